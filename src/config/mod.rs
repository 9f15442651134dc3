use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use alloy_primitives::Address;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct MarketSpec {
    pub address: String,
    pub symbol: Option<String>,
    /// Absent for the ether market
    pub underlying: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub rpc: Option<String>,

    #[serde(default)]
    pub abi_paths: Vec<String>,

    #[serde(default)]
    pub markets: Vec<MarketSpec>,
}

impl MarketSpec {
    pub fn parsed_address(&self) -> Option<Address> {
        parse_address(&self.address)
    }

    pub fn parsed_underlying(&self) -> Option<Address> {
        self.underlying.as_deref().and_then(parse_address)
    }

    pub fn display_symbol(&self) -> String {
        self.symbol
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| short_addr(&self.address))
    }
}

impl Config {
    /// Find a configured market by symbol (case-insensitive) or address
    pub fn market(&self, key: &str) -> Option<&MarketSpec> {
        let key = key.trim();
        let as_address = parse_address(key);
        self.markets.iter().find(|market| {
            market
                .symbol
                .as_deref()
                .is_some_and(|symbol| symbol.eq_ignore_ascii_case(key))
                || (as_address.is_some() && market.parsed_address() == as_address)
        })
    }

    pub fn abi_roots(&self) -> Vec<PathBuf> {
        self.abi_paths.iter().map(|p| expand_home(p)).collect()
    }
}

pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    load_from(&path)
}

pub fn load_from(path: &Path) -> Config {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Config::default(),
    };
    match toml::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring malformed config");
            Config::default()
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    resolve_config_path(|key| std::env::var_os(key))
}

fn resolve_config_path(var: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    if let Some(path) = var("CTOKEN_ABI_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = var("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("ctoken-abi").join("config.toml"));
    }
    if let Some(home) = var("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("ctoken-abi").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "ctoken-abi", "ctoken-abi")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn parse_address(value: &str) -> Option<Address> {
    Address::from_str(value.trim()).ok()
}

fn short_addr(value: &str) -> String {
    let value = value.trim();
    if value.len() <= 10 {
        return value.to_string();
    }
    let start: String = value.chars().take(6).collect();
    let tail: Vec<char> = value.chars().rev().take(4).collect();
    let end: String = tail.into_iter().rev().collect();
    format!("{}..{}", start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const SAMPLE: &str = r#"
rpc = "http://localhost:8545"
abi_paths = ["./abis"]

[[markets]]
address = "0x4Ddc2D193948926D02f9B1fE9e1daa0718270ED5"
symbol = "cETH"

[[markets]]
address = "0x5d3a536E4D6DbD6114cc1Ead35777bAB948E3643"
symbol = "cDAI"
underlying = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
"#;

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = load_from(&path);
        assert_eq!(config.rpc.as_deref(), Some("http://localhost:8545"));
        assert_eq!(config.abi_roots(), vec![PathBuf::from("./abis")]);
        assert_eq!(config.markets.len(), 2);

        let ceth = config.market("ceth").unwrap();
        assert_eq!(ceth.parsed_underlying(), None);

        let cdai = config
            .market("0x5d3a536e4d6dbd6114cc1ead35777bab948e3643")
            .unwrap();
        assert_eq!(cdai.display_symbol(), "cDAI");
        assert_eq!(
            cdai.parsed_underlying(),
            Some(address!("6B175474E89094C44Da98b954EedeAC495271d0F"))
        );
    }

    #[test]
    fn test_missing_or_malformed_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_from(&dir.path().join("absent.toml"));
        assert!(missing.rpc.is_none() && missing.markets.is_empty());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "rpc = [").unwrap();
        let config = load_from(&bad);
        assert!(config.rpc.is_none());
        assert!(config.abi_paths.is_empty());
    }

    #[test]
    fn test_config_path_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.toml");
        let xdg = dir.path().join("xdg");
        let home = dir.path().join("home");

        let env = |pairs: Vec<(&'static str, PathBuf)>| {
            move |key: &str| {
                pairs
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| value.clone().into_os_string())
            }
        };

        let all = env(vec![
            ("CTOKEN_ABI_CONFIG", explicit.clone()),
            ("XDG_CONFIG_HOME", xdg.clone()),
            ("HOME", home.clone()),
        ]);
        assert_eq!(resolve_config_path(all), Some(explicit));

        let no_override = env(vec![("XDG_CONFIG_HOME", xdg.clone()), ("HOME", home.clone())]);
        assert_eq!(
            resolve_config_path(no_override),
            Some(xdg.join("ctoken-abi").join("config.toml"))
        );

        let home_only = env(vec![("HOME", home.clone())]);
        assert_eq!(
            resolve_config_path(home_only),
            Some(home.join(".config").join("ctoken-abi").join("config.toml"))
        );
    }

    #[test]
    fn test_load_follows_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, SAMPLE).unwrap();

        // No other test reads this variable
        std::env::set_var("CTOKEN_ABI_CONFIG", &path);
        let resolved = config_path();
        let config = load();
        std::env::remove_var("CTOKEN_ABI_CONFIG");

        assert_eq!(resolved, Some(path));
        assert_eq!(config.rpc.as_deref(), Some("http://localhost:8545"));
        assert_eq!(config.markets.len(), 2);
    }

    #[test]
    fn test_display_symbol_falls_back_to_short_address() {
        let spec = MarketSpec {
            address: "0x39AA39c021dfbaE8faC545936693aC917d5E7563".to_string(),
            symbol: Some("  ".to_string()),
            underlying: None,
        };
        assert_eq!(spec.display_symbol(), "0x39AA..7563");
    }
}
