use std::path::PathBuf;
use std::str::FromStr;

use alloy_primitives::{Address, B256, U256};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ctoken_abi::config::{self, Config};
use ctoken_abi::domain::abi::{validate, AbiCodec, AbiRegistry, AbiTable, DecodedArg};
use ctoken_abi::domain::compound::Interaction;
use ctoken_abi::infrastructure::abi::{AbiScanner, AlloyAbiCodec};
use ctoken_abi::infrastructure::ethereum::{AlloyCaller, ContractCaller, MarketReader};
use ctoken_abi::modules::export::{self, ExportFormat};

#[derive(Debug, Parser)]
#[command(
    name = "ctoken-abi",
    version,
    about = "Compound cToken ABI tables: selectors, validation, encoding and market reads"
)]
struct Args {
    /// Extra directory of ABI JSON files, merged after the built-in tables
    #[arg(long = "abi-path", global = true)]
    abi_paths: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List loaded tables
    List,
    /// Print every entry of a table with its selector or topic
    Show { table: String },
    /// Check tables against the schema rules
    Validate { table: Option<String> },
    /// Print the selector of a function (all overloads when given a bare name)
    Selector { table: String, function: String },
    /// Resolve a 4-byte selector or a 32-byte event topic
    Lookup { identifier: String },
    /// Encode calldata for a function
    Encode {
        table: String,
        function: String,
        args: Vec<String>,
    },
    /// Decode calldata, locating the function by its selector
    Decode {
        calldata: String,
        /// Only search this table
        #[arg(long)]
        table: Option<String>,
    },
    /// Decode an event log from its topics and data
    DecodeLog {
        /// Log topics, topic[0] first
        #[arg(long = "topic", required = true)]
        topics: Vec<String>,
        /// Non-indexed data
        #[arg(long, default_value = "0x")]
        data: String,
    },
    /// Call a function through eth_call and decode its outputs
    Call {
        /// HTTP JSON-RPC endpoint (e.g. http://localhost:8545)
        #[arg(long)]
        rpc: Option<String>,
        table: String,
        /// Contract address, or a market symbol from the config
        address: String,
        function: String,
        args: Vec<String>,
    },
    /// Read the state of a cToken market
    Market {
        /// HTTP JSON-RPC endpoint (e.g. http://localhost:8545)
        #[arg(long)]
        rpc: Option<String>,
        /// cToken address, or a market symbol from the config
        ctoken: String,
        /// Also quote mint and redeem for this amount (base units)
        #[arg(long)]
        amount: Option<String>,
    },
    /// Write the selector and topic listing to a file
    Export {
        #[arg(long, value_enum, default_value = "json")]
        format: ExportFormat,
        #[arg(long)]
        out: PathBuf,
        /// Tables to export, all when omitted
        tables: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = config::load();
    let registry = build_registry(&config, &args.abi_paths);

    match args.command {
        Command::List => list(&registry),
        Command::Show { table } => show(find_table(&registry, &table)?),
        Command::Validate { table } => validate_tables(&registry, table.as_deref()),
        Command::Selector { table, function } => {
            selector(find_table(&registry, &table)?, &function)
        }
        Command::Lookup { identifier } => lookup(&registry, &identifier),
        Command::Encode {
            table,
            function,
            args,
        } => encode(&registry, &table, &function, &args),
        Command::Decode { calldata, table } => decode(registry, &calldata, table.as_deref()),
        Command::DecodeLog { topics, data } => decode_log(registry, &topics, &data),
        Command::Call {
            rpc,
            table,
            address,
            function,
            args,
        } => {
            let table = find_table(&registry, &table)?.clone();
            let to = resolve_address(&config, &address)?;
            let caller = connect(&config, rpc.as_deref())?;
            block_on(call(caller, table, to, function, args))
        }
        Command::Market {
            rpc,
            ctoken,
            amount,
        } => {
            let ctoken = resolve_address(&config, &ctoken)?;
            let amount = amount
                .map(|value| U256::from_str(&value).context("invalid amount"))
                .transpose()?;
            let caller = connect(&config, rpc.as_deref())?;
            block_on(market(caller, ctoken, amount))
        }
        Command::Export {
            format,
            out,
            tables,
        } => export_tables(&registry, format, &out, &tables),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_registry(config: &Config, extra: &[PathBuf]) -> AbiRegistry {
    let mut registry = AbiRegistry::builtin();
    let mut roots = config.abi_roots();
    roots.extend(extra.iter().cloned());
    if !roots.is_empty() {
        let scanned = AbiScanner::scan_roots(&roots);
        if !scanned.errors.is_empty() {
            tracing::warn!(errors = scanned.errors.len(), "some ABI files could not be loaded");
        }
        registry.merge(scanned);
    }
    for collision in &registry.collisions {
        tracing::warn!(
            selector = %collision.selector_hex(),
            kept = %collision.kept,
            shadowed = %collision.shadowed,
            "selector collision"
        );
    }
    tracing::info!("{}", registry.summary());
    registry
}

fn find_table<'a>(registry: &'a AbiRegistry, name: &str) -> Result<&'a AbiTable> {
    registry.table(name).ok_or_else(|| {
        let known: Vec<&str> = registry.tables().iter().map(AbiTable::name).collect();
        anyhow!("unknown table `{}` (known: {})", name, known.join(", "))
    })
}

fn resolve_address(config: &Config, value: &str) -> Result<Address> {
    if let Some(market) = config.market(value) {
        return market
            .parsed_address()
            .with_context(|| format!("configured market `{}` has an invalid address", value));
    }
    Address::from_str(value.trim()).with_context(|| format!("invalid address `{}`", value))
}

fn connect(config: &Config, rpc: Option<&str>) -> Result<AlloyCaller> {
    let url = rpc
        .map(str::to_string)
        .or_else(|| config.rpc.clone())
        .context("no RPC endpoint: pass --rpc or set `rpc` in the config")?;
    AlloyCaller::connect_http(&url)
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(future)
}

fn list(registry: &AbiRegistry) -> Result<()> {
    for table in registry.tables() {
        println!(
            "{:<14} {:>3} entries  {:>3} functions  {:>2} events  ({})",
            table.name(),
            table.len(),
            table.functions().count(),
            table.events().count(),
            table.source()
        );
    }
    println!("{}", registry.summary());
    Ok(())
}

fn show(table: &AbiTable) -> Result<()> {
    println!("{} ({})", table.name(), table.source());
    for entry in table.entries() {
        let identifier = entry
            .derived_identifier()
            .map(|bytes| format!("0x{}", hex::encode(bytes)))
            .unwrap_or_default();
        let mutability = entry
            .mutability()
            .map(|m| m.to_string())
            .unwrap_or_default();
        println!(
            "  {:<11} {:<12} {:<66} {}",
            entry.kind.as_str(),
            mutability,
            identifier,
            entry.describe()
        );
    }
    Ok(())
}

fn validate_tables(registry: &AbiRegistry, only: Option<&str>) -> Result<()> {
    let tables: Vec<&AbiTable> = match only {
        Some(name) => vec![find_table(registry, name)?],
        None => registry.tables().iter().collect(),
    };

    let mut failed = 0;
    for table in tables {
        let report = validate(table);
        let status = if report.is_clean() { "ok" } else { "FAILED" };
        println!("{}: {} entries, {}", report.table, report.entries, status);
        for issue in &report.issues {
            println!("  error: {}", issue);
        }
        for (name, signatures) in &report.overloads {
            println!("  overload {}: {}", name, signatures.join(", "));
        }
        if !report.is_clean() {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} table(s) failed validation", failed);
    }
    Ok(())
}

fn selector(table: &AbiTable, function: &str) -> Result<()> {
    let mut entries: Vec<_> = table.overloads(function).collect();
    if entries.is_empty() {
        entries.push(table.function(function)?);
    }
    for entry in entries {
        let (Some(signature), Some(selector)) = (entry.signature(), entry.selector()) else {
            continue;
        };
        println!("0x{}  {}", hex::encode(selector), signature);
    }
    Ok(())
}

fn lookup(registry: &AbiRegistry, identifier: &str) -> Result<()> {
    let digits = strip_hex_prefix(identifier).len();
    if digits != 8 && digits != 64 {
        bail!("expected a 4-byte selector or a 32-byte topic, got `{}`", identifier);
    }
    let resolved = registry
        .lookup_identifier(identifier)
        .with_context(|| format!("no entry for {}", identifier))?;
    println!("{}.{}", resolved.table.name(), resolved.entry.describe());
    Ok(())
}

fn encode(registry: &AbiRegistry, table: &str, function: &str, args: &[String]) -> Result<()> {
    let table = find_table(registry, table)?;
    let entry = table.function(function)?;
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let calldata = AlloyAbiCodec::default().encode_call(entry, &args)?;
    println!("0x{}", hex::encode(calldata));
    Ok(())
}

fn decode(registry: AbiRegistry, calldata: &str, only: Option<&str>) -> Result<()> {
    let data = parse_hex(calldata)?;
    let decoded = match only {
        Some(name) => {
            let table = find_table(&registry, name)?;
            let selector: [u8; 4] = data
                .get(..4)
                .and_then(|bytes| bytes.try_into().ok())
                .context("calldata shorter than a selector")?;
            let entry = table.function_by_selector(selector).with_context(|| {
                format!("no function 0x{} in {}", hex::encode(selector), table.name())
            })?;
            let mut call = AlloyAbiCodec::default().decode_calldata(entry, &data)?;
            call.table = Some(table.name().to_string());
            call
        }
        None => AlloyAbiCodec::new(registry)
            .decode_by_selector(&data)?
            .with_context(|| format!("unknown selector 0x{}", hex::encode(&data[..4.min(data.len())])))?,
    };

    match &decoded.table {
        Some(table) => println!("{}.{}", table, decoded.signature),
        None => println!("{}", decoded.signature),
    }
    print_args(&decoded.arguments);
    Ok(())
}

fn decode_log(registry: AbiRegistry, topics: &[String], data: &str) -> Result<()> {
    let topics = topics
        .iter()
        .map(|topic| B256::from_str(topic.trim()).with_context(|| format!("invalid topic `{}`", topic)))
        .collect::<Result<Vec<_>>>()?;
    let data = parse_hex(data)?;

    let first = topics.first().copied().context("no topics")?;
    let resolved = registry
        .lookup_topic(first)
        .with_context(|| format!("unknown event topic {}", first))?;
    let table = resolved.table.name().to_string();
    let event = resolved.entry.clone();

    let log = AlloyAbiCodec::new(registry).decode_log(&event, &topics, &data)?;
    println!("{}.{}", table, log.signature);
    print_args(&log.fields);
    Ok(())
}

async fn call<C: ContractCaller>(
    caller: C,
    table: AbiTable,
    to: Address,
    function: String,
    args: Vec<String>,
) -> Result<()> {
    let endpoint = caller.endpoint_name();
    let reader = MarketReader::new(caller);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let outputs = reader
        .call_function(&table, to, &function, &args)
        .await
        .with_context(|| format!("eth_call via {}", endpoint))?;
    print_args(&outputs);
    Ok(())
}

async fn market<C: ContractCaller>(caller: C, ctoken: Address, amount: Option<U256>) -> Result<()> {
    let reader = MarketReader::new(caller);
    let snapshot = reader.snapshot(ctoken).await?;

    println!("market          {} ({})", snapshot.symbol, snapshot.ctoken);
    match snapshot.underlying {
        Some(underlying) => println!("underlying      {}", underlying),
        None => println!("underlying      ETH"),
    }
    println!("exchange rate   {}", snapshot.exchange_rate);
    println!("supply rate     {} per block", snapshot.supply_rate_per_block);
    println!("supply APR      {:.6}%", snapshot.supply_apr());
    println!("market size     {}", snapshot.market_size);

    if let Some(amount) = amount {
        let minted = snapshot.expected_output(Interaction::Mint, amount)?;
        let redeemed = snapshot.expected_output(Interaction::Redeem, amount)?;
        println!("mint {}   -> {} {}", amount, minted, snapshot.symbol);
        println!("redeem {} -> {} underlying", amount, redeemed);
    }
    Ok(())
}

fn export_tables(
    registry: &AbiRegistry,
    format: ExportFormat,
    out: &std::path::Path,
    names: &[String],
) -> Result<()> {
    let tables: Vec<&AbiTable> = if names.is_empty() {
        registry.tables().iter().collect()
    } else {
        names
            .iter()
            .map(|name| find_table(registry, name))
            .collect::<Result<_>>()?
    };
    let rows = export::rows(tables);
    let written = export::export(out, format, &rows)?;
    println!("wrote {} entries to {}", written, out.display());
    Ok(())
}

fn print_args(args: &[DecodedArg]) {
    for arg in args {
        println!("  {} {} = {}", arg.kind, arg.name, arg.value);
    }
}

fn parse_hex(value: &str) -> Result<Vec<u8>> {
    hex::decode(strip_hex_prefix(value)).with_context(|| format!("invalid hex `{}`", value))
}

fn strip_hex_prefix(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_accepts_either_prefix_case() {
        let registry = AbiRegistry::builtin();
        assert!(lookup(&registry, "0XA9059CBB").is_ok());
        assert!(lookup(&registry, "0xa9059cbb").is_ok());
        assert!(lookup(&registry, "0X1234").is_err());
        assert_eq!(parse_hex("0XAB").unwrap(), vec![0xab]);
    }
}
