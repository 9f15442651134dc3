//! String argument coercion and value formatting for alloy-dyn-abi

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, FixedBytes, I256, U256};
use anyhow::{bail, Context, Result};

/// Parse argument values according to their types
pub fn parse_arguments(types: &[DynSolType], args: &[&str]) -> Result<Vec<DynSolValue>> {
    if args.len() != types.len() {
        bail!(
            "argument count mismatch: expected {} arguments, got {}",
            types.len(),
            args.len()
        );
    }

    types
        .iter()
        .zip(args.iter())
        .enumerate()
        .map(|(i, (ty, arg))| {
            parse_value(ty, arg)
                .with_context(|| format!("failed to parse argument {} as {}", i + 1, ty))
        })
        .collect()
}

/// Parse a single value according to its type
pub fn parse_value(ty: &DynSolType, arg: &str) -> Result<DynSolValue> {
    let arg = arg.trim();
    match ty {
        DynSolType::Address => {
            let addr = strip_hex(arg);
            if addr.len() != 40 || !addr.chars().all(|c| c.is_ascii_hexdigit()) {
                bail!("invalid address: expected 40 hex characters");
            }
            let bytes = hex::decode(addr).context("invalid hex")?;
            Ok(DynSolValue::Address(Address::from_slice(&bytes)))
        }

        DynSolType::Bool => {
            let value = match arg.to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => bail!("invalid bool: expected true/false, got '{}'", arg),
            };
            Ok(DynSolValue::Bool(value))
        }

        DynSolType::Int(size) => {
            let value = if has_hex_prefix(arg) {
                // Two's complement of width `size`
                let raw = U256::from_be_bytes(parse_hex_word(strip_hex(arg))?);
                if *size < 256 && raw >> *size != U256::ZERO {
                    bail!("hex value does not fit in int{}", size);
                }
                if *size > 0 && *size < 256 && raw.bit(*size - 1) {
                    I256::from_raw(raw | (U256::MAX << *size))
                } else {
                    I256::from_raw(raw)
                }
            } else {
                arg.parse::<I256>()
                    .map_err(|e| anyhow::anyhow!("invalid integer: {}", e))?
            };
            if !int_fits(value, *size) {
                bail!("value does not fit in int{}", size);
            }
            Ok(DynSolValue::Int(value, *size))
        }

        DynSolType::Uint(size) => {
            let value = if has_hex_prefix(arg) {
                U256::from_be_bytes(parse_hex_word(strip_hex(arg))?)
            } else {
                arg.parse::<U256>()
                    .map_err(|e| anyhow::anyhow!("invalid unsigned integer: {}", e))?
            };
            if !uint_fits(value, *size) {
                bail!("value does not fit in uint{}", size);
            }
            Ok(DynSolValue::Uint(value, *size))
        }

        DynSolType::Bytes => {
            let bytes = hex::decode(strip_hex(arg)).context("invalid hex")?;
            Ok(DynSolValue::Bytes(bytes))
        }

        DynSolType::FixedBytes(size) => {
            let bytes = hex::decode(strip_hex(arg)).context("invalid hex")?;
            if bytes.len() != *size {
                bail!(
                    "invalid bytes length: expected {} bytes, got {}",
                    size,
                    bytes.len()
                );
            }
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(FixedBytes::from(word), *size))
        }

        DynSolType::String => {
            let s = if arg.len() >= 2
                && ((arg.starts_with('"') && arg.ends_with('"'))
                    || (arg.starts_with('\'') && arg.ends_with('\'')))
            {
                &arg[1..arg.len() - 1]
            } else {
                arg
            };
            Ok(DynSolValue::String(s.to_string()))
        }

        DynSolType::Array(inner_ty) => {
            let elements = split_group(arg, '[', ']')?;
            let values = elements
                .iter()
                .map(|elem| parse_value(inner_ty, elem))
                .collect::<Result<Vec<_>>>()?;
            Ok(DynSolValue::Array(values))
        }

        DynSolType::FixedArray(inner_ty, size) => {
            let elements = split_group(arg, '[', ']')?;
            if elements.len() != *size {
                bail!(
                    "fixed array size mismatch: expected {} elements, got {}",
                    size,
                    elements.len()
                );
            }
            let values = elements
                .iter()
                .map(|elem| parse_value(inner_ty, elem))
                .collect::<Result<Vec<_>>>()?;
            Ok(DynSolValue::FixedArray(values))
        }

        DynSolType::Tuple(types) => {
            let elements = split_group(arg, '(', ')')?;
            if elements.len() != types.len() {
                bail!(
                    "tuple size mismatch: expected {} elements, got {}",
                    types.len(),
                    elements.len()
                );
            }
            let values = types
                .iter()
                .zip(elements.iter())
                .map(|(ty, elem)| parse_value(ty, elem))
                .collect::<Result<Vec<_>>>()?;
            Ok(DynSolValue::Tuple(values))
        }

        _ => bail!("unsupported type: {}", ty),
    }
}

/// Split `[a,b,(c,d)]` into its top-level elements
fn split_group<'a>(arg: &'a str, open: char, close: char) -> Result<Vec<&'a str>> {
    let Some(inner) = arg
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
    else {
        bail!("expected a value enclosed in {}...{}", open, close);
    };

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut elements = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, c) in inner.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => {
                depth = depth
                    .checked_sub(1)
                    .context("unbalanced brackets in argument")?;
            }
            ',' if depth == 0 => {
                elements.push(inner[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        bail!("unbalanced brackets in argument");
    }
    elements.push(inner[start..].trim());
    Ok(elements)
}

fn has_hex_prefix(arg: &str) -> bool {
    arg.starts_with("0x") || arg.starts_with("0X")
}

fn strip_hex(arg: &str) -> &str {
    arg.strip_prefix("0x")
        .or_else(|| arg.strip_prefix("0X"))
        .unwrap_or(arg)
}

/// Parse hex string into a left-padded 32-byte word
fn parse_hex_word(hex_str: &str) -> Result<[u8; 32]> {
    let hex_str = if hex_str.len() % 2 == 1 {
        format!("0{}", hex_str)
    } else {
        hex_str.to_string()
    };
    let bytes = hex::decode(&hex_str).context("invalid hex")?;

    if bytes.len() > 32 {
        bail!(
            "hex value too large: expected max 32 bytes, got {}",
            bytes.len()
        );
    }

    let mut padded = [0u8; 32];
    padded[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(padded)
}

fn uint_fits(value: U256, size: usize) -> bool {
    size >= 256 || value >> size == U256::ZERO
}

fn int_fits(value: I256, size: usize) -> bool {
    if size >= 256 {
        return true;
    }
    if size == 0 {
        return false;
    }
    let bound = I256::from_raw(U256::from(1) << (size - 1));
    value >= -bound && value < bound
}

/// Reject integers wider than their declared `intN`/`uintN`
///
/// `DynSolType::matches` compares widths only, not values.
pub fn check_ranges(value: &DynSolValue) -> Result<()> {
    match value {
        DynSolValue::Int(v, size) if !int_fits(*v, *size) => {
            bail!("value {} does not fit in int{}", v, size)
        }
        DynSolValue::Uint(v, size) if !uint_fits(*v, *size) => {
            bail!("value {} does not fit in uint{}", v, size)
        }
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            items.iter().try_for_each(check_ranges)
        }
        _ => Ok(()),
    }
}

/// Format a DynSolValue for display
///
/// The output of this function parses back with [`parse_value`].
pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => {
            let bytes = &word.as_slice()[..(*size).min(32)];
            format!("0x{}", hex::encode(bytes))
        }
        DynSolValue::Address(addr) => addr.to_checksum(None),
        DynSolValue::Function(func) => format!("0x{}", hex::encode(func.as_slice())),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::String(s) => format!("\"{}\"", s),
        DynSolValue::Array(arr) | DynSolValue::FixedArray(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            format!("[{}]", items.join(","))
        }
        DynSolValue::Tuple(fields) => {
            let items: Vec<String> = fields.iter().map(format_value).collect();
            format!("({})", items.join(","))
        }
        #[allow(unreachable_patterns)]
        other => format!("{:?}", other),
    }
}
