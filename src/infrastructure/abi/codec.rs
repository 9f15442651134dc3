//! ABI codec implementation using alloy-dyn-abi

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::B256;
use anyhow::{bail, ensure, Context, Result};

use super::args::{check_ranges, format_value, parse_arguments};
use crate::domain::abi::{
    selector_hex, AbiCodec, AbiEntry, AbiRegistry, DecodedArg, DecodedCall, DecodedLog, EntryKind,
    Param, Selector,
};

/// ABI codec implementation using alloy-dyn-abi
pub struct AlloyAbiCodec {
    registry: AbiRegistry,
}

impl Default for AlloyAbiCodec {
    fn default() -> Self {
        Self::new(AbiRegistry::builtin())
    }
}

impl AlloyAbiCodec {
    /// Create a new codec with the given registry
    pub fn new(registry: AbiRegistry) -> Self {
        Self { registry }
    }

    /// Get the underlying registry
    pub fn registry(&self) -> &AbiRegistry {
        &self.registry
    }

    /// Set a new registry
    pub fn set_registry(&mut self, registry: AbiRegistry) {
        self.registry = registry;
    }

    /// Encode calldata from typed values
    pub fn encode_values(&self, function: &AbiEntry, values: &[DynSolValue]) -> Result<Vec<u8>> {
        let selector = function_selector(function)?;
        let types = param_types(&function.inputs)?;
        ensure!(
            values.len() == types.len(),
            "argument count mismatch: expected {} arguments, got {}",
            types.len(),
            values.len()
        );
        for (idx, (ty, value)) in types.iter().zip(values).enumerate() {
            ensure!(
                ty.matches(value),
                "argument {} does not match type {}",
                idx + 1,
                ty
            );
            check_ranges(value).with_context(|| format!("argument {}", idx + 1))?;
        }

        let mut calldata = selector.to_vec();
        if !values.is_empty() {
            calldata.extend_from_slice(&DynSolValue::Tuple(values.to_vec()).abi_encode_params());
        }
        Ok(calldata)
    }

    /// Decode call arguments into typed values (calldata includes the selector)
    pub fn decode_input_values(&self, function: &AbiEntry, data: &[u8]) -> Result<Vec<DynSolValue>> {
        let expected = function_selector(function)?;
        ensure!(
            data.len() >= 4,
            "calldata too short (need at least 4 bytes for selector)"
        );

        let selector: Selector = [data[0], data[1], data[2], data[3]];
        if selector != expected {
            bail!(
                "selector mismatch: got {}, expected {}",
                selector_hex(selector),
                selector_hex(expected)
            );
        }

        decode_params(&function.inputs, &data[4..]).context("failed to decode calldata")
    }

    /// Decode return data into typed values
    pub fn decode_output_values(
        &self,
        function: &AbiEntry,
        data: &[u8],
    ) -> Result<Vec<DynSolValue>> {
        ensure!(
            function.kind == EntryKind::Function,
            "{} has no return values",
            function.describe()
        );
        decode_params(&function.outputs, data)
            .with_context(|| format!("failed to decode output of {}", function.describe()))
    }
}

impl AbiCodec for AlloyAbiCodec {
    fn encode_call(&self, function: &AbiEntry, args: &[&str]) -> Result<Vec<u8>> {
        let types = param_types(&function.inputs)?;
        let values = parse_arguments(&types, args)?;
        self.encode_values(function, &values)
    }

    fn decode_calldata(&self, function: &AbiEntry, data: &[u8]) -> Result<DecodedCall> {
        let values = self.decode_input_values(function, data)?;
        Ok(DecodedCall {
            table: None,
            function_name: function.name().to_string(),
            signature: function.signature().unwrap_or_default(),
            arguments: named_args(&function.inputs, &values),
        })
    }

    fn decode_output(&self, function: &AbiEntry, data: &[u8]) -> Result<Vec<DecodedArg>> {
        let values = self.decode_output_values(function, data)?;
        Ok(named_args(&function.outputs, &values))
    }

    fn decode_log(&self, event: &AbiEntry, topics: &[B256], data: &[u8]) -> Result<DecodedLog> {
        ensure!(
            event.kind == EntryKind::Event,
            "{} is not an event",
            event.describe()
        );

        let topics = if event.anonymous {
            topics
        } else {
            let expected = event.topic().context("event has no topic")?;
            match topics.split_first() {
                Some((first, rest)) if *first == expected => rest,
                Some((first, _)) => bail!("topic mismatch: got {}, expected {}", first, expected),
                None => bail!("log has no topics"),
            }
        };

        let indexed: Vec<&Param> = event.inputs.iter().filter(|p| p.is_indexed()).collect();
        ensure!(
            indexed.len() == topics.len(),
            "expected {} indexed topics, got {}",
            indexed.len(),
            topics.len()
        );

        let body: Vec<Param> = event
            .inputs
            .iter()
            .filter(|p| !p.is_indexed())
            .cloned()
            .collect();
        let mut body_values = decode_params(&body, data)
            .context("failed to decode log data")?
            .into_iter();
        let mut topic_iter = topics.iter();

        let mut fields = Vec::with_capacity(event.inputs.len());
        for (idx, param) in event.inputs.iter().enumerate() {
            let value = if param.is_indexed() {
                let topic = topic_iter.next().context("missing topic")?;
                decode_topic(param, *topic)?
            } else {
                body_values.next().context("missing log data field")?
            };
            fields.push(DecodedArg {
                name: arg_name(param, idx),
                kind: param.canonical_type(),
                value: format_value(&value),
            });
        }

        Ok(DecodedLog {
            event_name: event.name().to_string(),
            signature: event.signature().unwrap_or_default(),
            fields,
        })
    }

    fn decode_by_selector(&self, data: &[u8]) -> Result<Option<DecodedCall>> {
        if data.len() < 4 {
            bail!("calldata too short (need at least 4 bytes for selector)");
        }
        let selector: Selector = [data[0], data[1], data[2], data[3]];
        match self.registry.lookup(selector) {
            Some(found) => {
                let mut decoded = self.decode_calldata(found.entry, data)?;
                decoded.table = Some(found.table.name().to_string());
                Ok(Some(decoded))
            }
            None => Ok(None),
        }
    }
}

fn function_selector(function: &AbiEntry) -> Result<Selector> {
    ensure!(
        function.kind == EntryKind::Function,
        "{} is not a function",
        function.describe()
    );
    function.selector().context("function has no selector")
}

/// Parse types from parameters
pub fn param_types(params: &[Param]) -> Result<Vec<DynSolType>> {
    params
        .iter()
        .map(|param| {
            let ty = param.canonical_type();
            DynSolType::parse(&ty)
                .with_context(|| format!("failed to parse type '{}' for param '{}'", ty, param.name))
        })
        .collect()
}

fn decode_params(params: &[Param], data: &[u8]) -> Result<Vec<DynSolValue>> {
    let types = param_types(params)?;
    if types.is_empty() {
        return Ok(Vec::new());
    }

    // Decode all parameters as one tuple
    match DynSolType::Tuple(types).abi_decode_params(data)? {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

/// Decode an indexed event input from its topic
///
/// Reference types are stored as their keccak256 hash, so only the hash
/// can be recovered.
fn decode_topic(param: &Param, topic: B256) -> Result<DynSolValue> {
    let ty = DynSolType::parse(&param.canonical_type())?;
    match ty {
        DynSolType::Address
        | DynSolType::Bool
        | DynSolType::Int(_)
        | DynSolType::Uint(_)
        | DynSolType::FixedBytes(_)
        | DynSolType::Function => Ok(ty.abi_decode(topic.as_slice())?),
        _ => Ok(DynSolValue::FixedBytes(topic, 32)),
    }
}

fn arg_name(param: &Param, idx: usize) -> String {
    if param.name.trim().is_empty() {
        format!("arg{}", idx)
    } else {
        param.name.clone()
    }
}

fn named_args(params: &[Param], values: &[DynSolValue]) -> Vec<DecodedArg> {
    params
        .iter()
        .zip(values.iter())
        .enumerate()
        .map(|(idx, (param, value))| DecodedArg {
            name: arg_name(param, idx),
            kind: param.canonical_type(),
            value: format_value(value),
        })
        .collect()
}
