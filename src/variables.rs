//! Variable decode: turns a job's raw JSON `variables` object into the
//! argument shape the handler expects, honoring `variables_to_fetch` and
//! `single_value` (§3 `TaskConfig`, §6 "Variables wire format").

use std::collections::HashMap;

use crate::job::Job;
use crate::task::TaskConfig;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("job variables must be a JSON object, got: {0}")]
    NotAnObject(serde_json::Value),
    #[error("single_value task is missing its declared variable {0:?}")]
    MissingSingleValue(String),
}

/// What a handler receives after decode: either the named-variable map, or —
/// for a `single_value` task — the bare value of its one declared variable.
#[derive(Debug, Clone)]
pub enum DecodedVariables {
    Map(HashMap<String, serde_json::Value>),
    Single(serde_json::Value),
}

impl DecodedVariables {
    /// Convenience accessor for handlers that know they registered a plain
    /// (non-`single_value`) task.
    pub fn into_map(self) -> HashMap<String, serde_json::Value> {
        match self {
            DecodedVariables::Map(map) => map,
            DecodedVariables::Single(value) => {
                let mut map = HashMap::with_capacity(1);
                map.insert("value".to_string(), value);
                map
            }
        }
    }
}

/// Decode a job's variables per `config.variables_to_fetch`/`single_value`.
///
/// When `variables_to_fetch` is empty, the whole variables object is
/// returned (the gateway already filtered to what `ActivateJobsRequest`
/// asked for; an empty fetch list there means "fetch everything").
pub fn decode(job: &Job, config: &TaskConfig) -> Result<DecodedVariables, DecodeError> {
    let object = job
        .variables
        .as_object()
        .ok_or_else(|| DecodeError::NotAnObject(job.variables.clone()))?;

    if config.single_value {
        let name = config
            .variable_name
            .as_ref()
            .expect("single_value task must have variable_name set");
        let value = object
            .get(name)
            .cloned()
            .ok_or_else(|| DecodeError::MissingSingleValue(name.clone()))?;
        return Ok(DecodedVariables::Single(value));
    }

    if config.variables_to_fetch.is_empty() {
        return Ok(DecodedVariables::Map(object.clone().into_iter().collect()));
    }

    let mut decoded = HashMap::with_capacity(config.variables_to_fetch.len());
    for key in &config.variables_to_fetch {
        if let Some(value) = object.get(key) {
            decoded.insert(key.clone(), value.clone());
        }
    }
    Ok(DecodedVariables::Map(decoded))
}
