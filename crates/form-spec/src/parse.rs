use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::spec::flow::FlowConfiguration;

/// Reasons a flow configuration cannot be loaded.
#[derive(Debug, Error)]
pub enum ConfigParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("schema mismatch: {0}")]
    SchemaMismatch(#[source] serde_json::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parses a configuration document.
///
/// Syntax errors are reported as [`ConfigParseError::InvalidJson`]; well-formed
/// JSON with the wrong shape as [`ConfigParseError::SchemaMismatch`].
pub fn parse_flow(json: &str) -> Result<FlowConfiguration, ConfigParseError> {
    parse_flow_slice(json.as_bytes())
}

pub fn parse_flow_slice(bytes: &[u8]) -> Result<FlowConfiguration, ConfigParseError> {
    let document: Value = serde_json::from_slice(bytes).map_err(ConfigParseError::InvalidJson)?;
    serde_json::from_value(document).map_err(ConfigParseError::SchemaMismatch)
}

pub fn load_flow(path: impl AsRef<Path>) -> Result<FlowConfiguration, ConfigParseError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ConfigParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_flow_slice(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        flow_id = %config.flow_id,
        screens = config.screens.len(),
        "flow configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_are_invalid_json() {
        let err = parse_flow(r#"{"flowId": "x", "screens": [ }"#).unwrap_err();
        assert!(matches!(err, ConfigParseError::InvalidJson(_)));
        assert!(matches!(parse_flow(""), Err(ConfigParseError::InvalidJson(_))));
    }

    #[test]
    fn shape_errors_are_schema_mismatches() {
        let err = parse_flow(r#"{"flowId": "x", "version": "1"}"#).unwrap_err();
        assert!(matches!(err, ConfigParseError::SchemaMismatch(_)));
        let err = parse_flow("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ConfigParseError::SchemaMismatch(_)));
    }

    #[test]
    fn missing_file_is_io() {
        let err = load_flow("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigParseError::Io { .. }));
    }
}
