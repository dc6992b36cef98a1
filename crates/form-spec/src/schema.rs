use schemars::schema_for;
use serde_json::Value;

use crate::spec::flow::FlowConfiguration;

/// JSON Schema describing a flow configuration document.
pub fn generate() -> Value {
    schema_for!(FlowConfiguration).to_value()
}
