#![allow(missing_docs)]

pub mod parse;
pub mod render;
pub mod schema;
pub mod spec;
pub mod state;
pub mod validate;
pub mod value;
pub mod visibility;

pub use parse::{ConfigParseError, load_flow, parse_flow, parse_flow_slice};
pub use render::{
    RenderAction, RenderField, RenderPayload, RenderProgress, RenderStatus, apply_text_input,
    build_render_payload, render_json_ui, render_text, visible_fields,
};
pub use schema::generate as config_schema;
pub use spec::{
    ActionSpec, CheckOperator, Condition, FieldKind, FieldSpec, FlowConfiguration, Keyboard,
    LogicalOperator, OptionItem, RuleKind, ScreenProgress, ScreenSpec, ValidationRule,
    VisibilityExpr,
};
pub use state::FormState;
pub use validate::{
    ValidationOutcome, validate, validate_choices, validate_date, validate_date_on,
};
pub use value::{FieldValue, encode_date, format_date, parse_date};
pub use visibility::{ValueLookup, VisibilityMap, is_visible, resolve_visibility};
