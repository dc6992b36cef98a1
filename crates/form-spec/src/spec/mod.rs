pub mod field;
pub mod flow;
pub mod screen;

pub use field::{
    CheckOperator, Condition, DEFAULT_DATE_FORMAT, FieldKind, FieldSpec, Keyboard,
    LogicalOperator, OptionItem, RuleKind, ValidationRule, VisibilityExpr,
};
pub use flow::FlowConfiguration;
pub use screen::{ActionSpec, PRIMARY_BUTTON, ScreenProgress, ScreenSpec};
