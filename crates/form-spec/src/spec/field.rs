use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Date pattern used when a date field does not declare one.
pub const DEFAULT_DATE_FORMAT: &str = "MM/dd/yyyy";

/// Supported field widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Label,
    TextField,
    PhoneField,
    DatePicker,
    Dropdown,
    RadioGroup,
    /// Any widget type this engine does not know; never rendered.
    #[serde(other)]
    Unsupported,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Label => "label",
            FieldKind::TextField => "text_field",
            FieldKind::PhoneField => "phone_field",
            FieldKind::DatePicker => "date_picker",
            FieldKind::Dropdown => "dropdown",
            FieldKind::RadioGroup => "radio_group",
            FieldKind::Unsupported => "unsupported",
        }
    }
}

/// Keyboard hint for text input widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Keyboard {
    NumberPad,
    Email,
    Phone,
    #[default]
    #[serde(other)]
    Default,
}

/// Rule kinds understood by the validation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Required,
    Email,
    Phone,
    MinLength,
    MaxLength,
    Numeric,
    MinAge,
    /// Rule types added by newer configurations; always pass.
    #[serde(other)]
    Unknown,
}

/// Single validation rule attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationRule {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

impl ValidationRule {
    pub fn new(kind: RuleKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }
}

/// Selectable option of a dropdown or radio group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OptionItem {
    pub id: String,
    pub label: String,
}

impl OptionItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// How multiple visibility conditions are combined.
///
/// Matching is case-insensitive; any other string is kept as
/// [`LogicalOperator::Unrecognized`] so the evaluator can fail closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogicalOperator {
    And,
    Or,
    Unrecognized(String),
}

impl From<String> for LogicalOperator {
    fn from(value: String) -> Self {
        match value.to_uppercase().as_str() {
            "AND" => LogicalOperator::And,
            "OR" => LogicalOperator::Or,
            _ => LogicalOperator::Unrecognized(value),
        }
    }
}

impl From<LogicalOperator> for String {
    fn from(value: LogicalOperator) -> Self {
        match value {
            LogicalOperator::And => "AND".into(),
            LogicalOperator::Or => "OR".into(),
            LogicalOperator::Unrecognized(raw) => raw,
        }
    }
}

/// Comparison applied by a single visibility condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckOperator {
    #[default]
    Equals,
    Contains,
}

impl From<String> for CheckOperator {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("contains") {
            CheckOperator::Contains
        } else {
            CheckOperator::Equals
        }
    }
}

impl From<CheckOperator> for String {
    fn from(value: CheckOperator) -> Self {
        match value {
            CheckOperator::Equals => "equals".into(),
            CheckOperator::Contains => "contains".into(),
        }
    }
}

/// A single `fieldId <op> value` check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub field_id: String,
    pub value: String,
    #[serde(default, rename = "operator", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub check: Option<CheckOperator>,
}

impl Condition {
    pub fn equals(field_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            value: value.into(),
            check: None,
        }
    }

    pub fn contains(field_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            value: value.into(),
            check: Some(CheckOperator::Contains),
        }
    }
}

/// Conditional visibility attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisibilityExpr {
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub operator: Option<LogicalOperator>,
}

/// Definition of a single field inside a screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub id: String,
    pub order_id: i64,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_visibility: Option<VisibilityExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_multi_select: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl FieldSpec {
    /// Minimal field of the given kind; the remaining attributes are unset.
    pub fn new(id: impl Into<String>, order_id: i64, kind: FieldKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order_id,
            kind,
            label: label.into(),
            placeholder: None,
            validations: Vec::new(),
            keyboard: None,
            default_country_code: None,
            date_format: None,
            options: None,
            is_disabled: None,
            default_value: None,
            conditional_visibility: None,
            text: None,
            style: None,
            is_multi_select: None,
            input_filter: None,
            max_length: None,
        }
    }

    pub fn disabled(&self) -> bool {
        self.is_disabled.unwrap_or(false)
    }

    pub fn multi_select(&self) -> bool {
        self.kind == FieldKind::Dropdown && self.is_multi_select.unwrap_or(false)
    }

    pub fn is_required(&self) -> bool {
        self.validations
            .iter()
            .any(|rule| rule.kind == RuleKind::Required)
    }

    pub fn date_format(&self) -> &str {
        self.date_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT)
    }

    pub fn keyboard(&self) -> Keyboard {
        self.keyboard.unwrap_or_default()
    }

    /// Key under which a phone field stores its dialling prefix.
    pub fn country_code_key(&self) -> String {
        format!("{}_country_code", self.id)
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.kind.as_str())
    }
}
