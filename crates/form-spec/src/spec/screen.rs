use std::hash::{Hash, Hasher};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::FieldSpec;

/// Action type that continues to the next screen.
pub const PRIMARY_BUTTON: &str = "primary_button";

/// Step counter shown above a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScreenProgress {
    pub current_step: u32,
    pub total_steps: u32,
}

/// Button or link declared by a screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActionSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub action: String,
}

impl ActionSpec {
    pub fn is_primary(&self) -> bool {
        self.kind == PRIMARY_BUTTON
    }
}

/// One screen of the flow.
///
/// Screens are identified by `id`; equality and hashing ignore every other
/// attribute.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScreenSpec {
    pub id: String,
    pub order_id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_title: Option<String>,
    pub show_back_button: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ScreenProgress>,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

impl ScreenSpec {
    pub fn new(id: impl Into<String>, order_id: i64, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order_id,
            title: title.into(),
            subtitle: None,
            header_title: None,
            show_back_button: true,
            progress: None,
            fields: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn field(&self, field_id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.id == field_id)
    }

    pub fn field_mut(&mut self, field_id: &str) -> Option<&mut FieldSpec> {
        self.fields.iter_mut().find(|field| field.id == field_id)
    }
}

impl PartialEq for ScreenSpec {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ScreenSpec {}

impl Hash for ScreenSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
