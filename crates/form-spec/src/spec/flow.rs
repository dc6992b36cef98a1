use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::screen::ScreenSpec;

/// Top-level flow definition as authored in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowConfiguration {
    pub flow_id: String,
    pub version: String,
    pub screens: Vec<ScreenSpec>,
}

impl FlowConfiguration {
    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Screens in display order: ascending `orderId`, ties keep their
    /// serialized order.
    pub fn sorted_screens(&self) -> Vec<ScreenSpec> {
        let mut screens = self.screens.clone();
        screens.sort_by_key(|screen| screen.order_id);
        screens
    }

    pub fn screen(&self, screen_id: &str) -> Option<&ScreenSpec> {
        self.screens.iter().find(|screen| screen.id == screen_id)
    }
}
