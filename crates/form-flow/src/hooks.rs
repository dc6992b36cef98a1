use std::collections::HashMap;
use std::sync::Arc;

use form_spec::{FormState, visible_fields};
use tracing::info;

use crate::error::HookError;
use crate::service::OptionCategory;

/// Asks the coordinator to populate a field from a remote option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRequest {
    pub field_id: String,
    pub category: OptionCategory,
}

impl OptionRequest {
    pub fn new(field_id: impl Into<String>, category: OptionCategory) -> Self {
        Self {
            field_id: field_id.into(),
            category,
        }
    }
}

/// Per-screen behaviour run by the coordinator.
pub trait ScreenHooks: Send + Sync {
    /// Called every time the screen becomes the current one.
    fn on_shown(&self, _state: &FormState) -> Vec<OptionRequest> {
        Vec::new()
    }

    /// Called after the screen validated successfully, before advancing.
    /// An error is logged and does not block the flow.
    fn on_continue(&self, _state: &FormState) -> Result<(), HookError> {
        Ok(())
    }
}

/// Loads option lists on display and logs a summary on continue.
#[derive(Debug, Clone, Default)]
pub struct AccountScreenHooks {
    options: Vec<(String, OptionCategory)>,
}

impl AccountScreenHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, field_id: impl Into<String>, category: OptionCategory) -> Self {
        self.options.push((field_id.into(), category));
        self
    }
}

impl ScreenHooks for AccountScreenHooks {
    fn on_shown(&self, state: &FormState) -> Vec<OptionRequest> {
        self.options
            .iter()
            .filter(|(field_id, _)| state.field(field_id).is_some())
            .map(|(field_id, category)| OptionRequest::new(field_id.clone(), *category))
            .collect()
    }

    fn on_continue(&self, state: &FormState) -> Result<(), HookError> {
        let summary = visible_fields(state)
            .into_iter()
            .filter_map(|field| {
                state
                    .value(&field.id)
                    .map(|value| format!("{}={}", field.id, value.display()))
            })
            .collect::<Vec<_>>()
            .join(", ");
        info!(screen_id = %state.screen_id(), %summary, "screen completed");
        Ok(())
    }
}

/// Hooks keyed by screen id. Screens without an entry run no hooks.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn ScreenHooks>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks for the account-opening screens.
    pub fn account_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("create_account", AccountScreenHooks::new());
        registry.register(
            "personal_details_1",
            AccountScreenHooks::new()
                .with_options("marital_status", OptionCategory::MaritalStatus)
                .with_options("education_level", OptionCategory::EducationLevels),
        );
        registry.register(
            "personal_details_2",
            AccountScreenHooks::new()
                .with_options("marital_status", OptionCategory::MaritalStatus)
                .with_options("education_level", OptionCategory::EducationLevels),
        );
        registry.register(
            "financial_details",
            AccountScreenHooks::new()
                .with_options("employment_sector", OptionCategory::EmploymentSectors),
        );
        registry
    }

    pub fn register(&mut self, screen_id: impl Into<String>, hooks: impl ScreenHooks + 'static) {
        self.hooks.insert(screen_id.into(), Arc::new(hooks));
    }

    pub fn get(&self, screen_id: &str) -> Option<&Arc<dyn ScreenHooks>> {
        self.hooks.get(screen_id)
    }

    pub(crate) fn on_shown(&self, state: &FormState) -> Vec<OptionRequest> {
        self.get(state.screen_id())
            .map(|hooks| hooks.on_shown(state))
            .unwrap_or_default()
    }

    pub(crate) fn on_continue(&self, state: &FormState) -> Result<(), HookError> {
        match self.get(state.screen_id()) {
            Some(hooks) => hooks.on_continue(state),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut screens: Vec<&String> = self.hooks.keys().collect();
        screens.sort();
        f.debug_struct("HookRegistry").field("screens", &screens).finish()
    }
}
