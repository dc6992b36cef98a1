use std::collections::{BTreeMap, BTreeSet};

use chrono::{Local, NaiveDate};

use crate::spec::field::{FieldKind, FieldSpec, OptionItem};
use crate::spec::screen::ScreenSpec;
use crate::validate::{validate, validate_choices, validate_date_on};
use crate::value::FieldValue;
use crate::visibility::{ValueLookup, field_visible};

/// Mutable state of one screen: values, shown errors and touched fields.
///
/// Errors stay hidden until a field has been touched. Screen validity is
/// always derived from the stored errors and the required-field fill state.
#[derive(Debug, Clone)]
pub struct FormState {
    screen: ScreenSpec,
    values: BTreeMap<String, FieldValue>,
    errors: BTreeMap<String, String>,
    touched: BTreeSet<String>,
    today: Option<NaiveDate>,
}

impl FormState {
    /// Builds the state for a screen and seeds its default values.
    pub fn new(screen: ScreenSpec) -> Self {
        let mut state = Self {
            screen,
            values: BTreeMap::new(),
            errors: BTreeMap::new(),
            touched: BTreeSet::new(),
            today: None,
        };
        state.seed_defaults();
        state
    }

    /// Pins the date used by `min_age` rules.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self.refresh_validity();
        self
    }

    /// Fills empty fields from their configured `defaultValue`.
    pub fn seed_defaults(&mut self) {
        for field in &self.screen.fields {
            if self.values.contains_key(&field.id) {
                continue;
            }
            let Some(raw) = field.default_value.as_deref() else {
                continue;
            };
            match FieldValue::from_default(field, raw) {
                Some(value) => {
                    self.values.insert(field.id.clone(), value);
                }
                None => tracing::warn!(
                    field_id = %field.id,
                    default_value = %raw,
                    date_format = %field.date_format(),
                    "default value does not match the field's date format"
                ),
            }
        }
        self.refresh_validity();
    }

    pub fn screen(&self) -> &ScreenSpec {
        &self.screen
    }

    pub fn screen_id(&self) -> &str {
        &self.screen.id
    }

    pub fn field(&self, field_id: &str) -> Option<&FieldSpec> {
        self.screen.field(field_id)
    }

    pub fn value(&self, field_id: &str) -> Option<&FieldValue> {
        self.values.get(field_id)
    }

    pub fn field_values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    pub fn text(&self, field_id: &str) -> &str {
        self.text_of(field_id)
    }

    pub fn choices(&self, field_id: &str) -> &[String] {
        self.choices_of(field_id)
    }

    pub fn date(&self, field_id: &str) -> Option<NaiveDate> {
        self.values.get(field_id).and_then(FieldValue::date)
    }

    /// Stores a value and revalidates. Does not mark the field touched.
    pub fn set_value(&mut self, field_id: &str, value: FieldValue) {
        self.values.insert(field_id.to_string(), value);
        self.validate_field(field_id);
        self.refresh_validity();
    }

    /// Removes a value, e.g. a cleared date picker.
    pub fn clear_value(&mut self, field_id: &str) {
        self.values.remove(field_id);
        self.validate_field(field_id);
        self.refresh_validity();
    }

    /// Records the first interaction with a field so its errors surface.
    pub fn mark_touched(&mut self, field_id: &str) {
        self.touched.insert(field_id.to_string());
        self.validate_field(field_id);
        self.refresh_validity();
    }

    pub fn is_touched(&self, field_id: &str) -> bool {
        self.touched.contains(field_id)
    }

    /// Recomputes the displayed error of one field.
    pub fn validate_field(&mut self, field_id: &str) {
        let Some(field) = self.screen.field(field_id) else {
            self.errors.remove(field_id);
            return;
        };
        if field.validations.is_empty() {
            self.errors.remove(field_id);
            return;
        }

        let outcome = if field.kind == FieldKind::DatePicker {
            let today = self.today.unwrap_or_else(|| Local::now().date_naive());
            validate_date_on(self.date(field_id), &field.validations, today)
        } else if field.multi_select() {
            validate_choices(self.choices(field_id), &field.validations)
        } else {
            validate(self.text(field_id), &field.validations)
        };

        match outcome.message {
            Some(message) if self.touched.contains(field_id) => {
                self.errors.insert(field_id.to_string(), message);
            }
            _ => {
                self.errors.remove(field_id);
            }
        }
    }

    /// Touches and validates every visible, enabled field.
    ///
    /// Returns `true` when no field holds an error afterwards.
    pub fn validate_all_fields(&mut self) -> bool {
        let targets: Vec<String> = self
            .screen
            .fields
            .iter()
            .filter(|field| !field.disabled() && field_visible(field, &self.values))
            .map(|field| field.id.clone())
            .collect();

        for field_id in targets {
            self.touched.insert(field_id.clone());
            self.validate_field(&field_id);
        }
        self.refresh_validity();
        self.errors.is_empty()
    }

    /// Screen-level validity: no error is held and every visible, enabled,
    /// required input is filled.
    pub fn is_form_valid(&self) -> bool {
        self.errors.is_empty() && self.required_fields_filled()
    }

    pub fn error(&self, field_id: &str) -> Option<&str> {
        self.errors.get(field_id).map(String::as_str)
    }

    pub fn is_error_shown(&self, field_id: &str) -> bool {
        self.errors.contains_key(field_id)
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn is_field_visible(&self, field: &FieldSpec) -> bool {
        field_visible(field, &self.values)
    }

    /// Replaces the option list of a field. Unknown ids are ignored.
    pub fn update_field_options(&mut self, field_id: &str, options: Vec<OptionItem>) -> bool {
        let screen_id = self.screen.id.clone();
        let Some(field) = self.screen.field_mut(field_id) else {
            tracing::debug!(%screen_id, field_id, "no such field for options");
            return false;
        };
        let count = options.len();
        field.options = Some(options);
        tracing::debug!(%screen_id, field_id, count, "field options updated");
        true
    }

    fn refresh_validity(&mut self) {
        let mut live = Vec::new();
        let mut stale = Vec::new();
        for field in &self.screen.fields {
            let inactive = field.disabled() || !field_visible(field, &self.values);
            if inactive {
                stale.push(field.id.clone());
            } else if field.kind != FieldKind::Label {
                live.push(field.id.clone());
            }
        }
        for field_id in stale {
            self.errors.remove(&field_id);
        }
        for field_id in live {
            self.validate_field(&field_id);
        }

        tracing::trace!(
            screen_id = %self.screen.id,
            errors = self.errors.len(),
            required_filled = self.required_fields_filled(),
            "form validity refreshed"
        );
    }

    fn required_fields_filled(&self) -> bool {
        self.screen
            .fields
            .iter()
            .filter(|field| {
                field.kind != FieldKind::Label
                    && field.is_required()
                    && !field.disabled()
                    && field_visible(field, &self.values)
            })
            .all(|field| self.is_filled(field))
    }

    fn is_filled(&self, field: &FieldSpec) -> bool {
        if field.kind == FieldKind::DatePicker {
            self.date(&field.id).is_some()
        } else if field.multi_select() {
            !self.choices(&field.id).is_empty()
        } else {
            !self.text(&field.id).trim().is_empty()
        }
    }
}

impl ValueLookup for FormState {
    fn lookup(&self, field_id: &str) -> Option<&FieldValue> {
        self.values.get(field_id)
    }
}
