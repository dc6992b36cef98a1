use std::collections::{BTreeMap, HashMap};

use form_spec::{FormState, ScreenSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Answers of one screen keyed by field id.
pub type ScreenAnswers = BTreeMap<String, Value>;

/// Aggregated answers of a flow, keyed by screen id then field id.
///
/// Values use their wire encoding: text and single choices as strings,
/// multi-selects as string arrays and dates as `YYYY-MM-DDT00:00:00Z`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionPayload {
    screens: BTreeMap<String, ScreenAnswers>,
}

impl SubmissionPayload {
    /// Collects every screen that has a state, in flow order.
    pub fn collect(screens: &[ScreenSpec], states: &HashMap<String, FormState>) -> Self {
        let screens = screens
            .iter()
            .filter_map(|screen| states.get(&screen.id))
            .map(|state| (state.screen_id().to_string(), screen_answers(state)))
            .collect();
        Self { screens }
    }

    pub fn screen(&self, screen_id: &str) -> Option<&ScreenAnswers> {
        self.screens.get(screen_id)
    }

    pub fn get(&self, screen_id: &str, field_id: &str) -> Option<&Value> {
        self.screens.get(screen_id)?.get(field_id)
    }

    pub fn screen_ids(&self) -> impl Iterator<Item = &str> {
        self.screens.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.screens).unwrap_or(Value::Null)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }
}

fn screen_answers(state: &FormState) -> ScreenAnswers {
    state
        .field_values()
        .iter()
        .map(|(field_id, value)| (field_id.clone(), value.to_json()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use form_spec::{FieldKind, FieldSpec, FieldValue};
    use serde_json::json;

    fn screen(id: &str, order: i64, fields: Vec<FieldSpec>) -> ScreenSpec {
        let mut screen = ScreenSpec::new(id, order, id);
        screen.fields = fields;
        screen
    }

    #[test]
    fn collects_screens_with_state_only() {
        let first = screen(
            "identity",
            1,
            vec![
                FieldSpec::new("name", 1, FieldKind::TextField, "Name"),
                FieldSpec::new("dob", 2, FieldKind::DatePicker, "Birthday"),
            ],
        );
        let second = screen("never_seen", 2, Vec::new());

        let mut state = FormState::new(first.clone());
        state.set_value("name", FieldValue::Text("Ada".into()));
        let dob = NaiveDate::from_ymd_opt(1990, 5, 1).expect("date");
        state.set_value("dob", FieldValue::Date(dob));

        let mut states = HashMap::new();
        states.insert("identity".to_string(), state);
        let payload = SubmissionPayload::collect(&[first, second], &states);

        assert_eq!(payload.len(), 1);
        assert_eq!(
            payload.to_json(),
            json!({ "identity": { "name": "Ada", "dob": "1990-05-01T00:00:00Z" } })
        );
        assert!(payload.screen("never_seen").is_none());
    }

    #[test]
    fn cbor_encoding_is_reversible() {
        let field = FieldSpec::new("sources", 1, FieldKind::Dropdown, "Sources");
        let spec = screen("money", 1, vec![field]);
        let mut state = FormState::new(spec.clone());
        state.set_value(
            "sources",
            FieldValue::MultiChoice(vec!["employment".into(), "savings".into()]),
        );
        let mut states = HashMap::new();
        states.insert("money".to_string(), state);
        let payload = SubmissionPayload::collect(&[spec], &states);

        let bytes = payload.to_cbor().expect("cbor");
        let decoded = SubmissionPayload::from_cbor(&bytes).expect("decode");
        assert_eq!(decoded, payload);
        assert_eq!(
            decoded.get("money", "sources"),
            Some(&json!(["employment", "savings"]))
        );
    }
}
