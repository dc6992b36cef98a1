use regex::Regex;
use serde_json::{Map, Value, json};

use crate::{
    spec::{
        field::{FieldKind, FieldSpec, Keyboard, OptionItem},
        screen::ScreenSpec,
    },
    state::FormState,
    value::{FieldValue, format_date},
};

/// Dialling prefix used when a phone field declares none.
pub const DEFAULT_COUNTRY_CODE: &str = "+1";

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// At least one error or unfilled required field blocks the screen.
    NeedInput,
    /// The primary action is enabled.
    Ready,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Ready => "ready",
        }
    }
}

/// Step counters exposed to renderers.
#[derive(Debug, Clone, Copy)]
pub struct RenderProgress {
    pub current_step: u32,
    pub total_steps: u32,
}

/// Describes a single visible field for render outputs.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub kind: FieldKind,
    pub label: String,
    pub style: Option<String>,
    pub placeholder: String,
    pub required: bool,
    pub disabled: bool,
    pub keyboard: Keyboard,
    pub current_value: Option<FieldValue>,
    pub error: Option<String>,
    pub options: Vec<OptionItem>,
    pub multi_select: bool,
    pub date_format: Option<String>,
    pub country_code: Option<String>,
    pub max_length: Option<usize>,
}

impl RenderField {
    /// Current value as shown to the user; dates use the field's own format.
    pub fn display_value(&self) -> Option<String> {
        let value = self.current_value.as_ref()?;
        Some(match (value, self.date_format.as_deref()) {
            (FieldValue::Date(date), Some(pattern)) => format_date(*date, pattern),
            _ => value.display(),
        })
    }
}

/// A screen action with its enabled state.
#[derive(Debug, Clone)]
pub struct RenderAction {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub enabled: bool,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub screen_id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub header_title: Option<String>,
    pub show_back_button: bool,
    pub status: RenderStatus,
    pub progress: Option<RenderProgress>,
    pub fields: Vec<RenderField>,
    pub actions: Vec<RenderAction>,
}

/// Fields in display order (ascending `orderId`) whose visibility holds.
pub fn visible_fields(state: &FormState) -> Vec<&FieldSpec> {
    let mut fields: Vec<&FieldSpec> = state
        .screen()
        .fields
        .iter()
        .filter(|field| field.kind != FieldKind::Unsupported && state.is_field_visible(field))
        .collect();
    fields.sort_by_key(|field| field.order_id);
    fields
}

/// Build the renderer payload for the screen owned by `state`.
pub fn build_render_payload(state: &FormState) -> RenderPayload {
    let screen: &ScreenSpec = state.screen();
    let valid = state.is_form_valid();

    let fields = visible_fields(state)
        .into_iter()
        .map(|field| render_field(state, field))
        .collect();

    let actions = screen
        .actions
        .iter()
        .filter(|action| action.is_primary())
        .map(|action| RenderAction {
            id: action.id.clone(),
            kind: action.kind.clone(),
            title: action.title.clone(),
            enabled: valid,
        })
        .collect();

    RenderPayload {
        screen_id: screen.id.clone(),
        title: screen.title.clone(),
        subtitle: screen.subtitle.clone(),
        header_title: screen.header_title.clone(),
        show_back_button: screen.show_back_button,
        status: if valid {
            RenderStatus::Ready
        } else {
            RenderStatus::NeedInput
        },
        progress: screen.progress.map(|progress| RenderProgress {
            current_step: progress.current_step,
            total_steps: progress.total_steps,
        }),
        fields,
        actions,
    }
}

fn render_field(state: &FormState, field: &FieldSpec) -> RenderField {
    let label = match field.kind {
        FieldKind::Label => field.text.clone().unwrap_or_else(|| field.label.clone()),
        _ => field.label.clone(),
    };
    let style = (field.kind == FieldKind::Label)
        .then(|| field.style.clone().unwrap_or_else(|| "section".to_string()));
    let placeholder = field.placeholder.clone().unwrap_or_else(|| {
        let fallback = match field.kind {
            FieldKind::Dropdown if field.multi_select() => "Select options",
            FieldKind::Dropdown => "Select an option",
            _ => "",
        };
        fallback.to_string()
    });
    let country_code = (field.kind == FieldKind::PhoneField).then(|| country_code(state, field));

    RenderField {
        id: field.id.clone(),
        kind: field.kind,
        label,
        style,
        placeholder,
        required: field.is_required(),
        disabled: field.disabled(),
        keyboard: field.keyboard(),
        current_value: state.value(&field.id).cloned(),
        error: state.error(&field.id).map(String::from),
        options: field.options.clone().unwrap_or_default(),
        multi_select: field.multi_select(),
        date_format: (field.kind == FieldKind::DatePicker).then(|| field.date_format().to_string()),
        country_code,
        max_length: field.max_length,
    }
}

/// Current dialling prefix of a phone field.
pub fn country_code(state: &FormState, field: &FieldSpec) -> String {
    let stored = state.text(&field.country_code_key());
    if stored.is_empty() {
        field
            .default_country_code
            .clone()
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string())
    } else {
        stored.to_string()
    }
}

/// Applies the input-level constraints of a text field to a proposed edit.
///
/// The candidate is truncated to `maxLength` characters; if an `inputFilter`
/// is configured and finds no match in the candidate, the previous text is
/// kept. A filter that does not compile never blocks input.
pub fn apply_text_input(field: &FieldSpec, previous: &str, proposed: &str) -> String {
    let candidate: String = match field.max_length {
        Some(max) => proposed.chars().take(max).collect(),
        None => proposed.to_string(),
    };

    if let Some(filter) = field.input_filter.as_deref().filter(|filter| !filter.is_empty()) {
        match Regex::new(filter) {
            Ok(regex) if !regex.is_match(&candidate) => {
                tracing::debug!(field_id = %field.id, filter, "input rejected by filter");
                return previous.to_string();
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(field_id = %field.id, filter, error = %err, "invalid input filter");
            }
        }
    }

    candidate
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("type".into(), Value::String(field.kind.as_str().into()));
            map.insert("label".into(), Value::String(field.label.clone()));
            if let Some(style) = &field.style {
                map.insert("style".into(), Value::String(style.clone()));
            }
            if !field.placeholder.is_empty() {
                map.insert("placeholder".into(), Value::String(field.placeholder.clone()));
            }
            map.insert("required".into(), Value::Bool(field.required));
            map.insert("disabled".into(), Value::Bool(field.disabled));
            if let Some(value) = &field.current_value {
                map.insert("current_value".into(), value.to_json());
            }
            map.insert(
                "error".into(),
                field.error.clone().map(Value::String).unwrap_or(Value::Null),
            );
            if !field.options.is_empty() {
                map.insert(
                    "options".into(),
                    Value::Array(
                        field
                            .options
                            .iter()
                            .map(|option| json!({ "id": option.id, "label": option.label }))
                            .collect(),
                    ),
                );
            }
            if field.multi_select {
                map.insert("multi_select".into(), Value::Bool(true));
            }
            if let Some(format) = &field.date_format {
                map.insert("date_format".into(), Value::String(format.clone()));
            }
            if let Some(code) = &field.country_code {
                map.insert("country_code".into(), Value::String(code.clone()));
            }
            if let Some(max) = field.max_length {
                map.insert("max_length".into(), json!(max));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    let actions = payload
        .actions
        .iter()
        .map(|action| {
            json!({
                "id": action.id,
                "type": action.kind,
                "title": action.title,
                "enabled": action.enabled,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "screen_id": payload.screen_id,
        "title": payload.title,
        "subtitle": payload.subtitle,
        "header_title": payload.header_title,
        "show_back_button": payload.show_back_button,
        "status": payload.status.as_str(),
        "progress": payload.progress.map(|progress| json!({
            "current_step": progress.current_step,
            "total_steps": progress.total_steps,
        })),
        "fields": fields,
        "actions": actions,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    match payload.progress {
        Some(progress) => lines.push(format!(
            "{} [{}/{}]",
            payload.title, progress.current_step, progress.total_steps
        )),
        None => lines.push(payload.title.clone()),
    }
    if let Some(subtitle) = &payload.subtitle {
        lines.push(subtitle.clone());
    }
    lines.push(format!("Status: {}", payload.status.as_str()));

    for field in &payload.fields {
        if field.kind == FieldKind::Label {
            lines.push(format!("## {}", field.label));
            continue;
        }
        let mut entry = format!(" - {} ({})", field.label, field.id);
        if field.required {
            entry.push_str(" *");
        }
        if field.disabled {
            entry.push_str(" [disabled]");
        }
        if let Some(value) = field.display_value() {
            entry.push_str(&format!(" = {}", value));
        }
        lines.push(entry);
        if !field.options.is_empty() {
            let options = field
                .options
                .iter()
                .map(|option| option.id.as_str())
                .collect::<Vec<_>>()
                .join("/");
            lines.push(format!("     options: {}", options));
        }
        if let Some(error) = &field.error {
            lines.push(format!("     error: {}", error));
        }
    }

    for action in &payload.actions {
        let state = if action.enabled { "enabled" } else { "disabled" };
        lines.push(format!("[{}] ({})", action.title, state));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_length_truncates_before_filtering() {
        let mut field = FieldSpec::new("pin", 1, FieldKind::TextField, "PIN");
        field.max_length = Some(4);
        field.input_filter = Some("^[0-9]*$".into());
        assert_eq!(apply_text_input(&field, "12", "123456"), "1234");
        assert_eq!(apply_text_input(&field, "12", "12a"), "12");
    }

    #[test]
    fn filter_uses_a_search_not_a_full_match() {
        let mut field = FieldSpec::new("name", 1, FieldKind::TextField, "Name");
        field.input_filter = Some("[A-Za-z]".into());
        assert_eq!(apply_text_input(&field, "", "J0"), "J0");
        assert_eq!(apply_text_input(&field, "J", "00"), "J");
    }

    #[test]
    fn broken_filter_never_blocks() {
        let mut field = FieldSpec::new("name", 1, FieldKind::TextField, "Name");
        field.input_filter = Some("([".into());
        assert_eq!(apply_text_input(&field, "", "anything"), "anything");
    }
}
