use chrono::{NaiveDate, SecondsFormat};
use serde_json::Value;

use crate::spec::field::{FieldKind, FieldSpec};

/// Value held by a single field.
///
/// Accessors are permissive: asking for a shape the value does not have yields
/// an empty default instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Choice(String),
    MultiChoice(Vec<String>),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn text(&self) -> &str {
        match self {
            FieldValue::Text(text) | FieldValue::Choice(text) => text,
            _ => "",
        }
    }

    pub fn choices(&self) -> &[String] {
        match self {
            FieldValue::MultiChoice(choices) => choices,
            _ => &[],
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(date) => Some(*date),
            _ => None,
        }
    }

    /// Wraps user input in the variant matching the field's widget.
    pub fn for_field(field: &FieldSpec, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        match field.kind {
            FieldKind::Dropdown if field.multi_select() => FieldValue::MultiChoice(split_list(&raw)),
            FieldKind::Dropdown | FieldKind::RadioGroup => FieldValue::Choice(raw),
            _ => FieldValue::Text(raw),
        }
    }

    /// Interprets a configured `defaultValue`. Dates that do not match the
    /// field's format produce no value.
    pub fn from_default(field: &FieldSpec, raw: &str) -> Option<Self> {
        match field.kind {
            FieldKind::DatePicker => parse_date(raw, field.date_format()).map(FieldValue::Date),
            _ => Some(FieldValue::for_field(field, raw)),
        }
    }

    /// Interprets an answer supplied as JSON (scripted runs, CLI input).
    pub fn from_json(field: &FieldSpec, value: &Value) -> Option<Self> {
        match (field.kind, value) {
            (FieldKind::DatePicker, Value::String(raw)) => parse_date(raw, field.date_format())
                .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
                .map(FieldValue::Date),
            (FieldKind::DatePicker, _) => None,
            (FieldKind::Dropdown, Value::Array(items)) if field.multi_select() => Some(
                FieldValue::MultiChoice(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect(),
                ),
            ),
            (_, Value::String(raw)) => Some(FieldValue::for_field(field, raw.as_str())),
            (_, Value::Number(number)) => Some(FieldValue::for_field(field, number.to_string())),
            (_, Value::Bool(flag)) => Some(FieldValue::for_field(field, flag.to_string())),
            _ => None,
        }
    }

    /// Wire encoding used in submission payloads.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(text) | FieldValue::Choice(text) => Value::String(text.clone()),
            FieldValue::MultiChoice(choices) => Value::Array(
                choices
                    .iter()
                    .map(|choice| Value::String(choice.clone()))
                    .collect(),
            ),
            FieldValue::Date(date) => Value::String(encode_date(*date)),
        }
    }

    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(text) | FieldValue::Choice(text) => text.clone(),
            FieldValue::MultiChoice(choices) => choices.join(", "),
            FieldValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// ISO-8601 date-time at midnight UTC, e.g. `1990-05-01T00:00:00Z`.
pub fn encode_date(date: NaiveDate) -> String {
    date.and_hms_opt(0, 0, 0)
        .map(|datetime| {
            datetime
                .and_utc()
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
        .unwrap_or_else(|| date.to_string())
}

/// Parses a date written with a Unicode-style pattern such as `MM/dd/yyyy`.
pub fn parse_date(raw: &str, pattern: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), &chrono_format(pattern)).ok()
}

/// Formats a date with a Unicode-style pattern.
pub fn format_date(date: NaiveDate, pattern: &str) -> String {
    date.format(&chrono_format(pattern)).to_string()
}

/// Translates `yyyy`/`MM`/`dd`-style patterns into chrono `strftime` syntax.
pub fn chrono_format(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut index = 0;
    while index < chars.len() {
        let current = chars[index];
        if current == '\'' {
            index += 1;
            while index < chars.len() && chars[index] != '\'' {
                push_literal(&mut out, chars[index]);
                index += 1;
            }
            index += 1;
            continue;
        }
        let mut run = 1;
        while index + run < chars.len() && chars[index + run] == current {
            run += 1;
        }
        match current {
            'y' if run == 2 => out.push_str("%y"),
            'y' => out.push_str("%Y"),
            'M' if run >= 4 => out.push_str("%B"),
            'M' if run == 3 => out.push_str("%b"),
            'M' => out.push_str("%m"),
            'd' => out.push_str("%d"),
            'E' if run >= 4 => out.push_str("%A"),
            'E' => out.push_str("%a"),
            'H' => out.push_str("%H"),
            'h' => out.push_str("%I"),
            'm' => out.push_str("%M"),
            's' => out.push_str("%S"),
            'a' => out.push_str("%p"),
            other => {
                for _ in 0..run {
                    push_literal(&mut out, other);
                }
            }
        }
        index += run;
    }
    out
}

fn push_literal(out: &mut String, ch: char) {
    if ch == '%' {
        out.push_str("%%");
    } else {
        out.push(ch);
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
