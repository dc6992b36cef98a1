use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::spec::field::{RuleKind, ValidationRule};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9a-z._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,64}$")
        .expect("email pattern compiles")
});

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,15}$").expect("phone pattern compiles"));

/// Result of running a rule list against one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

/// Runs `rules` in order against a string value and stops at the first
/// failing rule.
pub fn validate(value: &str, rules: &[ValidationRule]) -> ValidationOutcome {
    rules
        .iter()
        .find(|rule| !rule_passes(value, rule))
        .map(|rule| ValidationOutcome::fail(rule.message.clone()))
        .unwrap_or_else(ValidationOutcome::ok)
}

/// Date entry point measured against the local calendar date.
pub fn validate_date(value: Option<NaiveDate>, rules: &[ValidationRule]) -> ValidationOutcome {
    validate_date_on(value, rules, Local::now().date_naive())
}

/// Date entry point with an explicit "today".
///
/// A missing date only fails a `required` rule; a present date is checked
/// against `min_age` rules alone.
pub fn validate_date_on(
    value: Option<NaiveDate>,
    rules: &[ValidationRule],
    today: NaiveDate,
) -> ValidationOutcome {
    let Some(date) = value else {
        return rules
            .iter()
            .find(|rule| rule.kind == RuleKind::Required)
            .map(|rule| ValidationOutcome::fail(rule.message.clone()))
            .unwrap_or_else(ValidationOutcome::ok);
    };

    for rule in rules {
        if rule.kind == RuleKind::MinAge
            && let Some(min_age) = rule.value
            && i64::from(today.year() - date.year()) < min_age
        {
            return ValidationOutcome::fail(rule.message.clone());
        }
    }
    ValidationOutcome::ok()
}

/// Multi-select entry point. Only `required` applies: at least one choice.
pub fn validate_choices(choices: &[String], rules: &[ValidationRule]) -> ValidationOutcome {
    if !choices.is_empty() {
        return ValidationOutcome::ok();
    }
    rules
        .iter()
        .find(|rule| rule.kind == RuleKind::Required)
        .map(|rule| ValidationOutcome::fail(rule.message.clone()))
        .unwrap_or_else(ValidationOutcome::ok)
}

fn rule_passes(value: &str, rule: &ValidationRule) -> bool {
    match rule.kind {
        RuleKind::Required => !value.trim().is_empty(),
        RuleKind::Email => EMAIL.is_match(value),
        RuleKind::Phone => PHONE.is_match(value),
        RuleKind::MinLength => rule
            .value
            .is_none_or(|min| char_count(value) >= min),
        RuleKind::MaxLength => rule
            .value
            .is_none_or(|max| char_count(value) <= max),
        RuleKind::Numeric => value.is_empty() || value.parse::<i64>().is_ok(),
        RuleKind::MinAge | RuleKind::Unknown => true,
    }
}

fn char_count(value: &str) -> i64 {
    value.chars().count() as i64
}
