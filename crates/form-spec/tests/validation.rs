use chrono::NaiveDate;
use form_spec::{
    FieldSpec, FieldKind, RuleKind, ScreenSpec, ValidationRule, resolve_visibility, validate,
    validate_date_on,
};
use form_spec::{FieldValue, FormState};

fn rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::new(RuleKind::Required, "required"),
        ValidationRule::new(RuleKind::MinLength, "too short").with_value(5),
    ]
}

#[test]
fn first_failing_rule_wins() {
    let result = validate("", &rules());
    assert!(!result.valid);
    assert_eq!(result.message.as_deref(), Some("required"));

    let result = validate("abc", &rules());
    assert_eq!(result.message.as_deref(), Some("too short"));

    assert!(validate("abcdef", &rules()).valid);
}

#[test]
fn date_path_ignores_string_rules() {
    let today = NaiveDate::from_ymd_opt(2030, 1, 1).expect("valid date");
    let born = NaiveDate::from_ymd_opt(2000, 7, 4).expect("valid date");
    let rules = vec![
        ValidationRule::new(RuleKind::Required, "required"),
        ValidationRule::new(RuleKind::Phone, "phone"),
        ValidationRule::new(RuleKind::MinLength, "short").with_value(50),
    ];
    assert!(validate_date_on(Some(born), &rules, today).valid);
}

#[test]
fn visibility_map_tracks_current_values() {
    let toggle = FieldSpec::new("owner", 1, FieldKind::RadioGroup, "Owner");
    let mut details = FieldSpec::new("owner_details", 2, FieldKind::TextField, "Details");
    details.conditional_visibility = serde_json::from_value(serde_json::json!({
        "conditions": [{ "fieldId": "owner", "value": "yes" }]
    }))
    .expect("expression");
    let mut screen = ScreenSpec::new("s", 1, "S");
    screen.fields = vec![toggle, details];

    let mut state = FormState::new(screen.clone());
    let visibility = resolve_visibility(&screen, state.field_values());
    assert_eq!(visibility.get("owner"), Some(&true));
    assert_eq!(visibility.get("owner_details"), Some(&false));

    state.set_value("owner", FieldValue::Choice("yes".into()));
    let visibility = resolve_visibility(&screen, state.field_values());
    assert_eq!(visibility.get("owner_details"), Some(&true));
}
