use std::collections::HashSet;
use std::fmt;

use form_spec::{
    FieldKind, FieldSpec, FlowConfiguration, LogicalOperator, RuleKind, ScreenSpec, parse_date,
};
use serde::Serialize;

/// Something in a configuration that parses but will not behave as intended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub screen_id: String,
    pub field_id: Option<String>,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field_id {
            Some(field_id) => write!(f, "{}.{}: {}", self.screen_id, field_id, self.message),
            None => write!(f, "{}: {}", self.screen_id, self.message),
        }
    }
}

pub fn lint(config: &FlowConfiguration) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut screen_ids = HashSet::new();
    for screen in &config.screens {
        if !screen_ids.insert(screen.id.as_str()) {
            findings.push(screen_finding(screen, "duplicate screen id"));
        }
        if !screen.actions.iter().any(|action| action.is_primary()) {
            findings.push(screen_finding(screen, "no primary_button action"));
        }
        lint_screen(screen, &mut findings);
    }
    findings
}

fn lint_screen(screen: &ScreenSpec, findings: &mut Vec<Finding>) {
    let field_ids: HashSet<&str> = screen.fields.iter().map(|field| field.id.as_str()).collect();
    let mut seen = HashSet::new();
    for field in &screen.fields {
        let mut push = |message: String| findings.push(field_finding(screen, field, message));
        if !seen.insert(field.id.as_str()) {
            push("duplicate field id".into());
        }
        if field.kind == FieldKind::Unsupported {
            push("unsupported field type; the field is never shown".into());
        }
        for rule in &field.validations {
            if rule.kind == RuleKind::Unknown {
                push(format!("rule \"{}\" has an unknown type and always passes", rule.message));
            }
        }
        if field.kind == FieldKind::DatePicker
            && let Some(default) = field.default_value.as_deref()
            && parse_date(default, field.date_format()).is_none()
        {
            push(format!(
                "default '{}' does not match date format {}",
                default,
                field.date_format()
            ));
        }
        if let Some(expr) = &field.conditional_visibility {
            for condition in &expr.conditions {
                if !field_ids.contains(condition.field_id.as_str()) {
                    push(format!(
                        "visibility depends on unknown field '{}'",
                        condition.field_id
                    ));
                }
            }
            if let Some(LogicalOperator::Unrecognized(raw)) = &expr.operator
                && expr.conditions.len() > 1
            {
                push(format!("operator '{}' is not AND/OR; the field stays hidden", raw));
            }
        }
    }
}

fn screen_finding(screen: &ScreenSpec, message: &str) -> Finding {
    Finding {
        screen_id: screen.id.clone(),
        field_id: None,
        message: message.to_string(),
    }
}

fn field_finding(screen: &ScreenSpec, field: &FieldSpec, message: String) -> Finding {
    Finding {
        screen_id: screen.id.clone(),
        field_id: Some(field.id.clone()),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_spec::parse_flow;

    #[test]
    fn bundled_flow_is_clean() {
        let config = parse_flow(include_str!("../../form-spec/tests/fixtures/account_flow.json"))
            .expect("fixture");
        assert_eq!(lint(&config), Vec::new());
    }

    #[test]
    fn reports_broken_entries() {
        let config = parse_flow(
            r#"{
              "flowId": "broken",
              "version": "1",
              "screens": [{
                "id": "only",
                "orderId": 1,
                "title": "Only",
                "showBackButton": false,
                "fields": [
                  { "id": "slider", "orderId": 1, "type": "slider", "label": "Slide" },
                  { "id": "dob", "orderId": 2, "type": "date_picker", "label": "Born",
                    "defaultValue": "1990-01-01" },
                  { "id": "extra", "orderId": 3, "type": "text_field", "label": "Extra",
                    "conditionalVisibility": {
                      "operator": "XOR",
                      "conditions": [
                        { "fieldId": "ghost", "value": "x" },
                        { "fieldId": "dob", "value": "y" }
                      ]
                    } }
                ]
              }]
            }"#,
        )
        .expect("config");
        let rendered: Vec<String> = lint(&config).iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "only: no primary_button action",
                "only.slider: unsupported field type; the field is never shown",
                "only.dob: default '1990-01-01' does not match date format MM/dd/yyyy",
                "only.extra: visibility depends on unknown field 'ghost'",
                "only.extra: operator 'XOR' is not AND/OR; the field stays hidden",
            ]
        );
    }
}
