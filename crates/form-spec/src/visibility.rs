use std::collections::{BTreeMap, HashMap};

use crate::spec::field::{CheckOperator, Condition, FieldSpec, LogicalOperator, VisibilityExpr};
use crate::spec::screen::ScreenSpec;
use crate::value::FieldValue;

pub type VisibilityMap = BTreeMap<String, bool>;

/// Read access to the current values of a screen.
pub trait ValueLookup {
    fn lookup(&self, field_id: &str) -> Option<&FieldValue>;

    fn text_of(&self, field_id: &str) -> &str {
        self.lookup(field_id).map(FieldValue::text).unwrap_or("")
    }

    fn choices_of(&self, field_id: &str) -> &[String] {
        self.lookup(field_id).map(FieldValue::choices).unwrap_or(&[])
    }
}

impl ValueLookup for BTreeMap<String, FieldValue> {
    fn lookup(&self, field_id: &str) -> Option<&FieldValue> {
        self.get(field_id)
    }
}

impl ValueLookup for HashMap<String, FieldValue> {
    fn lookup(&self, field_id: &str) -> Option<&FieldValue> {
        self.get(field_id)
    }
}

/// Decides whether an expression shows its field.
///
/// Without an operator only the first condition counts; an operator the
/// engine does not recognise hides the field.
pub fn is_visible(expr: Option<&VisibilityExpr>, values: &impl ValueLookup) -> bool {
    let Some(expr) = expr else {
        return true;
    };
    let Some(first) = expr.conditions.first() else {
        return true;
    };

    if expr.conditions.len() == 1 || expr.operator.is_none() {
        return condition_holds(first, values);
    }

    match &expr.operator {
        Some(LogicalOperator::And) => expr
            .conditions
            .iter()
            .all(|condition| condition_holds(condition, values)),
        Some(LogicalOperator::Or) => expr
            .conditions
            .iter()
            .any(|condition| condition_holds(condition, values)),
        Some(LogicalOperator::Unrecognized(raw)) => {
            tracing::debug!(operator = %raw, "unrecognized visibility operator; hiding field");
            false
        }
        None => true,
    }
}

pub fn field_visible(field: &FieldSpec, values: &impl ValueLookup) -> bool {
    is_visible(field.conditional_visibility.as_ref(), values)
}

/// Visibility of every field on a screen.
pub fn resolve_visibility(screen: &ScreenSpec, values: &impl ValueLookup) -> VisibilityMap {
    screen
        .fields
        .iter()
        .map(|field| (field.id.clone(), field_visible(field, values)))
        .collect()
}

fn condition_holds(condition: &Condition, values: &impl ValueLookup) -> bool {
    match condition.check.unwrap_or_default() {
        CheckOperator::Contains => values
            .choices_of(&condition.field_id)
            .iter()
            .any(|choice| choice == &condition.value),
        CheckOperator::Equals => values.text_of(&condition.field_id) == condition.value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(entries: &[(&str, FieldValue)]) -> BTreeMap<String, FieldValue> {
        entries
            .iter()
            .map(|(id, value)| (id.to_string(), value.clone()))
            .collect()
    }

    fn text(value: &str) -> FieldValue {
        FieldValue::Text(value.into())
    }

    fn expr(conditions: Vec<Condition>, operator: Option<&str>) -> VisibilityExpr {
        VisibilityExpr {
            conditions,
            operator: operator.map(|op| LogicalOperator::from(op.to_string())),
        }
    }

    #[test]
    fn missing_or_empty_expression_is_visible() {
        let lookup = values(&[]);
        assert!(is_visible(None, &lookup));
        assert!(is_visible(Some(&expr(vec![], Some("AND"))), &lookup));
    }

    #[test]
    fn or_and_and_differ_on_partial_match() {
        let lookup = values(&[("a", text("x")), ("b", text("z"))]);
        let conditions = vec![Condition::equals("a", "x"), Condition::equals("b", "y")];
        assert!(is_visible(Some(&expr(conditions.clone(), Some("OR"))), &lookup));
        assert!(!is_visible(Some(&expr(conditions, Some("AND"))), &lookup));
    }

    #[test]
    fn missing_operator_uses_first_condition_only() {
        let lookup = values(&[("a", text("x")), ("b", text("z"))]);
        let conditions = vec![Condition::equals("a", "x"), Condition::equals("b", "y")];
        assert!(is_visible(Some(&expr(conditions, None)), &lookup));
    }

    #[test]
    fn single_condition_ignores_operator() {
        let lookup = values(&[("a", text("x"))]);
        let single = expr(vec![Condition::equals("a", "x")], Some("NAND"));
        assert!(is_visible(Some(&single), &lookup));
    }

    #[test]
    fn unrecognized_operator_fails_closed() {
        let lookup = values(&[("a", text("x")), ("b", text("y"))]);
        let conditions = vec![Condition::equals("a", "x"), Condition::equals("b", "y")];
        assert!(!is_visible(Some(&expr(conditions, Some("XOR"))), &lookup));
    }

    #[test]
    fn contains_checks_multi_select_membership() {
        let lookup = values(&[(
            "income",
            FieldValue::MultiChoice(vec!["salary".into(), "rent".into()]),
        )]);
        let shown = expr(vec![Condition::contains("income", "rent")], None);
        let hidden = expr(vec![Condition::contains("income", "trading")], None);
        assert!(is_visible(Some(&shown), &lookup));
        assert!(!is_visible(Some(&hidden), &lookup));
    }

    #[test]
    fn equals_is_case_sensitive_and_absent_means_empty() {
        let lookup = values(&[("a", FieldValue::Choice("Yes".into()))]);
        assert!(!is_visible(Some(&expr(vec![Condition::equals("a", "yes")], None)), &lookup));
        assert!(is_visible(Some(&expr(vec![Condition::equals("missing", "")], None)), &lookup));
        assert!(!is_visible(
            Some(&expr(vec![Condition::contains("missing", "")], None)),
            &lookup
        ));
    }
}
