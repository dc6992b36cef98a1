use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};
use form_flow::{
    AccountService, ContinueOutcome, FlowCoordinator, FlowOutcome, FlowPhase, HeadlessNavigator,
    SubmissionPayload,
};
use form_spec::{FieldValue, FlowConfiguration};
use serde_json::{Map, Value};
use tracing::debug;

/// Drives a flow screen by screen with pre-recorded answers.
///
/// `answers` maps screen ids to `{field_id: value}` objects. Keys that are not
/// fields (such as `mobile_number_country_code`) are stored verbatim.
pub async fn run_to_completion(
    config: FlowConfiguration,
    answers: &Value,
    service: Arc<dyn AccountService>,
) -> Result<SubmissionPayload> {
    let answers = answers
        .as_object()
        .ok_or_else(|| anyhow!("answers must be a JSON object keyed by screen id"))?;
    let navigator = HeadlessNavigator::new();
    let outcome: Arc<Mutex<Option<FlowOutcome>>> = Arc::default();
    let slot = Arc::clone(&outcome);
    let mut coordinator = FlowCoordinator::new(config, service, navigator, move |done| {
        if let Ok(mut slot) = slot.lock() {
            *slot = Some(done);
        }
    });
    coordinator.start();
    if coordinator.phase() == FlowPhase::NotStarted {
        bail!("flow {} has no screens", coordinator.flow_id());
    }

    loop {
        coordinator.settle().await;
        let Some(index) = coordinator.current_index() else {
            break;
        };
        let screen_id = coordinator.screens()[index].id.clone();
        let empty = Map::new();
        let screen_answers = match answers.get(&screen_id) {
            Some(Value::Object(map)) => map,
            Some(_) => bail!("answers for screen '{}' must be an object", screen_id),
            None => &empty,
        };
        apply_screen_answers(&mut coordinator, &screen_id, screen_answers)?;

        match coordinator.continue_pressed() {
            ContinueOutcome::Advanced { index } => debug!(index, "advanced"),
            ContinueOutcome::Blocked { errors } => {
                let details = errors
                    .iter()
                    .map(|(field_id, message)| format!("{}: {}", field_id, message))
                    .collect::<Vec<_>>()
                    .join("; ");
                bail!("screen '{}' is incomplete: {}", screen_id, details);
            }
            ContinueOutcome::Submitting => {
                coordinator.settle().await;
                if coordinator.phase() != FlowPhase::Completed {
                    let message = coordinator
                        .user_error()
                        .unwrap_or("submission did not complete")
                        .to_string();
                    bail!("{}", message);
                }
            }
            ContinueOutcome::Ignored => bail!("flow stopped on screen '{}'", screen_id),
        }
    }

    let outcome = outcome
        .lock()
        .map_err(|_| anyhow!("completion state poisoned"))?
        .take();
    match outcome {
        Some(FlowOutcome::Completed(payload)) => Ok(payload),
        Some(FlowOutcome::Cancelled) => bail!("flow was cancelled"),
        None => bail!("flow ended without an outcome"),
    }
}

fn apply_screen_answers(
    coordinator: &mut FlowCoordinator,
    screen_id: &str,
    answers: &Map<String, Value>,
) -> Result<()> {
    for (field_id, raw) in answers {
        let field = coordinator
            .current_state()
            .and_then(|state| state.field(field_id))
            .cloned();
        let value = match field {
            Some(field) => FieldValue::from_json(&field, raw).ok_or_else(|| {
                anyhow!(
                    "answer for {}.{} does not fit a {} field",
                    screen_id,
                    field_id,
                    field.kind.as_str()
                )
            })?,
            None => match raw {
                Value::String(text) => {
                    debug!(screen_id, field_id, "storing extra answer");
                    FieldValue::Text(text.clone())
                }
                _ => bail!("screen '{}' has no field '{}'", screen_id, field_id),
            },
        };
        coordinator.set_value(field_id, value);
        coordinator.mark_touched(field_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_flow::MockAccountService;
    use form_spec::parse_flow;
    use serde_json::json;

    fn config() -> FlowConfiguration {
        parse_flow(include_str!("../../form-spec/tests/fixtures/account_flow.json")).expect("fixture")
    }

    fn complete_answers() -> Value {
        json!({
            "create_account": {
                "national_id": "12345678",
                "mobile_number": "7700900123",
                "mobile_number_country_code": "+351",
                "email": "ada@example.com"
            },
            "personal_details_1": {
                "full_name": "Ada Lovelace",
                "marital_status": "single"
            },
            "financial_details": {
                "source_of_income": ["family_support"],
                "worked_in_financial_sector": "no"
            }
        })
    }

    #[tokio::test]
    async fn scripted_answers_complete_the_flow() {
        let payload = run_to_completion(config(), &complete_answers(), Arc::new(MockAccountService::new()))
            .await
            .expect("flow completes");
        assert_eq!(
            payload.get("personal_details_1", "date_of_birth"),
            Some(&json!("1990-01-01T00:00:00Z"))
        );
        assert_eq!(
            payload.get("create_account", "mobile_number_country_code"),
            Some(&json!("+351"))
        );
        assert_eq!(
            payload.get("financial_details", "source_of_income"),
            Some(&json!(["family_support"]))
        );
    }

    #[tokio::test]
    async fn missing_answers_report_the_blocking_screen() {
        let mut answers = complete_answers();
        answers["create_account"]
            .as_object_mut()
            .expect("object")
            .remove("email");
        let err = run_to_completion(config(), &answers, Arc::new(MockAccountService::new()))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("create_account"), "{message}");
        assert!(message.contains("Email is required"), "{message}");
    }
}
