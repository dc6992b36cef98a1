use chrono::NaiveDate;
use form_spec::{
    FieldValue, FlowConfiguration, FormState, OptionItem, RenderStatus, build_render_payload,
    parse_flow, render_json_ui, render_text, visible_fields,
};

fn fixture() -> FlowConfiguration {
    parse_flow(include_str!("../tests/fixtures/account_flow.json")).expect("fixture parses")
}

fn state(screen_id: &str) -> FormState {
    let screen = fixture().screen(screen_id).cloned().expect("screen exists");
    FormState::new(screen).with_today(NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date"))
}

#[test]
fn screens_sort_by_order_id() {
    let ids: Vec<_> = fixture()
        .sorted_screens()
        .into_iter()
        .map(|screen| screen.id)
        .collect();
    assert_eq!(ids, vec!["create_account", "personal_details_1", "financial_details"]);
}

#[test]
fn visible_fields_follow_order_and_conditions() {
    let mut state = state("personal_details_1");
    let ids: Vec<_> = visible_fields(&state).iter().map(|field| field.id.clone()).collect();
    assert_eq!(
        ids,
        vec!["full_name", "date_of_birth", "nationality", "marital_status", "dual_nationality"]
    );

    state.set_value("dual_nationality", FieldValue::Choice("yes".into()));
    state.set_value("marital_status", FieldValue::Choice("married".into()));
    let ids: Vec<_> = visible_fields(&state).iter().map(|field| field.id.clone()).collect();
    assert!(ids.contains(&"dual_nationality_country".to_string()));
    assert!(ids.contains(&"tax_identification_number".to_string()));
}

#[test]
fn render_json_ui_exposes_structure() {
    let state = state("create_account");
    let payload = build_render_payload(&state);
    assert_eq!(payload.status, RenderStatus::NeedInput);

    let ui = render_json_ui(&payload);
    assert_eq!(ui["screen_id"], "create_account");
    assert_eq!(ui["progress"]["total_steps"], 3);
    let fields = ui["fields"].as_array().expect("fields array");
    assert_eq!(fields[0]["type"], "label");
    assert_eq!(fields[0]["label"], "Your identity");
    assert_eq!(fields[0]["style"], "section");
    let phone = fields
        .iter()
        .find(|field| field["id"] == "mobile_number")
        .expect("phone field");
    assert_eq!(phone["country_code"], "+44");
    let actions = ui["actions"].as_array().expect("actions");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["enabled"], false);
}

#[test]
fn primary_action_enables_once_valid() {
    let mut state = state("create_account");
    state.set_value("national_id", FieldValue::Text("12345678".into()));
    state.set_value("mobile_number", FieldValue::Text("7700900123".into()));
    state.set_value("email", FieldValue::Text("jane@example.com".into()));

    let payload = build_render_payload(&state);
    assert_eq!(payload.status, RenderStatus::Ready);
    assert!(payload.actions.iter().all(|action| action.enabled));
}

#[test]
fn options_hot_swap_into_the_rendered_dropdown() {
    let mut state = state("personal_details_1");
    let before = build_render_payload(&state);
    let marital = before
        .fields
        .iter()
        .find(|field| field.id == "marital_status")
        .expect("marital status");
    assert!(marital.options.is_empty());
    assert_eq!(marital.placeholder, "Select an option");

    state.update_field_options(
        "marital_status",
        vec![OptionItem::new("single", "Single"), OptionItem::new("married", "Married")],
    );
    let after = build_render_payload(&state);
    let marital = after
        .fields
        .iter()
        .find(|field| field.id == "marital_status")
        .expect("marital status");
    assert_eq!(marital.options.len(), 2);
}

#[test]
fn render_text_shows_errors_after_touch() {
    let mut state = state("create_account");
    state.mark_touched("email");
    let text = render_text(&build_render_payload(&state));
    assert!(text.contains("Create your account [1/3]"));
    assert!(text.contains("error: Email is required"));
    assert!(text.contains("[Continue] (disabled)"));
}

#[test]
fn dates_display_in_the_field_format() {
    let state = state("personal_details_1");
    let payload = build_render_payload(&state);
    let dob = payload
        .fields
        .iter()
        .find(|field| field.id == "date_of_birth")
        .expect("date field");
    assert_eq!(dob.display_value().as_deref(), Some("01/01/1990"));

    let text = render_text(&payload);
    assert!(text.contains("Date of birth (date_of_birth) * = 01/01/1990"));
    assert!(text.contains("Nationality (nationality) * [disabled] = British"));
}
