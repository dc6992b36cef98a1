use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serde_json::{Value, json};

const FLOW: &str = include_str!("../../form-spec/tests/fixtures/account_flow.json");

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn account_flow() -> Command {
    let mut cmd = Command::cargo_bin("account-flow").expect("binary");
    cmd.env_remove("ACCOUNT_FLOW_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf8 stdout")
}

#[test]
fn check_summarizes_a_valid_flow() -> TestResult {
    let temp = TempDir::new()?;
    let config = temp.child("flow.json");
    config.write_str(FLOW)?;

    let stdout = stdout_of(account_flow().arg("check").arg("--config").arg(config.path()));
    assert!(stdout.contains("Flow account_creation v1.2.0: 3 screen(s)"), "{stdout}");
    assert!(stdout.contains("1. create_account"), "{stdout}");
    assert!(stdout.contains("3. financial_details"), "{stdout}");
    assert!(stdout.contains("No issues found."), "{stdout}");
    Ok(())
}

#[test]
fn check_rejects_malformed_json() -> TestResult {
    let temp = TempDir::new()?;
    let config = temp.child("broken.json");
    config.write_str("{ \"flowId\": ")?;

    let output = account_flow()
        .arg("check")
        .arg("--config")
        .arg(config.path())
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output)?;
    assert!(stderr.contains("invalid JSON"), "{stderr}");
    Ok(())
}

#[test]
fn schema_describes_the_configuration() -> TestResult {
    let stdout = stdout_of(account_flow().arg("schema"));
    let schema: Value = serde_json::from_str(&stdout)?;
    assert_eq!(schema["title"], "FlowConfiguration");
    assert!(schema["properties"]["screens"].is_object());
    Ok(())
}

#[test]
fn render_json_shows_errors_for_supplied_answers() -> TestResult {
    let temp = TempDir::new()?;
    let config = temp.child("flow.json");
    config.write_str(FLOW)?;
    let answers = temp.child("answers.json");
    answers.write_str(&json!({ "email": "not-an-email" }).to_string())?;

    let stdout = stdout_of(
        account_flow()
            .args(["render", "--screen", "create_account", "--format", "json"])
            .arg("--config")
            .arg(config.path())
            .arg("--answers")
            .arg(answers.path()),
    );
    let ui: Value = serde_json::from_str(&stdout)?;
    assert_eq!(ui["screen_id"], "create_account");
    assert_eq!(ui["status"], "need_input");
    let email = ui["fields"]
        .as_array()
        .and_then(|fields| fields.iter().find(|field| field["id"] == "email"))
        .cloned()
        .unwrap_or(Value::Null);
    assert_eq!(email["error"], "Enter a valid email address");
    assert_eq!(email["current_value"], "not-an-email");
    Ok(())
}

#[test]
fn render_text_lists_the_screen() -> TestResult {
    let temp = TempDir::new()?;
    let config = temp.child("flow.json");
    config.write_str(FLOW)?;

    let stdout = stdout_of(
        account_flow()
            .args(["render", "--screen", "personal_details_1"])
            .arg("--config")
            .arg(config.path()),
    );
    assert!(stdout.starts_with("Personal details [2/3]"), "{stdout}");
    assert!(stdout.contains(" - Nationality (nationality) * [disabled] = British"), "{stdout}");
    assert!(!stdout.contains("dual_nationality_country"), "{stdout}");
    Ok(())
}

#[test]
fn run_submits_scripted_answers() -> TestResult {
    let temp = TempDir::new()?;
    let config = temp.child("flow.json");
    config.write_str(FLOW)?;
    let answers = temp.child("answers.json");
    answers.write_str(
        &json!({
            "create_account": {
                "national_id": "12345678",
                "mobile_number": "7700900123",
                "email": "ada@example.com"
            },
            "personal_details_1": {
                "full_name": "Ada Lovelace",
                "marital_status": "married",
                "dual_nationality": "yes",
                "dual_nationality_country": "Irish",
                "tax_identification_number": "IE1234567T"
            },
            "financial_details": {
                "source_of_income": ["employment"],
                "employment_sector": "private_sector",
                "employer_name": "Analytical Engines Ltd",
                "worked_in_financial_sector": "yes",
                "years_in_financial_sector": "12"
            }
        })
        .to_string(),
    )?;

    let stdout = stdout_of(
        account_flow()
            .arg("run")
            .arg("--config")
            .arg(config.path())
            .arg("--answers")
            .arg(answers.path())
            .arg("--cbor"),
    );
    let (json_part, cbor_line) = stdout
        .rsplit_once("CBOR: ")
        .ok_or("missing CBOR line")?;
    let payload: Value = serde_json::from_str(json_part)?;
    assert_eq!(payload["personal_details_1"]["date_of_birth"], "1990-01-01T00:00:00Z");
    assert_eq!(payload["personal_details_1"]["tax_identification_number"], "IE1234567T");
    assert_eq!(payload["financial_details"]["source_of_income"], json!(["employment"]));
    assert_eq!(payload["create_account"]["email"], "ada@example.com");
    assert!(cbor_line.trim().chars().all(|c| c.is_ascii_hexdigit()));
    Ok(())
}

#[test]
fn run_fails_on_the_first_incomplete_screen() -> TestResult {
    let temp = TempDir::new()?;
    let config = temp.child("flow.json");
    config.write_str(FLOW)?;
    let answers = temp.child("answers.json");
    answers.write_str(&json!({ "create_account": { "national_id": "123" } }).to_string())?;

    let output = account_flow()
        .arg("run")
        .arg("--config")
        .arg(config.path())
        .arg("--answers")
        .arg(answers.path())
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output)?;
    assert!(stderr.contains("screen 'create_account' is incomplete"), "{stderr}");
    assert!(stderr.contains("National ID must be at least 8 digits"), "{stderr}");
    Ok(())
}

#[test]
fn wizard_exit_cancels_the_flow() -> TestResult {
    let temp = TempDir::new()?;
    let config = temp.child("flow.json");
    config.write_str(FLOW)?;

    let stdout = stdout_of(
        account_flow()
            .arg("wizard")
            .arg("--config")
            .arg(config.path())
            .write_stdin("exit\n"),
    );
    assert!(stdout.contains("== Create your account (1/3) =="), "{stdout}");
    assert!(stdout.contains("National ID *"), "{stdout}");
    assert!(stdout.trim_end().ends_with("Flow cancelled."), "{stdout}");
    Ok(())
}

#[test]
fn wizard_walks_the_first_screen() -> TestResult {
    let temp = TempDir::new()?;
    let config = temp.child("flow.json");
    config.write_str(FLOW)?;

    let stdout = stdout_of(
        account_flow()
            .arg("wizard")
            .arg("--config")
            .arg(config.path())
            .write_stdin("12345678\n+351 7700900123\nada@example.com\nback\n"),
    );
    assert!(stdout.contains("== Personal details (2/3) =="), "{stdout}");
    assert!(stdout.contains("Mobile number * [+44]"), "{stdout}");
    assert!(stdout.trim_end().ends_with("Flow cancelled."), "{stdout}");
    Ok(())
}
