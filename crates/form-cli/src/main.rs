mod check;
mod runner;
mod wizard;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use form_flow::{FlowCoordinator, FlowOutcome, HeadlessNavigator, MockAccountService};
use form_spec::{
    FieldValue, FlowConfiguration, FormState, build_render_payload, config_schema, load_flow,
    render_json_ui, render_text,
};
use serde_json::Value;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Registry, fmt};

use wizard::{Verbosity, WizardPresenter};

const LOG_ENV: &str = "ACCOUNT_FLOW_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Account-opening flow CLI",
    long_about = "Checks, renders and runs JSON-configured account-opening flows"
)]
struct Cli {
    /// Log at debug level (overrides ACCOUNT_FLOW_LOG).
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a flow configuration and report suspicious entries.
    Check {
        /// Path to the flow configuration JSON.
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// Print findings as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
    /// Print the JSON Schema of the configuration format.
    Schema,
    /// Render one screen, optionally with answers applied.
    Render {
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// Screen id to render.
        #[arg(long)]
        screen: String,
        /// JSON object of field id to answer for that screen.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Run the whole flow non-interactively against the mock backend.
    Run {
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// JSON object keyed by screen id, then field id.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// Also print the submission payload as CBOR hex.
        #[arg(long)]
        cbor: bool,
        /// Simulated backend latency in milliseconds.
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,
    },
    /// Walk through the flow interactively in the terminal.
    Wizard {
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// Print the submission payload as CBOR hex when done.
        #[arg(long)]
        cbor: bool,
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Check { config, json } => run_check(&config, json),
        Command::Schema => run_schema(),
        Command::Render {
            config,
            screen,
            answers,
            format,
        } => run_render(&config, &screen, answers.as_deref(), format),
        Command::Run {
            config,
            answers,
            cbor,
            latency_ms,
        } => run_scripted(&config, &answers, cbor, latency_ms).await,
        Command::Wizard {
            config,
            cbor,
            latency_ms,
        } => run_wizard(&config, cbor, latency_ms, cli.verbose).await,
    }
}

fn log_level(verbose: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    match std::env::var(LOG_ENV) {
        Ok(level) => level.parse::<Level>().unwrap_or(Level::WARN),
        Err(_) => Level::WARN,
    }
}

fn init_tracing(verbose: bool) {
    Registry::default()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(LevelFilter::from_level(log_level(verbose))),
        )
        .init()
}

fn load(path: &Path) -> Result<FlowConfiguration> {
    load_flow(path).with_context(|| format!("cannot load flow from {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn run_check(path: &Path, json: bool) -> Result<()> {
    let config = load(path)?;
    let findings = check::lint(&config);
    if json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
        return Ok(());
    }
    println!(
        "Flow {} v{}: {} screen(s)",
        config.flow_id,
        config.version,
        config.screens.len()
    );
    for (position, screen) in config.sorted_screens().iter().enumerate() {
        println!(
            "  {}. {} \"{}\" ({} fields, {} actions)",
            position + 1,
            screen.id,
            screen.title,
            screen.fields.len(),
            screen.actions.len()
        );
    }
    for finding in &findings {
        println!("warning: {}", finding);
    }
    if findings.is_empty() {
        println!("No issues found.");
    } else {
        println!("{} warning(s)", findings.len());
    }
    Ok(())
}

fn run_schema() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&config_schema())?);
    Ok(())
}

fn run_render(
    path: &Path,
    screen_id: &str,
    answers: Option<&Path>,
    format: RenderMode,
) -> Result<()> {
    let config = load(path)?;
    let screen = config
        .screen(screen_id)
        .ok_or_else(|| anyhow!("flow {} has no screen '{}'", config.flow_id, screen_id))?;
    let mut state = FormState::new(screen.clone());
    if let Some(answers_path) = answers {
        let answers = read_json(answers_path)?;
        apply_answers(&mut state, &answers)?;
    }

    let payload = build_render_payload(&state);
    match format {
        RenderMode::Text => println!("{}", render_text(&payload)),
        RenderMode::Json => println!("{}", serde_json::to_string_pretty(&render_json_ui(&payload))?),
    }
    Ok(())
}

/// Applies a `{field_id: value}` object to a standalone screen state.
fn apply_answers(state: &mut FormState, answers: &Value) -> Result<()> {
    let answers = answers
        .as_object()
        .ok_or_else(|| anyhow!("answers must be a JSON object of field id to value"))?;
    for (field_id, raw) in answers {
        let Some(field) = state.field(field_id).cloned() else {
            bail!("screen {} has no field '{}'", state.screen_id(), field_id);
        };
        let value = FieldValue::from_json(&field, raw)
            .ok_or_else(|| anyhow!("answer for '{}' does not fit a {} field", field_id, field.kind.as_str()))?;
        state.set_value(field_id, value);
        state.mark_touched(field_id);
    }
    Ok(())
}

async fn run_scripted(path: &Path, answers_path: &Path, cbor: bool, latency_ms: u64) -> Result<()> {
    let config = load(path)?;
    let answers = read_json(answers_path)?;
    let service = MockAccountService::new().with_latency(Duration::from_millis(latency_ms));
    let payload = runner::run_to_completion(config, &answers, Arc::new(service)).await?;

    println!("{}", payload.to_json_pretty()?);
    if cbor {
        println!("CBOR: {}", encode_hex(&payload.to_cbor()?));
    }
    Ok(())
}

async fn run_wizard(path: &Path, cbor: bool, latency_ms: u64, verbose: bool) -> Result<()> {
    let config = load(path)?;
    let service = MockAccountService::new().with_latency(Duration::from_millis(latency_ms));
    let navigator = HeadlessNavigator::new();
    let outcome: Arc<Mutex<Option<FlowOutcome>>> = Arc::default();
    let slot = Arc::clone(&outcome);
    let mut coordinator = FlowCoordinator::new(config, Arc::new(service), navigator.clone(), move |done| {
        if let Ok(mut slot) = slot.lock() {
            *slot = Some(done);
        }
    });
    coordinator.start();

    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(verbose), cbor);
    let stdin = std::io::stdin();
    wizard::drive(&mut coordinator, &navigator, &mut presenter, &mut stdin.lock()).await?;

    let outcome = outcome
        .lock()
        .map_err(|_| anyhow!("completion state poisoned"))?
        .take();
    match outcome {
        Some(FlowOutcome::Completed(payload)) => presenter.show_completion(&payload),
        Some(FlowOutcome::Cancelled) | None => presenter.show_cancelled(),
    }
    Ok(())
}

pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_spec::parse_flow;
    use serde_json::json;

    #[test]
    fn load_errors_name_the_file_and_the_cause() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("flow.json");
        fs::write(&path, "[]").expect("write");
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("flow.json"));
        assert!(format!("{err:#}").contains("schema mismatch"));
    }

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(encode_hex(&[0x00, 0x0f, 0xab]), "000fab");
    }

    #[test]
    fn answers_are_touched_so_errors_render() {
        let config = parse_flow(include_str!("../../form-spec/tests/fixtures/account_flow.json"))
            .expect("fixture");
        let screen = config.screen("create_account").expect("screen").clone();
        let mut state = FormState::new(screen);
        apply_answers(&mut state, &json!({ "email": "nope" })).expect("answers");
        assert_eq!(state.error("email"), Some("Enter a valid email address"));
        assert!(apply_answers(&mut state, &json!({ "unknown": "x" })).is_err());
        assert!(apply_answers(&mut state, &json!(["email"])).is_err());
    }
}
