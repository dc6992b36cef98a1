use std::collections::{BTreeMap, HashSet};
use std::io::{BufRead, Write};

use anyhow::Result;
use form_flow::{ContinueOutcome, FlowCoordinator, FlowPhase, HeadlessNavigator, SubmissionPayload};
use form_spec::{FieldKind, FieldValue, RenderField, RenderPayload, parse_date, render_text};

use crate::encode_hex;

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: screen titles and prompts only.
    Clean,
    /// Verbose output: the full rendered screen before prompting.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints screens, prompts and results for the terminal wizard.
pub struct WizardPresenter {
    verbosity: Verbosity,
    last_screen: Option<String>,
    show_cbor: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_cbor: bool) -> Self {
        Self {
            verbosity,
            last_screen: None,
            show_cbor,
        }
    }

    pub fn show_screen(&mut self, payload: &RenderPayload) {
        if self.verbosity.is_verbose() {
            println!("{}", render_text(payload));
        } else if self.last_screen.as_deref() != Some(payload.screen_id.as_str()) {
            match payload.progress {
                Some(progress) => println!(
                    "== {} ({}/{}) ==",
                    payload.title, progress.current_step, progress.total_steps
                ),
                None => println!("== {} ==", payload.title),
            }
            if let Some(subtitle) = &payload.subtitle {
                println!("{}", subtitle);
            }
        }
        self.last_screen = Some(payload.screen_id.clone());
    }

    pub fn show_prompt(&self, field: &RenderField) {
        let mut line = field.label.clone();
        if field.required {
            line.push_str(" *");
        }
        if let Some(format) = &field.date_format {
            line.push_str(&format!(" ({})", format));
        }
        if let Some(code) = &field.country_code {
            line.push_str(&format!(" [{}]", code));
        }
        if let Some(value) = field.display_value() {
            line.push_str(&format!(" [current: {}]", value));
        }
        println!("{}", line);
        if !field.options.is_empty() {
            let choices = field
                .options
                .iter()
                .map(|option| format!("{} ({})", option.id, option.label))
                .collect::<Vec<_>>()
                .join(", ");
            if field.multi_select {
                println!("Choose one or more, comma separated: {}", choices);
            } else {
                println!("Choose one: {}", choices);
            }
        } else if !field.placeholder.is_empty() && self.verbosity.is_verbose() {
            println!("Hint: {}", field.placeholder);
        }
    }

    pub fn show_parse_error(&self, message: &str) {
        eprintln!("Invalid answer: {}", message);
    }

    pub fn show_field_error(&self, message: &str) {
        eprintln!("  {}", message);
    }

    pub fn show_blocked(&self, errors: &BTreeMap<String, String>) {
        eprintln!("Please fix the following before continuing:");
        for (field_id, message) in errors {
            eprintln!("  {} - {}", field_id, message);
        }
    }

    pub fn show_submission_error(&self, message: &str) {
        eprintln!("Submission failed: {}", message);
    }

    pub fn show_completion(&self, payload: &SubmissionPayload) {
        println!("Account created ✅");
        match payload.to_json_pretty() {
            Ok(pretty) => println!("{}", pretty),
            Err(err) => eprintln!("Failed to serialize answers to JSON: {}", err),
        }
        if self.show_cbor {
            match payload.to_cbor() {
                Ok(bytes) => println!("Answers (CBOR hex): {}", encode_hex(&bytes)),
                Err(err) => eprintln!("Failed to serialize answers to CBOR: {}", err),
            }
        }
    }

    pub fn show_cancelled(&self) {
        println!("Flow cancelled.");
    }
}

enum Command {
    Answer(String),
    Skip,
    Back,
    Exit,
}

fn read_command(input: &mut impl BufRead) -> Result<Command> {
    print!("> ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Command::Exit);
    }
    let trimmed = line.trim();
    Ok(match trimmed {
        "" => Command::Skip,
        _ if trimmed.eq_ignore_ascii_case("exit") => Command::Exit,
        _ if trimmed.eq_ignore_ascii_case("back") => Command::Back,
        _ => Command::Answer(trimmed.to_string()),
    })
}

/// Runs the flow until it completes or is cancelled.
///
/// Typing `back` pops the current screen, `exit` (or end of input) leaves the
/// flow and an empty line keeps the current answer.
pub async fn drive(
    coordinator: &mut FlowCoordinator,
    navigator: &HeadlessNavigator,
    presenter: &mut WizardPresenter,
    input: &mut impl BufRead,
) -> Result<()> {
    'screens: loop {
        coordinator.settle().await;
        if matches!(coordinator.phase(), FlowPhase::Completed | FlowPhase::Cancelled) {
            return Ok(());
        }
        let Some(payload) = coordinator.render_current() else {
            return Ok(());
        };
        presenter.show_screen(&payload);

        let mut asked = HashSet::new();
        loop {
            let Some(field) = next_prompt(coordinator, &asked) else {
                break;
            };
            presenter.show_prompt(&field);
            match read_command(input)? {
                Command::Exit => {
                    navigator.pop_all();
                    coordinator.process_pending();
                    return Ok(());
                }
                Command::Back => {
                    navigator.pop();
                    continue 'screens;
                }
                Command::Skip => {
                    coordinator.mark_touched(&field.id);
                    asked.insert(field.id.clone());
                }
                Command::Answer(raw) => match answer(coordinator, &field, &raw) {
                    Ok(()) => {
                        let error = coordinator
                            .current_state()
                            .and_then(|state| state.error(&field.id))
                            .map(String::from);
                        match error {
                            Some(message) => presenter.show_field_error(&message),
                            None => {
                                asked.insert(field.id.clone());
                            }
                        }
                    }
                    Err(message) => presenter.show_parse_error(&message),
                },
            }
        }

        match coordinator.continue_pressed() {
            ContinueOutcome::Blocked { errors } => presenter.show_blocked(&errors),
            ContinueOutcome::Submitting => {
                coordinator.settle().await;
                if let Some(message) = coordinator.user_error() {
                    presenter.show_submission_error(message);
                }
            }
            ContinueOutcome::Advanced { .. } | ContinueOutcome::Ignored => {}
        }
    }
}

fn next_prompt(coordinator: &FlowCoordinator, asked: &HashSet<String>) -> Option<RenderField> {
    coordinator.render_current()?.fields.into_iter().find(|field| {
        field.kind != FieldKind::Label && !field.disabled && !asked.contains(&field.id)
    })
}

fn answer(coordinator: &mut FlowCoordinator, field: &RenderField, raw: &str) -> Result<(), String> {
    match field.kind {
        FieldKind::DatePicker => {
            let format = field.date_format.as_deref().unwrap_or_default();
            let date = parse_date(raw, format)
                .ok_or_else(|| format!("expected a date formatted as {}", format))?;
            coordinator.set_value(&field.id, FieldValue::Date(date));
        }
        FieldKind::Dropdown | FieldKind::RadioGroup => {
            let picked = raw
                .split(',')
                .map(str::trim)
                .filter(|choice| !choice.is_empty())
                .map(|choice| resolve_choice(field, choice))
                .collect::<Result<Vec<_>, _>>()?;
            let value = if field.multi_select {
                FieldValue::MultiChoice(picked)
            } else {
                match picked.as_slice() {
                    [single] => FieldValue::Choice(single.clone()),
                    _ => return Err("pick exactly one option".into()),
                }
            };
            coordinator.set_value(&field.id, value);
        }
        FieldKind::PhoneField => {
            let number = match raw.split_once(' ') {
                Some((code, number)) if code.starts_with('+') => {
                    coordinator.set_country_code(&field.id, code);
                    number.trim()
                }
                _ => raw,
            };
            coordinator.input_text(&field.id, number);
        }
        _ => {
            coordinator.input_text(&field.id, raw);
        }
    }
    coordinator.mark_touched(&field.id);
    Ok(())
}

/// Accepts an option id or its label, ignoring case.
fn resolve_choice(field: &RenderField, raw: &str) -> Result<String, String> {
    if field.options.is_empty() {
        return Ok(raw.to_string());
    }
    field
        .options
        .iter()
        .find(|option| option.id.eq_ignore_ascii_case(raw) || option.label.eq_ignore_ascii_case(raw))
        .map(|option| option.id.clone())
        .ok_or_else(|| {
            let ids = field
                .options
                .iter()
                .map(|option| option.id.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("'{}' is not one of: {}", raw, ids)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_spec::{Keyboard, OptionItem};

    fn radio() -> RenderField {
        RenderField {
            id: "dual_nationality".into(),
            kind: FieldKind::RadioGroup,
            label: "Another nationality?".into(),
            style: None,
            placeholder: String::new(),
            required: false,
            disabled: false,
            keyboard: Keyboard::Default,
            current_value: None,
            error: None,
            options: vec![OptionItem::new("yes", "Yes"), OptionItem::new("no", "No")],
            multi_select: false,
            date_format: None,
            country_code: None,
            max_length: None,
        }
    }

    #[test]
    fn choices_match_ids_or_labels() {
        let field = radio();
        assert_eq!(resolve_choice(&field, "YES"), Ok("yes".to_string()));
        assert_eq!(resolve_choice(&field, "No"), Ok("no".to_string()));
        assert!(resolve_choice(&field, "maybe").is_err());
    }

    #[test]
    fn empty_input_skips_and_keywords_navigate() {
        let mut input = "\nback\nEXIT\nJane\n".as_bytes();
        assert!(matches!(read_command(&mut input), Ok(Command::Skip)));
        assert!(matches!(read_command(&mut input), Ok(Command::Back)));
        assert!(matches!(read_command(&mut input), Ok(Command::Exit)));
        assert!(matches!(read_command(&mut input), Ok(Command::Answer(raw)) if raw == "Jane"));
        assert!(matches!(read_command(&mut input), Ok(Command::Exit)));
    }
}
