use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use form_spec::{
    ConfigParseError, FieldValue, FlowConfiguration, FormState, OptionItem, RenderPayload,
    ScreenSpec, apply_text_input, build_render_payload, parse_flow,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::error::{NavigationError, ServiceError, SubmissionError};
use crate::hooks::{HookRegistry, OptionRequest};
use crate::navigation::{NavigationEvent, NavigationHost, NavigationSink, ScreenHandle, SubscriptionId};
use crate::payload::SubmissionPayload;
use crate::service::AccountService;

/// Where the flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    NotStarted,
    ShowingScreen(usize),
    Completed,
    Cancelled,
}

/// Reported exactly once when the flow ends.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    Completed(SubmissionPayload),
    Cancelled,
}

/// Result of a primary-button tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinueOutcome {
    /// The next screen is now shown.
    Advanced { index: usize },
    /// Validation failed; the errors are now visible.
    Blocked { errors: BTreeMap<String, String> },
    /// The last screen was valid and the submission is in flight.
    Submitting,
    /// No screen is active or a submission is already running.
    Ignored,
}

pub type CompletionHandler = Box<dyn FnOnce(FlowOutcome) + Send>;

/// Work delivered back to the coordinator, one message at a time.
#[derive(Debug)]
pub(crate) enum FlowMessage {
    Navigation(NavigationEvent),
    OptionsLoaded {
        screen_index: usize,
        visit: u64,
        field_id: String,
        result: Result<Vec<OptionItem>, ServiceError>,
    },
    SubmissionFinished {
        attempt: u64,
        payload: SubmissionPayload,
        result: Result<bool, ServiceError>,
    },
}

/// Drives a multi-screen flow on top of a navigation host.
///
/// All state changes happen on the caller's task: asynchronous work (option
/// fetches, submissions) and navigation notifications are queued as messages
/// and applied by [`FlowCoordinator::next_message`] or
/// [`FlowCoordinator::process_pending`]. Methods that spawn work must run
/// inside a Tokio runtime.
pub struct FlowCoordinator {
    flow_id: String,
    screens: Vec<ScreenSpec>,
    states: HashMap<String, FormState>,
    hooks: HookRegistry,
    service: Arc<dyn AccountService>,
    navigator: Box<dyn NavigationHost>,
    subscription: Option<SubscriptionId>,
    root: Option<ScreenHandle>,
    shown: Vec<(ScreenHandle, usize)>,
    phase: FlowPhase,
    visit: u64,
    attempts: u64,
    in_flight: Option<u64>,
    pending_fetches: usize,
    user_error: Option<String>,
    last_error: Option<SubmissionError>,
    today: Option<NaiveDate>,
    on_completion: Option<CompletionHandler>,
    tx: UnboundedSender<FlowMessage>,
    rx: UnboundedReceiver<FlowMessage>,
}

impl FlowCoordinator {
    pub fn new(
        configuration: FlowConfiguration,
        service: Arc<dyn AccountService>,
        navigator: impl NavigationHost + 'static,
        on_completion: impl FnOnce(FlowOutcome) + Send + 'static,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            screens: configuration.sorted_screens(),
            flow_id: configuration.flow_id,
            states: HashMap::new(),
            hooks: HookRegistry::account_defaults(),
            service,
            navigator: Box::new(navigator),
            subscription: None,
            root: None,
            shown: Vec::new(),
            phase: FlowPhase::NotStarted,
            visit: 0,
            attempts: 0,
            in_flight: None,
            pending_fetches: 0,
            user_error: None,
            last_error: None,
            today: None,
            on_completion: Some(Box::new(on_completion)),
            tx,
            rx,
        }
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    /// Pins the date used by `min_age` rules on every screen.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Subscribes to navigation and shows the first screen. A flow without
    /// screens logs an error and stays unstarted.
    pub fn start(&mut self) {
        if self.phase != FlowPhase::NotStarted {
            debug!(flow_id = %self.flow_id, "flow already started");
            return;
        }
        if self.screens.is_empty() {
            error!(flow_id = %self.flow_id, "no screens available; flow not started");
            return;
        }
        let sink = NavigationSink::new(self.tx.clone());
        self.subscription = Some(self.navigator.subscribe(sink));
        info!(flow_id = %self.flow_id, screens = self.screens.len(), "flow started");
        if let Err(err) = self.show_screen(0) {
            error!(flow_id = %self.flow_id, error = %err, "failed to show first screen");
        }
    }

    /// Shows the screen at `index` in flow order, reusing its state if it
    /// was visited before.
    /// Fails once the flow has completed or been cancelled.
    pub fn show_screen(&mut self, index: usize) -> Result<(), NavigationError> {
        if !self.is_active() {
            warn!(
                flow_id = %self.flow_id,
                phase = ?self.phase,
                index,
                "flow ended; screen not shown"
            );
            return Err(NavigationError::FlowEnded);
        }
        let Some(screen) = self.screens.get(index) else {
            let err = NavigationError::InvalidScreenIndex {
                index,
                len: self.screens.len(),
            };
            error!(flow_id = %self.flow_id, error = %err, "cannot show screen");
            return Err(err);
        };

        let today = self.today;
        let state = self.states.entry(screen.id.clone()).or_insert_with(|| {
            let state = FormState::new(screen.clone());
            match today {
                Some(today) => state.with_today(today),
                None => state,
            }
        });
        state.seed_defaults();
        let payload = build_render_payload(state);
        let requests = self.hooks.on_shown(state);

        self.phase = FlowPhase::ShowingScreen(index);
        self.visit += 1;
        let handle = self.navigator.push(&payload);
        self.shown.push((handle, index));
        if self.root.is_none() {
            self.root = Some(handle);
        }
        info!(flow_id = %self.flow_id, screen_id = %payload.screen_id, index, "screen shown");

        self.request_options(index, requests);
        Ok(())
    }

    /// Handles a primary-button tap on the current screen.
    #[tracing::instrument(skip(self), fields(flow_id = %self.flow_id))]
    pub fn continue_pressed(&mut self) -> ContinueOutcome {
        self.process_pending();
        let FlowPhase::ShowingScreen(index) = self.phase else {
            debug!(phase = ?self.phase, "continue ignored; no active screen");
            return ContinueOutcome::Ignored;
        };
        if self.in_flight.is_some() {
            debug!("continue ignored; submission in flight");
            return ContinueOutcome::Ignored;
        }
        let Some(screen_id) = self.screens.get(index).map(|screen| screen.id.clone()) else {
            return ContinueOutcome::Ignored;
        };
        let Some(state) = self.states.get_mut(&screen_id) else {
            return ContinueOutcome::Ignored;
        };

        if !state.validate_all_fields() {
            let errors = state.errors().clone();
            info!(%screen_id, errors = errors.len(), "screen has validation errors");
            return ContinueOutcome::Blocked { errors };
        }
        if let Err(err) = self.hooks.on_continue(state) {
            warn!(%screen_id, error = %err, "continue hook failed");
        }

        if index + 1 < self.screens.len() {
            match self.show_screen(index + 1) {
                Ok(()) => ContinueOutcome::Advanced { index: index + 1 },
                Err(_) => ContinueOutcome::Ignored,
            }
        } else {
            self.submit();
            ContinueOutcome::Submitting
        }
    }

    /// Stores a value on the current screen. Returns `false` when no screen
    /// is active.
    pub fn set_value(&mut self, field_id: &str, value: FieldValue) -> bool {
        self.edit_current(|state| state.set_value(field_id, value))
    }

    pub fn clear_value(&mut self, field_id: &str) -> bool {
        self.edit_current(|state| state.clear_value(field_id))
    }

    pub fn mark_touched(&mut self, field_id: &str) -> bool {
        self.edit_current(|state| state.mark_touched(field_id))
    }

    /// Applies typed text through the field's length limit and input filter,
    /// returning the text that was kept.
    pub fn input_text(&mut self, field_id: &str, proposed: &str) -> Option<String> {
        self.process_pending();
        let state = self.current_state_mut()?;
        let field = state.field(field_id)?.clone();
        let accepted = apply_text_input(&field, state.text(field_id), proposed);
        state.set_value(field_id, FieldValue::for_field(&field, accepted.as_str()));
        Some(accepted)
    }

    /// Selects the dialling prefix of a phone field.
    pub fn set_country_code(&mut self, field_id: &str, code: &str) -> bool {
        self.process_pending();
        let Some(state) = self.current_state_mut() else {
            return false;
        };
        let Some(key) = state.field(field_id).map(|field| field.country_code_key()) else {
            return false;
        };
        state.set_value(&key, FieldValue::Text(code.to_string()));
        true
    }

    /// Waits for the next queued message and applies it.
    pub async fn next_message(&mut self) -> bool {
        match self.rx.recv().await {
            Some(message) => {
                self.apply(message);
                true
            }
            None => false,
        }
    }

    /// Applies every message already queued, returning how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.apply(message);
            handled += 1;
        }
        handled
    }

    /// Waits until no option fetch or submission is outstanding.
    pub async fn settle(&mut self) {
        while self.has_outstanding_work() {
            if !self.next_message().await {
                break;
            }
        }
        self.process_pending();
    }

    pub fn has_outstanding_work(&self) -> bool {
        self.in_flight.is_some() || self.pending_fetches > 0
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    /// Screens in flow order.
    pub fn screens(&self) -> &[ScreenSpec] {
        &self.screens
    }

    pub fn phase(&self) -> FlowPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, FlowPhase::NotStarted | FlowPhase::ShowingScreen(_))
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            FlowPhase::ShowingScreen(index) => Some(index),
            _ => None,
        }
    }

    pub fn current_state(&self) -> Option<&FormState> {
        let screen = self.screens.get(self.current_index()?)?;
        self.states.get(&screen.id)
    }

    pub fn state(&self, screen_id: &str) -> Option<&FormState> {
        self.states.get(screen_id)
    }

    pub fn render_current(&self) -> Option<RenderPayload> {
        self.current_state().map(build_render_payload)
    }

    /// Message shown after the last failed submission, if any.
    pub fn user_error(&self) -> Option<&str> {
        self.user_error.as_deref()
    }

    pub fn last_submission_error(&self) -> Option<&SubmissionError> {
        self.last_error.as_ref()
    }

    fn current_state_mut(&mut self) -> Option<&mut FormState> {
        let FlowPhase::ShowingScreen(index) = self.phase else {
            return None;
        };
        let screen_id = &self.screens.get(index)?.id;
        self.states.get_mut(screen_id)
    }

    fn edit_current(&mut self, edit: impl FnOnce(&mut FormState)) -> bool {
        self.process_pending();
        match self.current_state_mut() {
            Some(state) => {
                edit(state);
                true
            }
            None => false,
        }
    }

    fn request_options(&mut self, screen_index: usize, requests: Vec<OptionRequest>) {
        for request in requests {
            let service = Arc::clone(&self.service);
            let tx = self.tx.clone();
            let visit = self.visit;
            self.pending_fetches += 1;
            debug!(
                field_id = %request.field_id,
                category = request.category.as_str(),
                visit,
                "requesting options"
            );
            tokio::spawn(async move {
                let result = service.fetch_options(request.category).await;
                let _ = tx.send(FlowMessage::OptionsLoaded {
                    screen_index,
                    visit,
                    field_id: request.field_id,
                    result,
                });
            });
        }
    }

    fn submit(&mut self) {
        let payload = SubmissionPayload::collect(&self.screens, &self.states);
        self.attempts += 1;
        let attempt = self.attempts;
        self.in_flight = Some(attempt);
        self.user_error = None;
        info!(flow_id = %self.flow_id, attempt, screens = payload.len(), "submitting flow");

        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = service.submit(&payload).await;
            let _ = tx.send(FlowMessage::SubmissionFinished {
                attempt,
                payload,
                result,
            });
        });
    }

    fn apply(&mut self, message: FlowMessage) {
        match message {
            FlowMessage::Navigation(event) => self.handle_navigation(event),
            FlowMessage::OptionsLoaded {
                screen_index,
                visit,
                field_id,
                result,
            } => {
                self.pending_fetches = self.pending_fetches.saturating_sub(1);
                if self.phase != FlowPhase::ShowingScreen(screen_index) || visit != self.visit {
                    debug!(%field_id, visit, "discarding options for a screen no longer shown");
                    return;
                }
                match result {
                    Ok(options) => {
                        if let Some(state) = self.current_state_mut() {
                            state.update_field_options(&field_id, options);
                        }
                    }
                    Err(err) => warn!(%field_id, error = %err, "failed to load options"),
                }
            }
            FlowMessage::SubmissionFinished {
                attempt,
                payload,
                result,
            } => {
                if self.in_flight != Some(attempt) {
                    debug!(attempt, "discarding stale submission result");
                    return;
                }
                self.in_flight = None;
                match result {
                    Ok(true) => self.finish(FlowOutcome::Completed(payload)),
                    Ok(false) => self.submission_failed(SubmissionError::RejectedByBackend),
                    Err(err) => self.submission_failed(err.into()),
                }
            }
        }
    }

    fn handle_navigation(&mut self, event: NavigationEvent) {
        let NavigationEvent::DidShow { stack } = event;
        if !self.is_active() {
            return;
        }
        self.shown.retain(|(handle, _)| stack.contains(handle));

        if let Some(root) = self.root
            && !stack.contains(&root)
        {
            info!(flow_id = %self.flow_id, "navigated back past the first screen");
            self.finish(FlowOutcome::Cancelled);
            return;
        }

        let Some(top) = stack.last() else {
            return;
        };
        let Some(&(_, index)) = self.shown.iter().find(|(handle, _)| handle == top) else {
            debug!(flow_id = %self.flow_id, "top of stack is not a flow screen");
            return;
        };
        if let FlowPhase::ShowingScreen(current) = self.phase
            && index < current
        {
            self.retreat(index);
        }
    }

    fn retreat(&mut self, index: usize) {
        self.phase = FlowPhase::ShowingScreen(index);
        self.visit += 1;
        self.user_error = None;
        let requests = self
            .current_state()
            .map(|state| self.hooks.on_shown(state))
            .unwrap_or_default();
        info!(flow_id = %self.flow_id, index, "returned to an earlier screen");
        self.request_options(index, requests);
    }

    fn submission_failed(&mut self, err: SubmissionError) {
        error!(flow_id = %self.flow_id, error = %err, "submission failed");
        let message = err.user_message();
        self.user_error = Some(message.to_string());
        self.navigator.present_error(message);
        self.last_error = Some(err);
    }

    fn finish(&mut self, outcome: FlowOutcome) {
        self.phase = match outcome {
            FlowOutcome::Completed(_) => FlowPhase::Completed,
            FlowOutcome::Cancelled => FlowPhase::Cancelled,
        };
        self.in_flight = None;
        if let Some(id) = self.subscription.take() {
            self.navigator.unsubscribe(id);
        }
        info!(flow_id = %self.flow_id, phase = ?self.phase, "flow finished");
        if let Some(on_completion) = self.on_completion.take() {
            on_completion(outcome);
        }
    }
}

impl std::fmt::Debug for FlowCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowCoordinator")
            .field("flow_id", &self.flow_id)
            .field("phase", &self.phase)
            .field("screens", &self.screens.len())
            .field("submitting", &self.in_flight.is_some())
            .finish()
    }
}

/// Builds a coordinator with the account-opening hooks and shows the first
/// screen.
pub fn start_flow(
    navigator: impl NavigationHost + 'static,
    configuration: FlowConfiguration,
    service: Arc<dyn AccountService>,
    on_completion: impl FnOnce(FlowOutcome) + Send + 'static,
) -> FlowCoordinator {
    let mut coordinator = FlowCoordinator::new(configuration, service, navigator, on_completion);
    coordinator.start();
    coordinator
}

/// Parses `json` and starts the flow it describes.
pub fn start_flow_from_json(
    navigator: impl NavigationHost + 'static,
    json: &str,
    service: Arc<dyn AccountService>,
    on_completion: impl FnOnce(FlowOutcome) + Send + 'static,
) -> Result<FlowCoordinator, ConfigParseError> {
    let configuration = parse_flow(json)?;
    Ok(start_flow(navigator, configuration, service, on_completion))
}
