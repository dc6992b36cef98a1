use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use form_spec::RenderPayload;
use tokio::sync::mpsc::UnboundedSender;

use crate::coordinator::FlowMessage;

/// Opaque identity of a screen pushed onto a navigation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Notifications a navigation host sends back to the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// A screen finished showing; `stack` lists the handles bottom to top.
    DidShow { stack: Vec<ScreenHandle> },
}

/// Delivers navigation events into the coordinator's message queue.
#[derive(Debug, Clone)]
pub struct NavigationSink {
    tx: UnboundedSender<FlowMessage>,
}

impl NavigationSink {
    pub(crate) fn new(tx: UnboundedSender<FlowMessage>) -> Self {
        Self { tx }
    }

    /// Returns `false` once the coordinator is gone.
    pub fn notify(&self, event: NavigationEvent) -> bool {
        self.tx.send(FlowMessage::Navigation(event)).is_ok()
    }
}

/// Stack-based navigation container hosting the flow's screens.
pub trait NavigationHost: Send {
    fn push(&mut self, screen: &RenderPayload) -> ScreenHandle;

    fn subscribe(&mut self, sink: NavigationSink) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId);

    /// Surfaces a user-facing error on the current screen.
    fn present_error(&mut self, _message: &str) {}
}

#[derive(Debug, Default)]
struct HeadlessState {
    stack: Vec<(ScreenHandle, String)>,
    next_handle: u64,
    sinks: BTreeMap<SubscriptionId, NavigationSink>,
    next_subscription: u64,
    errors: Vec<String>,
}

impl HeadlessState {
    fn broadcast(&self) {
        let stack: Vec<ScreenHandle> = self.stack.iter().map(|(handle, _)| *handle).collect();
        for sink in self.sinks.values() {
            sink.notify(NavigationEvent::DidShow {
                stack: stack.clone(),
            });
        }
    }
}

/// In-memory navigation stack for terminals and tests.
///
/// Clones share the same stack so a driver can keep a handle after giving
/// one to the coordinator.
#[derive(Debug, Clone, Default)]
pub struct HeadlessNavigator {
    inner: Arc<Mutex<HeadlessState>>,
}

impl HeadlessNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HeadlessState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Screen ids on the stack, bottom to top.
    pub fn screen_ids(&self) -> Vec<String> {
        self.state()
            .stack
            .iter()
            .map(|(_, screen_id)| screen_id.clone())
            .collect()
    }

    pub fn top(&self) -> Option<String> {
        self.state()
            .stack
            .last()
            .map(|(_, screen_id)| screen_id.clone())
    }

    pub fn depth(&self) -> usize {
        self.state().stack.len()
    }

    /// Back button: removes the top screen and notifies subscribers.
    pub fn pop(&self) -> Option<String> {
        let mut state = self.state();
        let (_, screen_id) = state.stack.pop()?;
        state.broadcast();
        Some(screen_id)
    }

    /// Removes every screen, as when the whole flow is dismissed.
    pub fn pop_all(&self) {
        let mut state = self.state();
        state.stack.clear();
        state.broadcast();
    }

    pub fn errors(&self) -> Vec<String> {
        self.state().errors.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state().sinks.len()
    }
}

impl NavigationHost for HeadlessNavigator {
    fn push(&mut self, screen: &RenderPayload) -> ScreenHandle {
        let mut state = self.state();
        state.next_handle += 1;
        let handle = ScreenHandle(state.next_handle);
        state.stack.push((handle, screen.screen_id.clone()));
        tracing::debug!(screen_id = %screen.screen_id, depth = state.stack.len(), "screen pushed");
        state.broadcast();
        handle
    }

    fn subscribe(&mut self, sink: NavigationSink) -> SubscriptionId {
        let mut state = self.state();
        state.next_subscription += 1;
        let id = SubscriptionId(state.next_subscription);
        state.sinks.insert(id, sink);
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.state().sinks.remove(&id);
    }

    fn present_error(&mut self, message: &str) {
        self.state().errors.push(message.to_string());
    }
}
