#![allow(missing_docs)]

pub mod coordinator;
pub mod error;
pub mod hooks;
pub mod navigation;
pub mod payload;
pub mod service;

pub use coordinator::{
    CompletionHandler, ContinueOutcome, FlowCoordinator, FlowOutcome, FlowPhase, start_flow,
    start_flow_from_json,
};
pub use error::{HookError, NavigationError, ServiceError, SubmissionError};
pub use hooks::{AccountScreenHooks, HookRegistry, OptionRequest, ScreenHooks};
pub use navigation::{
    HeadlessNavigator, NavigationEvent, NavigationHost, NavigationSink, ScreenHandle,
    SubscriptionId,
};
pub use payload::{ScreenAnswers, SubmissionPayload};
pub use service::{AccountService, MockAccountService, OptionCategory};
