//! State controllers for the OneClick Studio client.
//!
//! Every controller here is a plain struct driven by explicit calls with an
//! injected clock; side effects come back to the caller as typed requests
//! ([`modes::ModeFetch`], [`chat::GenerationRequest`], [`admin::AdminAction`])
//! so the state machines stay synchronous and testable. [`studio::Studio`]
//! composes them and drives the async collaborators.

pub mod admin;
pub mod build;
pub mod chat;
pub mod modes;
pub mod payment;
pub mod session;
pub mod studio;

pub use admin::{AdminAction, AdminActionError, AdminConsoleState, AdminFetch, AdminMutation, AdminTab};
pub use build::{BuildState, BuildWorkflow, NotConfigured, PollTicket};
pub use chat::{GenerationRequest, GenerationWorkflow};
pub use modes::{AdminRequired, AppMode, FetchToken, ModeController, ModeFetch};
pub use payment::{PaymentInputError, PaymentStep, PaymentWorkflow};
pub use session::{
    CreditOverlay, LoginRejection, RegistrationOutcome, Route, SessionStore, SubscriptionDiff,
    diff_subscriptions,
};
pub use studio::{Studio, StudioError, SubmitOutcome};
