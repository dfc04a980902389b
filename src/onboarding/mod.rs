//! Onboarding wizard: the five-step flow a new business goes through to
//! get its WhatsApp bot running.
//!
//! `step` holds the transition table, `payload` the validated per-step data,
//! `session` the serializable state, and `controller` drives the flow against
//! the remote session API (`remote`), local persistence (`crate::store`) and
//! analytics. `routes` is the HTTP side of the remote session API.

pub mod analytics;
pub mod controller;
pub mod payload;
pub mod remote;
pub mod routes;
pub mod session;
pub mod step;

pub use analytics::{
    AnalyticsDispatcher, AnalyticsEvent, AnalyticsSink, MemoryAnalytics, TracingAnalytics,
};
pub use controller::{
    AdvanceOutcome, OnboardingController, ResumeOutcome, ResumeSource, RetreatOutcome,
};
pub use payload::{
    AuthMethod, AutoMessageStepData, BusinessStepData, OAuthProvider, PhoneStepData,
    PlanSelectionStepData, RegistrationRecord, RegistrationStepData, ResponseTime, StepPayload,
};
pub use remote::{HttpRemoteSessionApi, RemoteSessionApi, RemoteSessionRecord, StepReceipt};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use session::{OnboardingSession, SessionData, SessionMetadata};
pub use step::{OnboardingStep, TOTAL_STEPS};
