//! WhatsApp bot onboarding: business validation, plan recommendation and
//! the resumable five-step signup flow.

pub mod config;
pub mod domain;
pub mod error;
pub mod onboarding;
pub mod store;
pub mod validation;
