//! The five onboarding steps and their transition table.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::payload::{self, StepPayload};
use crate::validation::ValidationErrors;

/// One stage of the onboarding wizard, numbered 1..=5.
///
/// Progresses linearly: BusinessInfo → PhoneConnect → AutoMessage →
/// PlanSelection → Registration. Serialized as its step number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OnboardingStep {
    BusinessInfo,
    PhoneConnect,
    AutoMessage,
    PlanSelection,
    Registration,
}

/// Number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 5;

/// Static description of one step: where its data lives, how its raw input
/// is validated, and what comes next.
pub struct StepEntry {
    pub step: OnboardingStep,
    /// Key under which the step's data is stored in the session.
    pub key: &'static str,
    /// Name reported to analytics.
    pub name: &'static str,
    pub validate: fn(&Value) -> Result<StepPayload, ValidationErrors>,
    pub next: Option<OnboardingStep>,
}

static STEP_TABLE: [StepEntry; 5] = [
    StepEntry {
        step: OnboardingStep::BusinessInfo,
        key: "businessInfo",
        name: "business_info",
        validate: payload::validate_business_info,
        next: Some(OnboardingStep::PhoneConnect),
    },
    StepEntry {
        step: OnboardingStep::PhoneConnect,
        key: "phoneNumber",
        name: "phone_connect",
        validate: payload::validate_phone_number,
        next: Some(OnboardingStep::AutoMessage),
    },
    StepEntry {
        step: OnboardingStep::AutoMessage,
        key: "autoMessage",
        name: "auto_message",
        validate: payload::validate_auto_message,
        next: Some(OnboardingStep::PlanSelection),
    },
    StepEntry {
        step: OnboardingStep::PlanSelection,
        key: "planSelection",
        name: "plan_selection",
        validate: payload::validate_plan_selection,
        next: Some(OnboardingStep::Registration),
    },
    StepEntry {
        step: OnboardingStep::Registration,
        key: "registration",
        name: "registration",
        validate: payload::validate_registration,
        next: None,
    },
];

impl OnboardingStep {
    pub const ALL: [OnboardingStep; 5] = [
        Self::BusinessInfo,
        Self::PhoneConnect,
        Self::AutoMessage,
        Self::PlanSelection,
        Self::Registration,
    ];

    pub const FIRST: OnboardingStep = Self::BusinessInfo;
    pub const LAST: OnboardingStep = Self::Registration;

    /// Convert a 1-based step number.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::BusinessInfo),
            2 => Some(Self::PhoneConnect),
            3 => Some(Self::AutoMessage),
            4 => Some(Self::PlanSelection),
            5 => Some(Self::Registration),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::BusinessInfo => 1,
            Self::PhoneConnect => 2,
            Self::AutoMessage => 3,
            Self::PlanSelection => 4,
            Self::Registration => 5,
        }
    }

    pub fn entry(self) -> &'static StepEntry {
        &STEP_TABLE[usize::from(self.number() - 1)]
    }

    pub fn key(self) -> &'static str {
        self.entry().key
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn next(self) -> Option<Self> {
        self.entry().next
    }

    pub fn previous(self) -> Option<Self> {
        Self::from_number(self.number().checked_sub(1)?)
    }

    /// Validate raw input for this step.
    pub fn validate(self, raw: &Value) -> Result<StepPayload, ValidationErrors> {
        (self.entry().validate)(raw)
    }
}

impl TryFrom<u8> for OnboardingStep {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::from_number(n)
            .ok_or_else(|| format!("Invalid step number {n}. Must be between 1 and {TOTAL_STEPS}"))
    }
}

impl From<OnboardingStep> for u8 {
    fn from(step: OnboardingStep) -> Self {
        step.number()
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}
