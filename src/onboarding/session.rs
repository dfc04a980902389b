//! The onboarding session aggregate.
//!
//! Persisted as JSON through the session store. The aggregate owns its
//! invariants: steps complete in order, data only exists for completed
//! steps, and `last_updated_at` moves strictly forward.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payload::{
    AutoMessageStepData, BusinessStepData, PhoneStepData, PlanSelectionStepData,
    RegistrationRecord, StepPayload,
};
use super::remote::StepReceipt;
use super::step::OnboardingStep;
use crate::domain::plan::{PlanTier, PriceVariant};

/// Step data collected so far, keyed by step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_info: Option<BusinessStepData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<PhoneStepData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_message: Option<AutoMessageStepData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_selection: Option<PlanSelectionStepData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<RegistrationRecord>,
}

impl SessionData {
    /// Whether data for `step` has been recorded.
    pub fn has(&self, step: OnboardingStep) -> bool {
        match step {
            OnboardingStep::BusinessInfo => self.business_info.is_some(),
            OnboardingStep::PhoneConnect => self.phone_number.is_some(),
            OnboardingStep::AutoMessage => self.auto_message.is_some(),
            OnboardingStep::PlanSelection => self.plan_selection.is_some(),
            OnboardingStep::Registration => self.registration.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub started_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub session_id: Uuid,
    pub price_variant: PriceVariant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Progress of one visitor through the onboarding wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingSession {
    pub current_step: OnboardingStep,
    pub completed_steps: BTreeSet<OnboardingStep>,
    pub data: SessionData,
    pub metadata: SessionMetadata,
}

impl OnboardingSession {
    /// A fresh frame at step 1 with a new session id.
    pub fn new(price_variant: PriceVariant) -> Self {
        let now = Utc::now();
        Self {
            current_step: OnboardingStep::FIRST,
            completed_steps: BTreeSet::new(),
            data: SessionData::default(),
            metadata: SessionMetadata {
                started_at: now,
                last_updated_at: now,
                session_id: Uuid::new_v4(),
                price_variant,
                completed_at: None,
            },
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.metadata.session_id
    }

    pub fn price_variant(&self) -> PriceVariant {
        self.metadata.price_variant
    }

    pub fn is_complete(&self) -> bool {
        self.completed_steps.contains(&OnboardingStep::LAST)
    }

    /// First step without completed data, if any.
    pub fn first_incomplete(&self) -> Option<OnboardingStep> {
        OnboardingStep::ALL
            .into_iter()
            .find(|s| !self.completed_steps.contains(s))
    }

    /// Furthest step the visitor may open.
    pub fn furthest_unlocked(&self) -> OnboardingStep {
        self.first_incomplete().unwrap_or(OnboardingStep::LAST)
    }

    /// Whether anything was ever stored remotely for this session.
    pub fn has_been_saved(&self) -> bool {
        !self.completed_steps.is_empty()
    }

    /// Recommendation derived from step-1 data.
    pub fn recommended_plan(&self) -> Option<PlanTier> {
        self.data
            .business_info
            .as_ref()
            .map(BusinessStepData::recommended_plan)
    }

    /// Verify structural invariants. Used on sessions loaded from storage.
    pub fn check_invariants(&self) -> Result<(), String> {
        let k = self.completed_steps.len();
        for (i, step) in self.completed_steps.iter().enumerate() {
            if usize::from(step.number()) != i + 1 {
                return Err(format!("completed steps are not a prefix: step {step} out of order"));
            }
        }
        if usize::from(self.current_step.number()) > k + 1 {
            return Err(format!(
                "current step {} is beyond the first incomplete step {}",
                self.current_step,
                k + 1
            ));
        }
        for step in OnboardingStep::ALL {
            if self.data.has(step) && !self.completed_steps.contains(&step) {
                return Err(format!("data present for incomplete step {step}"));
            }
        }
        if self.is_complete() != self.metadata.completed_at.is_some() {
            return Err("completion timestamp does not match completed steps".to_string());
        }
        if self.metadata.last_updated_at < self.metadata.started_at {
            return Err("last update precedes session start".to_string());
        }
        Ok(())
    }

    /// Merge a remotely-saved payload and move the step pointer.
    ///
    /// The caller has already checked that `payload` belongs to the current
    /// step and the session is not complete.
    pub fn apply(&mut self, payload: &StepPayload, receipt: &StepReceipt, now: DateTime<Utc>) {
        let step = payload.step();
        match payload {
            StepPayload::BusinessInfo(d) => self.data.business_info = Some(d.clone()),
            StepPayload::PhoneNumber(d) => self.data.phone_number = Some(d.clone()),
            StepPayload::AutoMessage(d) => self.data.auto_message = Some(d.clone()),
            StepPayload::PlanSelection(d) => self.data.plan_selection = Some(d.clone()),
            StepPayload::Registration(d) => {
                let user_id = match receipt {
                    StepReceipt::RegistrationCompleted { user_id } => Some(user_id.clone()),
                    _ => None,
                };
                self.data.registration = Some(d.record(user_id));
            }
        }
        self.completed_steps.insert(step);
        self.touch(now);
        match step.next() {
            Some(next) => self.current_step = next,
            None => self.metadata.completed_at = Some(self.metadata.last_updated_at),
        }
    }

    /// Move back one step. Returns `false` at step 1.
    pub fn step_back(&mut self, now: DateTime<Utc>) -> bool {
        match self.current_step.previous() {
            Some(previous) => {
                self.current_step = previous;
                self.touch(now);
                true
            }
            None => false,
        }
    }

    /// Bump `last_updated_at`, keeping it strictly increasing even when the
    /// clock stalls or goes backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let floor = self.metadata.last_updated_at + Duration::milliseconds(1);
        self.metadata.last_updated_at = now.max(floor);
    }

    /// Decide which step to show when resuming from a route.
    ///
    /// A route at step 1 (or none) defers to a later persisted step. Any
    /// other route step is honored if it is unlocked.
    pub fn reconcile_step(&self, route: Option<OnboardingStep>) -> OnboardingStep {
        let persisted = self.current_step;
        match route {
            None => persisted,
            Some(OnboardingStep::BusinessInfo) if persisted > OnboardingStep::FIRST => persisted,
            Some(route) if route <= self.furthest_unlocked() => route,
            Some(_) => persisted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn receipt_for(step: OnboardingStep) -> StepReceipt {
        match step {
            OnboardingStep::BusinessInfo => StepReceipt::BusinessInfoSaved {
                session_id: "s-1".to_string(),
            },
            OnboardingStep::PhoneConnect => StepReceipt::PhoneNumberSaved { verified: true },
            OnboardingStep::AutoMessage => StepReceipt::AutoMessageSaved,
            OnboardingStep::PlanSelection => StepReceipt::PlanSelectionSaved {
                checkout_url: "https://billing.example.com/checkout".to_string(),
            },
            OnboardingStep::Registration => StepReceipt::RegistrationCompleted {
                user_id: "user-9".to_string(),
            },
        }
    }

    fn sample_raw(step: OnboardingStep) -> serde_json::Value {
        match step {
            OnboardingStep::BusinessInfo => json!({
                "businessName": "Panadería Luna",
                "sector": "retail",
                "employeeCount": 6,
                "monthlyClients": 300
            }),
            OnboardingStep::PhoneConnect => json!({
                "phoneNumber": "55 1234 5678",
                "countryCode": "+52",
                "isWhatsAppBusiness": true
            }),
            OnboardingStep::AutoMessage => json!({
                "welcomeMessage": "¡Hola! Gracias por escribirnos.",
                "responseTime": "immediate",
                "enableKeywords": false
            }),
            OnboardingStep::PlanSelection => json!({
                "planType": "starter",
                "billingCycle": "monthly",
                "priceVariant": "control"
            }),
            OnboardingStep::Registration => json!({
                "email": "owner@luna.mx",
                "authMethod": {"type": "email_password", "password": "pan4dero!"}
            }),
        }
    }

    fn advance(session: &mut OnboardingSession) {
        let step = session.current_step;
        let payload = step.validate(&sample_raw(step)).unwrap();
        session.apply(&payload, &receipt_for(step), Utc::now());
    }

    #[test]
    fn fresh_session_is_valid() {
        let session = OnboardingSession::new(PriceVariant::Control);
        assert_eq!(session.current_step, OnboardingStep::BusinessInfo);
        assert!(!session.has_been_saved());
        assert!(!session.is_complete());
        session.check_invariants().unwrap();
    }

    #[test]
    fn five_applies_complete_the_session() {
        let mut session = OnboardingSession::new(PriceVariant::Control);
        for _ in 0..5 {
            advance(&mut session);
            session.check_invariants().unwrap();
        }
        assert!(session.is_complete());
        assert_eq!(session.current_step, OnboardingStep::Registration);
        assert_eq!(session.completed_steps.len(), 5);
        assert!(session.metadata.completed_at.is_some());
        assert_eq!(
            session.data.registration.as_ref().unwrap().user_id.as_deref(),
            Some("user-9")
        );
    }

    #[test]
    fn touch_is_strictly_increasing() {
        let mut session = OnboardingSession::new(PriceVariant::Control);
        let before = session.metadata.last_updated_at;
        session.touch(before - Duration::seconds(30));
        assert!(session.metadata.last_updated_at > before);
    }

    #[test]
    fn step_back_keeps_data() {
        let mut session = OnboardingSession::new(PriceVariant::Discount);
        assert!(!session.step_back(Utc::now()));
        advance(&mut session);
        advance(&mut session);
        assert!(session.step_back(Utc::now()));
        assert_eq!(session.current_step, OnboardingStep::PhoneConnect);
        assert!(session.data.phone_number.is_some());
        assert_eq!(session.completed_steps.len(), 2);
        session.check_invariants().unwrap();
    }

    #[test]
    fn invariants_reject_gaps() {
        let mut session = OnboardingSession::new(PriceVariant::Control);
        session.completed_steps.insert(OnboardingStep::AutoMessage);
        assert!(session.check_invariants().is_err());

        let mut session = OnboardingSession::new(PriceVariant::Control);
        session.current_step = OnboardingStep::PlanSelection;
        assert!(session.check_invariants().is_err());
    }

    #[test]
    fn invariants_reject_orphan_data() {
        let mut session = OnboardingSession::new(PriceVariant::Control);
        advance(&mut session);
        session.completed_steps.clear();
        session.current_step = OnboardingStep::BusinessInfo;
        assert!(session.check_invariants().is_err());
    }

    #[test]
    fn reconcile_prefers_persisted_over_first_route() {
        let mut session = OnboardingSession::new(PriceVariant::Control);
        advance(&mut session);
        advance(&mut session);
        assert_eq!(
            session.reconcile_step(Some(OnboardingStep::BusinessInfo)),
            OnboardingStep::AutoMessage
        );
        assert_eq!(session.reconcile_step(None), OnboardingStep::AutoMessage);
    }

    #[test]
    fn reconcile_honors_reachable_route() {
        let mut session = OnboardingSession::new(PriceVariant::Control);
        advance(&mut session);
        advance(&mut session);
        assert_eq!(
            session.reconcile_step(Some(OnboardingStep::PhoneConnect)),
            OnboardingStep::PhoneConnect
        );
        assert_eq!(
            session.reconcile_step(Some(OnboardingStep::Registration)),
            OnboardingStep::AutoMessage
        );
    }

    #[test]
    fn serializes_with_step_numbers() {
        let mut session = OnboardingSession::new(PriceVariant::Premium);
        advance(&mut session);
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["currentStep"], 2);
        assert_eq!(value["completedSteps"], json!([1]));
        assert_eq!(value["metadata"]["priceVariant"], "premium");
        assert_eq!(value["data"]["businessInfo"]["sector"], "retail");

        let back: OnboardingSession = serde_json::from_value(value).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn recommended_plan_from_step_one() {
        let mut session = OnboardingSession::new(PriceVariant::Control);
        assert_eq!(session.recommended_plan(), None);
        advance(&mut session);
        assert_eq!(session.recommended_plan(), Some(PlanTier::Starter));
    }
}
