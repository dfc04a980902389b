//! OnboardingController: sequences the five steps, saves each one
//! remotely, persists progress locally and reports transitions.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use super::analytics::{AnalyticsDispatcher, AnalyticsEvent, AnalyticsSink};
use super::payload::StepPayload;
use super::remote::{self, RemoteSessionApi, RemoteSessionRecord, StepReceipt};
use super::session::OnboardingSession;
use super::step::OnboardingStep;
use crate::domain::plan::{PlanTier, PriceVariant};
use crate::error::{OnboardingError, PersistenceError, RemoteSaveError};
use crate::store::SessionStore;

/// Result of a successful `advance()`.
#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    /// Session after the step was applied.
    pub session: OnboardingSession,
    /// What the backend returned for the step.
    pub receipt: StepReceipt,
    /// Whether this submission finished onboarding.
    pub completed: bool,
    /// Set when the session could not be persisted locally. The step still
    /// counts; only resume-after-reload is affected.
    pub persist_error: Option<PersistenceError>,
}

/// Result of a successful `retreat()`.
#[derive(Debug, Clone)]
pub struct RetreatOutcome {
    pub session: OnboardingSession,
    /// Whether the session actually moved back a step.
    pub moved: bool,
    /// Set when the session could not be persisted locally.
    pub persist_error: Option<PersistenceError>,
}

/// Where a resumed session came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeSource {
    /// Nothing was stored.
    Fresh,
    /// A stored session was restored.
    Restored,
    /// Stored data was unreadable or invalid; a fresh session replaced it.
    Recovered(PersistenceError),
}

#[derive(Debug, Clone)]
pub struct ResumeOutcome {
    pub session: OnboardingSession,
    pub source: ResumeSource,
}

/// Coordinates the onboarding flow: validation has already happened, the
/// controller enforces ordering, talks to the backend and persists.
///
/// Analytics go through an [`AnalyticsDispatcher`], so a slow sink never
/// holds up an operation. Construct inside a Tokio runtime.
pub struct OnboardingController {
    store: Arc<dyn SessionStore>,
    remote: Arc<dyn RemoteSessionApi>,
    analytics: AnalyticsDispatcher,
    session: RwLock<OnboardingSession>,
    /// Held for the duration of every mutating operation.
    op_lock: Mutex<()>,
}

impl OnboardingController {
    /// Create a controller with a fresh session in a random price bucket.
    pub fn new(
        store: Arc<dyn SessionStore>,
        remote: Arc<dyn RemoteSessionApi>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        let variant = PriceVariant::assign(&mut rand::thread_rng());
        Self::with_variant(store, remote, analytics, variant)
    }

    /// Create a controller with a fresh session in a fixed price bucket.
    pub fn with_variant(
        store: Arc<dyn SessionStore>,
        remote: Arc<dyn RemoteSessionApi>,
        analytics: Arc<dyn AnalyticsSink>,
        variant: PriceVariant,
    ) -> Self {
        Self {
            store,
            remote,
            analytics: AnalyticsDispatcher::spawn(analytics),
            session: RwLock::new(OnboardingSession::new(variant)),
            op_lock: Mutex::new(()),
        }
    }

    /// Immutable copy of the current session.
    pub async fn snapshot(&self) -> OnboardingSession {
        self.session.read().await.clone()
    }

    pub async fn current_step(&self) -> OnboardingStep {
        self.session.read().await.current_step
    }

    /// Plan suggested by the step-1 answers, once they exist.
    pub async fn recommended_plan(&self) -> Option<PlanTier> {
        self.session.read().await.recommended_plan()
    }

    /// The backend's record of this session.
    pub async fn remote_session(&self) -> Result<Option<RemoteSessionRecord>, RemoteSaveError> {
        let session_id = self.session.read().await.session_id();
        self.remote.get_session(session_id).await
    }

    /// Wait until every analytics event emitted so far reached the sink.
    pub async fn flush_analytics(&self) {
        self.analytics.flush().await;
    }

    fn begin(&self) -> Result<MutexGuard<'_, ()>, OnboardingError> {
        self.op_lock.try_lock().map_err(|_| OnboardingError::Busy)
    }

    /// Submit the validated payload for the current step.
    ///
    /// 1. Save it remotely; a failure leaves the session untouched.
    /// 2. Merge it, mark the step complete and move on (or finish).
    /// 3. Persist locally; failures are reported, not fatal.
    /// 4. Emit `step_complete` then `step_view` or `onboarding_complete`.
    pub async fn advance(&self, payload: StepPayload) -> Result<AdvanceOutcome, OnboardingError> {
        let op = self.begin()?;

        let (session_id, current) = {
            let session = self.session.read().await;
            if session.is_complete() {
                return Err(OnboardingError::AlreadyComplete);
            }
            if payload.step() != session.current_step {
                return Err(OnboardingError::StepMismatch {
                    expected: session.current_step,
                    got: payload.step(),
                });
            }
            if let StepPayload::PlanSelection(plan) = &payload {
                if plan.price_variant != session.price_variant() {
                    return Err(OnboardingError::PriceVariantMismatch {
                        expected: session.price_variant().to_string(),
                        got: plan.price_variant.to_string(),
                    });
                }
            }
            (session.session_id(), session.current_step)
        };

        let receipt = match remote::submit(self.remote.as_ref(), session_id, &payload).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(%session_id, step = current.number(), "Remote save failed: {}", e);
                return Err(e.into());
            }
        };

        let updated = {
            let mut session = self.session.write().await;
            session.apply(&payload, &receipt, Utc::now());
            session.clone()
        };
        let completed = updated.is_complete();

        let persist_error = self.persist(&updated).await;
        drop(op);

        self.analytics
            .send(AnalyticsEvent::step_complete(current, session_id));
        if completed {
            tracing::info!(%session_id, "Onboarding complete");
            self.analytics
                .send(AnalyticsEvent::OnboardingComplete { session_id });
        } else {
            self.analytics
                .send(AnalyticsEvent::step_view(updated.current_step, session_id));
        }

        Ok(AdvanceOutcome {
            session: updated,
            receipt,
            completed,
            persist_error,
        })
    }

    /// Go back one step. Completed data is kept. At step 1 nothing happens.
    pub async fn retreat(&self) -> Result<RetreatOutcome, OnboardingError> {
        let op = self.begin()?;

        let (from, updated) = {
            let mut session = self.session.write().await;
            if session.is_complete() {
                return Err(OnboardingError::AlreadyComplete);
            }
            let from = session.current_step;
            if !session.step_back(Utc::now()) {
                return Ok(RetreatOutcome {
                    session: session.clone(),
                    moved: false,
                    persist_error: None,
                });
            }
            (from, session.clone())
        };

        let persist_error = self.persist(&updated).await;
        drop(op);

        self.analytics.send(AnalyticsEvent::StepBack {
            from_step: from,
            to_step: updated.current_step,
            session_id: updated.session_id(),
        });
        Ok(RetreatOutcome {
            session: updated,
            moved: true,
            persist_error,
        })
    }

    /// Drop all progress and start over with a new session id in the same
    /// price bucket.
    pub async fn restart(&self) -> Result<OnboardingSession, OnboardingError> {
        let op = self.begin()?;

        let (previous_id, variant, saved) = {
            let session = self.session.read().await;
            (session.session_id(), session.price_variant(), session.has_been_saved())
        };

        if saved {
            self.remote.clear_session(previous_id).await.map_err(|e| {
                tracing::warn!(session_id = %previous_id, "Remote clear failed: {}", e);
                OnboardingError::from(e)
            })?;
        }
        let fresh = OnboardingSession::new(variant);
        if let Err(e) = self.store.clear().await {
            // A reload must not bring the old session back.
            tracing::warn!(session_id = %previous_id, "Failed to clear stored session: {}", e);
            self.persist(&fresh).await;
        }
        *self.session.write().await = fresh.clone();
        drop(op);

        tracing::info!(
            previous_session_id = %previous_id,
            session_id = %fresh.session_id(),
            "Onboarding restarted"
        );
        self.analytics.send(AnalyticsEvent::OnboardingRestart {
            previous_session_id: previous_id,
            session_id: fresh.session_id(),
        });
        self.analytics
            .send(AnalyticsEvent::step_view(OnboardingStep::FIRST, fresh.session_id()));
        Ok(fresh)
    }

    /// Restore the stored session, if any, and pick the step to show.
    ///
    /// `route_step` is the step number the caller was asked to open. Out of
    /// range numbers are ignored.
    pub async fn resume(&self, route_step: Option<u8>) -> Result<ResumeOutcome, OnboardingError> {
        let op = self.begin()?;
        let route = route_step.and_then(OnboardingStep::from_number);

        let loaded = match self.store.load().await {
            Ok(Some(session)) => match session.check_invariants() {
                Ok(()) => Ok(Some(session)),
                Err(reason) => Err(PersistenceError::Corrupted(reason)),
            },
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        let (session, source) = {
            let mut guard = self.session.write().await;
            let source = match loaded {
                Ok(Some(mut stored)) => {
                    stored.current_step = stored.reconcile_step(route);
                    tracing::info!(
                        session_id = %stored.session_id(),
                        step = stored.current_step.number(),
                        "Resumed onboarding session"
                    );
                    *guard = stored;
                    ResumeSource::Restored
                }
                Ok(None) => ResumeSource::Fresh,
                Err(e) => {
                    tracing::warn!("Discarding stored onboarding session: {}", e);
                    let variant = guard.price_variant();
                    *guard = OnboardingSession::new(variant);
                    ResumeSource::Recovered(e)
                }
            };
            (guard.clone(), source)
        };

        if matches!(source, ResumeSource::Recovered(_)) {
            if let Err(e) = self.store.clear().await {
                tracing::warn!("Failed to clear stored session: {}", e);
            }
        }
        drop(op);

        if !session.is_complete() {
            self.analytics
                .send(AnalyticsEvent::step_view(session.current_step, session.session_id()));
        }
        Ok(ResumeOutcome { session, source })
    }

    async fn persist(&self, session: &OnboardingSession) -> Option<PersistenceError> {
        match self.store.save(session).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(
                    session_id = %session.session_id(),
                    "Failed to persist onboarding session: {}",
                    e
                );
                Some(e)
            }
        }
    }
}
