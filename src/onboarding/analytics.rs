//! Analytics events emitted at onboarding transitions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::step::OnboardingStep;
use crate::error::AnalyticsError;

/// One analytics event. Serialized with an `event` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AnalyticsEvent {
    StepView {
        step: OnboardingStep,
        step_name: &'static str,
        session_id: Uuid,
    },
    StepComplete {
        step: OnboardingStep,
        step_name: &'static str,
        session_id: Uuid,
    },
    StepBack {
        from_step: OnboardingStep,
        to_step: OnboardingStep,
        session_id: Uuid,
    },
    OnboardingComplete {
        session_id: Uuid,
    },
    OnboardingRestart {
        previous_session_id: Uuid,
        session_id: Uuid,
    },
}

impl AnalyticsEvent {
    pub fn step_view(step: OnboardingStep, session_id: Uuid) -> Self {
        Self::StepView {
            step,
            step_name: step.name(),
            session_id,
        }
    }

    pub fn step_complete(step: OnboardingStep, session_id: Uuid) -> Self {
        Self::StepComplete {
            step,
            step_name: step.name(),
            session_id,
        }
    }

    /// Event name as reported to the sink.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StepView { .. } => "step_view",
            Self::StepComplete { .. } => "step_complete",
            Self::StepBack { .. } => "step_back",
            Self::OnboardingComplete { .. } => "onboarding_complete",
            Self::OnboardingRestart { .. } => "onboarding_restart",
        }
    }
}

/// Destination for analytics events.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError>;
}

/// Writes events to the `analytics` tracing target.
pub struct TracingAnalytics;

#[async_trait]
impl AnalyticsSink for TracingAnalytics {
    async fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        let payload =
            serde_json::to_string(&event).map_err(|e| AnalyticsError::Delivery(e.to_string()))?;
        tracing::info!(target: "analytics", event = event.name(), %payload);
        Ok(())
    }
}

enum DispatchCommand {
    Track(AnalyticsEvent),
    Flush(oneshot::Sender<()>),
}

/// Hands events to a sink on a background task, in the order they were
/// sent. Sending never waits for the sink.
pub struct AnalyticsDispatcher {
    tx: mpsc::UnboundedSender<DispatchCommand>,
}

impl AnalyticsDispatcher {
    /// Start the delivery task. Must be called inside a Tokio runtime.
    pub fn spawn(sink: Arc<dyn AnalyticsSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    DispatchCommand::Track(event) => {
                        let name = event.name();
                        if let Err(e) = sink.track(event).await {
                            tracing::warn!(event = name, "Analytics delivery failed: {}", e);
                        }
                    }
                    DispatchCommand::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            tracing::debug!("Analytics dispatcher stopped");
        });
        Self { tx }
    }

    pub fn send(&self, event: AnalyticsEvent) {
        let name = event.name();
        if self.tx.send(DispatchCommand::Track(event)).is_err() {
            tracing::warn!(event = name, "Analytics dispatcher gone, event dropped");
        }
    }

    /// Wait until every event sent so far has reached the sink.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(DispatchCommand::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

/// Keeps events in memory, in order.
#[derive(Default)]
pub struct MemoryAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemoryAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(AnalyticsEvent::name).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

#[async_trait]
impl AnalyticsSink for MemoryAnalytics {
    async fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        self.events
            .lock()
            .map_err(|_| AnalyticsError::Delivery("event buffer poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}
