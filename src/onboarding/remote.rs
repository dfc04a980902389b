//! Remote session API: the backend operations that persist each step.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::payload::{
    AutoMessageStepData, BusinessStepData, PhoneStepData, PlanSelectionStepData,
    RegistrationStepData, StepPayload,
};
use super::step::OnboardingStep;
use crate::config::ClientConfig;
use crate::error::{ConfigError, RemoteSaveError};

/// What the backend returned for a saved step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StepReceipt {
    BusinessInfoSaved { session_id: String },
    PhoneNumberSaved { verified: bool },
    AutoMessageSaved,
    PlanSelectionSaved { checkout_url: String },
    RegistrationCompleted { user_id: String },
}

impl StepReceipt {
    pub fn step(&self) -> OnboardingStep {
        match self {
            Self::BusinessInfoSaved { .. } => OnboardingStep::BusinessInfo,
            Self::PhoneNumberSaved { .. } => OnboardingStep::PhoneConnect,
            Self::AutoMessageSaved => OnboardingStep::AutoMessage,
            Self::PlanSelectionSaved { .. } => OnboardingStep::PlanSelection,
            Self::RegistrationCompleted { .. } => OnboardingStep::Registration,
        }
    }
}

/// The backend's view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSessionRecord {
    pub session_id: Uuid,
    /// Stored step data keyed by step key (`businessInfo`, ...).
    #[serde(default)]
    pub steps: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RemoteSessionRecord {
    /// Steps the backend has data for, in order.
    pub fn saved_steps(&self) -> Vec<OnboardingStep> {
        OnboardingStep::ALL
            .into_iter()
            .filter(|s| self.steps.contains_key(s.key()))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Backend operations, one per step plus session lookup and removal.
#[async_trait]
pub trait RemoteSessionApi: Send + Sync {
    async fn save_business_info(
        &self,
        session_id: Uuid,
        data: &BusinessStepData,
    ) -> Result<StepReceipt, RemoteSaveError>;

    async fn save_phone_number(
        &self,
        session_id: Uuid,
        data: &PhoneStepData,
    ) -> Result<StepReceipt, RemoteSaveError>;

    async fn save_auto_message(
        &self,
        session_id: Uuid,
        data: &AutoMessageStepData,
    ) -> Result<StepReceipt, RemoteSaveError>;

    async fn save_plan_selection(
        &self,
        session_id: Uuid,
        data: &PlanSelectionStepData,
    ) -> Result<StepReceipt, RemoteSaveError>;

    async fn complete_registration(
        &self,
        session_id: Uuid,
        data: &RegistrationStepData,
    ) -> Result<StepReceipt, RemoteSaveError>;

    async fn get_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<RemoteSessionRecord>, RemoteSaveError>;

    async fn clear_session(&self, session_id: Uuid) -> Result<(), RemoteSaveError>;
}

/// Send a payload to the operation matching its step.
pub async fn submit(
    api: &dyn RemoteSessionApi,
    session_id: Uuid,
    payload: &StepPayload,
) -> Result<StepReceipt, RemoteSaveError> {
    let receipt = match payload {
        StepPayload::BusinessInfo(d) => api.save_business_info(session_id, d).await?,
        StepPayload::PhoneNumber(d) => api.save_phone_number(session_id, d).await?,
        StepPayload::AutoMessage(d) => api.save_auto_message(session_id, d).await?,
        StepPayload::PlanSelection(d) => api.save_plan_selection(session_id, d).await?,
        StepPayload::Registration(d) => api.complete_registration(session_id, d).await?,
    };
    if receipt.step() != payload.step() {
        return Err(RemoteSaveError::InvalidResponse {
            operation: payload.step().name().to_string(),
            reason: format!("received a receipt for step {}", receipt.step()),
        });
    }
    Ok(receipt)
}

// ── HTTP client ─────────────────────────────────────────────────────

/// `RemoteSessionApi` over the service's REST endpoints.
pub struct HttpRemoteSessionApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemoteSessionApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "WA_ONBOARDING_API_TIMEOUT_SECS".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST `{sessionId, data}` and return the success body.
    async fn post_step(
        &self,
        operation: &str,
        path: &str,
        session_id: Uuid,
        data: Value,
    ) -> Result<Value, RemoteSaveError> {
        tracing::debug!(%session_id, operation, "Saving onboarding step");
        let resp = self
            .client
            .post(self.url(path))
            .json(&json!({ "sessionId": session_id, "data": data }))
            .send()
            .await
            .map_err(|e| transport(operation, e))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| invalid(operation, e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteSaveError::rejected(operation, error_reason(&body, status)));
        }
        if body.get("success").and_then(Value::as_bool) != Some(true) {
            return Err(RemoteSaveError::rejected(operation, error_reason(&body, status)));
        }
        Ok(body)
    }
}

fn encode<T: Serialize>(operation: &str, data: &T) -> Result<Value, RemoteSaveError> {
    serde_json::to_value(data).map_err(|e| RemoteSaveError::Transport {
        operation: operation.to_string(),
        reason: format!("failed to encode request: {e}"),
    })
}

fn transport(operation: &str, e: reqwest::Error) -> RemoteSaveError {
    RemoteSaveError::Transport {
        operation: operation.to_string(),
        reason: e.to_string(),
    }
}

fn invalid(operation: &str, reason: impl Into<String>) -> RemoteSaveError {
    RemoteSaveError::InvalidResponse {
        operation: operation.to_string(),
        reason: reason.into(),
    }
}

fn error_reason(body: &Value, status: StatusCode) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

fn string_field(operation: &str, body: &Value, key: &str) -> Result<String, RemoteSaveError> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| invalid(operation, format!("missing '{key}'")))
}

#[async_trait]
impl RemoteSessionApi for HttpRemoteSessionApi {
    async fn save_business_info(
        &self,
        session_id: Uuid,
        data: &BusinessStepData,
    ) -> Result<StepReceipt, RemoteSaveError> {
        const OP: &str = "save_business_info";
        let body = self
            .post_step(OP, "/api/onboarding/business-info", session_id, encode(OP, data)?)
            .await?;
        Ok(StepReceipt::BusinessInfoSaved {
            session_id: string_field(OP, &body, "sessionId")?,
        })
    }

    async fn save_phone_number(
        &self,
        session_id: Uuid,
        data: &PhoneStepData,
    ) -> Result<StepReceipt, RemoteSaveError> {
        const OP: &str = "save_phone_number";
        let body = self
            .post_step(OP, "/api/onboarding/phone-number", session_id, encode(OP, data)?)
            .await?;
        let verified = body
            .get("verified")
            .and_then(Value::as_bool)
            .ok_or_else(|| invalid(OP, "missing 'verified'"))?;
        Ok(StepReceipt::PhoneNumberSaved { verified })
    }

    async fn save_auto_message(
        &self,
        session_id: Uuid,
        data: &AutoMessageStepData,
    ) -> Result<StepReceipt, RemoteSaveError> {
        const OP: &str = "save_auto_message";
        self.post_step(OP, "/api/onboarding/auto-message", session_id, encode(OP, data)?)
            .await?;
        Ok(StepReceipt::AutoMessageSaved)
    }

    async fn save_plan_selection(
        &self,
        session_id: Uuid,
        data: &PlanSelectionStepData,
    ) -> Result<StepReceipt, RemoteSaveError> {
        const OP: &str = "save_plan_selection";
        let body = self
            .post_step(OP, "/api/onboarding/plan-selection", session_id, encode(OP, data)?)
            .await?;
        Ok(StepReceipt::PlanSelectionSaved {
            checkout_url: string_field(OP, &body, "checkoutUrl")?,
        })
    }

    async fn complete_registration(
        &self,
        session_id: Uuid,
        data: &RegistrationStepData,
    ) -> Result<StepReceipt, RemoteSaveError> {
        const OP: &str = "complete_registration";
        let body = self
            .post_step(OP, "/api/onboarding/registration", session_id, data.to_wire())
            .await?;
        Ok(StepReceipt::RegistrationCompleted {
            user_id: string_field(OP, &body, "userId")?,
        })
    }

    async fn get_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<RemoteSessionRecord>, RemoteSaveError> {
        const OP: &str = "get_session";
        let resp = self
            .client
            .get(self.url(&format!("/api/onboarding/session/{session_id}")))
            .send()
            .await
            .map_err(|e| transport(OP, e))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            return Err(RemoteSaveError::rejected(OP, error_reason(&body, status)));
        }
        resp.json::<RemoteSessionRecord>()
            .await
            .map(Some)
            .map_err(|e| invalid(OP, e.to_string()))
    }

    async fn clear_session(&self, session_id: Uuid) -> Result<(), RemoteSaveError> {
        const OP: &str = "clear_session";
        let resp = self
            .client
            .delete(self.url(&format!("/api/onboarding/session/{session_id}")))
            .send()
            .await
            .map_err(|e| transport(OP, e))?;

        let status = resp.status();
        // Already gone counts as cleared.
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        Err(RemoteSaveError::rejected(OP, error_reason(&body, status)))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StubRemote;
    use super::*;

    fn plan_payload() -> StepPayload {
        OnboardingStep::PlanSelection
            .validate(&json!({
                "planType": "growth",
                "billingCycle": "monthly",
                "priceVariant": "control"
            }))
            .unwrap()
    }

    #[test]
    fn receipts_serialize_with_kind() {
        let value = serde_json::to_value(StepReceipt::PlanSelectionSaved {
            checkout_url: "https://x.test/c".to_string(),
        })
        .unwrap();
        assert_eq!(value["kind"], "plan_selection_saved");
        assert_eq!(value["checkoutUrl"], "https://x.test/c");
        assert_eq!(
            StepReceipt::AutoMessageSaved.step(),
            OnboardingStep::AutoMessage
        );
    }

    #[tokio::test]
    async fn submit_dispatches_by_step() {
        let stub = StubRemote::new();
        let receipt = submit(&stub, Uuid::new_v4(), &plan_payload()).await.unwrap();
        assert!(matches!(receipt, StepReceipt::PlanSelectionSaved { .. }));
        assert_eq!(stub.calls(), vec!["save_plan_selection"]);
    }

    #[tokio::test]
    async fn submit_rejects_mismatched_receipt() {
        let stub = StubRemote::new();
        *stub.wrong_receipt.lock().unwrap() = true;
        let err = submit(&stub, Uuid::new_v4(), &plan_payload())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteSaveError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn submit_propagates_rejection() {
        let stub = StubRemote::new();
        stub.fail_with(RemoteSaveError::rejected("save_plan_selection", "nope"));
        let err = submit(&stub, Uuid::new_v4(), &plan_payload())
            .await
            .unwrap_err();
        assert_eq!(err, RemoteSaveError::rejected("save_plan_selection", "nope"));
    }

    #[test]
    fn record_lists_saved_steps() {
        let mut steps = BTreeMap::new();
        steps.insert("phoneNumber".to_string(), json!({}));
        steps.insert("businessInfo".to_string(), json!({}));
        let record = RemoteSessionRecord {
            session_id: Uuid::nil(),
            steps,
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        };
        assert_eq!(
            record.saved_steps(),
            vec![OnboardingStep::BusinessInfo, OnboardingStep::PhoneConnect]
        );
        assert!(!record.is_complete());
    }

    #[tokio::test]
    async fn http_client_reports_transport_errors() {
        let api = HttpRemoteSessionApi::new(&ClientConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            timeout: std::time::Duration::from_millis(500),
            ..ClientConfig::default()
        })
        .unwrap();
        let err = api.clear_session(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RemoteSaveError::Transport { .. }));
    }
}
