//! REST endpoints: the remote session API backed by libSQL, plus stateless
//! validation and recommendation helpers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use super::payload::{PlanSelectionStepData, StepPayload};
use super::step::OnboardingStep;
use crate::domain::{
    BotConfig, BusinessInfo, ExpectedVolume, PhoneNumber, VerificationCode,
    WhatsAppIntegrationConfig, get_business_size_category, get_recommended_plan,
};
use crate::error::{DatabaseError, ValidationErrors};
use crate::store::Database;
use crate::validation::{self, Checker};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub db: Arc<dyn Database>,
    /// Base URL the plan-selection endpoint appends checkout parameters to.
    pub checkout_url: String,
}

/// Body of every step submission.
#[derive(Debug)]
pub struct StepRequest {
    pub session_id: Uuid,
    pub data: Value,
}

impl StepRequest {
    pub fn from_json(body: &Value) -> Result<Self, ValidationErrors> {
        let obj = body
            .as_object()
            .ok_or_else(|| ValidationErrors::single("body", "Expected a JSON object"))?;

        let mut checker = Checker::new();
        let session_id = checker.check(
            "sessionId",
            validation::required_str(obj, "sessionId", "Session id").and_then(|raw| {
                Uuid::parse_str(&raw).map_err(|_| "Session id must be a UUID".to_string())
            }),
        );
        let data = match obj.get("data") {
            None | Some(Value::Null) => {
                checker.push("data", "Step data is required");
                None
            }
            Some(data) => Some(data.clone()),
        };

        match (session_id, data) {
            (Some(session_id), Some(data)) => Ok(Self { session_id, data }),
            _ => Err(checker.into_errors()),
        }
    }
}

/// JSON body extractor. Unreadable bodies are rejected with the same 422
/// shape as field validation errors.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(status = %rejection.status(), "Rejected request body");
                Err(ApiError::Validation(ValidationErrors::single(
                    "body",
                    rejection.body_text(),
                )))
            }
        }
    }
}

impl<S> FromRequest<S> for StepRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(body) = JsonBody::<Value>::from_request(req, state).await?;
        Ok(Self::from_json(&body)?)
    }
}

/// Error returned by route handlers.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationErrors),
    NotFound(String),
    Internal(String),
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        Self::Validation(e)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} {id} not found"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "error": "Validation failed",
                    "code": "VALIDATION_ERROR",
                    "fields": errors,
                })),
            )
                .into_response(),
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": message, "code": "NOT_FOUND"})),
            )
                .into_response(),
            Self::Internal(message) => {
                tracing::error!("Onboarding request failed: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error", "code": "INTERNAL_ERROR"})),
                )
                    .into_response()
            }
        }
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

// ── Step submissions ────────────────────────────────────────────────

async fn require_session(db: &dyn Database, session_id: Uuid) -> Result<(), ApiError> {
    match db.get_onboarding_session(session_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound(format!(
            "Onboarding session {session_id} not found"
        ))),
    }
}

async fn store_step(
    db: &dyn Database,
    session_id: Uuid,
    payload: &StepPayload,
) -> Result<(), ApiError> {
    let data = payload
        .to_wire()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    db.upsert_onboarding_step(session_id, payload.step().key(), &data)
        .await?;
    tracing::info!(%session_id, step = payload.step().number(), "Stored onboarding step");
    Ok(())
}

/// POST /api/onboarding/business-info
///
/// Opens the session on first use.
async fn save_business_info(
    State(state): State<OnboardingRouteState>,
    req: StepRequest,
) -> ApiResult {
    let payload = OnboardingStep::BusinessInfo.validate(&req.data)?;
    state.db.ensure_onboarding_session(req.session_id).await?;
    store_step(state.db.as_ref(), req.session_id, &payload).await?;
    Ok(Json(json!({"success": true, "sessionId": req.session_id})))
}

/// POST /api/onboarding/phone-number
async fn save_phone_number(
    State(state): State<OnboardingRouteState>,
    req: StepRequest,
) -> ApiResult {
    let payload = OnboardingStep::PhoneConnect.validate(&req.data)?;
    require_session(state.db.as_ref(), req.session_id).await?;
    store_step(state.db.as_ref(), req.session_id, &payload).await?;

    // Only numbers already on WhatsApp Business count as verified.
    let verified = matches!(&payload, StepPayload::PhoneNumber(d) if d.is_whatsapp_business);
    Ok(Json(json!({"success": true, "verified": verified})))
}

/// POST /api/onboarding/auto-message
async fn save_auto_message(
    State(state): State<OnboardingRouteState>,
    req: StepRequest,
) -> ApiResult {
    let payload = OnboardingStep::AutoMessage.validate(&req.data)?;
    require_session(state.db.as_ref(), req.session_id).await?;
    store_step(state.db.as_ref(), req.session_id, &payload).await?;
    Ok(Json(json!({"success": true})))
}

fn checkout_url(
    base: &str,
    session_id: Uuid,
    plan: &PlanSelectionStepData,
) -> Result<String, ApiError> {
    let quote = plan.quote();
    let session = session_id.to_string();
    let total = quote.total.to_string();
    let url = reqwest::Url::parse_with_params(
        base,
        &[
            ("plan", plan.plan_type.as_str()),
            ("cycle", plan.billing_cycle.as_str()),
            ("variant", plan.price_variant.as_str()),
            ("total", total.as_str()),
            ("session", session.as_str()),
        ],
    )
    .map_err(|e| ApiError::Internal(format!("invalid checkout URL: {e}")))?;
    Ok(url.to_string())
}

/// POST /api/onboarding/plan-selection
async fn save_plan_selection(
    State(state): State<OnboardingRouteState>,
    req: StepRequest,
) -> ApiResult {
    let payload = OnboardingStep::PlanSelection.validate(&req.data)?;
    let StepPayload::PlanSelection(plan) = &payload else {
        return Err(ApiError::Internal("unexpected payload".to_string()));
    };
    require_session(state.db.as_ref(), req.session_id).await?;
    store_step(state.db.as_ref(), req.session_id, &payload).await?;

    let url = checkout_url(&state.checkout_url, req.session_id, plan)?;
    Ok(Json(json!({
        "success": true,
        "checkoutUrl": url,
        "quote": plan.quote(),
    })))
}

/// POST /api/onboarding/registration
///
/// Creates the account and completes the session. Credentials are never
/// stored.
async fn complete_registration(
    State(state): State<OnboardingRouteState>,
    req: StepRequest,
) -> ApiResult {
    let payload = OnboardingStep::Registration.validate(&req.data)?;
    let StepPayload::Registration(registration) = &payload else {
        return Err(ApiError::Internal("unexpected payload".to_string()));
    };
    require_session(state.db.as_ref(), req.session_id).await?;

    let user_id = Uuid::new_v4().to_string();
    let record = serde_json::to_value(registration.record(Some(user_id.clone())))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    state
        .db
        .upsert_onboarding_step(req.session_id, OnboardingStep::Registration.key(), &record)
        .await?;
    state
        .db
        .complete_onboarding_session(req.session_id, &user_id)
        .await?;

    tracing::info!(session_id = %req.session_id, %user_id, "Onboarding registration complete");
    Ok(Json(json!({"success": true, "userId": user_id})))
}

// ── Session lookup ──────────────────────────────────────────────────

/// GET /api/onboarding/session/{id}
async fn get_session(
    State(state): State<OnboardingRouteState>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    match state.db.get_onboarding_session(session_id).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(ApiError::NotFound(format!(
            "Onboarding session {session_id} not found"
        ))),
    }
}

/// DELETE /api/onboarding/session/{id}
async fn delete_session(
    State(state): State<OnboardingRouteState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult {
    if state.db.delete_onboarding_session(session_id).await? {
        tracing::info!(%session_id, "Deleted onboarding session");
        Ok(Json(json!({"success": true})))
    } else {
        Err(ApiError::NotFound(format!(
            "Onboarding session {session_id} not found"
        )))
    }
}

// ── Stateless helpers ───────────────────────────────────────────────

/// GET /api/onboarding/recommendation?employeeCount=&expectedVolume=
async fn recommendation(Query(params): Query<HashMap<String, String>>) -> ApiResult {
    let obj: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    let mut checker = Checker::new();
    let employees = checker.check(
        "employeeCount",
        validation::required_int(&obj, "employeeCount", "Employee count").and_then(|n| {
            if n < 1 {
                return Err("Employee count must be at least 1".to_string());
            }
            u32::try_from(n).map_err(|_| "Employee count is too high".to_string())
        }),
    );
    let volume = checker.check(
        "expectedVolume",
        validation::required_enum::<ExpectedVolume>(&obj, "expectedVolume", "Expected volume"),
    );

    let (Some(employees), Some(volume)) = (employees, volume) else {
        return Err(checker.into_errors().into());
    };
    let plan = get_recommended_plan(employees, volume);
    Ok(Json(json!({
        "recommendedPlan": plan,
        "businessSize": get_business_size_category(employees),
        "monthlyPrice": plan.base_monthly_price(),
    })))
}

/// POST /api/business-info/validate
async fn validate_business_info(JsonBody(body): JsonBody<Value>) -> ApiResult {
    let info = BusinessInfo::from_json(&body)?;
    Ok(Json(json!({"valid": true, "businessInfo": info})))
}

/// POST /api/whatsapp/config/validate
///
/// Echoes a summary with the access token masked.
async fn validate_whatsapp_config(JsonBody(body): JsonBody<Value>) -> ApiResult {
    let config = WhatsAppIntegrationConfig::from_json(&body)?;
    Ok(Json(json!({"valid": true, "config": config.summary()})))
}

/// POST /api/bot/config/validate
async fn validate_bot_config(JsonBody(body): JsonBody<Value>) -> ApiResult {
    let config = BotConfig::from_json(&body)?;
    Ok(Json(json!({"valid": true, "config": config})))
}

/// POST /api/phone/verify
///
/// Checks the number and code format. Delivery of the code is handled
/// outside this service.
async fn verify_phone(JsonBody(body): JsonBody<Value>) -> ApiResult {
    let obj = validation::as_object(&body)?;
    let text = |key: &str| obj.get(key).and_then(Value::as_str).unwrap_or_default();

    let phone = PhoneNumber::parse(text("countryCode"), text("phoneNumber"))?;
    let code = VerificationCode::parse(text("code"))?;
    tracing::debug!(phone = %phone.e164(), code_len = code.as_str().len(), "Phone verification accepted");
    Ok(Json(json!({"verified": true, "phoneNumber": phone.e164()})))
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/onboarding/business-info", post(save_business_info))
        .route("/api/onboarding/phone-number", post(save_phone_number))
        .route("/api/onboarding/auto-message", post(save_auto_message))
        .route("/api/onboarding/plan-selection", post(save_plan_selection))
        .route("/api/onboarding/registration", post(complete_registration))
        .route(
            "/api/onboarding/session/{id}",
            get(get_session).delete(delete_session),
        )
        .route("/api/onboarding/recommendation", get(recommendation))
        .route("/api/business-info/validate", post(validate_business_info))
        .route("/api/whatsapp/config/validate", post(validate_whatsapp_config))
        .route("/api/bot/config/validate", post(validate_bot_config))
        .route("/api/phone/verify", post(verify_phone))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    async fn app() -> (Router, Arc<dyn Database>) {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let router = onboarding_routes(OnboardingRouteState {
            db: Arc::clone(&db),
            checkout_url: "https://billing.example.com/checkout".to_string(),
        });
        (router, db)
    }

    async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn business(session_id: Uuid) -> Value {
        json!({
            "sessionId": session_id,
            "data": {
                "businessName": "Taquería El Sol",
                "sector": "hospitality",
                "employeeCount": "4",
                "monthlyClients": 300
            }
        })
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _) = app().await;
        let (status, body) = call(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn business_info_opens_session() {
        let (router, db) = app().await;
        let id = Uuid::new_v4();
        let (status, body) =
            call(&router, Method::POST, "/api/onboarding/business-info", Some(business(id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["sessionId"], id.to_string());

        let record = db.get_onboarding_session(id).await.unwrap().unwrap();
        assert_eq!(record.steps["businessInfo"]["employeeCount"], 4);
    }

    #[tokio::test]
    async fn invalid_step_data_is_422() {
        let (router, _) = app().await;
        let req = json!({
            "sessionId": Uuid::new_v4(),
            "data": {"businessName": "", "sector": "mining", "employeeCount": 0, "monthlyClients": 10}
        });
        let (status, body) =
            call(&router, Method::POST, "/api/onboarding/business-info", Some(req)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        let fields: Vec<&str> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"businessName"));
        assert!(fields.contains(&"sector"));
        assert!(fields.contains(&"employeeCount"));
    }

    #[tokio::test]
    async fn later_steps_require_existing_session() {
        let (router, _) = app().await;
        let req = json!({
            "sessionId": Uuid::new_v4(),
            "data": {"phoneNumber": "55 1234 5678", "countryCode": "+52", "isWhatsAppBusiness": false}
        });
        let (status, _) =
            call(&router, Method::POST, "/api/onboarding/phone-number", Some(req)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn full_session_lifecycle() {
        let (router, db) = app().await;
        let id = Uuid::new_v4();
        call(&router, Method::POST, "/api/onboarding/business-info", Some(business(id))).await;

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/onboarding/phone-number",
            Some(json!({
                "sessionId": id,
                "data": {"phoneNumber": "55 1234 5678", "countryCode": "+52", "isWhatsAppBusiness": true}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verified"], true);

        let (status, _) = call(
            &router,
            Method::POST,
            "/api/onboarding/auto-message",
            Some(json!({
                "sessionId": id,
                "data": {"welcomeMessage": "¡Hola! Gracias por escribirnos.", "responseTime": "immediate", "enableKeywords": false}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/onboarding/plan-selection",
            Some(json!({
                "sessionId": id,
                "data": {"planType": "starter", "billingCycle": "monthly", "priceVariant": "control"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let url = body["checkoutUrl"].as_str().unwrap();
        assert!(url.starts_with("https://billing.example.com/checkout?plan=starter"));
        assert!(url.contains(&format!("session={id}")));

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/onboarding/registration",
            Some(json!({
                "sessionId": id,
                "data": {"email": "Owner@ElSol.test", "authMethod": {"type": "email_password", "password": "correct horse 1"}}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let user_id = body["userId"].as_str().unwrap().to_string();

        let (status, body) = call(
            &router,
            Method::GET,
            &format!("/api/onboarding/session/{id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], user_id);
        assert!(body["completedAt"].is_string());
        assert_eq!(body["steps"]["registration"]["email"], "owner@elsol.test");
        assert!(!body.to_string().contains("correct horse"));

        let (status, _) = call(
            &router,
            Method::DELETE,
            &format!("/api/onboarding/session/{id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(db.get_onboarding_session(id).await.unwrap().is_none());

        let (status, _) = call(
            &router,
            Method::DELETE,
            &format!("/api/onboarding/session/{id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn recommendation_endpoint() {
        let (router, _) = app().await;
        let (status, body) = call(
            &router,
            Method::GET,
            "/api/onboarding/recommendation?employeeCount=25&expectedVolume=medium",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendedPlan"], "growth");
        assert_eq!(body["businessSize"], "small");

        let (status, body) = call(
            &router,
            Method::GET,
            "/api/onboarding/recommendation?employeeCount=0&expectedVolume=huge",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn oversized_employee_count_is_too_high() {
        let (router, _) = app().await;
        let (status, body) = call(
            &router,
            Method::GET,
            "/api/onboarding/recommendation?employeeCount=5000000000&expectedVolume=low",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"][0]["field"], "employeeCount");
        assert_eq!(body["fields"][0]["message"], "Employee count is too high");
    }

    #[tokio::test]
    async fn malformed_step_envelope_uses_validation_shape() {
        let (router, _) = app().await;
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/onboarding/business-info",
            Some(json!({"sessionId": "not-a-uuid"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        let fields: Vec<&str> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f["field"].as_str())
            .collect();
        assert_eq!(fields, vec!["sessionId", "data"]);
    }

    #[tokio::test]
    async fn unreadable_body_uses_validation_shape() {
        let (router, _) = app().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/onboarding/phone-number")
            .header("content-type", "application/json")
            .body(Body::from("{\"sessionId\": "))
            .unwrap();
        let resp = router.clone().oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["fields"][0]["field"], "body");

        // Missing content type on a stateless validator.
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/bot/config/validate")
            .body(Body::from("{}"))
            .unwrap();
        let resp = router.clone().oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn phone_verify_checks_code_format() {
        let (router, _) = app().await;
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/phone/verify",
            Some(json!({"countryCode": "+1", "phoneNumber": "(415) 555-0100", "code": "123456"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phoneNumber"], "+14155550100");

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/phone/verify",
            Some(json!({"countryCode": "+1", "phoneNumber": "(415) 555-0100", "code": "12a"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"][0]["field"], "code");
    }

    #[tokio::test]
    async fn whatsapp_config_validation_masks_token() {
        let (router, _) = app().await;
        let token = format!("EAAG{}", "z".repeat(60));
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/whatsapp/config/validate",
            Some(json!({
                "businessAccountId": "102938475610",
                "phoneNumberId": "109876543210",
                "appId": "1234567890",
                "accessToken": token,
                "webhookUrl": "https://hooks.example.com/whatsapp",
                "verifyToken": "s3cret-verify"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.to_string().contains(&token));

        let (status, _) = call(
            &router,
            Method::POST,
            "/api/whatsapp/config/validate",
            Some(json!({"webhookUrl": "http://insecure.example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn business_info_validation_normalizes() {
        let (router, _) = app().await;
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/business-info/validate",
            Some(json!({
                "companyName": "  Acme  ",
                "businessType": "sme",
                "industry": "retail",
                "employeeCount": 12,
                "website": "example.com",
                "expectedVolume": "low"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["businessInfo"]["companyName"], "Acme");
        assert_eq!(body["businessInfo"]["website"], "https://example.com");
    }
}
