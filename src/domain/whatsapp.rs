//! WhatsApp Business API integration settings.
//!
//! Every field is its own newtype so ids cannot be swapped by accident. The
//! access and verify tokens are held as [`SecretString`] and never appear in
//! `Debug` output or serialized summaries.

use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{self, Checker, ValidationErrors};

const ACCESS_TOKEN_MIN: usize = 50;
const VERIFY_TOKEN_MIN: usize = 8;
const META_ID_MAX_DIGITS: usize = 32;

fn parse_meta_id(raw: &str, label: &str) -> Result<String, String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(format!("{label} is required"));
    }
    if id.len() > META_ID_MAX_DIGITS || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("{label} must be a numeric id"));
    }
    Ok(id.to_string())
}

macro_rules! meta_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: &str) -> Result<Self, String> {
                parse_meta_id(raw, $label).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

meta_id!(
    /// WhatsApp Business Account id.
    BusinessAccountId,
    "Business account ID"
);
meta_id!(
    /// Id of the phone number registered with the Cloud API.
    PhoneNumberId,
    "Phone number ID"
);
meta_id!(
    /// Meta app id.
    AppId,
    "App ID"
);

/// Long-lived Graph API access token.
#[derive(Debug, Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let token = raw.trim();
        if token.is_empty() {
            return Err("Access token is required".to_string());
        }
        if token.chars().count() < ACCESS_TOKEN_MIN {
            return Err(format!(
                "Access token must be at least {ACCESS_TOKEN_MIN} characters"
            ));
        }
        Ok(Self(SecretString::from(token.to_string())))
    }

    /// Last four characters, for display.
    pub fn masked(&self) -> String {
        let token = self.0.expose_secret();
        let tail: String = token
            .chars()
            .skip(token.chars().count().saturating_sub(4))
            .collect();
        format!("****{tail}")
    }
}

/// Public HTTPS endpoint that receives webhook deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WebhookUrl(String);

impl WebhookUrl {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("Webhook URL is required".to_string());
        }
        let url = Url::parse(trimmed).map_err(|_| "Webhook URL must be a valid URL".to_string())?;
        if url.scheme() != "https" {
            return Err("Webhook URL must use HTTPS".to_string());
        }
        if url.host_str().is_none() {
            return Err("Webhook URL must include a host".to_string());
        }
        Ok(Self(url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Shared secret echoed back by Meta during webhook verification.
#[derive(Debug, Clone)]
pub struct VerifyToken(SecretString);

impl VerifyToken {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let token = raw.trim();
        if token.chars().count() < VERIFY_TOKEN_MIN {
            return Err(format!(
                "Verify token must be at least {VERIFY_TOKEN_MIN} characters"
            ));
        }
        Ok(Self(SecretString::from(token.to_string())))
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.0.expose_secret() == candidate
    }
}

/// Raw, untrimmed integration settings as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhatsAppConfigInput {
    pub business_account_id: String,
    pub phone_number_id: String,
    pub app_id: String,
    pub access_token: String,
    pub webhook_url: String,
    pub verify_token: String,
}

/// Validated WhatsApp Cloud API integration settings.
#[derive(Debug, Clone)]
pub struct WhatsAppIntegrationConfig {
    pub business_account_id: BusinessAccountId,
    pub phone_number_id: PhoneNumberId,
    pub app_id: AppId,
    pub access_token: AccessToken,
    pub webhook_url: WebhookUrl,
    pub verify_token: VerifyToken,
}

/// Display-safe view of a config.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfigSummary {
    pub business_account_id: BusinessAccountId,
    pub phone_number_id: PhoneNumberId,
    pub app_id: AppId,
    pub access_token: String,
    pub webhook_url: WebhookUrl,
}

impl WhatsAppIntegrationConfig {
    pub fn create(input: &WhatsAppConfigInput) -> Result<Self, ValidationErrors> {
        let mut checker = Checker::new();
        let business_account_id = checker.check(
            "businessAccountId",
            BusinessAccountId::parse(&input.business_account_id),
        );
        let phone_number_id =
            checker.check("phoneNumberId", PhoneNumberId::parse(&input.phone_number_id));
        let app_id = checker.check("appId", AppId::parse(&input.app_id));
        let access_token = checker.check("accessToken", AccessToken::parse(&input.access_token));
        let webhook_url = checker.check("webhookUrl", WebhookUrl::parse(&input.webhook_url));
        let verify_token = checker.check("verifyToken", VerifyToken::parse(&input.verify_token));

        match (
            business_account_id,
            phone_number_id,
            app_id,
            access_token,
            webhook_url,
            verify_token,
        ) {
            (
                Some(business_account_id),
                Some(phone_number_id),
                Some(app_id),
                Some(access_token),
                Some(webhook_url),
                Some(verify_token),
            ) => Ok(Self {
                business_account_id,
                phone_number_id,
                app_id,
                access_token,
                webhook_url,
                verify_token,
            }),
            _ => Err(checker.into_errors()),
        }
    }

    /// Validate raw JSON. Non-string fields are reported like missing ones.
    pub fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let obj = validation::as_object(value)?;
        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self::create(&WhatsAppConfigInput {
            business_account_id: text("businessAccountId"),
            phone_number_id: text("phoneNumberId"),
            app_id: text("appId"),
            access_token: text("accessToken"),
            webhook_url: text("webhookUrl"),
            verify_token: text("verifyToken"),
        })
    }

    pub fn summary(&self) -> WhatsAppConfigSummary {
        WhatsAppConfigSummary {
            business_account_id: self.business_account_id.clone(),
            phone_number_id: self.phone_number_id.clone(),
            app_id: self.app_id.clone(),
            access_token: self.access_token.masked(),
            webhook_url: self.webhook_url.clone(),
        }
    }
}
