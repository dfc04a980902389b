//! Typed step payloads and their validators.
//!
//! Each validator reads the raw JSON a client submitted for one step and
//! either returns the normalized payload or one error per invalid field.
//! Validators are independent; none of them looks at another step's data.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::step::OnboardingStep;
use crate::domain::business::{self, ExpectedVolume, Industry};
use crate::domain::phone::PhoneNumber;
use crate::domain::plan::{self, AddOn, BillingCycle, PlanTier, PriceVariant};
use crate::validation::{self, Checker, ValidationErrors};

const MAX_MONTHLY_CLIENTS: i64 = 10_000_000;
const WELCOME_MIN: usize = 10;
const WELCOME_MAX: usize = 1000;
const MAX_KEYWORDS: usize = 20;
const KEYWORD_MAX: usize = 50;
const EMAIL_MAX: usize = 254;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

// ── Step 1: business info ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessStepData {
    pub business_name: String,
    pub sector: Industry,
    pub employee_count: u32,
    pub monthly_clients: u32,
}

impl BusinessStepData {
    pub fn from_json(raw: &Value) -> Result<Self, ValidationErrors> {
        let obj = validation::as_object(raw)?;
        let mut checker = Checker::new();

        let business_name = checker.check(
            "businessName",
            validation::optional_str(obj, "businessName")
                .and_then(|n| business::check_company_name(n.as_deref().unwrap_or("")))
                .map_err(|msg| msg.replace("Company name", "Business name")),
        );
        let sector = checker.check(
            "sector",
            validation::required_enum::<Industry>(obj, "sector", "Sector"),
        );
        let employee_count = checker.check(
            "employeeCount",
            validation::required_int(obj, "employeeCount", "Employee count")
                .and_then(business::check_employee_count),
        );
        let monthly_clients = checker.check(
            "monthlyClients",
            validation::required_int(obj, "monthlyClients", "Monthly clients")
                .and_then(check_monthly_clients),
        );

        match (business_name, sector, employee_count, monthly_clients) {
            (Some(business_name), Some(sector), Some(employee_count), Some(monthly_clients)) => {
                Ok(Self {
                    business_name,
                    sector,
                    employee_count,
                    monthly_clients,
                })
            }
            _ => Err(checker.into_errors()),
        }
    }

    pub fn expected_volume(&self) -> ExpectedVolume {
        ExpectedVolume::from_monthly_clients(self.monthly_clients)
    }

    pub fn recommended_plan(&self) -> PlanTier {
        plan::get_recommended_plan(self.employee_count, self.expected_volume())
    }
}

fn check_monthly_clients(n: i64) -> Result<u32, String> {
    if n < 0 {
        Err("Monthly clients cannot be negative".to_string())
    } else if n > MAX_MONTHLY_CLIENTS {
        Err("Monthly clients seems too high".to_string())
    } else {
        Ok(n as u32)
    }
}

// ── Step 2: phone connect ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneStepData {
    /// National number, digits only.
    pub phone_number: String,
    /// Country code including the leading `+`.
    pub country_code: String,
    #[serde(rename = "isWhatsAppBusiness")]
    pub is_whatsapp_business: bool,
}

impl PhoneStepData {
    pub fn from_json(raw: &Value) -> Result<Self, ValidationErrors> {
        let obj = validation::as_object(raw)?;
        let mut checker = Checker::new();

        let is_whatsapp_business = checker.check(
            "isWhatsAppBusiness",
            validation::optional_bool(obj, "isWhatsAppBusiness", "WhatsApp Business flag")
                .map(Option::unwrap_or_default),
        );
        let country_code = checker.check(
            "countryCode",
            validation::optional_str(obj, "countryCode").map(Option::unwrap_or_default),
        );
        let number = checker.check(
            "phoneNumber",
            validation::optional_str(obj, "phoneNumber").map(Option::unwrap_or_default),
        );

        let (Some(country_code), Some(number), Some(is_whatsapp_business)) =
            (country_code, number, is_whatsapp_business)
        else {
            return Err(checker.into_errors());
        };

        match PhoneNumber::parse(&country_code, &number) {
            Ok(phone) if checker.is_clean() => Ok(Self {
                phone_number: phone.national_number().to_string(),
                country_code: phone.country_code(),
                is_whatsapp_business,
            }),
            Ok(_) => Err(checker.into_errors()),
            Err(errors) => {
                for e in errors.errors() {
                    checker.push(&e.field, e.message.clone());
                }
                Err(checker.into_errors())
            }
        }
    }

    pub fn e164(&self) -> String {
        format!("{}{}", self.country_code, self.phone_number)
    }
}

// ── Step 3: auto message ────────────────────────────────────────────

/// Promised reply time shown to customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseTime {
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "24hours")]
    OneDay,
}

impl ResponseTime {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::FiveMinutes => "5min",
            Self::OneHour => "1hour",
            Self::OneDay => "24hours",
        }
    }
}

impl FromStr for ResponseTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "immediate" => Ok(Self::Immediate),
            "5min" => Ok(Self::FiveMinutes),
            "1hour" => Ok(Self::OneHour),
            "24hours" => Ok(Self::OneDay),
            other => Err(format!("Unknown response time '{other}'")),
        }
    }
}

impl fmt::Display for ResponseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoMessageStepData {
    pub welcome_message: String,
    pub response_time: ResponseTime,
    pub enable_keywords: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl AutoMessageStepData {
    pub fn from_json(raw: &Value) -> Result<Self, ValidationErrors> {
        let obj = validation::as_object(raw)?;
        let mut checker = Checker::new();

        let welcome_message = checker.check(
            "welcomeMessage",
            validation::required_str(obj, "welcomeMessage", "Welcome message").and_then(|m| {
                validation::check_length(&m, WELCOME_MIN, WELCOME_MAX, "Welcome message")
                    .map(|()| m)
            }),
        );
        let response_time = checker.check(
            "responseTime",
            validation::required_enum::<ResponseTime>(obj, "responseTime", "Response time"),
        );
        let enable_keywords = checker.check(
            "enableKeywords",
            validation::optional_bool(obj, "enableKeywords", "Keyword replies flag")
                .map(Option::unwrap_or_default),
        );
        let keywords = match enable_keywords {
            Some(true) => checker.check("keywords", read_keywords(obj)).map(Some),
            _ => Some(None),
        };

        match (welcome_message, response_time, enable_keywords, keywords) {
            (Some(welcome_message), Some(response_time), Some(enable_keywords), Some(keywords)) => {
                Ok(Self {
                    welcome_message,
                    response_time,
                    enable_keywords,
                    keywords,
                })
            }
            _ => Err(checker.into_errors()),
        }
    }
}

fn read_keywords(obj: &Map<String, Value>) -> Result<Vec<String>, String> {
    let items = match obj.get("keywords") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        // Comma-separated text is accepted as well.
        Some(Value::String(s)) => s.split(',').map(|k| Value::String(k.to_string())).collect(),
        Some(_) => return Err("Keywords must be a list".to_string()),
    };

    let mut seen = BTreeSet::new();
    let mut keywords = Vec::new();
    for item in items {
        let Some(text) = item.as_str() else {
            return Err("Keywords must be text".to_string());
        };
        let keyword = text.trim();
        if keyword.is_empty() {
            continue;
        }
        if keyword.chars().count() > KEYWORD_MAX {
            return Err(format!("Each keyword must be at most {KEYWORD_MAX} characters"));
        }
        if seen.insert(keyword.to_lowercase()) {
            keywords.push(keyword.to_string());
        }
    }

    if keywords.is_empty() {
        return Err("Add at least one keyword or disable keyword replies".to_string());
    }
    if keywords.len() > MAX_KEYWORDS {
        return Err(format!("At most {MAX_KEYWORDS} keywords are allowed"));
    }
    Ok(keywords)
}

// ── Step 4: plan selection ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSelectionStepData {
    pub plan_type: PlanTier,
    pub billing_cycle: BillingCycle,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_ons: Vec<AddOn>,
    pub price_variant: PriceVariant,
}

impl PlanSelectionStepData {
    pub fn from_json(raw: &Value) -> Result<Self, ValidationErrors> {
        let obj = validation::as_object(raw)?;
        let mut checker = Checker::new();

        let plan_type = checker.check(
            "planType",
            validation::required_enum::<PlanTier>(obj, "planType", "Plan"),
        );
        let billing_cycle = checker.check(
            "billingCycle",
            validation::required_enum::<BillingCycle>(obj, "billingCycle", "Billing cycle"),
        );
        let add_ons = checker.check("addOns", read_add_ons(obj.get("addOns")));
        let price_variant = checker.check(
            "priceVariant",
            validation::required_enum::<PriceVariant>(obj, "priceVariant", "Price variant"),
        );

        match (plan_type, billing_cycle, add_ons, price_variant) {
            (Some(plan_type), Some(billing_cycle), Some(add_ons), Some(price_variant)) => Ok(Self {
                plan_type,
                billing_cycle,
                add_ons,
                price_variant,
            }),
            _ => Err(checker.into_errors()),
        }
    }

    pub fn quote(&self) -> plan::Quote {
        plan::quote(
            self.plan_type,
            self.billing_cycle,
            &self.add_ons,
            self.price_variant,
        )
    }
}

fn read_add_ons(value: Option<&Value>) -> Result<Vec<AddOn>, String> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err("Add-ons must be a list".to_string()),
    };
    let mut add_ons = BTreeSet::new();
    for item in items {
        let name = item
            .as_str()
            .ok_or_else(|| "Add-ons must be text".to_string())?;
        add_ons.insert(name.parse::<AddOn>()?);
    }
    Ok(add_ons.into_iter().collect())
}

// ── Step 5: registration ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Facebook,
    Microsoft,
}

impl FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "google" => Ok(Self::Google),
            "facebook" => Ok(Self::Facebook),
            "microsoft" => Ok(Self::Microsoft),
            other => Err(format!("Unsupported sign-in provider '{other}'")),
        }
    }
}

/// How the account authenticates. Credentials stay secret in memory and
/// never reach the stored session.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    EmailPassword { password: SecretString },
    OAuth { provider: OAuthProvider, token: SecretString },
}

#[derive(Debug, Clone)]
pub struct RegistrationStepData {
    pub email: String,
    pub auth_method: AuthMethod,
}

/// Registration as kept in the session: no credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    pub email: String,
    pub auth_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<OAuthProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl RegistrationStepData {
    pub fn from_json(raw: &Value) -> Result<Self, ValidationErrors> {
        let obj = validation::as_object(raw)?;
        let mut checker = Checker::new();

        let email = checker.check("email", check_email(obj));
        let auth_method = match obj.get("authMethod") {
            Some(Value::Object(auth)) => read_auth_method(auth, &mut checker),
            _ => {
                checker.push("authMethod", "Sign-in method is required");
                None
            }
        };

        match (email, auth_method) {
            (Some(email), Some(auth_method)) if checker.is_clean() => Ok(Self { email, auth_method }),
            _ => Err(checker.into_errors()),
        }
    }

    /// JSON sent to the registration endpoint. Exposes the credential.
    pub fn to_wire(&self) -> Value {
        let auth = match &self.auth_method {
            AuthMethod::EmailPassword { password } => json!({
                "type": "email_password",
                "password": password.expose_secret(),
            }),
            AuthMethod::OAuth { provider, token } => json!({
                "type": "oauth",
                "provider": provider,
                "token": token.expose_secret(),
            }),
        };
        json!({ "email": self.email, "authMethod": auth })
    }

    pub fn record(&self, user_id: Option<String>) -> RegistrationRecord {
        let (auth_method, provider) = match &self.auth_method {
            AuthMethod::EmailPassword { .. } => ("email_password", None),
            AuthMethod::OAuth { provider, .. } => ("oauth", Some(*provider)),
        };
        RegistrationRecord {
            email: self.email.clone(),
            auth_method: auth_method.to_string(),
            provider,
            user_id,
        }
    }
}

fn check_email(obj: &Map<String, Value>) -> Result<String, String> {
    let email = validation::required_str(obj, "email", "Email")?.to_lowercase();
    if email.len() > EMAIL_MAX || !EMAIL_RE.is_match(&email) {
        return Err("Please enter a valid email address".to_string());
    }
    Ok(email)
}

fn read_auth_method(auth: &Map<String, Value>, checker: &mut Checker) -> Option<AuthMethod> {
    let kind = checker.check(
        "authMethod.type",
        validation::required_str(auth, "type", "Sign-in method"),
    )?;
    match kind.as_str() {
        "email_password" => {
            let password = match auth.get("password") {
                Some(Value::String(p)) => p.clone(),
                _ => String::new(),
            };
            checker
                .check("authMethod.password", check_password(&password))
                .map(|()| AuthMethod::EmailPassword {
                    password: SecretString::from(password),
                })
        }
        "oauth" => {
            let provider = checker.check(
                "authMethod.provider",
                validation::required_enum::<OAuthProvider>(auth, "provider", "Sign-in provider"),
            );
            let token = checker.check(
                "authMethod.token",
                validation::required_str(auth, "token", "Sign-in token"),
            );
            Some(AuthMethod::OAuth {
                provider: provider?,
                token: SecretString::from(token?),
            })
        }
        other => {
            checker.push("authMethod.type", format!("Unknown sign-in method '{other}'"));
            None
        }
    }
}

fn check_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    let len = password.chars().count();
    if len < PASSWORD_MIN {
        return Err(format!("Password must be at least {PASSWORD_MIN} characters"));
    }
    if len > PASSWORD_MAX {
        return Err(format!("Password must be at most {PASSWORD_MAX} characters"));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err("Password must contain a letter and a number".to_string());
    }
    Ok(())
}

// ── Tagged union over all steps ─────────────────────────────────────

/// A validated submission for one step.
#[derive(Debug, Clone)]
pub enum StepPayload {
    BusinessInfo(BusinessStepData),
    PhoneNumber(PhoneStepData),
    AutoMessage(AutoMessageStepData),
    PlanSelection(PlanSelectionStepData),
    Registration(RegistrationStepData),
}

impl StepPayload {
    /// The step this payload belongs to.
    pub fn step(&self) -> OnboardingStep {
        match self {
            Self::BusinessInfo(_) => OnboardingStep::BusinessInfo,
            Self::PhoneNumber(_) => OnboardingStep::PhoneConnect,
            Self::AutoMessage(_) => OnboardingStep::AutoMessage,
            Self::PlanSelection(_) => OnboardingStep::PlanSelection,
            Self::Registration(_) => OnboardingStep::Registration,
        }
    }

    /// JSON body sent to the remote session API.
    pub fn to_wire(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::BusinessInfo(d) => serde_json::to_value(d),
            Self::PhoneNumber(d) => serde_json::to_value(d),
            Self::AutoMessage(d) => serde_json::to_value(d),
            Self::PlanSelection(d) => serde_json::to_value(d),
            Self::Registration(d) => Ok(d.to_wire()),
        }
    }
}

pub(crate) fn validate_business_info(raw: &Value) -> Result<StepPayload, ValidationErrors> {
    BusinessStepData::from_json(raw).map(StepPayload::BusinessInfo)
}

pub(crate) fn validate_phone_number(raw: &Value) -> Result<StepPayload, ValidationErrors> {
    PhoneStepData::from_json(raw).map(StepPayload::PhoneNumber)
}

pub(crate) fn validate_auto_message(raw: &Value) -> Result<StepPayload, ValidationErrors> {
    AutoMessageStepData::from_json(raw).map(StepPayload::AutoMessage)
}

pub(crate) fn validate_plan_selection(raw: &Value) -> Result<StepPayload, ValidationErrors> {
    PlanSelectionStepData::from_json(raw).map(StepPayload::PlanSelection)
}

pub(crate) fn validate_registration(raw: &Value) -> Result<StepPayload, ValidationErrors> {
    RegistrationStepData::from_json(raw).map(StepPayload::Registration)
}
