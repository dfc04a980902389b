//! Business profile value object.

use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{self, Checker, ValidationErrors};

/// Smallest accepted employee count.
pub const MIN_EMPLOYEES: i64 = 1;

/// Largest accepted employee count.
pub const MAX_EMPLOYEES: i64 = 1_000_000;

const COMPANY_NAME_MIN: usize = 2;
const COMPANY_NAME_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;

/// Legal shape of the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusinessType {
    Startup,
    Sme,
    Enterprise,
    Agency,
    NonProfit,
    Other,
}

impl BusinessType {
    pub const ALL: [BusinessType; 6] = [
        Self::Startup,
        Self::Sme,
        Self::Enterprise,
        Self::Agency,
        Self::NonProfit,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Sme => "sme",
            Self::Enterprise => "enterprise",
            Self::Agency => "agency",
            Self::NonProfit => "non-profit",
            Self::Other => "other",
        }
    }
}

impl FromStr for BusinessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown business type '{s}'"))
    }
}

impl fmt::Display for BusinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Industry the business operates in. Also used as the onboarding "sector".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Industry {
    Technology,
    Retail,
    Healthcare,
    Education,
    Finance,
    Hospitality,
    RealEstate,
    Manufacturing,
    ProfessionalServices,
    Media,
    Other,
}

impl Industry {
    pub const ALL: [Industry; 11] = [
        Self::Technology,
        Self::Retail,
        Self::Healthcare,
        Self::Education,
        Self::Finance,
        Self::Hospitality,
        Self::RealEstate,
        Self::Manufacturing,
        Self::ProfessionalServices,
        Self::Media,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Technology => "technology",
            Self::Retail => "retail",
            Self::Healthcare => "healthcare",
            Self::Education => "education",
            Self::Finance => "finance",
            Self::Hospitality => "hospitality",
            Self::RealEstate => "real-estate",
            Self::Manufacturing => "manufacturing",
            Self::ProfessionalServices => "professional-services",
            Self::Media => "media",
            Self::Other => "other",
        }
    }
}

impl FromStr for Industry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown industry '{s}'"))
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected monthly conversation volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedVolume {
    Low,
    Medium,
    High,
}

impl ExpectedVolume {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Estimate the volume band from the number of clients served per month.
    pub fn from_monthly_clients(clients: u32) -> Self {
        match clients {
            0..500 => Self::Low,
            500..5_000 => Self::Medium,
            _ => Self::High,
        }
    }
}

impl FromStr for ExpectedVolume {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("Unknown expected volume '{other}'")),
        }
    }
}

impl fmt::Display for ExpectedVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed input for [`create_business_info`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfoInput {
    pub company_name: String,
    pub business_type: BusinessType,
    pub industry: Industry,
    pub employee_count: i64,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub expected_volume: ExpectedVolume,
}

/// A validated, normalized business profile. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    company_name: String,
    business_type: BusinessType,
    industry: Industry,
    employee_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    expected_volume: ExpectedVolume,
}

impl BusinessInfo {
    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn business_type(&self) -> BusinessType {
        self.business_type
    }

    pub fn industry(&self) -> Industry {
        self.industry
    }

    pub fn employee_count(&self) -> u32 {
        self.employee_count
    }

    pub fn website(&self) -> Option<&str> {
        self.website.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn expected_volume(&self) -> ExpectedVolume {
        self.expected_volume
    }

    /// Validate raw JSON (camelCase keys) into a business profile.
    pub fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let obj = validation::as_object(value)?;
        let mut checker = Checker::new();

        let company_name = checker.check(
            "companyName",
            validation::optional_str(obj, "companyName")
                .and_then(|name| check_company_name(name.as_deref().unwrap_or(""))),
        );
        let business_type = checker.check(
            "businessType",
            validation::required_enum::<BusinessType>(obj, "businessType", "Business type"),
        );
        let industry = checker.check(
            "industry",
            validation::required_enum::<Industry>(obj, "industry", "Industry"),
        );
        let employee_count = checker.check(
            "employeeCount",
            validation::required_int(obj, "employeeCount", "Employee count")
                .and_then(check_employee_count),
        );
        let website = checker.check(
            "website",
            validation::optional_str(obj, "website").and_then(|w| check_website(w.as_deref())),
        );
        let description = checker.check(
            "description",
            validation::optional_str(obj, "description")
                .and_then(|d| check_description(d.as_deref())),
        );
        let expected_volume = checker.check(
            "expectedVolume",
            validation::required_enum::<ExpectedVolume>(obj, "expectedVolume", "Expected volume"),
        );

        match (
            company_name,
            business_type,
            industry,
            employee_count,
            website,
            description,
            expected_volume,
        ) {
            (
                Some(company_name),
                Some(business_type),
                Some(industry),
                Some(employee_count),
                Some(website),
                Some(description),
                Some(expected_volume),
            ) if checker.is_clean() => Ok(Self {
                company_name,
                business_type,
                industry,
                employee_count,
                website,
                description,
                expected_volume,
            }),
            _ => Err(checker.into_errors()),
        }
    }
}

/// Build a [`BusinessInfo`], reporting every violated constraint at once.
pub fn create_business_info(input: BusinessInfoInput) -> Result<BusinessInfo, ValidationErrors> {
    let mut checker = Checker::new();

    let company_name = checker.check("companyName", check_company_name(&input.company_name));
    let employee_count = checker.check("employeeCount", check_employee_count(input.employee_count));
    let website = checker.check(
        "website",
        check_website(input.website.as_deref().map(str::trim).filter(|w| !w.is_empty())),
    );
    let description = checker.check("description", check_description(input.description.as_deref()));

    match (company_name, employee_count, website, description) {
        (Some(company_name), Some(employee_count), Some(website), Some(description))
            if checker.is_clean() =>
        {
            Ok(BusinessInfo {
                company_name,
                business_type: input.business_type,
                industry: input.industry,
                employee_count,
                website,
                description,
                expected_volume: input.expected_volume,
            })
        }
        _ => Err(checker.into_errors()),
    }
}

/// Prefix a scheme onto bare domains.
///
/// Empty or whitespace-only input yields an empty string; input that already
/// starts with `http://` or `https://` is returned trimmed.
pub fn format_website_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

pub(crate) fn check_company_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("Company name is required".to_string());
    }
    validation::check_length(name, COMPANY_NAME_MIN, COMPANY_NAME_MAX, "Company name")?;
    Ok(name.to_string())
}

pub(crate) fn check_employee_count(count: i64) -> Result<u32, String> {
    if count < MIN_EMPLOYEES {
        return Err("Employee count must be at least 1".to_string());
    }
    if count > MAX_EMPLOYEES {
        return Err("Employee count seems too high".to_string());
    }
    u32::try_from(count).map_err(|_| "Employee count seems too high".to_string())
}

fn check_website(raw: Option<&str>) -> Result<Option<String>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let formatted = format_website_url(raw);
    if formatted.is_empty() {
        return Ok(None);
    }
    let url = Url::parse(&formatted).map_err(|_| "Please enter a valid website URL".to_string())?;
    let has_domain = url.host_str().is_some_and(|h| h.contains('.'));
    if !matches!(url.scheme(), "http" | "https") || !has_domain {
        return Err("Please enter a valid website URL".to_string());
    }
    Ok(Some(formatted))
}

fn check_description(raw: Option<&str>) -> Result<Option<String>, String> {
    let Some(description) = raw.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if description.chars().count() > DESCRIPTION_MAX {
        return Err(format!(
            "Description must be at most {DESCRIPTION_MAX} characters"
        ));
    }
    Ok(Some(description.to_string()))
}
