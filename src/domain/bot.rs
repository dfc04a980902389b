//! Bot behaviour configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{self, Checker, ValidationErrors};

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;
const WELCOME_MAX: usize = 1000;
const FALLBACK_MAX: usize = 500;
const MAX_RESPONSE_DELAY_SECS: i64 = 30;

/// Language the bot replies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotLanguage {
    Es,
    En,
    Pt,
    Fr,
}

impl BotLanguage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
            Self::Pt => "pt",
            Self::Fr => "fr",
        }
    }
}

impl FromStr for BotLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Self::Es),
            "en" => Ok(Self::En),
            "pt" => Ok(Self::Pt),
            "fr" => Ok(Self::Fr),
            other => Err(format!("Unsupported language '{other}'")),
        }
    }
}

impl fmt::Display for BotLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily window, in whole hours, during which the bot hands off to humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHours {
    pub open_hour: u8,
    pub close_hour: u8,
}

impl BusinessHours {
    pub fn new(open_hour: i64, close_hour: i64) -> Result<Self, String> {
        let in_range = |h: i64| (0..=23).contains(&h);
        if !in_range(open_hour) || !in_range(close_hour) {
            return Err("Business hours must be between 0 and 23".to_string());
        }
        if open_hour >= close_hour {
            return Err("Opening hour must be before closing hour".to_string());
        }
        Ok(Self {
            open_hour: open_hour as u8,
            close_hour: close_hour as u8,
        })
    }

    pub fn contains(&self, hour: u8) -> bool {
        (self.open_hour..self.close_hour).contains(&hour)
    }
}

/// Typed input for [`BotConfig::create`].
#[derive(Debug, Clone, Default)]
pub struct BotConfigInput {
    pub name: String,
    pub language: String,
    pub welcome_message: String,
    pub fallback_message: String,
    pub response_delay_secs: i64,
    pub business_hours: Option<(i64, i64)>,
}

/// Validated bot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    pub name: String,
    pub language: BotLanguage,
    pub welcome_message: String,
    pub fallback_message: String,
    pub response_delay_secs: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_hours: Option<BusinessHours>,
}

impl BotConfig {
    pub fn create(input: &BotConfigInput) -> Result<Self, ValidationErrors> {
        let mut checker = Checker::new();

        let name = checker.check("name", required_text(&input.name, NAME_MIN, NAME_MAX, "Bot name"));
        let language = checker.check("language", input.language.parse::<BotLanguage>());
        let welcome_message = checker.check(
            "welcomeMessage",
            required_text(&input.welcome_message, 1, WELCOME_MAX, "Welcome message"),
        );
        let fallback_message = checker.check(
            "fallbackMessage",
            required_text(&input.fallback_message, 1, FALLBACK_MAX, "Fallback message"),
        );
        let response_delay_secs = checker.check(
            "responseDelaySecs",
            check_delay(input.response_delay_secs),
        );
        let business_hours = checker.check(
            "businessHours",
            input
                .business_hours
                .map(|(open, close)| BusinessHours::new(open, close))
                .transpose(),
        );

        match (
            name,
            language,
            welcome_message,
            fallback_message,
            response_delay_secs,
            business_hours,
        ) {
            (
                Some(name),
                Some(language),
                Some(welcome_message),
                Some(fallback_message),
                Some(response_delay_secs),
                Some(business_hours),
            ) => Ok(Self {
                name,
                language,
                welcome_message,
                fallback_message,
                response_delay_secs,
                business_hours,
            }),
            _ => Err(checker.into_errors()),
        }
    }

    /// Validate raw JSON. `businessHours` is `{openHour, closeHour}`.
    pub fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let obj = validation::as_object(value)?;
        let mut checker = Checker::new();

        let text = |key: &str| validation::optional_str(obj, key).map(Option::unwrap_or_default);
        let name = checker.check("name", text("name"));
        let language = checker.check("language", text("language"));
        let welcome_message = checker.check("welcomeMessage", text("welcomeMessage"));
        let fallback_message = checker.check("fallbackMessage", text("fallbackMessage"));
        let delay = checker.check(
            "responseDelaySecs",
            validation::optional_int(obj, "responseDelaySecs", "Response delay")
                .map(Option::unwrap_or_default),
        );
        let hours = checker.check("businessHours", read_hours(obj.get("businessHours")));

        if !checker.is_clean() {
            return Err(checker.into_errors());
        }
        Self::create(&BotConfigInput {
            name: name.unwrap_or_default(),
            language: language.unwrap_or_default(),
            welcome_message: welcome_message.unwrap_or_default(),
            fallback_message: fallback_message.unwrap_or_default(),
            response_delay_secs: delay.unwrap_or_default(),
            business_hours: hours.flatten(),
        })
    }
}

fn required_text(raw: &str, min: usize, max: usize, label: &str) -> Result<String, String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(format!("{label} is required"));
    }
    validation::check_length(text, min, max, label)?;
    Ok(text.to_string())
}

fn check_delay(secs: i64) -> Result<u8, String> {
    if (0..=MAX_RESPONSE_DELAY_SECS).contains(&secs) {
        Ok(secs as u8)
    } else {
        Err(format!(
            "Response delay must be between 0 and {MAX_RESPONSE_DELAY_SECS} seconds"
        ))
    }
}

fn read_hours(value: Option<&Value>) -> Result<Option<(i64, i64)>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let obj = v
                .as_object()
                .ok_or_else(|| "Business hours must be an object".to_string())?;
            let open = validation::required_int(obj, "openHour", "Opening hour")?;
            let close = validation::required_int(obj, "closeHour", "Closing hour")?;
            Ok(Some((open, close)))
        }
    }
}
