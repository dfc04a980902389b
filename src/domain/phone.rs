//! Phone number and verification code validation.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validation::{Checker, ValidationErrors};

static COUNTRY_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?([1-9][0-9]{0,2})$").unwrap());

static SEPARATORS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-.()]").unwrap());

/// Shortest full number (country code + national number) we accept.
const E164_MIN_DIGITS: usize = 8;
/// E.164 caps numbers at 15 digits.
const E164_MAX_DIGITS: usize = 15;

/// A phone number split into country code and national digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    country_code: String,
    national_number: String,
}

impl PhoneNumber {
    /// Parse a country code (`"+52"`, `"52"`) and a national number that may
    /// contain spaces, dashes, dots or parentheses.
    pub fn parse(country_code: &str, number: &str) -> Result<Self, ValidationErrors> {
        let mut checker = Checker::new();
        let code = checker.check("countryCode", parse_country_code(country_code));
        let national = checker.check("phoneNumber", parse_national_number(number));

        match (code, national) {
            (Some(country_code), Some(national_number)) => {
                let total = country_code.len() + national_number.len();
                if total < E164_MIN_DIGITS {
                    checker.push("phoneNumber", "Phone number is too short");
                } else if total > E164_MAX_DIGITS {
                    checker.push("phoneNumber", "Phone number is too long");
                }
                if checker.is_clean() {
                    Ok(Self {
                        country_code,
                        national_number,
                    })
                } else {
                    Err(checker.into_errors())
                }
            }
            _ => Err(checker.into_errors()),
        }
    }

    /// Country code with its leading `+`.
    pub fn country_code(&self) -> String {
        format!("+{}", self.country_code)
    }

    pub fn national_number(&self) -> &str {
        &self.national_number
    }

    /// E.164 rendering, e.g. `+5215512345678`.
    pub fn e164(&self) -> String {
        format!("+{}{}", self.country_code, self.national_number)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.e164())
    }
}

fn parse_country_code(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Country code is required".to_string());
    }
    COUNTRY_CODE_RE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| "Country code must be '+' followed by 1 to 3 digits".to_string())
}

fn parse_national_number(raw: &str) -> Result<String, String> {
    let digits = SEPARATORS_RE.replace_all(raw.trim(), "");
    if digits.is_empty() {
        return Err("Phone number is required".to_string());
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("Phone number may only contain digits".to_string());
    }
    Ok(digits.into_owned())
}

/// A six-digit one-time verification code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode(String);

impl VerificationCode {
    pub fn parse(raw: &str) -> Result<Self, ValidationErrors> {
        let code = raw.trim();
        if code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(code.to_string()))
        } else {
            Err(ValidationErrors::single(
                "code",
                "Verification code must be 6 digits",
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formatted_numbers() {
        let phone = PhoneNumber::parse("+52", "(55) 1234-5678").unwrap();
        assert_eq!(phone.country_code(), "+52");
        assert_eq!(phone.national_number(), "5512345678");
        assert_eq!(phone.e164(), "+525512345678");
        assert_eq!(phone.to_string(), "+525512345678");
    }

    #[test]
    fn country_code_without_plus() {
        let phone = PhoneNumber::parse("1", "415.555.0100").unwrap();
        assert_eq!(phone.e164(), "+14155550100");
    }

    #[test]
    fn rejects_bad_country_code() {
        let err = PhoneNumber::parse("+0", "5512345678").unwrap_err();
        assert!(err.has_field("countryCode"));
        let err = PhoneNumber::parse("+1234", "5512345678").unwrap_err();
        assert!(err.has_field("countryCode"));
        let err = PhoneNumber::parse("", "5512345678").unwrap_err();
        assert_eq!(err.message_for("countryCode"), Some("Country code is required"));
    }

    #[test]
    fn rejects_letters_and_bad_lengths() {
        let err = PhoneNumber::parse("+52", "55-CALL-NOW").unwrap_err();
        assert_eq!(
            err.message_for("phoneNumber"),
            Some("Phone number may only contain digits")
        );

        let err = PhoneNumber::parse("+52", "12345").unwrap_err();
        assert_eq!(err.message_for("phoneNumber"), Some("Phone number is too short"));

        let err = PhoneNumber::parse("+52", "1234567890123456").unwrap_err();
        assert_eq!(err.message_for("phoneNumber"), Some("Phone number is too long"));
    }

    #[test]
    fn reports_both_fields() {
        let err = PhoneNumber::parse("abc", "").unwrap_err();
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn verification_code() {
        assert_eq!(VerificationCode::parse(" 123456 ").unwrap().as_str(), "123456");
        assert!(VerificationCode::parse("12345").is_err());
        assert!(VerificationCode::parse("12a456").is_err());
        assert!(VerificationCode::parse("1234567").is_err());
    }
}
