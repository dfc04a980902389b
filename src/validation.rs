//! Field-scoped validation primitives.
//!
//! Validators collect one [`FieldError`] per offending field and either
//! produce the whole value or fail with every error at once. The helpers in
//! this module read raw JSON input and apply the shared normalization rules:
//! strings are trimmed, numeric strings are coerced to integers and empty
//! optional strings become absent.

use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

/// A validation failure attached to a single input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The full set of field errors from one rejected submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Message for a given field, if that field failed.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.message_for(field).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "Validation failed: {}", parts.join("; "))
    }
}

/// Collects field errors while a validator walks its input.
#[derive(Debug, Default)]
pub struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of checking one field, keeping the value on success.
    pub fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.errors.push(FieldError::new(field, message));
                None
            }
        }
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> ValidationErrors {
        ValidationErrors(self.errors)
    }
}

// ── Raw JSON readers ────────────────────────────────────────────────

/// Interpret the submission as a JSON object.
pub fn as_object(value: &Value) -> Result<&Map<String, Value>, ValidationErrors> {
    value
        .as_object()
        .ok_or_else(|| ValidationErrors::single("data", "Expected a JSON object"))
}

/// Read an optional string, trimmed. Empty strings count as absent.
pub fn optional_str(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Some(_) => Err("Must be text".to_string()),
    }
}

/// Read a required string, trimmed.
pub fn required_str(obj: &Map<String, Value>, key: &str, label: &str) -> Result<String, String> {
    optional_str(obj, key)?.ok_or_else(|| format!("{label} is required"))
}

/// Read an optional integer, accepting numeric strings.
pub fn optional_int(obj: &Map<String, Value>, key: &str, label: &str) -> Result<Option<i64>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            if n.is_u64() {
                return Err(format!("{label} is too high"));
            }
            match n.as_f64() {
                Some(f) if f.fract() != 0.0 => Err(format!("{label} must be a whole number")),
                Some(f) if f >= 1e15 => Err(format!("{label} is too high")),
                Some(f) if f <= -1e15 => Err(format!("{label} is too low")),
                Some(f) => Ok(Some(f as i64)),
                None => Err(format!("{label} must be a whole number")),
            }
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<i64>().map(Some).map_err(|e| match e.kind() {
                IntErrorKind::PosOverflow => format!("{label} is too high"),
                IntErrorKind::NegOverflow => format!("{label} is too low"),
                _ => format!("{label} must be a whole number"),
            })
        }
        Some(_) => Err(format!("{label} must be a whole number")),
    }
}

/// Read a required integer, accepting numeric strings.
pub fn required_int(obj: &Map<String, Value>, key: &str, label: &str) -> Result<i64, String> {
    optional_int(obj, key, label)?.ok_or_else(|| format!("{label} is required"))
}

/// Read an optional boolean, accepting `"true"` / `"false"`.
pub fn optional_bool(obj: &Map<String, Value>, key: &str, label: &str) -> Result<Option<bool>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => match s.trim() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            "" => Ok(None),
            _ => Err(format!("{label} must be true or false")),
        },
        Some(_) => Err(format!("{label} must be true or false")),
    }
}

/// Read a required enum value through its `FromStr` implementation.
pub fn required_enum<T>(obj: &Map<String, Value>, key: &str, label: &str) -> Result<T, String>
where
    T: FromStr<Err = String>,
{
    required_str(obj, key, label)?.parse()
}

/// Check a trimmed string's length in characters.
pub fn check_length(value: &str, min: usize, max: usize, label: &str) -> Result<(), String> {
    let len = value.chars().count();
    if len < min {
        Err(format!("{label} must be at least {min} characters"))
    } else if len > max {
        Err(format!("{label} must be at most {max} characters"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn optional_str_trims_and_drops_empty() {
        let o = obj(json!({"a": "  hi  ", "b": "   ", "c": null}));
        assert_eq!(optional_str(&o, "a").unwrap(), Some("hi".to_string()));
        assert_eq!(optional_str(&o, "b").unwrap(), None);
        assert_eq!(optional_str(&o, "c").unwrap(), None);
        assert_eq!(optional_str(&o, "missing").unwrap(), None);
    }

    #[test]
    fn optional_str_rejects_non_text() {
        let o = obj(json!({"a": 5}));
        assert!(optional_str(&o, "a").is_err());
    }

    #[test]
    fn int_coerces_numeric_strings() {
        let o = obj(json!({"a": " 42 ", "b": 7, "c": 3.0, "d": "4.5", "e": 4.5}));
        assert_eq!(required_int(&o, "a", "A").unwrap(), 42);
        assert_eq!(required_int(&o, "b", "B").unwrap(), 7);
        assert_eq!(required_int(&o, "c", "C").unwrap(), 3);
        assert!(required_int(&o, "d", "D").is_err());
        assert!(required_int(&o, "e", "E").is_err());
        assert_eq!(required_int(&o, "zz", "Zz").unwrap_err(), "Zz is required");
    }

    #[test]
    fn oversized_ints_are_out_of_range() {
        let o = obj(json!({
            "a": u64::MAX,
            "b": 1e20,
            "c": "99999999999999999999",
            "d": "-99999999999999999999",
            "e": -1e20
        }));
        assert_eq!(required_int(&o, "a", "A").unwrap_err(), "A is too high");
        assert_eq!(required_int(&o, "b", "B").unwrap_err(), "B is too high");
        assert_eq!(required_int(&o, "c", "C").unwrap_err(), "C is too high");
        assert_eq!(required_int(&o, "d", "D").unwrap_err(), "D is too low");
        assert_eq!(required_int(&o, "e", "E").unwrap_err(), "E is too low");
    }

    #[test]
    fn bool_accepts_strings() {
        let o = obj(json!({"a": "true", "b": false, "c": "yes"}));
        assert_eq!(optional_bool(&o, "a", "A").unwrap(), Some(true));
        assert_eq!(optional_bool(&o, "b", "B").unwrap(), Some(false));
        assert!(optional_bool(&o, "c", "C").is_err());
    }

    #[test]
    fn length_counts_characters() {
        assert!(check_length("ñandú", 5, 5, "Name").is_ok());
        assert_eq!(
            check_length("a", 2, 5, "Name").unwrap_err(),
            "Name must be at least 2 characters"
        );
        assert_eq!(
            check_length("abcdef", 2, 5, "Name").unwrap_err(),
            "Name must be at most 5 characters"
        );
    }

    #[test]
    fn checker_collects_every_error() {
        let mut checker = Checker::new();
        let a: Option<i32> = checker.check("a", Err("bad a".to_string()));
        let b = checker.check("b", Ok(2));
        checker.push("c", "bad c");
        assert!(a.is_none());
        assert_eq!(b, Some(2));
        assert!(!checker.is_clean());

        let errors = checker.into_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.message_for("a"), Some("bad a"));
        assert!(errors.has_field("c"));
        assert!(!errors.has_field("b"));
    }

    #[test]
    fn display_lists_fields() {
        let errors = ValidationErrors::single("email", "Email is required");
        assert_eq!(
            errors.to_string(),
            "Validation failed: email: Email is required"
        );
    }
}
