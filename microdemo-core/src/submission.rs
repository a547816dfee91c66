//! Submission model and validation

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub const EMAIL_SENDER: &str = "email_sender";
pub const EMAIL_SUBJECT: &str = "email_subject";
pub const EMAIL_TIMESTREAM: &str = "email_timestream";

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

static TIMESTAMP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{3})?Z?$")
        .expect("valid timestamp pattern")
});

/// Why a single field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldProblem {
    Missing,
    NotAString,
    InvalidEmail,
    InvalidTimestamp,
    NotAnObject,
}

impl FieldProblem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::NotAString => "not a string",
            Self::InvalidEmail => "not an email address",
            Self::InvalidTimestamp => "not an ISO-8601 timestamp",
            Self::NotAnObject => "not a JSON object",
        }
    }
}

/// A rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub problem: FieldProblem,
}

impl FieldError {
    pub fn new(field: impl Into<String>, problem: FieldProblem) -> Self {
        Self {
            field: field.into(),
            problem,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.problem.as_str())
    }
}

/// All field failures of one submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid submission: {}", join_fields(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

fn join_fields(fields: &[FieldError]) -> String {
    let parts: Vec<String> = fields.iter().map(ToString::to_string).collect();
    parts.join("; ")
}

/// The required fields of a validated submission.
///
/// Other attributes are not interpreted; callers forward the raw `data`
/// value untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub email_sender: String,
    pub email_subject: String,
    pub email_timestream: String,
}

impl Submission {
    /// Validate a raw `data` value, collecting every failing field
    pub fn from_value(data: &Value) -> Result<Self, ValidationError> {
        let Some(object) = data.as_object() else {
            return Err(ValidationError {
                fields: vec![FieldError::new("data", FieldProblem::NotAnObject)],
            });
        };

        let mut fields = Vec::new();

        let sender = required_string(object, EMAIL_SENDER, &mut fields);
        let subject = required_string(object, EMAIL_SUBJECT, &mut fields);
        let timestream = required_string(object, EMAIL_TIMESTREAM, &mut fields);

        if let Some(sender) = sender {
            if !is_email(sender) {
                fields.push(FieldError::new(EMAIL_SENDER, FieldProblem::InvalidEmail));
            }
        }
        if let Some(timestream) = timestream {
            if !is_timestamp(timestream) {
                fields.push(FieldError::new(
                    EMAIL_TIMESTREAM,
                    FieldProblem::InvalidTimestamp,
                ));
            }
        }

        match (sender, subject, timestream) {
            (Some(sender), Some(subject), Some(timestream)) if fields.is_empty() => Ok(Self {
                email_sender: sender.to_string(),
                email_subject: subject.to_string(),
                email_timestream: timestream.to_string(),
            }),
            _ => Err(ValidationError { fields }),
        }
    }
}

fn required_string<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a str> {
    match object.get(field) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(field, FieldProblem::Missing));
            None
        }
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => {
            errors.push(FieldError::new(field, FieldProblem::NotAString));
            None
        }
    }
}

/// Permissive email shape: something@something.something, no whitespace
pub fn is_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// ISO-8601 date-time with optional milliseconds and optional trailing `Z`
pub fn is_timestamp(value: &str) -> bool {
    TIMESTAMP_PATTERN.is_match(value)
}
