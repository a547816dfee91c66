//! Pipeline error taxonomy and formatting

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::submission::FieldError;

/// Failure classes surfaced by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    /// The shared-secret token did not match
    AuthorizationFailure,
    /// Required submission fields are missing or malformed
    ValidationFailure,
    /// The queue or the object store failed
    DependencyFailure,
    /// A body could not be parsed as JSON
    ParseFailure,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationFailure => "AuthorizationFailure",
            Self::ValidationFailure => "ValidationFailure",
            Self::DependencyFailure => "DependencyFailure",
            Self::ParseFailure => "ParseFailure",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::AuthorizationFailure => 403,
            Self::ValidationFailure | Self::ParseFailure => 400,
            Self::DependencyFailure => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned to HTTP callers
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct PipelineError {
    pub code: ErrorCode,
    pub message: String,
    pub fields: Vec<FieldError>,
    pub request_id: String,
}

impl PipelineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: Vec::new(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldError>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Format as a JSON error body
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct JsonError<'a> {
            code: &'static str,
            message: &'a str,
            #[serde(skip_serializing_if = "no_fields")]
            fields: &'a [FieldError],
            request_id: &'a str,
        }

        fn no_fields(fields: &&[FieldError]) -> bool {
            fields.is_empty()
        }

        let error = JsonError {
            code: self.code.as_str(),
            message: &self.message,
            fields: &self.fields,
            request_id: &self.request_id,
        };

        serde_json::to_string(&error).unwrap_or_else(|_| {
            format!(r#"{{"code":"{}","message":"{}"}}"#, self.code.as_str(), self.message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::FieldProblem;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorCode::AuthorizationFailure.http_status(), 403);
        assert_eq!(ErrorCode::ValidationFailure.http_status(), 400);
        assert_eq!(ErrorCode::ParseFailure.http_status(), 400);
        assert_eq!(ErrorCode::DependencyFailure.http_status(), 500);
    }

    #[test]
    fn test_error_json_format() {
        let error = PipelineError::new(ErrorCode::ValidationFailure, "Invalid submission")
            .with_fields(vec![FieldError::new("email_sender", FieldProblem::Missing)])
            .with_request_id("test-request-id");

        let json: serde_json::Value = serde_json::from_str(&error.to_json()).unwrap();
        assert_eq!(json["code"], "ValidationFailure");
        assert_eq!(json["requestId"], "test-request-id");
        assert_eq!(json["fields"][0]["field"], "email_sender");
        assert_eq!(json["fields"][0]["problem"], "missing");
    }

    #[test]
    fn test_error_json_omits_empty_fields() {
        let error = PipelineError::new(ErrorCode::AuthorizationFailure, "Invalid token");

        let json = error.to_json();
        assert!(json.contains("AuthorizationFailure"));
        assert!(!json.contains("fields"));
    }
}
