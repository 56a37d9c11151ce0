//! Module for errors returned from the backend.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// The error code for a unique constraint violation in the relational store.
const UNIQUE_VIOLATION: &str = "23505";
/// The error code for an expired or invalid JWT in the relational store.
const JWT_INVALID: &str = "PGRST301";
/// The error code for a row level security violation.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

#[derive(Default, Deserialize)]
struct InnerError {
    code: Option<Value>,
    error_code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

impl InnerError {
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(Value::String(v)) => Some(v.clone()),
            _ => None,
        }
    }

    fn message(&self) -> String {
        [
            &self.msg,
            &self.message,
            &self.error_description,
            &self.error,
        ]
        .iter()
        .find_map(|v| v.as_ref().filter(|v| !v.is_empty()).cloned())
        .unwrap_or_default()
    }

    fn kind(&self, status: u16) -> ErrorKind {
        let code = self.code();
        if code.as_deref() == Some(UNIQUE_VIOLATION) {
            return ErrorKind::UniqueViolation {
                column: self.details.as_deref().and_then(violated_column),
            };
        }
        match self.error_code.as_deref() {
            Some("invalid_credentials") => return ErrorKind::InvalidCredentials,
            Some("user_already_exists") | Some("email_exists") => {
                return ErrorKind::UserAlreadyExists
            }
            _ => {}
        }
        if self.error.as_deref() == Some("invalid_grant") {
            return ErrorKind::InvalidCredentials;
        }
        if self.message().contains("already registered") {
            return ErrorKind::UserAlreadyExists;
        }
        if status == 401
            || status == 403
            || matches!(code.as_deref(), Some(JWT_INVALID) | Some(INSUFFICIENT_PRIVILEGE))
        {
            return ErrorKind::Unauthorized;
        }
        ErrorKind::Other
    }
}

/// Extracts the column from a unique violation detail like `Key (username)=(alice) already
/// exists.`.
fn violated_column(details: &str) -> Option<String> {
    let start = details.find("Key (")? + "Key (".len();
    let end = details[start..].find(')')? + start;
    let columns = &details[start..end];
    // Composite keys are reported as `(a, b)`; only single columns are meaningful here.
    if columns.contains(',') {
        None
    } else {
        Some(columns.trim().to_owned())
    }
}

/// The classification of a backend error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A unique constraint was violated. `column` is the violated column if it is known.
    UniqueViolation { column: Option<String> },
    /// The email and password pair was rejected.
    InvalidCredentials,
    /// An identity with the email address already exists.
    UserAlreadyExists,
    /// The request lacked a valid token or the token does not own the resource.
    Unauthorized,
    /// The request never reached the backend or its response could not be read.
    Transport,
    /// Any other error.
    Other,
}

/// An error returned from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (status {status})")]
pub struct Error {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: String,
}

impl Error {
    /// Creates a new [`Error`].
    pub fn new<S: Into<String>>(kind: ErrorKind, status: u16, message: S) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    /// Parses the body of a failed response.
    ///
    /// Bodies that are not JSON are kept verbatim as the message.
    pub fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<InnerError>(body) {
            Ok(inner) => Self {
                kind: inner.kind(status),
                status,
                message: inner.message(),
            },
            Err(_) => Self {
                kind: InnerError::default().kind(status),
                status,
                message: body.to_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_names_the_column() {
        let body = r#"{"code":"23505","details":"Key (username)=(alice) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"users_username_key\""}"#;
        let error = Error::from_body(409, body);
        assert_eq!(
            error.kind,
            ErrorKind::UniqueViolation {
                column: Some("username".to_owned())
            }
        );
        assert!(error.message.starts_with("duplicate key"));
    }

    #[test]
    fn composite_unique_violation_has_no_column() {
        let body = r#"{"code":"23505","details":"Key (a, b)=(1, 2) already exists.","message":"duplicate"}"#;
        assert_eq!(
            Error::from_body(409, body).kind,
            ErrorKind::UniqueViolation { column: None }
        );
    }

    #[test]
    fn auth_errors() {
        let legacy = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            Error::from_body(400, legacy).kind,
            ErrorKind::InvalidCredentials
        );
        let coded = r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
        let error = Error::from_body(400, coded);
        assert_eq!(error.kind, ErrorKind::InvalidCredentials);
        assert_eq!(error.message, "Invalid login credentials");
        let exists = r#"{"code":422,"msg":"User already registered"}"#;
        assert_eq!(
            Error::from_body(422, exists).kind,
            ErrorKind::UserAlreadyExists
        );
    }

    #[test]
    fn unauthorized_and_other() {
        let jwt = r#"{"code":"PGRST301","message":"JWT expired"}"#;
        assert_eq!(Error::from_body(401, jwt).kind, ErrorKind::Unauthorized);
        let plain = Error::from_body(502, "Bad Gateway");
        assert_eq!(plain.kind, ErrorKind::Other);
        assert_eq!(plain.message, "Bad Gateway");
        assert_eq!(Error::from_body(403, "").kind, ErrorKind::Unauthorized);
    }
}
