use crate::{backend, validate::ValidationErrors};
use backend::ErrorKind;
use thiserror::Error as ThisError;

/// Error that can occur while managing accounts and business cards.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The username belongs to another account.
    #[error("username is already taken")]
    DuplicateUsername,
    /// The email address belongs to another account.
    #[error("an account with this email address already exists")]
    DuplicateEmail,
    /// The email and password pair was rejected.
    #[error("invalid email or password")]
    InvalidCredentials,
    /// The account or business card does not exist or is not visible.
    #[error("business card not found")]
    NotFound,
    /// Uploading a file failed.
    #[error("failed to upload {file}")]
    UploadFailed {
        file: String,
        #[source]
        source: backend::Error,
    },
    /// The backend failed to read or write a record.
    #[error("failed to save changes")]
    PersistenceFailed(#[source] backend::Error),
    /// Form input was rejected before contacting the backend.
    #[error("{0}")]
    ValidationFailed(ValidationErrors),
    /// The operation requires a signed in session.
    #[error("not signed in")]
    NotSignedIn,
}

impl Error {
    /// Translates an error of a table operation.
    pub(crate) fn from_tables(error: backend::Error) -> Self {
        match error.kind() {
            ErrorKind::UniqueViolation { column: Some(column) } if column == "username" => {
                Self::DuplicateUsername
            }
            ErrorKind::UniqueViolation { column: Some(column) } if column == "email" => {
                Self::DuplicateEmail
            }
            ErrorKind::Unauthorized => Self::NotSignedIn,
            _ => Self::PersistenceFailed(error),
        }
    }

    /// Translates an error of the auth subsystem.
    pub(crate) fn from_auth(error: backend::Error) -> Self {
        match error.kind() {
            ErrorKind::InvalidCredentials => Self::InvalidCredentials,
            ErrorKind::UserAlreadyExists => Self::DuplicateEmail,
            _ => Self::PersistenceFailed(error),
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::response;

    fn backend_error(kind: ErrorKind) -> backend::Error {
        response::Error::new(kind, 409, "conflict").into()
    }

    #[test]
    fn unique_violations_become_duplicates() {
        let username = backend_error(ErrorKind::UniqueViolation {
            column: Some("username".to_owned()),
        });
        assert!(matches!(
            Error::from_tables(username),
            Error::DuplicateUsername
        ));
        let email = backend_error(ErrorKind::UniqueViolation {
            column: Some("email".to_owned()),
        });
        assert!(matches!(Error::from_tables(email), Error::DuplicateEmail));
        let card = backend_error(ErrorKind::UniqueViolation {
            column: Some("user_id".to_owned()),
        });
        assert!(matches!(
            Error::from_tables(card),
            Error::PersistenceFailed(_)
        ));
    }

    #[test]
    fn auth_errors_are_translated() {
        assert!(matches!(
            Error::from_auth(backend_error(ErrorKind::InvalidCredentials)),
            Error::InvalidCredentials
        ));
        assert!(matches!(
            Error::from_auth(backend_error(ErrorKind::UserAlreadyExists)),
            Error::DuplicateEmail
        ));
        assert!(matches!(
            Error::from_auth(backend_error(ErrorKind::Other)),
            Error::PersistenceFailed(_)
        ));
    }
}
