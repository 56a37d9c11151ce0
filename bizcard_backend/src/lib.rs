//! Contract of the hosted backend used by the business card client.
//!
//! The backend bundles three services: an authentication subsystem issuing sessions ([`Auth`]), a
//! relational store with two tables ([`Tables`]) and a blob store returning public URLs
//! ([`Storage`]). [`RestBackend`] speaks the hosted service's HTTP API, [`MemoryBackend`] keeps
//! everything in process and enforces the same constraints.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

use async_trait::async_trait;
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, result::Result as StdResult};
use thiserror::Error as ThisError;
use url::Url;
use uuid::Uuid;

pub use memory::{MemoryBackend, PasswordReset, StoredObject};
pub use response::ErrorKind;
pub use rest::{RestBackend, Urls};

pub mod response;

mod memory;
mod password;
mod rest;
mod util;

/// Type alias for `Result<T, Error>`.
pub type Result<T, E = Error> = StdResult<T, E>;

/// A row of a table, represented as a JSON object.
pub type Row = serde_json::Map<String, Value>;

/// Errors that can occur while interacting with the backend.
#[derive(Debug, Display, ThisError)]
pub enum Error {
    /// Failed to send request.
    Request(#[from] reqwest::Error),
    /// Failed to parse URL.
    ParseUrl(#[from] url::ParseError),
    /// Failed to decode a row or payload.
    Decode(#[from] serde_json::Error),
    /// Backend returned an error: {0}
    Response(#[from] response::Error),
}

impl Error {
    /// Returns the classified kind of the error.
    ///
    /// Errors that never reached the backend are [`ErrorKind::Transport`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Response(e) => e.kind.clone(),
            Self::Request(_) | Self::ParseUrl(_) | Self::Decode(_) => ErrorKind::Transport,
        }
    }
}

/// The tables of the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Application level user records (`id`, `email`, `username`).
    Users,
    /// Business card documents, one per user (`user_id`).
    BusinessCards,
}

impl Table {
    /// Returns the name of the table.
    pub fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::BusinessCards => "business_cards",
        }
    }

    /// Returns the columns that carry a unique constraint.
    pub fn unique_columns(self) -> &'static [&'static str] {
        match self {
            Self::Users => &["id", "username", "email"],
            Self::BusinessCards => &["id", "user_id"],
        }
    }

    /// Returns the column holding the id of the principal owning a row.
    pub fn owner_column(self) -> &'static str {
        match self {
            Self::Users => "id",
            Self::BusinessCards => "user_id",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An equality filter on a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    /// Creates a filter matching rows where `column` equals `value`.
    pub fn eq<C, V>(column: C, value: V) -> Self
    where
        C: Into<String>,
        V: Into<Value>,
    {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Returns whether the row matches the filter.
    pub fn matches(&self, row: &Row) -> bool {
        match row.get(&self.column) {
            Some(v) => *v == self.value,
            None => self.value.is_null(),
        }
    }

    /// Returns the filter in the `column=eq.value` query form.
    pub(crate) fn to_query(&self) -> (String, String) {
        let value = match &self.value {
            Value::Null => return (self.column.clone(), "is.null".to_owned()),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        (self.column.clone(), format!("eq.{}", value))
    }
}

/// How an upsert resolves a conflict on the conflict column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Merge the given columns into the existing row.
    Merge,
    /// Leave the existing row untouched and return nothing.
    IgnoreDuplicates,
}

/// An authenticated identity issued by the auth subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Principal {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens and principal of a signed in identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: Principal,
}

/// The result of a sign up.
///
/// `session` is `None` when the backend requires the email address to be confirmed before the
/// identity may sign in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignUp {
    pub user: Principal,
    pub session: Option<AuthSession>,
}

/// The authentication subsystem.
#[async_trait]
pub trait Auth: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;
    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession>;
    async fn sign_out(&self, access_token: &str) -> Result<()>;
    /// Sends an email with a password reset link pointing at `redirect_to`.
    async fn send_password_reset(&self, email: &str, redirect_to: &Url) -> Result<()>;
}

/// The relational store.
///
/// Calls without an access token are performed with the public API key.
#[async_trait]
pub trait Tables: Send + Sync {
    async fn select(
        &self,
        table: Table,
        filters: &[Filter],
        access_token: Option<&str>,
    ) -> Result<Vec<Row>>;

    async fn insert(&self, table: Table, row: Row, access_token: Option<&str>) -> Result<Row>;

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Row,
        access_token: Option<&str>,
    ) -> Result<Vec<Row>>;

    /// Inserts `row`, resolving a conflict on `on_conflict` according to `resolution`.
    ///
    /// Returns `None` if the conflict was ignored.
    async fn upsert(
        &self,
        table: Table,
        row: Row,
        on_conflict: &str,
        resolution: Resolution,
        access_token: Option<&str>,
    ) -> Result<Option<Row>>;
}

/// The blob store.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        access_token: Option<&str>,
    ) -> Result<()>;

    /// Returns the public URL of the object stored at `path`.
    fn public_url(&self, path: &str) -> Result<Url>;
}

/// A backend offering all three services.
pub trait Backend: Auth + Tables + Storage {}

impl<T: Auth + Tables + Storage> Backend for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_query_form() {
        assert_eq!(
            Filter::eq("username", "alice").to_query(),
            ("username".to_owned(), "eq.alice".to_owned())
        );
        assert_eq!(
            Filter::eq("is_published", true).to_query(),
            ("is_published".to_owned(), "eq.true".to_owned())
        );
        assert_eq!(
            Filter::eq("user_id", Value::Null).to_query(),
            ("user_id".to_owned(), "is.null".to_owned())
        );
    }

    #[test]
    fn filter_matches_row() {
        let row = json!({ "username": "alice", "is_published": false });
        let row = row.as_object().unwrap();
        assert!(Filter::eq("username", "alice").matches(row));
        assert!(!Filter::eq("is_published", true).matches(row));
        assert!(Filter::eq("missing", Value::Null).matches(row));
    }
}
