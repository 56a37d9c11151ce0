//! Module for account resources.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(crate) mod request;

/// An account resource.
///
/// The id is the id of the principal issued by the auth subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    /// The name under which the public card is reachable.
    pub username: String,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

/// Derives a username for an account that was created without one.
///
/// Uses the local part of `email`, or `user_` followed by the first eight characters of the id
/// if the email has no usable local part.
pub(crate) fn derived_username(email: &str, id: Uuid) -> String {
    match email.split('@').next().map(str::trim) {
        Some(local) if !local.is_empty() => local.to_owned(),
        _ => fallback_username(id),
    }
}

pub(crate) fn fallback_username(id: Uuid) -> String {
    let id = id.to_string();
    format!("user_{}", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_derived_from_the_email() {
        let id = Uuid::parse_str("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap();
        assert_eq!(derived_username("alice@example.com", id), "alice");
        assert_eq!(derived_username("@example.com", id), "user_0f8fad5b");
        assert_eq!(fallback_username(id), "user_0f8fad5b");
    }
}
