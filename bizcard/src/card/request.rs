use super::{Card, CardDraft};
use crate::backend::{Backend, Filter, Resolution, Table};
use crate::{util, Error};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

const OWNER: &str = "user_id";

async fn find(
    backend: &dyn Backend,
    filters: &[Filter],
    access_token: Option<&str>,
) -> crate::backend::Result<Option<Card>> {
    let rows = backend
        .select(Table::BusinessCards, filters, access_token)
        .await?;
    rows.into_iter().next().map(util::from_row).transpose()
}

/// Loads the card of `user_id`.
pub(crate) async fn load(
    backend: &dyn Backend,
    user_id: Uuid,
    access_token: Option<&str>,
) -> Result<Card, Error> {
    find(backend, &[Filter::eq(OWNER, user_id.to_string())], access_token)
        .await
        .map_err(Error::from_tables)?
        .ok_or(Error::NotFound)
}

/// Loads the card of `user_id` if it is published.
pub(crate) async fn load_published(
    backend: &dyn Backend,
    user_id: Uuid,
) -> crate::backend::Result<Option<Card>> {
    let filters = [
        Filter::eq(OWNER, user_id.to_string()),
        Filter::eq("is_published", true),
    ];
    find(backend, &filters, None).await
}

/// Creates the empty card of `user_id` unless it already has one.
pub(crate) async fn provision(
    backend: &dyn Backend,
    user_id: Uuid,
    access_token: &str,
) -> Result<Card, Error> {
    let created = backend
        .upsert(
            Table::BusinessCards,
            Card::empty_row(user_id),
            OWNER,
            Resolution::IgnoreDuplicates,
            Some(access_token),
        )
        .await
        .map_err(Error::from_tables)?;
    match created {
        Some(row) => {
            info!(%user_id, "provisioned business card");
            util::from_row(row).map_err(Error::PersistenceFailed)
        }
        None => {
            debug!(%user_id, "business card already exists");
            load(backend, user_id, Some(access_token)).await
        }
    }
}

/// Writes the content of `draft` and marks the card as published.
pub(crate) async fn publish(
    backend: &dyn Backend,
    draft: &CardDraft,
    access_token: &str,
) -> Result<Card, Error> {
    let user_id = draft.user_id();
    let mut row = draft
        .card()
        .content_row()
        .map_err(|e| Error::PersistenceFailed(e.into()))?;
    row.insert(OWNER.to_owned(), json!(user_id));
    row.insert("is_published".to_owned(), Value::Bool(true));
    row.insert("updated_at".to_owned(), json!(Utc::now().to_rfc3339()));
    let written = backend
        .upsert(
            Table::BusinessCards,
            row,
            OWNER,
            Resolution::Merge,
            Some(access_token),
        )
        .await
        .map_err(Error::from_tables)?;
    info!(%user_id, "published business card");
    match written {
        Some(row) => util::from_row(row).map_err(Error::PersistenceFailed),
        None => load(backend, user_id, Some(access_token)).await,
    }
}
