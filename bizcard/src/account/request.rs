use crate::backend::{self, Backend, Filter, Table};
use crate::{account::Account, util, Error};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

async fn find(
    backend: &dyn Backend,
    column: &str,
    value: String,
    access_token: Option<&str>,
) -> backend::Result<Option<Account>> {
    let rows = backend
        .select(Table::Users, &[Filter::eq(column, value)], access_token)
        .await?;
    rows.into_iter().next().map(util::from_row).transpose()
}

pub(crate) async fn find_by_id(
    backend: &dyn Backend,
    id: Uuid,
    access_token: Option<&str>,
) -> backend::Result<Option<Account>> {
    find(backend, "id", id.to_string(), access_token).await
}

pub(crate) async fn find_by_username(
    backend: &dyn Backend,
    username: &str,
) -> backend::Result<Option<Account>> {
    find(backend, "username", username.to_owned(), None).await
}

pub(crate) async fn find_by_email(
    backend: &dyn Backend,
    email: &str,
) -> backend::Result<Option<Account>> {
    find(backend, "email", email.to_owned(), None).await
}

/// Inserts the account row of the principal `id`.
pub(crate) async fn insert(
    backend: &dyn Backend,
    id: Uuid,
    email: &str,
    username: &str,
    access_token: &str,
) -> Result<Account, Error> {
    let row = util::row(json!({
        "id": id,
        "email": email,
        "username": username,
    }));
    let row = backend
        .insert(Table::Users, row, Some(access_token))
        .await
        .map_err(Error::from_tables)?;
    info!(%id, username, "created account");
    util::from_row(row).map_err(Error::PersistenceFailed)
}

/// Changes the username of the account `id`.
pub(crate) async fn update_username(
    backend: &dyn Backend,
    id: Uuid,
    username: &str,
    access_token: &str,
) -> Result<Account, Error> {
    let rows = backend
        .update(
            Table::Users,
            &[Filter::eq("id", id.to_string())],
            util::row(json!({ "username": username })),
            Some(access_token),
        )
        .await
        .map_err(Error::from_tables)?;
    let row = rows.into_iter().next().ok_or(Error::NotFound)?;
    info!(%id, username, "changed username");
    util::from_row(row).map_err(Error::PersistenceFailed)
}
