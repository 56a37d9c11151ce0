use crate::password::PasswordHash;
use crate::{
    response, Auth, AuthSession, Error, ErrorKind, Filter, Principal, Resolution, Result, Row,
    SignUp, Storage, Table, Tables,
};
use async_trait::async_trait;
use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use url::Url;
use uuid::Uuid;

type UploadFilter = Box<dyn Fn(&str, &[u8]) -> bool + Send + Sync>;

/// An object held by the blob store of a [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A password reset requested from a [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PasswordReset {
    pub email: String,
    pub redirect_to: Url,
}

struct Identity {
    principal: Principal,
    password: PasswordHash,
}

#[derive(Default)]
struct State {
    identities: HashMap<String, Identity>,
    access_tokens: HashMap<String, Uuid>,
    refresh_tokens: HashMap<String, Uuid>,
    users: Vec<Row>,
    business_cards: Vec<Row>,
    objects: HashMap<String, StoredObject>,
    password_resets: Vec<PasswordReset>,
    upload_filter: Option<UploadFilter>,
}

impl State {
    fn rows(&self, table: Table) -> &Vec<Row> {
        match table {
            Table::Users => &self.users,
            Table::BusinessCards => &self.business_cards,
        }
    }

    fn rows_mut(&mut self, table: Table) -> &mut Vec<Row> {
        match table {
            Table::Users => &mut self.users,
            Table::BusinessCards => &mut self.business_cards,
        }
    }

    fn principal(&self, access_token: Option<&str>) -> Result<Uuid> {
        access_token
            .and_then(|token| self.access_tokens.get(token))
            .copied()
            .ok_or_else(|| error(ErrorKind::Unauthorized, 401, "JWT missing or invalid"))
    }

    fn issue_session(&mut self, principal: Principal, expires_in: i64) -> AuthSession {
        let access_token = random_token();
        let refresh_token = random_token();
        self.access_tokens.insert(access_token.clone(), principal.id);
        self.refresh_tokens.insert(refresh_token.clone(), principal.id);
        AuthSession {
            access_token,
            refresh_token,
            expires_in: Some(expires_in),
            user: principal,
        }
    }

    fn principal_by_id(&self, id: Uuid) -> Option<Principal> {
        self.identities
            .values()
            .find(|v| v.principal.id == id)
            .map(|v| v.principal.clone())
    }

    /// Checks the unique constraints of `table` for `row`, skipping the row at `skip`.
    fn check_unique(&self, table: Table, row: &Row, skip: Option<usize>) -> Result<()> {
        for column in table.unique_columns() {
            let value = match row.get(*column) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            let taken = self
                .rows(table)
                .iter()
                .enumerate()
                .any(|(i, existing)| Some(i) != skip && existing.get(*column) == Some(value));
            if taken {
                return Err(response::Error::new(
                    ErrorKind::UniqueViolation {
                        column: Some((*column).to_owned()),
                    },
                    409,
                    format!("duplicate key value violates unique constraint on {}.{}", table, column),
                )
                .into());
            }
        }
        Ok(())
    }

    fn insert(&mut self, table: Table, mut row: Row) -> Result<Row> {
        let now = Value::String(Utc::now().to_rfc3339());
        if table == Table::BusinessCards {
            row.entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            row.entry("is_published").or_insert(Value::Bool(false));
        }
        row.entry("created_at").or_insert_with(|| now.clone());
        row.entry("updated_at").or_insert(now);
        self.check_unique(table, &row, None)?;
        self.rows_mut(table).push(row.clone());
        Ok(row)
    }
}

fn error(kind: ErrorKind, status: u16, message: &str) -> Error {
    response::Error::new(kind, status, message).into()
}

fn row_level_security(table: Table) -> Error {
    error(
        ErrorKind::Unauthorized,
        403,
        &format!("new row violates row-level security policy for table \"{}\"", table),
    )
}

fn owned_by(table: Table, row: &Row, principal: Uuid) -> bool {
    row.get(table.owner_column()) == Some(&Value::String(principal.to_string()))
}

fn random_token() -> String {
    let mut bytes = [0; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

/// A backend keeping identities, rows and objects in memory.
///
/// Enforces the constraints of the hosted backend: unique `users.username`, `users.email` and
/// `business_cards.user_id`, writes only by the owning principal and uploads only below the
/// owner's id. Reads are public.
pub struct MemoryBackend {
    state: Mutex<State>,
    public_base: Url,
    token_lifetime: i64,
    signup_sessions: bool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("MemoryBackend")
            .field("identities", &state.identities.len())
            .field("users", &state.users.len())
            .field("business_cards", &state.business_cards.len())
            .field("objects", &state.objects.len())
            .field("public_base", &self.public_base)
            .finish()
    }
}

impl MemoryBackend {
    /// Creates a new, empty [`MemoryBackend`].
    pub fn new() -> Self {
        Self {
            state: Mutex::default(),
            public_base: Url::parse("http://localhost/storage/v1/object/public/uploads/")
                .unwrap(),
            token_lifetime: 3600,
            signup_sessions: true,
        }
    }

    /// Sets the lifetime of issued access tokens in seconds.
    pub fn with_token_lifetime(mut self, seconds: i64) -> Self {
        self.token_lifetime = seconds;
        self
    }

    /// Makes sign ups return no session, as a backend requiring email confirmation does.
    pub fn without_signup_sessions(mut self) -> Self {
        self.signup_sessions = false;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of all rows of `table`.
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.state().rows(table).clone()
    }

    /// Stores `row` in `table` without checking constraints or ownership.
    pub fn put_row(&self, table: Table, row: Row) {
        self.state().rows_mut(table).push(row);
    }

    /// Returns the object stored at `path`.
    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.state().objects.get(path).cloned()
    }

    /// Returns the paths of all stored objects in sorted order.
    pub fn object_paths(&self) -> Vec<String> {
        let mut paths = self.state().objects.keys().cloned().collect::<Vec<_>>();
        paths.sort();
        paths
    }

    /// Returns the password resets requested so far.
    pub fn password_resets(&self) -> Vec<PasswordReset> {
        self.state().password_resets.clone()
    }

    /// Returns the number of access tokens that are still valid.
    pub fn active_sessions(&self) -> usize {
        self.state().access_tokens.len()
    }

    /// Makes every upload for which `predicate(path, bytes)` returns `true` fail.
    pub fn fail_uploads_where<F>(&self, predicate: F)
    where
        F: Fn(&str, &[u8]) -> bool + Send + Sync + 'static,
    {
        self.state().upload_filter = Some(Box::new(predicate));
    }

    /// Removes the predicate set by [`fail_uploads_where`](Self::fail_uploads_where).
    pub fn clear_upload_failures(&self) {
        self.state().upload_filter = None;
    }
}

#[async_trait]
impl Auth for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp> {
        let mut state = self.state();
        let key = email.to_lowercase();
        if state.identities.contains_key(&key) {
            return Err(error(
                ErrorKind::UserAlreadyExists,
                422,
                "User already registered",
            ));
        }
        let principal = Principal {
            id: Uuid::new_v4(),
            email: Some(key.clone()),
        };
        debug!(id = %principal.id, "created identity");
        state.identities.insert(
            key,
            Identity {
                principal: principal.clone(),
                password: PasswordHash::new(password),
            },
        );
        let session = if self.signup_sessions {
            Some(state.issue_session(principal.clone(), self.token_lifetime))
        } else {
            None
        };
        Ok(SignUp {
            user: principal,
            session,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let mut state = self.state();
        let principal = match state.identities.get(&email.to_lowercase()) {
            Some(identity) if identity.password.verify(password) => identity.principal.clone(),
            _ => {
                return Err(error(
                    ErrorKind::InvalidCredentials,
                    400,
                    "Invalid login credentials",
                ))
            }
        };
        Ok(state.issue_session(principal, self.token_lifetime))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        let mut state = self.state();
        let principal = state
            .refresh_tokens
            .remove(refresh_token)
            .and_then(|id| state.principal_by_id(id))
            .ok_or_else(|| error(ErrorKind::InvalidCredentials, 400, "Invalid Refresh Token"))?;
        Ok(state.issue_session(principal, self.token_lifetime))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        match self.state().access_tokens.remove(access_token) {
            Some(_) => Ok(()),
            None => Err(error(ErrorKind::Unauthorized, 401, "invalid JWT")),
        }
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &Url) -> Result<()> {
        self.state().password_resets.push(PasswordReset {
            email: email.to_owned(),
            redirect_to: redirect_to.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl Tables for MemoryBackend {
    async fn select(
        &self,
        table: Table,
        filters: &[Filter],
        _access_token: Option<&str>,
    ) -> Result<Vec<Row>> {
        Ok(self
            .state()
            .rows(table)
            .iter()
            .filter(|row| filters.iter().all(|f| f.matches(row)))
            .cloned()
            .collect())
    }

    async fn insert(&self, table: Table, row: Row, access_token: Option<&str>) -> Result<Row> {
        let mut state = self.state();
        let principal = state.principal(access_token)?;
        if !owned_by(table, &row, principal) {
            return Err(row_level_security(table));
        }
        state.insert(table, row)
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Row,
        access_token: Option<&str>,
    ) -> Result<Vec<Row>> {
        let mut state = self.state();
        let principal = state.principal(access_token)?;
        let indices = state
            .rows(table)
            .iter()
            .enumerate()
            .filter(|(_, row)| filters.iter().all(|f| f.matches(row)))
            .filter(|(_, row)| owned_by(table, row, principal))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let now = Value::String(Utc::now().to_rfc3339());
        let mut updated = Vec::with_capacity(indices.len());
        for i in indices {
            let mut row = state.rows(table)[i].clone();
            row.insert("updated_at".to_owned(), now.clone());
            row.extend(patch.clone());
            if !owned_by(table, &row, principal) {
                return Err(row_level_security(table));
            }
            state.check_unique(table, &row, Some(i))?;
            state.rows_mut(table)[i] = row.clone();
            updated.push(row);
        }
        Ok(updated)
    }

    async fn upsert(
        &self,
        table: Table,
        row: Row,
        on_conflict: &str,
        resolution: Resolution,
        access_token: Option<&str>,
    ) -> Result<Option<Row>> {
        let mut state = self.state();
        let principal = state.principal(access_token)?;
        if !owned_by(table, &row, principal) {
            return Err(row_level_security(table));
        }
        let existing = row.get(on_conflict).and_then(|value| {
            state
                .rows(table)
                .iter()
                .position(|v| v.get(on_conflict) == Some(value))
        });
        let i = match existing {
            Some(i) => i,
            None => return state.insert(table, row).map(Some),
        };
        if resolution == Resolution::IgnoreDuplicates {
            return Ok(None);
        }
        let mut merged = state.rows(table)[i].clone();
        if !owned_by(table, &merged, principal) {
            return Err(row_level_security(table));
        }
        merged.extend(row);
        state.check_unique(table, &merged, Some(i))?;
        state.rows_mut(table)[i] = merged.clone();
        Ok(Some(merged))
    }
}

#[async_trait]
impl Storage for MemoryBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        access_token: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state();
        let principal = state.principal(access_token)?;
        if path.split('/').next() != Some(principal.to_string().as_str()) {
            return Err(error(
                ErrorKind::Unauthorized,
                403,
                "new row violates row-level security policy for storage objects",
            ));
        }
        if let Some(predicate) = &state.upload_filter {
            if predicate(path, bytes.as_slice()) {
                return Err(error(ErrorKind::Other, 500, "upload rejected"));
            }
        }
        if state.objects.contains_key(path) {
            return Err(error(ErrorKind::Other, 409, "The resource already exists"));
        }
        state.objects.insert(
            path.to_owned(),
            StoredObject {
                content_type: content_type.to_owned(),
                bytes,
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> Result<Url> {
        Ok(self.public_base.join(path)?)
    }
}
