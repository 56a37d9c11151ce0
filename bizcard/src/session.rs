use crate::account::{request as accounts, Account};
use crate::backend::{self, AuthSession, ErrorKind};
use crate::card::{self, Card, CardDraft, ImageField};
use crate::upload::{self, ImageFile};
use crate::{validate, Client, Error, Result};
use std::convert::TryInto;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use url::Url;

/// Tokens used for accessing the backend on behalf of the account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tokens {
    pub refresh_token: String,
    pub access_token: String,
}

/// A signed in session of an account.
///
/// The access token is refreshed before a request once it has expired.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    account: Account,
    token_expiry_time: SystemTime,
    tokens: Tokens,
}

fn get_token_expiry_time(expires_in: Option<i64>) -> SystemTime {
    SystemTime::now()
        + expires_in
            .map(|v| v.try_into().map(Duration::from_secs).unwrap_or_default())
            .unwrap_or_default()
}

fn refresh_error(error: backend::Error) -> Error {
    match error.kind() {
        ErrorKind::InvalidCredentials | ErrorKind::Unauthorized => Error::NotSignedIn,
        _ => Error::PersistenceFailed(error),
    }
}

impl Session {
    pub(crate) fn new(client: Client, account: Account, auth: AuthSession) -> Self {
        Self {
            client,
            account,
            token_expiry_time: get_token_expiry_time(auth.expires_in),
            tokens: Tokens {
                refresh_token: auth.refresh_token,
                access_token: auth.access_token,
            },
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Returns the account the session belongs to.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Returns the tokens.
    pub fn tokens(&self) -> &Tokens {
        &self.tokens
    }

    /// Returns the URL of the public card of the account.
    pub fn public_url(&self) -> std::result::Result<Url, url::ParseError> {
        self.client.config().public_card_url(&self.account.username)
    }

    /// Returns whether the token has expired.
    fn token_has_expired(&self) -> bool {
        self.token_expiry_time <= SystemTime::now()
    }

    /// Returns a valid access token, refreshing it if needed.
    async fn access_token(&mut self) -> Result<String> {
        if self.token_has_expired() {
            self.refresh_token().await?;
        }
        Ok(self.tokens.access_token.clone())
    }

    /// Refreshes the token.
    async fn refresh_token(&mut self) -> Result<()> {
        let auth = self
            .client
            .backend()
            .refresh(&self.tokens.refresh_token)
            .await
            .map_err(refresh_error)?;
        debug!(id = %self.account.id, "refreshed access token");
        self.tokens.refresh_token = auth.refresh_token;
        self.tokens.access_token = auth.access_token;
        self.token_expiry_time = get_token_expiry_time(auth.expires_in);
        Ok(())
    }

    /// Changes the username of the account.
    ///
    /// Keeping the current username does nothing.
    pub async fn update_username(&mut self, username: &str) -> Result<&Account> {
        validate::username(username)?;
        let username = username.trim();
        if username == self.account.username {
            return Ok(&self.account);
        }
        let taken = accounts::find_by_username(self.client.backend(), username)
            .await
            .map_err(Error::from_tables)?
            .map_or(false, |v| v.id != self.account.id);
        if taken {
            return Err(Error::DuplicateUsername);
        }
        let token = self.access_token().await?;
        self.account =
            accounts::update_username(self.client.backend(), self.account.id, username, &token)
                .await?;
        Ok(&self.account)
    }

    /// Fetches the account again.
    pub async fn reload_account(&mut self) -> Result<&Account> {
        let token = self.access_token().await?;
        let backend = self.client.backend();
        self.account = accounts::find_by_id(backend, self.account.id, Some(token.as_str()))
            .await
            .map_err(Error::from_tables)?
            .ok_or(Error::NotFound)?;
        Ok(&self.account)
    }

    /// Creates the empty card of the account unless it already has one.
    pub async fn provision_card(&mut self) -> Result<Card> {
        let token = self.access_token().await?;
        card::request::provision(self.client.backend(), self.account.id, &token).await
    }

    /// Loads the card of the account into a new working copy.
    pub async fn load_card(&mut self) -> Result<CardDraft> {
        let token = self.access_token().await?;
        let backend = self.client.backend();
        let card = card::request::load(backend, self.account.id, Some(token.as_str())).await?;
        Ok(CardDraft::new(card))
    }

    /// Uploads `file` and stores its URL in `field` of `draft`.
    ///
    /// The URL of the office images is appended to the sequence.
    pub async fn upload_image(
        &mut self,
        draft: &mut CardDraft,
        field: ImageField,
        file: ImageFile,
    ) -> Result<Url> {
        let token = self.access_token().await?;
        let url =
            upload::upload_one(self.client.backend(), self.account.id, field, file, &token).await?;
        draft.put_images(field, &[url.to_string()]);
        info!(?field, "added image");
        Ok(url)
    }

    /// Uploads `files` concurrently and stores their URLs in `field` of `draft`.
    ///
    /// Either every file is uploaded and `draft` is updated, or [`Error::UploadFailed`] is
    /// returned and `draft` is left unchanged.
    pub async fn add_images(
        &mut self,
        draft: &mut CardDraft,
        field: ImageField,
        files: Vec<ImageFile>,
    ) -> Result<Vec<Url>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let token = self.access_token().await?;
        let urls =
            upload::upload_all(self.client.backend(), self.account.id, field, files, &token)
                .await?;
        let values = urls.iter().map(|v| v.to_string()).collect::<Vec<_>>();
        draft.put_images(field, &values);
        info!(count = urls.len(), ?field, "added images");
        Ok(urls)
    }

    /// Saves `draft` and makes the card publicly visible.
    ///
    /// Publishing again overwrites the previous content.
    pub async fn publish(&mut self, draft: &mut CardDraft) -> Result<()> {
        let token = self.access_token().await?;
        let card = card::request::publish(self.client.backend(), draft, &token).await?;
        draft.mark_published(card);
        Ok(())
    }

    /// Signs out.
    ///
    /// A failure to revoke the token on the backend is only logged.
    pub async fn logout(self) {
        let id = self.account.id;
        match self
            .client
            .backend()
            .sign_out(&self.tokens.access_token)
            .await
        {
            Ok(()) => info!(%id, "signed out"),
            Err(e) => warn!(%id, error = %e, "failed to sign out on the backend"),
        }
    }
}
