use crate::account::{self, request as accounts, Account};
use crate::backend::{AuthSession, Backend, ErrorKind, RestBackend};
use crate::config::{Config, ConfigError, BACKEND_URL_VAR};
use crate::{card, public, validate, Error, PublicCardView, Result, Session};
use std::{fmt, sync::Arc};
use tracing::{debug, info, warn};

/// A client used for interacting with the business card backend without being signed in.
///
/// The client is cheap to clone. Every clone shares the same backend handle.
///
/// # Example
///
/// ```ignore
/// use bizcard::{Client, Config};
///
/// let client = Client::new(Config::from_env()?)?;
/// let mut session = client.login("alice@example.com", "secret1").await?;
/// let mut draft = session.load_card().await?;
/// ```
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
    config: Arc<Config>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new [`Client`] talking to the hosted backend described by `config`.
    pub fn new(config: Config) -> std::result::Result<Self, ConfigError> {
        let backend = RestBackend::new(&config.backend_url, &config.api_key, &config.bucket)
            .map_err(|source| ConfigError::InvalidUrl {
                var: BACKEND_URL_VAR,
                source,
            })?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Creates a new [`Client`] using `backend`.
    pub fn with_backend(config: Config, backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Creates an identity together with its account and empty card.
    ///
    /// The username and email are checked for availability before the identity is created. The
    /// backend's unique constraints reject a registration that loses a race for either.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Session> {
        validate::sign_up(username, email, password)?;
        let username = username.trim();
        let email = email.trim().to_lowercase();

        if accounts::find_by_username(self.backend(), username)
            .await
            .map_err(Error::from_tables)?
            .is_some()
        {
            return Err(Error::DuplicateUsername);
        }
        if accounts::find_by_email(self.backend(), &email)
            .await
            .map_err(Error::from_tables)?
            .is_some()
        {
            return Err(Error::DuplicateEmail);
        }

        let sign_up = self
            .backend
            .sign_up(&email, password)
            .await
            .map_err(Error::from_auth)?;
        let auth = match sign_up.session {
            Some(v) => v,
            None => {
                debug!(id = %sign_up.user.id, "sign up returned no session, signing in");
                self.backend
                    .sign_in(&email, password)
                    .await
                    .map_err(Error::from_auth)?
            }
        };

        let account = accounts::insert(
            self.backend(),
            auth.user.id,
            &email,
            username,
            &auth.access_token,
        )
        .await?;
        card::request::provision(self.backend(), account.id, &auth.access_token).await?;
        info!(id = %account.id, username, "registered account");
        Ok(Session::new(self.clone(), account, auth))
    }

    /// Signs in with an email and password.
    ///
    /// An identity without an account row, e.g. one whose registration was interrupted, gets its
    /// account created here. A missing card is created as well.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        validate::sign_in(email, password)?;
        let email = email.trim().to_lowercase();
        let auth = self
            .backend
            .sign_in(&email, password)
            .await
            .map_err(Error::from_auth)?;
        let token = Some(auth.access_token.as_str());
        let found = accounts::find_by_id(self.backend(), auth.user.id, token)
            .await
            .map_err(Error::from_tables)?;
        let account = match found {
            Some(v) => {
                card::request::provision(self.backend(), v.id, &auth.access_token).await?;
                v
            }
            None => self.restore_account(&auth, &email).await?,
        };
        info!(id = %account.id, "signed in");
        Ok(Session::new(self.clone(), account, auth))
    }

    async fn restore_account(&self, auth: &AuthSession, email: &str) -> Result<Account> {
        let id = auth.user.id;
        let email = auth.user.email.as_deref().unwrap_or(email);
        warn!(%id, "account row is missing, creating it");
        let username = account::derived_username(email, id);
        let token = &auth.access_token;
        let account = match accounts::insert(self.backend(), id, email, &username, token).await {
            Err(Error::DuplicateUsername) => {
                let username = account::fallback_username(id);
                accounts::insert(self.backend(), id, email, &username, token).await?
            }
            v => v?,
        };
        card::request::provision(self.backend(), id, token).await?;
        Ok(account)
    }

    /// Sends a password reset email to `email`.
    ///
    /// Succeeds whether or not the address belongs to an account. Only a failure to reach the
    /// backend is reported.
    pub async fn reset_password(&self, email: &str) -> Result<()> {
        validate::email(email)?;
        let redirect_to = self
            .config
            .password_reset_url()
            .map_err(|e| Error::PersistenceFailed(e.into()))?;
        match self
            .backend
            .send_password_reset(email.trim(), &redirect_to)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::Transport => Err(Error::PersistenceFailed(e)),
            Err(e) => {
                warn!(error = %e, "password reset request was rejected");
                Ok(())
            }
        }
    }

    /// Returns the published card of `username`.
    ///
    /// Unknown users and unpublished cards are both [`Error::NotFound`].
    pub async fn public_card(&self, username: &str) -> Result<PublicCardView> {
        public::resolve(self.backend(), &self.config, username).await
    }
}
