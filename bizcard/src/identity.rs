//! Module for tracking who is signed in.

use crate::{account::Account, Client, Error, Result, Session};
use std::mem;
use tracing::debug;

/// The authentication state of an [`Identity`].
#[derive(Debug, Clone)]
pub enum AuthState {
    Anonymous,
    /// A sign in or registration is in progress.
    Authenticating,
    Authenticated(Session),
}

impl AuthState {
    fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Authenticating => "authenticating",
            Self::Authenticated(_) => "authenticated",
        }
    }
}

/// The signed in principal of the application.
///
/// An [`Identity`] is created once at startup and handed to everything that needs to know who
/// is signed in.
#[derive(Debug)]
pub struct Identity {
    client: Client,
    state: AuthState,
}

impl Identity {
    /// Creates a new anonymous [`Identity`].
    pub fn new(client: Client) -> Self {
        Self {
            client,
            state: AuthState::Anonymous,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    /// Returns the current session.
    pub fn session(&self) -> Result<&Session> {
        match &self.state {
            AuthState::Authenticated(v) => Ok(v),
            _ => Err(Error::NotSignedIn),
        }
    }

    /// Returns the current session mutably.
    pub fn session_mut(&mut self) -> Result<&mut Session> {
        match &mut self.state {
            AuthState::Authenticated(v) => Ok(v),
            _ => Err(Error::NotSignedIn),
        }
    }

    /// Returns the account of the current session.
    pub fn account(&self) -> Option<&Account> {
        self.session().ok().map(Session::account)
    }

    fn transition(&mut self, state: AuthState) -> AuthState {
        debug!(from = self.state.name(), to = state.name(), "auth state changed");
        mem::replace(&mut self.state, state)
    }

    /// Ends the current session before a new one starts.
    async fn begin(&mut self) {
        if let AuthState::Authenticated(session) = self.transition(AuthState::Authenticating) {
            session.logout().await;
        }
    }

    fn finish(&mut self, result: Result<Session>) -> Result<&Session> {
        match result {
            Ok(session) => {
                self.transition(AuthState::Authenticated(session));
                self.session()
            }
            Err(e) => {
                self.transition(AuthState::Anonymous);
                Err(e)
            }
        }
    }

    /// Registers a new account and signs it in.
    pub async fn register(&mut self, username: &str, email: &str, password: &str) -> Result<Account> {
        self.begin().await;
        let result = self.client.register(username, email, password).await;
        self.finish(result).map(|v| v.account().clone())
    }

    /// Signs in, ending the current session if there is one.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&Session> {
        self.begin().await;
        let result = self.client.login(email, password).await;
        self.finish(result)
    }

    /// Signs out. Does nothing if nobody is signed in.
    pub async fn logout(&mut self) {
        if let AuthState::Authenticated(session) = self.transition(AuthState::Anonymous) {
            session.logout().await;
        }
    }

    /// Sends a password reset email to `email`.
    pub async fn reset_password(&self, email: &str) -> Result<()> {
        self.client.reset_password(email).await
    }
}
