mod common;

use async_trait::async_trait;
use bizcard::backend::{
    self, Auth, AuthSession, Filter, MemoryBackend, Resolution, Row, SignUp, Storage, Table,
    Tables,
};
use bizcard::card::Template;
use bizcard::{AuthState, Client, Error, Identity};
use common::PASSWORD;
use serde_json::json;
use std::sync::{Arc, Mutex};
use url::Url;

/// Backend that stores a competing `users` row right after the next sign up is accepted.
struct RacingBackend {
    inner: Arc<MemoryBackend>,
    rival: Mutex<Option<Row>>,
}

impl RacingBackend {
    fn new(inner: Arc<MemoryBackend>, rival: Row) -> Self {
        Self {
            inner,
            rival: Mutex::new(Some(rival)),
        }
    }
}

#[async_trait]
impl Auth for RacingBackend {
    async fn sign_up(&self, email: &str, password: &str) -> backend::Result<SignUp> {
        let sign_up = self.inner.sign_up(email, password).await?;
        if let Some(row) = self.rival.lock().unwrap().take() {
            self.inner.put_row(Table::Users, row);
        }
        Ok(sign_up)
    }

    async fn sign_in(&self, email: &str, password: &str) -> backend::Result<AuthSession> {
        self.inner.sign_in(email, password).await
    }

    async fn refresh(&self, refresh_token: &str) -> backend::Result<AuthSession> {
        self.inner.refresh(refresh_token).await
    }

    async fn sign_out(&self, access_token: &str) -> backend::Result<()> {
        self.inner.sign_out(access_token).await
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &Url) -> backend::Result<()> {
        self.inner.send_password_reset(email, redirect_to).await
    }
}

#[async_trait]
impl Tables for RacingBackend {
    async fn select(
        &self,
        table: Table,
        filters: &[Filter],
        access_token: Option<&str>,
    ) -> backend::Result<Vec<Row>> {
        self.inner.select(table, filters, access_token).await
    }

    async fn insert(
        &self,
        table: Table,
        row: Row,
        access_token: Option<&str>,
    ) -> backend::Result<Row> {
        self.inner.insert(table, row, access_token).await
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Row,
        access_token: Option<&str>,
    ) -> backend::Result<Vec<Row>> {
        self.inner.update(table, filters, patch, access_token).await
    }

    async fn upsert(
        &self,
        table: Table,
        row: Row,
        on_conflict: &str,
        resolution: Resolution,
        access_token: Option<&str>,
    ) -> backend::Result<Option<Row>> {
        self.inner
            .upsert(table, row, on_conflict, resolution, access_token)
            .await
    }
}

#[async_trait]
impl Storage for RacingBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        access_token: Option<&str>,
    ) -> backend::Result<()> {
        self.inner
            .upload(path, bytes, content_type, access_token)
            .await
    }

    fn public_url(&self, path: &str) -> backend::Result<Url> {
        self.inner.public_url(path)
    }
}

#[tokio::test]
async fn register_provisions_an_unpublished_card() {
    let backend = common::backend();
    let client = common::client(&backend);
    let mut session = common::register(&client, "alice").await;

    let account = session.account().clone();
    assert_eq!(account.username, "alice");
    assert_eq!(account.email, "alice@example.com");

    let draft = session.load_card().await.unwrap();
    let card = draft.card();
    assert_eq!(card.user_id, account.id);
    assert!(!card.is_published);
    assert!(card.office_showcase.images.is_empty());
    assert_eq!(card.personal_info.name, None);
    assert!(card.social_media.is_empty());
    let theme = &card.theme_customization;
    assert_eq!(theme.template, Some(Template::Modern));
    assert_eq!(theme.primary_color.as_deref(), Some("#3B82F6"));
    assert_eq!(theme.secondary_color.as_deref(), Some("#8B5CF6"));

    assert_eq!(backend.rows(Table::Users).len(), 1);
    assert_eq!(backend.rows(Table::BusinessCards).len(), 1);
}

#[tokio::test]
async fn duplicate_username_writes_nothing() {
    let backend = common::backend();
    let client = common::client(&backend);
    common::register(&client, "alice").await;

    let result = client
        .register("alice", "someone@example.com", PASSWORD)
        .await;
    assert!(matches!(result, Err(Error::DuplicateUsername)));
    assert_eq!(backend.rows(Table::Users).len(), 1);
    assert_eq!(backend.rows(Table::BusinessCards).len(), 1);
    assert!(matches!(
        client.login("someone@example.com", PASSWORD).await,
        Err(Error::InvalidCredentials)
    ));
}

#[tokio::test]
async fn duplicate_email_is_detected_case_insensitively() {
    let backend = common::backend();
    let client = common::client(&backend);
    common::register(&client, "alice").await;

    let result = client.register("bob", "Alice@Example.com", PASSWORD).await;
    assert!(matches!(result, Err(Error::DuplicateEmail)));
    assert_eq!(backend.rows(Table::Users).len(), 1);
}

#[tokio::test]
async fn invalid_forms_never_reach_the_backend() {
    let backend = common::backend();
    let client = common::client(&backend);

    match client.register("al", "not-an-email", "123").await {
        Err(Error::ValidationFailed(errors)) => {
            assert_eq!(
                errors.get("username"),
                Some("Username must be at least 3 characters")
            );
            assert_eq!(errors.get("email"), Some("Invalid email"));
            assert_eq!(
                errors.get("password"),
                Some("Password must be at least 6 characters")
            );
        }
        other => panic!("unexpected result: {:?}", other.map(|v| v.account().clone())),
    }
    assert!(matches!(
        client.login("alice@example.com", "").await,
        Err(Error::ValidationFailed(_))
    ));
    assert!(backend.rows(Table::Users).is_empty());
    assert_eq!(backend.active_sessions(), 0);
}

#[tokio::test]
async fn register_signs_in_when_sign_up_returns_no_session() {
    let backend = Arc::new(MemoryBackend::new().without_signup_sessions());
    let client = common::client(&backend);
    let mut session = common::register(&client, "alice").await;
    assert_eq!(session.account().username, "alice");
    assert!(session.load_card().await.is_ok());
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let backend = common::backend();
    let client = common::client(&backend);
    common::register(&client, "alice").await;

    assert!(matches!(
        client.login("alice@example.com", "wrong-password").await,
        Err(Error::InvalidCredentials)
    ));
    let session = client.login("ALICE@example.com", PASSWORD).await.unwrap();
    assert_eq!(session.account().username, "alice");
}

#[tokio::test]
async fn login_restores_a_missing_account() {
    let backend = common::backend();
    let client = common::client(&backend);
    backend
        .sign_up("carol@example.com", PASSWORD)
        .await
        .unwrap();

    let mut session = client.login("carol@example.com", PASSWORD).await.unwrap();
    assert_eq!(session.account().username, "carol");
    assert!(!session.load_card().await.unwrap().is_published());

    // a second login finds the account and keeps the single card
    client.login("carol@example.com", PASSWORD).await.unwrap();
    assert_eq!(backend.rows(Table::Users).len(), 1);
    assert_eq!(backend.rows(Table::BusinessCards).len(), 1);
}

#[tokio::test]
async fn restored_account_falls_back_to_an_id_based_username() {
    let backend = common::backend();
    let client = common::client(&backend);
    backend.put_row(Table::Users, common::user_row("dave"));
    let sign_up = backend.sign_up("dave@example.org", PASSWORD).await.unwrap();

    let session = client.login("dave@example.org", PASSWORD).await.unwrap();
    let expected = format!("user_{}", &sign_up.user.id.to_string()[..8]);
    assert_eq!(session.account().username, expected);
}

#[tokio::test]
async fn expired_tokens_are_refreshed() {
    let backend = Arc::new(MemoryBackend::new().with_token_lifetime(0));
    let client = common::client(&backend);
    let mut session = common::register(&client, "alice").await;

    let before = session.tokens().clone();
    let draft = session.load_card().await.unwrap();
    assert_ne!(session.tokens().access_token, before.access_token);
    assert_ne!(session.tokens().refresh_token, before.refresh_token);
    assert_eq!(draft.user_id(), session.account().id);
}

#[tokio::test]
async fn username_update() {
    let backend = common::backend();
    let client = common::client(&backend);
    let mut alice = common::register(&client, "alice").await;
    common::register(&client, "bob").await;

    assert!(matches!(
        alice.update_username("bob").await,
        Err(Error::DuplicateUsername)
    ));
    assert!(matches!(
        alice.update_username("x").await,
        Err(Error::ValidationFailed(_))
    ));
    let unchanged = alice.update_username("alice").await.unwrap().clone();
    assert_eq!(unchanged.updated_at, alice.account().updated_at);

    let account = alice.update_username("alicia").await.unwrap();
    assert_eq!(account.username, "alicia");
    assert_eq!(
        alice.public_url().unwrap().as_str(),
        "https://cards.example.com/businesscard/alicia"
    );
    assert_eq!(
        alice.reload_account().await.unwrap().username,
        "alicia"
    );
}

#[tokio::test]
async fn logout_is_best_effort() {
    let backend = common::backend();
    let client = common::client(&backend);
    let session = common::register(&client, "alice").await;
    assert_eq!(backend.active_sessions(), 1);

    let copy = session.clone();
    session.logout().await;
    assert_eq!(backend.active_sessions(), 0);
    // the token is already revoked, the failure is only logged
    copy.logout().await;
}

#[tokio::test]
async fn password_reset_does_not_reveal_accounts() {
    let backend = common::backend();
    let client = common::client(&backend);
    common::register(&client, "alice").await;

    client.reset_password("alice@example.com").await.unwrap();
    client.reset_password("nobody@example.com").await.unwrap();
    assert!(matches!(
        client.reset_password("nobody").await,
        Err(Error::ValidationFailed(_))
    ));

    let resets = backend.password_resets();
    assert_eq!(resets.len(), 2);
    assert_eq!(
        resets[0].redirect_to.as_str(),
        "https://cards.example.com/reset-password"
    );
}

fn state_name(identity: &Identity) -> &'static str {
    match identity.state() {
        AuthState::Anonymous => "anonymous",
        AuthState::Authenticating => "authenticating",
        AuthState::Authenticated(_) => "authenticated",
    }
}

#[tokio::test]
async fn identity_state_machine() {
    let backend = common::backend();
    let mut identity = Identity::new(Client::with_backend(common::config(), backend.clone()));
    assert_eq!(state_name(&identity), "anonymous");
    assert!(matches!(identity.session(), Err(Error::NotSignedIn)));

    let account = identity
        .register("alice", "alice@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(state_name(&identity), "authenticated");
    assert_eq!(identity.account(), Some(&account));

    identity.logout().await;
    assert_eq!(state_name(&identity), "anonymous");
    assert_eq!(backend.active_sessions(), 0);

    assert!(identity
        .login("alice@example.com", "wrong-password")
        .await
        .is_err());
    assert_eq!(state_name(&identity), "anonymous");

    identity.login("alice@example.com", PASSWORD).await.unwrap();
    assert!(identity.is_authenticated());
    // signing in again replaces the previous session
    identity.login("alice@example.com", PASSWORD).await.unwrap();
    assert_eq!(backend.active_sessions(), 1);
    assert_eq!(identity.session_mut().unwrap().account().id, account.id);
}

#[tokio::test]
async fn login_provisions_a_missing_card() {
    let backend = common::backend();
    let client = common::client(&backend);
    let sign_up = backend
        .sign_up("frank@example.com", PASSWORD)
        .await
        .unwrap();
    let mut user = common::user_row("frank");
    user.insert("id".to_owned(), json!(sign_up.user.id));
    backend.put_row(Table::Users, user);
    assert!(backend.rows(Table::BusinessCards).is_empty());

    let mut session = client.login("frank@example.com", PASSWORD).await.unwrap();
    assert_eq!(session.account().username, "frank");
    let draft = session.load_card().await.unwrap();
    assert!(!draft.is_published());
    assert_eq!(draft.user_id(), sign_up.user.id);

    client.login("frank@example.com", PASSWORD).await.unwrap();
    assert_eq!(backend.rows(Table::Users).len(), 1);
    assert_eq!(backend.rows(Table::BusinessCards).len(), 1);
}

#[tokio::test]
async fn register_losing_the_username_race() {
    let memory = common::backend();
    let racing = Arc::new(RacingBackend::new(memory.clone(), common::user_row("alice")));
    let client = Client::with_backend(common::config(), racing);

    let result = client.register("alice", "late@example.com", PASSWORD).await;
    assert!(matches!(result, Err(Error::DuplicateUsername)));
    let users = memory.rows(Table::Users);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], json!("alice@example.com"));
    assert!(memory.rows(Table::BusinessCards).is_empty());

    // the identity was created, so registering the same email again is refused
    let retry = client.register("alice_two", "late@example.com", PASSWORD).await;
    assert!(matches!(retry, Err(Error::DuplicateEmail)));
    assert_eq!(memory.rows(Table::Users).len(), 1);

    // signing in creates the missing account and card
    let mut session = client.login("late@example.com", PASSWORD).await.unwrap();
    assert_eq!(session.account().username, "late");
    assert!(session.load_card().await.is_ok());
    assert_eq!(memory.rows(Table::Users).len(), 2);
    assert_eq!(memory.rows(Table::BusinessCards).len(), 1);
}
