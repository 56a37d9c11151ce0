#![allow(dead_code)] // https://github.com/rust-lang/rust/issues/46379

use bizcard::backend::{MemoryBackend, Row};
use bizcard::{Client, Config, Session};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

pub const BACKEND_URL: &str = "http://localhost:54321";
pub const SITE_URL: &str = "https://cards.example.com/";
pub const PASSWORD: &str = "secret1";

pub fn config() -> Config {
    Config::new(Url::parse(BACKEND_URL).unwrap(), "anon-key")
        .with_site_url(Url::parse(SITE_URL).unwrap())
}

pub fn backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new())
}

pub fn client(backend: &Arc<MemoryBackend>) -> Client {
    Client::with_backend(config(), backend.clone())
}

pub fn email(username: &str) -> String {
    format!("{}@example.com", username)
}

pub async fn register(client: &Client, username: &str) -> Session {
    client
        .register(username, &email(username), PASSWORD)
        .await
        .unwrap()
}

pub fn row(value: Value) -> Row {
    value.as_object().unwrap().clone()
}

/// Returns a complete `users` row owned by a fresh id.
pub fn user_row(username: &str) -> Row {
    let now = Utc::now().to_rfc3339();
    row(json!({
        "id": Uuid::new_v4(),
        "email": email(username),
        "username": username,
        "created_at": now,
        "updated_at": now,
    }))
}
