//! Client library for creating and publishing digital business cards.
//!
//! An account owns exactly one [`Card`]. The owner edits a [`CardDraft`] locally and publishes
//! it, after which the card is reachable at `<site>/<namespace>/<username>` through
//! [`Client::public_card`].
//!
//! # Example
//!
//! ```ignore
//! use bizcard::{card::Field, social::Platform, Client, Config, Identity};
//!
//! let mut identity = Identity::new(Client::new(Config::from_env()?)?);
//! identity.register("alice", "alice@example.com", "secret1").await?;
//!
//! let session = identity.session_mut()?;
//! let mut draft = session.load_card().await?;
//! draft.set_field(Field::Name, "Alice")?;
//! draft.set_field(Field::Social(Platform::Github), "alice")?;
//! session.publish(&mut draft).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

use std::result::Result as StdResult;

pub use bizcard_backend as backend;
pub use card::{Card, CardDraft};
pub use client::Client;
pub use config::{Config, ConfigError};
pub use error::Error;
pub use identity::{AuthState, Identity};
pub use public::PublicCardView;
pub use session::{Session, Tokens};
pub use upload::ImageFile;

mod client;
mod error;
mod session;
mod util;

pub mod account;
pub mod card;
pub mod config;
pub mod identity;
pub mod public;
pub mod social;
pub mod upload;
pub mod validate;

/// Type alias for `Result<T, Error>`.
pub type Result<T, E = Error> = StdResult<T, E>;
