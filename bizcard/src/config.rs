//! Module for the configuration of the backend and the public site.

use derive_setters::Setters;
use std::env;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Environment variable holding the URL of the hosted backend project.
pub const BACKEND_URL_VAR: &str = "BIZCARD_BACKEND_URL";
/// Environment variable holding the public API key of the backend project.
pub const BACKEND_KEY_VAR: &str = "BIZCARD_BACKEND_KEY";
/// Environment variable holding the origin of the public site.
pub const SITE_URL_VAR: &str = "BIZCARD_SITE_URL";
/// Environment variable holding the path namespace of public cards.
pub const NAMESPACE_VAR: &str = "BIZCARD_NAMESPACE";
/// Environment variable holding the storage bucket for uploads.
pub const BUCKET_VAR: &str = "BIZCARD_BUCKET";

const DEFAULT_SITE_URL: &str = "http://localhost:5173/";
const DEFAULT_NAMESPACE: &str = "businesscard";
const DEFAULT_BUCKET: &str = "uploads";
const PLACEHOLDERS: &[&str] = &["your_supabase_url_here", "your_supabase_anon_key_here"];

/// Instructions shown instead of the application while the backend is not configured.
pub const SETUP_GUIDANCE: &str = "\
Database setup required

To use the digital business card builder, connect a backend project first:

1. Create a project with the hosted backend provider.
2. Create the `users` and `business_cards` tables and the `uploads` storage bucket.
3. Set BIZCARD_BACKEND_URL to the project URL and BIZCARD_BACKEND_KEY to its public API key.
4. Restart the application. Once connected, you can start creating business cards!
";

/// Error returned when the configuration is incomplete or invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The backend URL or key is missing or still a placeholder.
    #[error("backend is not configured (missing {})", .missing.join(", "))]
    NotConfigured { missing: Vec<&'static str> },
    /// A configured URL could not be parsed.
    #[error("invalid URL in {var}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
}

impl ConfigError {
    /// Returns the setup instructions to present instead of the application.
    pub fn setup_guidance(&self) -> &'static str {
        SETUP_GUIDANCE
    }
}

/// Configuration of the backend connection and the public site.
#[derive(Debug, Clone, PartialEq, Eq, Setters)]
#[setters(prefix = "with_")]
pub struct Config {
    /// URL of the hosted backend project.
    #[setters(skip)]
    pub backend_url: Url,
    /// Public API key of the backend project.
    #[setters(skip)]
    pub api_key: String,
    /// Origin of the site serving the public cards.
    pub site_url: Url,
    /// First path segment of public card URLs.
    #[setters(into)]
    pub namespace: String,
    /// Storage bucket receiving uploaded images.
    #[setters(into)]
    pub bucket: String,
}

impl Config {
    /// Creates a new [`Config`] with the default site, namespace and bucket.
    pub fn new<K: Into<String>>(backend_url: Url, api_key: K) -> Self {
        Self {
            backend_url,
            api_key: api_key.into(),
            site_url: Url::parse(DEFAULT_SITE_URL).unwrap(),
            namespace: DEFAULT_NAMESPACE.to_owned(),
            bucket: DEFAULT_BUCKET.to_owned(),
        }
    }

    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, which maps variable names to values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty() && !PLACEHOLDERS.contains(&v.as_str()))
        };

        let backend_url = var(BACKEND_URL_VAR);
        let api_key = var(BACKEND_KEY_VAR);
        let (backend_url, api_key) = match (backend_url, api_key) {
            (Some(url), Some(key)) => (url, key),
            (url, key) => {
                let mut missing = Vec::new();
                if url.is_none() {
                    missing.push(BACKEND_URL_VAR);
                }
                if key.is_none() {
                    missing.push(BACKEND_KEY_VAR);
                }
                warn!(?missing, "backend is not configured");
                return Err(ConfigError::NotConfigured { missing });
            }
        };
        let parse = |name: &'static str, value: &str| {
            Url::parse(value).map_err(|source| ConfigError::InvalidUrl { var: name, source })
        };

        let mut config = Self::new(parse(BACKEND_URL_VAR, &backend_url)?, api_key);
        match var(SITE_URL_VAR) {
            Some(v) => config.site_url = parse(SITE_URL_VAR, &v)?,
            None => info!("{} not set, using default: {}", SITE_URL_VAR, DEFAULT_SITE_URL),
        }
        if let Some(v) = var(NAMESPACE_VAR) {
            config.namespace = v.trim_matches('/').to_owned();
        }
        if let Some(v) = var(BUCKET_VAR) {
            config.bucket = v;
        }
        Ok(config)
    }

    /// Returns the URL of the public card of `username`, `<site>/<namespace>/<username>`.
    pub fn public_card_url(&self, username: &str) -> Result<Url, url::ParseError> {
        let mut url = self.site_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(&self.namespace)
            .push(username);
        Ok(url)
    }

    /// Returns the URL that password reset emails link to.
    pub fn password_reset_url(&self) -> Result<Url, url::ParseError> {
        let mut url = self.site_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("reset-password");
        Ok(url)
    }
}
