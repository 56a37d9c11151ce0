//! Module for the supported social media platforms.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use url::Url;

/// A social media platform a card can link to.
///
/// The declaration order is the order in which links are displayed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Twitter,
    Youtube,
    Linkedin,
    Facebook,
    Github,
    Reddit,
    Pinterest,
    Snapchat,
    Discord,
    Telegram,
}

/// Error returned when parsing an unknown platform key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown social media platform: {0}")]
pub struct UnknownPlatform(pub String);

impl Platform {
    /// All platforms in display order.
    pub const ALL: [Platform; 11] = [
        Self::Instagram,
        Self::Twitter,
        Self::Youtube,
        Self::Linkedin,
        Self::Facebook,
        Self::Github,
        Self::Reddit,
        Self::Pinterest,
        Self::Snapchat,
        Self::Discord,
        Self::Telegram,
    ];

    /// Returns the key under which the handle is stored.
    pub fn key(self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Twitter => "twitter",
            Self::Youtube => "youtube",
            Self::Linkedin => "linkedin",
            Self::Facebook => "facebook",
            Self::Github => "github",
            Self::Reddit => "reddit",
            Self::Pinterest => "pinterest",
            Self::Snapchat => "snapchat",
            Self::Discord => "discord",
            Self::Telegram => "telegram",
        }
    }

    /// Returns the display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::Twitter => "Twitter/X",
            Self::Youtube => "YouTube",
            Self::Linkedin => "LinkedIn",
            Self::Facebook => "Facebook",
            Self::Github => "GitHub",
            Self::Reddit => "Reddit",
            Self::Pinterest => "Pinterest",
            Self::Snapchat => "Snapchat",
            Self::Discord => "Discord",
            Self::Telegram => "Telegram",
        }
    }

    /// Returns the URL that a handle is appended to.
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Instagram => "https://instagram.com/",
            Self::Twitter => "https://twitter.com/",
            Self::Youtube => "https://youtube.com/c/",
            Self::Linkedin => "https://linkedin.com/in/",
            Self::Facebook => "https://facebook.com/",
            Self::Github => "https://github.com/",
            Self::Reddit => "https://reddit.com/u/",
            Self::Pinterest => "https://pinterest.com/",
            Self::Snapchat => "https://snapchat.com/add/",
            Self::Discord => "https://discord.gg/",
            Self::Telegram => "https://t.me/",
        }
    }

    /// Returns the name of the icon representing the platform.
    pub fn icon(self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Twitter => "twitter",
            Self::Youtube => "youtube",
            Self::Linkedin => "linkedin",
            Self::Facebook => "facebook",
            Self::Github => "github",
            Self::Reddit => "message-circle",
            Self::Pinterest | Self::Snapchat => "camera",
            Self::Discord => "gamepad-2",
            Self::Telegram => "send",
        }
    }

    /// Returns the profile URL of `handle` on this platform.
    pub fn profile_url(self, handle: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}{}", self.base_url(), handle.trim()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.key() == s)
            .ok_or_else(|| UnknownPlatform(s.to_owned()))
    }
}
