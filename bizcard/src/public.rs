//! Module for the public view of published cards.

use crate::account::request as accounts;
use crate::backend::{self, Backend};
use crate::card::{
    self, Card, Rating, SocialMedia, Template, ThemeCustomization, DEFAULT_FONT_FAMILY,
    DEFAULT_PRIMARY_COLOR, DEFAULT_SECONDARY_COLOR,
};
use crate::config::Config;
use crate::{social::Platform, Error, Result};
use std::fmt;
use tracing::{debug, warn};
use url::Url;

/// Angle of the card background gradient in degrees.
pub const GRADIENT_ANGLE: u16 = 135;

/// A link to a social media profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SocialLink {
    pub platform: Platform,
    /// Display name of the platform.
    pub name: &'static str,
    pub icon: &'static str,
    pub handle: String,
    pub url: Url,
}

/// A linear background gradient.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gradient {
    pub angle: u16,
    pub from: String,
    pub to: String,
}

impl fmt::Display for Gradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "linear-gradient({}deg, {} 0%, {} 100%)",
            self.angle, self.from, self.to
        )
    }
}

/// The resolved look of a public card, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThemeStyle {
    pub gradient: Gradient,
    pub font_family: String,
    pub template: Template,
    pub layout: Option<String>,
}

fn non_empty(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_owned()
}

impl From<&ThemeCustomization> for ThemeStyle {
    fn from(theme: &ThemeCustomization) -> Self {
        Self {
            gradient: Gradient {
                angle: GRADIENT_ANGLE,
                from: non_empty(&theme.primary_color, DEFAULT_PRIMARY_COLOR),
                to: non_empty(&theme.secondary_color, DEFAULT_SECONDARY_COLOR),
            },
            font_family: non_empty(&theme.font_family, DEFAULT_FONT_FAMILY),
            template: theme.template.unwrap_or_default(),
            layout: theme.layout.clone(),
        }
    }
}

/// Five stars, of which the stars `n` with `n <= rating` are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StarRating {
    pub rating: Rating,
}

impl StarRating {
    /// Returns for each star whether it is filled.
    pub fn stars(self) -> [bool; 5] {
        let mut stars = [false; 5];
        for (n, star) in (1..).zip(stars.iter_mut()) {
            *star = n <= self.rating.whole_stars();
        }
        stars
    }

    pub fn filled(self) -> u8 {
        self.rating.whole_stars()
    }
}

/// The public view of a published card.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicCardView {
    pub username: String,
    pub card: Card,
    pub social_links: Vec<SocialLink>,
    pub theme: ThemeStyle,
    /// `None` if the card has no rating.
    pub stars: Option<StarRating>,
    /// The URL the card is published at.
    pub url: Url,
}

/// Returns the links of the non-empty handles in platform order.
pub fn social_links(social_media: &SocialMedia) -> Vec<SocialLink> {
    social_media
        .iter()
        .filter(|(_, handle)| !handle.trim().is_empty())
        .filter_map(|(platform, handle)| match platform.profile_url(handle) {
            Ok(url) => Some(SocialLink {
                platform,
                name: platform.name(),
                icon: platform.icon(),
                handle: handle.trim().to_owned(),
                url,
            }),
            Err(e) => {
                warn!(%platform, error = %e, "skipping malformed social media handle");
                None
            }
        })
        .collect()
}

impl PublicCardView {
    /// Builds the view of `card` published under `username`.
    pub fn new(username: String, card: Card, url: Url) -> Self {
        Self {
            social_links: social_links(&card.social_media),
            theme: ThemeStyle::from(&card.theme_customization),
            stars: card.google_reviews.rating.map(|rating| StarRating { rating }),
            username,
            card,
            url,
        }
    }
}

async fn find(
    backend: &dyn Backend,
    config: &Config,
    username: &str,
) -> backend::Result<Option<PublicCardView>> {
    let account = match accounts::find_by_username(backend, username).await? {
        Some(v) => v,
        None => return Ok(None),
    };
    let card = match card::request::load_published(backend, account.id).await? {
        Some(v) => v,
        None => return Ok(None),
    };
    let url = config.public_card_url(&account.username)?;
    Ok(Some(PublicCardView::new(account.username, card, url)))
}

/// Resolves the published card of `username`.
///
/// Unknown users, unpublished cards and failed lookups all yield [`Error::NotFound`].
pub async fn resolve(
    backend: &dyn Backend,
    config: &Config,
    username: &str,
) -> Result<PublicCardView> {
    let username = username.trim();
    match find(backend, config, username).await {
        Ok(Some(v)) => Ok(v),
        Ok(None) => {
            debug!(username, "no published card");
            Err(Error::NotFound)
        }
        Err(e) => {
            warn!(username, error = %e, "failed to resolve public card");
            Err(Error::NotFound)
        }
    }
}
