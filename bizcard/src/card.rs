//! Module for business card resources.
//!
//! A [`Card`] is stored as one row of the `business_cards` table. Each section of the card is a
//! separate column holding a JSON object. A section that is stored as `null` or missing
//! entirely is read as its empty value, so consumers only ever check individual fields.

use crate::{backend::Row, social::Platform, util};
use chrono::{DateTime, FixedOffset};
use serde::{de, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::{fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

pub use draft::CardDraft;
pub use field::{Field, Group, ImageField};

mod draft;
mod field;
pub(crate) mod request;

/// Primary color of a newly provisioned card.
pub const DEFAULT_PRIMARY_COLOR: &str = "#3B82F6";
/// Secondary color of a newly provisioned card.
pub const DEFAULT_SECONDARY_COLOR: &str = "#8B5CF6";
/// Font family used when a card does not set one.
pub const DEFAULT_FONT_FAMILY: &str = "Inter";

/// Personal contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct PersonalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// URL of the profile photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// Details about the business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct BusinessInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// URL of the business logo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// URL of an image of a printed business card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_card: Option<String>,
}

/// Social media handles keyed by platform.
///
/// Keys of platforms that are not supported are dropped when reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SocialMedia(BTreeMap<Platform, String>);

impl SocialMedia {
    /// Returns the handle on `platform`.
    pub fn get(&self, platform: Platform) -> Option<&str> {
        self.0.get(&platform).map(String::as_str)
    }

    /// Sets or, if `handle` is `None`, removes the handle on `platform`.
    pub fn set(&mut self, platform: Platform, handle: Option<String>) {
        match handle {
            Some(v) => {
                self.0.insert(platform, v);
            }
            None => {
                self.0.remove(&platform);
            }
        }
    }

    /// Returns the handles in platform order.
    pub fn iter(&self) -> impl Iterator<Item = (Platform, &str)> + '_ {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SocialMedia {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (platform, handle) in &self.0 {
            map.serialize_entry(platform.key(), handle)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SocialMedia {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = HashMap::<String, Value>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .filter_map(|(key, value)| {
                    let platform = key.parse::<Platform>().ok()?;
                    match value {
                        Value::String(handle) => Some((platform, handle)),
                        _ => None,
                    }
                })
                .collect(),
        ))
    }
}

/// Images and location of the office.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct OfficeShowcase {
    /// URLs of the office images in display order.
    #[serde(default, deserialize_with = "util::deserialize_optional")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// URL of an embedded map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_embed: Option<String>,
}

/// Links to video and social media content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct MediaIntegration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_reels: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_video: Option<String>,
}

/// Error returned for a rating outside of `[1, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("Rating must be between 1 and 5")]
pub struct InvalidRating;

/// A review rating between 1 and 5 with one decimal of precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rating(u8);

impl Rating {
    /// Creates a new [`Rating`], rounding `value` to one decimal.
    pub fn new(value: f64) -> Result<Self, InvalidRating> {
        if !value.is_finite() || !(1.0..=5.0).contains(&value) {
            return Err(InvalidRating);
        }
        Ok(Self((value * 10.0).round() as u8))
    }

    /// Returns the rating as a number.
    pub fn value(self) -> f64 {
        f64::from(self.0) / 10.0
    }

    /// Returns the number of whole stars, i.e. the stars `n` with `n <= rating`.
    pub fn whole_stars(self) -> u8 {
        self.0 / 10
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 10 == 0 {
            write!(f, "{}", self.0 / 10)
        } else {
            write!(f, "{}.{}", self.0 / 10, self.0 % 10)
        }
    }
}

impl FromStr for Rating {
    type Err = InvalidRating;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<f64>()
            .map_err(|_| InvalidRating)
            .and_then(Self::new)
    }
}

impl Serialize for Rating {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.value())
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Self::new(value).map_err(de::Error::custom)
    }
}

/// Review summary shown on the card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct GoogleReviews {
    /// Link to the external review page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_link: Option<String>,
    #[serde(
        default,
        deserialize_with = "util::deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<Rating>,
    /// A sample review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_text: Option<String>,
}

/// Error returned when parsing an unknown template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown template: {0}")]
pub struct UnknownTemplate(pub String);

/// A visual template of the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Modern,
    Classic,
    Vibrant,
    Nature,
    Elegant,
    Minimal,
}

impl Template {
    pub const ALL: [Template; 6] = [
        Self::Modern,
        Self::Classic,
        Self::Vibrant,
        Self::Nature,
        Self::Elegant,
        Self::Minimal,
    ];

    /// Returns the identifier of the template.
    pub fn key(self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Classic => "classic",
            Self::Vibrant => "vibrant",
            Self::Nature => "nature",
            Self::Elegant => "elegant",
            Self::Minimal => "minimal",
        }
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::Modern
    }
}

impl FromStr for Template {
    type Err = UnknownTemplate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.key() == s)
            .ok_or_else(|| UnknownTemplate(s.to_owned()))
    }
}

/// Look of the public card.
///
/// The default value is the theme of a newly provisioned card. It is also used when the stored
/// theme is `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ThemeCustomization {
    #[serde(
        default,
        deserialize_with = "util::deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub template: Option<Template>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

impl Default for ThemeCustomization {
    fn default() -> Self {
        Self {
            template: Some(Template::Modern),
            primary_color: Some(DEFAULT_PRIMARY_COLOR.to_owned()),
            secondary_color: Some(DEFAULT_SECONDARY_COLOR.to_owned()),
            font_family: None,
            layout: None,
        }
    }
}

/// A business card resource.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Card {
    pub id: Uuid,
    /// The id of the owning account.
    pub user_id: Uuid,
    #[serde(default, deserialize_with = "util::deserialize_optional")]
    pub personal_info: PersonalInfo,
    #[serde(default, deserialize_with = "util::deserialize_optional")]
    pub business_info: BusinessInfo,
    #[serde(default, deserialize_with = "util::deserialize_optional")]
    pub social_media: SocialMedia,
    #[serde(default, deserialize_with = "util::deserialize_optional")]
    pub office_showcase: OfficeShowcase,
    #[serde(default, deserialize_with = "util::deserialize_optional")]
    pub media_integration: MediaIntegration,
    #[serde(default, deserialize_with = "util::deserialize_optional")]
    pub google_reviews: GoogleReviews,
    #[serde(default, deserialize_with = "util::deserialize_optional")]
    pub theme_customization: ThemeCustomization,
    /// Whether the card is visible on its public page.
    #[serde(default, deserialize_with = "util::deserialize_optional")]
    pub is_published: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl Card {
    /// Returns the row of a new, unpublished card of `user_id` with every section empty.
    pub(crate) fn empty_row(user_id: Uuid) -> Row {
        util::row(json!({
            "user_id": user_id,
            "personal_info": {},
            "business_info": {},
            "social_media": {},
            "office_showcase": { "images": [] },
            "media_integration": {},
            "google_reviews": {},
            "theme_customization": ThemeCustomization::default(),
            "is_published": false,
        }))
    }

    /// Returns the columns holding the sections of the card.
    pub(crate) fn content_row(&self) -> Result<Row, serde_json::Error> {
        Ok(util::row(json!({
            "personal_info": serde_json::to_value(&self.personal_info)?,
            "business_info": serde_json::to_value(&self.business_info)?,
            "social_media": serde_json::to_value(&self.social_media)?,
            "office_showcase": serde_json::to_value(&self.office_showcase)?,
            "media_integration": serde_json::to_value(&self.media_integration)?,
            "google_reviews": serde_json::to_value(&self.google_reviews)?,
            "theme_customization": serde_json::to_value(&self.theme_customization)?,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(value: Value) -> Card {
        serde_json::from_value(value).unwrap()
    }

    fn timestamps() -> Value {
        json!("2024-05-01T10:00:00.000000+00:00")
    }

    #[test]
    fn null_sections_read_as_empty() {
        let card = card(json!({
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "personal_info": null,
            "business_info": null,
            "social_media": null,
            "office_showcase": null,
            "theme_customization": null,
            "is_published": null,
            "created_at": timestamps(),
            "updated_at": timestamps(),
        }));
        assert_eq!(card.personal_info, PersonalInfo::default());
        assert_eq!(card.business_info, BusinessInfo::default());
        assert!(card.social_media.is_empty());
        assert!(card.office_showcase.images.is_empty());
        assert_eq!(card.media_integration, MediaIntegration::default());
        assert_eq!(card.google_reviews, GoogleReviews::default());
        assert_eq!(card.theme_customization, ThemeCustomization::default());
        assert!(!card.is_published);
    }

    #[test]
    fn unknown_platforms_and_malformed_values_are_dropped() {
        let card = card(json!({
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "social_media": { "github": "alice", "myspace": "alice", "twitter": 5 },
            "google_reviews": { "rating": 9.5, "review_text": "Great" },
            "theme_customization": { "template": "neon", "primary_color": "#000000" },
            "created_at": timestamps(),
            "updated_at": timestamps(),
        }));
        assert_eq!(
            card.social_media.iter().collect::<Vec<_>>(),
            vec![(Platform::Github, "alice")]
        );
        assert_eq!(card.google_reviews.rating, None);
        assert_eq!(card.google_reviews.review_text.as_deref(), Some("Great"));
        assert_eq!(card.theme_customization.template, None);
        assert_eq!(card.theme_customization.secondary_color, None);
    }

    #[test]
    fn rating_bounds_and_precision() {
        assert_eq!(Rating::new(4.44).unwrap().to_string(), "4.4");
        assert_eq!(Rating::new(5.0).unwrap().to_string(), "5");
        assert_eq!(Rating::new(0.9), Err(InvalidRating));
        assert_eq!(Rating::new(5.1), Err(InvalidRating));
        assert_eq!(Rating::new(f64::NAN), Err(InvalidRating));
        assert_eq!("3.7".parse::<Rating>().unwrap().whole_stars(), 3);
        assert_eq!("abc".parse::<Rating>(), Err(InvalidRating));
        assert_eq!(serde_json::to_value(Rating::new(4.5).unwrap()).unwrap(), json!(4.5));
    }

    #[test]
    fn empty_row_has_default_theme() {
        let user_id = Uuid::new_v4();
        let row = Card::empty_row(user_id);
        assert_eq!(
            row["theme_customization"],
            json!({ "template": "modern", "primary_color": "#3B82F6", "secondary_color": "#8B5CF6" })
        );
        assert_eq!(row["office_showcase"], json!({ "images": [] }));
        assert_eq!(row["is_published"], json!(false));
        assert_eq!(row["user_id"], json!(user_id.to_string()));
    }
}
