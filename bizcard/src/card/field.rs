use crate::social::Platform;
use std::fmt;

/// A section of a card, stored in its own column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Group {
    PersonalInfo,
    BusinessInfo,
    SocialMedia,
    OfficeShowcase,
    MediaIntegration,
    GoogleReviews,
    ThemeCustomization,
}

impl Group {
    pub const ALL: [Group; 7] = [
        Self::PersonalInfo,
        Self::BusinessInfo,
        Self::SocialMedia,
        Self::OfficeShowcase,
        Self::MediaIntegration,
        Self::GoogleReviews,
        Self::ThemeCustomization,
    ];

    /// Returns the name of the column holding the group.
    pub fn column(self) -> &'static str {
        match self {
            Self::PersonalInfo => "personal_info",
            Self::BusinessInfo => "business_info",
            Self::SocialMedia => "social_media",
            Self::OfficeShowcase => "office_showcase",
            Self::MediaIntegration => "media_integration",
            Self::GoogleReviews => "google_reviews",
            Self::ThemeCustomization => "theme_customization",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A single-valued text field of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    Phone,
    Address,
    Photo,
    BusinessName,
    Services,
    Description,
    Logo,
    BusinessCardImage,
    Social(Platform),
    Location,
    GoogleMapsEmbed,
    YoutubeChannel,
    InstagramReels,
    FeaturedVideo,
    ReviewLink,
    Rating,
    ReviewText,
    Template,
    PrimaryColor,
    SecondaryColor,
    FontFamily,
    Layout,
}

const FIXED: [Field; 23] = [
    Field::Name,
    Field::Email,
    Field::Phone,
    Field::Address,
    Field::Photo,
    Field::BusinessName,
    Field::Services,
    Field::Description,
    Field::Logo,
    Field::BusinessCardImage,
    Field::Location,
    Field::GoogleMapsEmbed,
    Field::YoutubeChannel,
    Field::InstagramReels,
    Field::FeaturedVideo,
    Field::ReviewLink,
    Field::Rating,
    Field::ReviewText,
    Field::Template,
    Field::PrimaryColor,
    Field::SecondaryColor,
    Field::FontFamily,
    Field::Layout,
];

impl Field {
    /// Returns the group the field belongs to.
    pub fn group(self) -> Group {
        match self {
            Self::Name | Self::Email | Self::Phone | Self::Address | Self::Photo => {
                Group::PersonalInfo
            }
            Self::BusinessName
            | Self::Services
            | Self::Description
            | Self::Logo
            | Self::BusinessCardImage => Group::BusinessInfo,
            Self::Social(_) => Group::SocialMedia,
            Self::Location | Self::GoogleMapsEmbed => Group::OfficeShowcase,
            Self::YoutubeChannel | Self::InstagramReels | Self::FeaturedVideo => {
                Group::MediaIntegration
            }
            Self::ReviewLink | Self::Rating | Self::ReviewText => Group::GoogleReviews,
            Self::Template
            | Self::PrimaryColor
            | Self::SecondaryColor
            | Self::FontFamily
            | Self::Layout => Group::ThemeCustomization,
        }
    }

    /// Returns the key of the field within its group.
    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::Photo => "photo",
            Self::BusinessName => "business_name",
            Self::Services => "services",
            Self::Description => "description",
            Self::Logo => "logo",
            Self::BusinessCardImage => "business_card",
            Self::Social(platform) => platform.key(),
            Self::Location => "location",
            Self::GoogleMapsEmbed => "google_maps_embed",
            Self::YoutubeChannel => "youtube_channel",
            Self::InstagramReels => "instagram_reels",
            Self::FeaturedVideo => "featured_video",
            Self::ReviewLink => "review_link",
            Self::Rating => "rating",
            Self::ReviewText => "review_text",
            Self::Template => "template",
            Self::PrimaryColor => "primary_color",
            Self::SecondaryColor => "secondary_color",
            Self::FontFamily => "font_family",
            Self::Layout => "layout",
        }
    }

    /// Looks up a field by its group and key, as used by form inputs.
    pub fn from_key(group: Group, key: &str) -> Option<Self> {
        if group == Group::SocialMedia {
            return key.parse().ok().map(Self::Social);
        }
        FIXED
            .iter()
            .copied()
            .find(|v| v.group() == group && v.key() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group(), self.key())
    }
}

/// A field holding uploaded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageField {
    Photo,
    Logo,
    BusinessCardImage,
    /// The ordered image sequence of the office showcase.
    OfficeImages,
}

impl ImageField {
    pub fn group(self) -> Group {
        match self {
            Self::Photo => Group::PersonalInfo,
            Self::Logo | Self::BusinessCardImage => Group::BusinessInfo,
            Self::OfficeImages => Group::OfficeShowcase,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Logo => "logo",
            Self::BusinessCardImage => "business_card",
            Self::OfficeImages => "images",
        }
    }

    /// Returns whether the field holds a sequence of images.
    pub fn is_list(self) -> bool {
        self == Self::OfficeImages
    }

    /// Returns the text field holding the URL of a single-valued image field.
    pub fn field(self) -> Option<Field> {
        match self {
            Self::Photo => Some(Field::Photo),
            Self::Logo => Some(Field::Logo),
            Self::BusinessCardImage => Some(Field::BusinessCardImage),
            Self::OfficeImages => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_found_by_key() {
        for field in FIXED.iter().copied() {
            assert_eq!(Field::from_key(field.group(), field.key()), Some(field));
        }
        assert_eq!(
            Field::from_key(Group::SocialMedia, "github"),
            Some(Field::Social(Platform::Github))
        );
        assert_eq!(Field::from_key(Group::PersonalInfo, "logo"), None);
        assert_eq!(Field::from_key(Group::SocialMedia, "myspace"), None);
    }

    #[test]
    fn image_fields() {
        assert!(ImageField::OfficeImages.is_list());
        assert_eq!(ImageField::OfficeImages.field(), None);
        assert_eq!(
            ImageField::BusinessCardImage.field().map(Field::key),
            Some("business_card")
        );
        assert_eq!(Field::Social(Platform::Twitter).to_string(), "social_media.twitter");
    }
}
