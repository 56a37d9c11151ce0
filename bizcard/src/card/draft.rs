use super::{Card, Field, ImageField, Rating, Template};
use crate::{validate::ValidationErrors, Error};
use uuid::Uuid;

/// The working copy of a card being edited.
///
/// Edits only change the local copy. They become visible to others once the draft is
/// published with [`Session::publish`](crate::Session::publish).
#[derive(Debug, Clone, PartialEq)]
pub struct CardDraft {
    card: Card,
}

fn text(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

impl CardDraft {
    /// Creates a new [`CardDraft`] starting from `card`.
    pub fn new(card: Card) -> Self {
        Self { card }
    }

    pub fn card(&self) -> &Card {
        &self.card
    }

    pub fn into_card(self) -> Card {
        self.card
    }

    /// Returns the id of the account owning the card.
    pub fn user_id(&self) -> Uuid {
        self.card.user_id
    }

    /// Returns whether the card was published when it was loaded or last published.
    pub fn is_published(&self) -> bool {
        self.card.is_published
    }

    /// Sets `field` to `value`, leaving every other field untouched.
    ///
    /// An empty value clears the field. Ratings and templates are parsed and a malformed value is
    /// rejected with [`Error::ValidationFailed`].
    pub fn set_field(&mut self, field: Field, value: &str) -> Result<(), Error> {
        let value = text(value);
        match field {
            Field::Social(platform) => self.card.social_media.set(platform, value),
            Field::Rating => {
                self.card.google_reviews.rating = value
                    .map(|v| v.parse::<Rating>())
                    .transpose()
                    .map_err(|e| ValidationErrors::single("rating", e.to_string()))?;
            }
            Field::Template => {
                self.card.theme_customization.template = value
                    .map(|v| v.parse::<Template>())
                    .transpose()
                    .map_err(|_| ValidationErrors::single("template", "Unknown template"))?;
            }
            _ => {
                if let Some(slot) = self.text_slot(field) {
                    *slot = value;
                }
            }
        }
        Ok(())
    }

    /// Clears `field`.
    pub fn clear_field(&mut self, field: Field) {
        match field {
            Field::Social(platform) => self.card.social_media.set(platform, None),
            Field::Rating => self.card.google_reviews.rating = None,
            Field::Template => self.card.theme_customization.template = None,
            _ => {
                if let Some(slot) = self.text_slot(field) {
                    *slot = None;
                }
            }
        }
    }

    /// Returns the storage of a free text field, `None` for typed fields.
    fn text_slot(&mut self, field: Field) -> Option<&mut Option<String>> {
        let card = &mut self.card;
        let slot = match field {
            Field::Name => &mut card.personal_info.name,
            Field::Email => &mut card.personal_info.email,
            Field::Phone => &mut card.personal_info.phone,
            Field::Address => &mut card.personal_info.address,
            Field::Photo => &mut card.personal_info.photo,
            Field::BusinessName => &mut card.business_info.business_name,
            Field::Services => &mut card.business_info.services,
            Field::Description => &mut card.business_info.description,
            Field::Logo => &mut card.business_info.logo,
            Field::BusinessCardImage => &mut card.business_info.business_card,
            Field::Location => &mut card.office_showcase.location,
            Field::GoogleMapsEmbed => &mut card.office_showcase.google_maps_embed,
            Field::YoutubeChannel => &mut card.media_integration.youtube_channel,
            Field::InstagramReels => &mut card.media_integration.instagram_reels,
            Field::FeaturedVideo => &mut card.media_integration.featured_video,
            Field::ReviewLink => &mut card.google_reviews.review_link,
            Field::ReviewText => &mut card.google_reviews.review_text,
            Field::PrimaryColor => &mut card.theme_customization.primary_color,
            Field::SecondaryColor => &mut card.theme_customization.secondary_color,
            Field::FontFamily => &mut card.theme_customization.font_family,
            Field::Layout => &mut card.theme_customization.layout,
            Field::Social(_) | Field::Rating | Field::Template => return None,
        };
        Some(slot)
    }

    /// Returns the value of `field`.
    pub fn get_field(&self, field: Field) -> Option<String> {
        let card = &self.card;
        let value = match field {
            Field::Name => card.personal_info.name.as_deref(),
            Field::Email => card.personal_info.email.as_deref(),
            Field::Phone => card.personal_info.phone.as_deref(),
            Field::Address => card.personal_info.address.as_deref(),
            Field::Photo => card.personal_info.photo.as_deref(),
            Field::BusinessName => card.business_info.business_name.as_deref(),
            Field::Services => card.business_info.services.as_deref(),
            Field::Description => card.business_info.description.as_deref(),
            Field::Logo => card.business_info.logo.as_deref(),
            Field::BusinessCardImage => card.business_info.business_card.as_deref(),
            Field::Social(platform) => card.social_media.get(platform),
            Field::Location => card.office_showcase.location.as_deref(),
            Field::GoogleMapsEmbed => card.office_showcase.google_maps_embed.as_deref(),
            Field::YoutubeChannel => card.media_integration.youtube_channel.as_deref(),
            Field::InstagramReels => card.media_integration.instagram_reels.as_deref(),
            Field::FeaturedVideo => card.media_integration.featured_video.as_deref(),
            Field::ReviewLink => card.google_reviews.review_link.as_deref(),
            Field::Rating => return card.google_reviews.rating.map(|v| v.to_string()),
            Field::ReviewText => card.google_reviews.review_text.as_deref(),
            Field::Template => return card.theme_customization.template.map(|v| v.key().to_owned()),
            Field::PrimaryColor => card.theme_customization.primary_color.as_deref(),
            Field::SecondaryColor => card.theme_customization.secondary_color.as_deref(),
            Field::FontFamily => card.theme_customization.font_family.as_deref(),
            Field::Layout => card.theme_customization.layout.as_deref(),
        };
        value.map(str::to_owned)
    }

    /// Returns the URLs of the office images in display order.
    pub fn images(&self) -> &[String] {
        &self.card.office_showcase.images
    }

    /// Stores `urls` in `field`, appending to the sequence of a list field.
    ///
    /// A single-valued field keeps the last URL.
    pub(crate) fn put_images(&mut self, field: ImageField, urls: &[String]) {
        match field.field() {
            Some(single) => {
                if let (Some(slot), Some(url)) = (self.text_slot(single), urls.last()) {
                    *slot = Some(url.clone());
                }
            }
            None => self
                .card
                .office_showcase
                .images
                .extend(urls.iter().cloned()),
        }
    }

    /// Removes the office image at `index` and returns its URL.
    ///
    /// The stored file is kept. Returns `None` if `index` is out of range.
    pub fn remove_image(&mut self, index: usize) -> Option<String> {
        let images = &mut self.card.office_showcase.images;
        if index < images.len() {
            Some(images.remove(index))
        } else {
            None
        }
    }

    pub(crate) fn mark_published(&mut self, card: Card) {
        self.card = card;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::Platform;
    use serde_json::json;

    fn draft() -> CardDraft {
        let mut row = Card::empty_row(Uuid::new_v4());
        row.insert("id".to_owned(), json!(Uuid::new_v4()));
        row.insert("created_at".to_owned(), json!("2024-05-01T10:00:00+00:00"));
        row.insert("updated_at".to_owned(), json!("2024-05-01T10:00:00+00:00"));
        CardDraft::new(crate::util::from_row(row).unwrap())
    }

    #[test]
    fn set_field_leaves_siblings_untouched() {
        let mut draft = draft();
        draft.set_field(Field::Name, "Alice").unwrap();
        draft.set_field(Field::Phone, " 555-0100 ").unwrap();
        draft.set_field(Field::Name, "Alice Smith").unwrap();
        assert_eq!(draft.get_field(Field::Name).as_deref(), Some("Alice Smith"));
        assert_eq!(draft.get_field(Field::Phone).as_deref(), Some("555-0100"));
        assert_eq!(
            draft.get_field(Field::PrimaryColor).as_deref(),
            Some("#3B82F6")
        );
        draft.set_field(Field::Phone, "").unwrap();
        assert_eq!(draft.get_field(Field::Phone), None);
    }

    #[test]
    fn typed_fields_are_validated() {
        let mut draft = draft();
        draft.set_field(Field::Rating, "4.75").unwrap();
        assert_eq!(draft.get_field(Field::Rating).as_deref(), Some("4.8"));
        match draft.set_field(Field::Rating, "6") {
            Err(Error::ValidationFailed(errors)) => assert_eq!(
                errors.get("rating"),
                Some("Rating must be between 1 and 5")
            ),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(draft.get_field(Field::Rating).as_deref(), Some("4.8"));
        assert!(draft.set_field(Field::Template, "retro").is_err());
        draft.set_field(Field::Template, "nature").unwrap();
        assert_eq!(draft.get_field(Field::Template).as_deref(), Some("nature"));
        draft.clear_field(Field::Rating);
        assert_eq!(draft.card().google_reviews.rating, None);
    }

    #[test]
    fn social_handles() {
        let mut draft = draft();
        draft
            .set_field(Field::Social(Platform::Github), "alice")
            .unwrap();
        assert_eq!(draft.card().social_media.get(Platform::Github), Some("alice"));
        draft.clear_field(Field::Social(Platform::Github));
        assert!(draft.card().social_media.is_empty());
    }

    #[test]
    fn images_are_appended_and_removed_by_position() {
        let mut draft = draft();
        let urls = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        draft.put_images(ImageField::OfficeImages, &urls);
        assert_eq!(draft.remove_image(1).as_deref(), Some("b"));
        assert_eq!(draft.remove_image(5), None);
        assert_eq!(draft.images(), &["a".to_owned(), "c".to_owned()]);
        draft.put_images(ImageField::Logo, &urls[..1]);
        assert_eq!(draft.get_field(Field::Logo).as_deref(), Some("a"));
    }

    #[test]
    fn clearing_and_single_image_fields() {
        let mut draft = draft();
        draft.set_field(Field::Name, "Alice").unwrap();
        draft.set_field(Field::Template, "vibrant").unwrap();
        draft.clear_field(Field::Name);
        draft.clear_field(Field::Template);
        draft.clear_field(Field::PrimaryColor);
        assert_eq!(draft.get_field(Field::Name), None);
        assert_eq!(draft.get_field(Field::Template), None);
        assert_eq!(draft.get_field(Field::PrimaryColor), None);

        let urls = vec!["first".to_owned(), "second".to_owned()];
        draft.put_images(ImageField::Photo, &urls);
        assert_eq!(draft.get_field(Field::Photo).as_deref(), Some("second"));
        draft.put_images(ImageField::BusinessCardImage, &[]);
        assert_eq!(draft.get_field(Field::BusinessCardImage), None);
        assert!(draft.images().is_empty());
    }
}
