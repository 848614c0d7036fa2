//! Shop reviews.

use chrono::{DateTime, Utc};

use crate::decode::{DecodeDocument, DecodeError, FieldReader, Fields};
use crate::types::{ReviewId, ShopId, UserId};

/// Name shown for reviews written without one.
pub const ANONYMOUS: &str = "Anonymous";

/// A customer's review of a shop.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: ReviewId,
    pub shop_id: ShopId,
    pub user_id: Option<UserId>,
    pub user_name: String,
    /// Star rating; legacy values are clamped to 0..=5.
    pub rating: u8,
    pub comment: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Review {
    /// Rating rendered as filled and empty stars.
    #[must_use]
    pub fn stars(&self) -> String {
        let filled = usize::from(self.rating.min(5));
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

impl DecodeDocument for Review {
    fn decode(id: &str, fields: &Fields) -> Result<Self, DecodeError> {
        let doc = FieldReader::new(id, fields);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rating = doc.number("rating")?.unwrap_or_default().round().clamp(0.0, 5.0) as u8;

        Ok(Self {
            id: ReviewId::new(id),
            shop_id: ShopId::new(doc.string(&["shopId"])?),
            user_id: doc.opt_string(&["userId"])?.map(UserId::new),
            user_name: doc
                .opt_string(&["userName"])?
                .unwrap_or_else(|| ANONYMOUS.to_owned()),
            rating,
            comment: doc.text(&["comment"])?,
            created_at: doc.timestamp("createdAt")?,
        })
    }
}
