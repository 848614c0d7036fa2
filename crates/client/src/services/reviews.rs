//! Shop reviews.

use tailor_hub_core::review::ANONYMOUS;
use tailor_hub_core::{Review, ReviewId, ShopId};
use tracing::instrument;

use super::{collections, query_decoded, required, signed_in_uid};
use crate::backend::{Direction, DocumentStore, Patch, Query};
use crate::error::{ClientError, Result};
use crate::session::SessionStore;

/// The review form.
#[derive(Debug, Clone)]
pub struct NewReview {
    /// Stars, 1 to 5.
    pub rating: u8,
    pub comment: String,
}

/// Review operations.
pub struct ReviewService<'a> {
    store: &'a dyn DocumentStore,
    session: &'a SessionStore,
}

impl<'a> ReviewService<'a> {
    /// Create a new review service.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, session: &'a SessionStore) -> Self {
        Self { store, session }
    }

    /// Review a shop as the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a session and
    /// `ClientError::Validation` for a rating outside 1..=5 or a blank
    /// comment.
    #[instrument(skip(self, review), fields(shop_id = %shop, rating = review.rating))]
    pub async fn add_review(&self, shop: &ShopId, review: NewReview) -> Result<ReviewId> {
        let user = signed_in_uid(self.session)?;
        if !(1..=5).contains(&review.rating) {
            return Err(ClientError::validation("Rating must be between 1 and 5"));
        }
        let comment = required(&review.comment, "Please enter your comment")?;

        let id = self
            .store
            .add(
                collections::REVIEWS,
                Patch::new()
                    .set("shopId", shop.as_str())
                    .set("userId", user.as_str())
                    .set("userName", ANONYMOUS)
                    .set("rating", review.rating)
                    .set("comment", comment)
                    .server_timestamp("createdAt"),
            )
            .await?;
        Ok(ReviewId::new(id))
    }

    /// Reviews of a shop, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the read fails.
    pub async fn list(&self, shop: &ShopId) -> Result<Vec<Review>> {
        query_decoded(self.store, &for_shop(shop)).await
    }
}

/// Reviews of a shop, newest first.
#[must_use]
pub fn for_shop(shop: &ShopId) -> Query {
    Query::collection(collections::REVIEWS)
        .where_eq("shopId", shop.as_str())
        .order_by("createdAt", Direction::Descending)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tailor_hub_core::Email;

    use super::*;
    use crate::backend::{IdentityService, MemoryBackend};

    fn review(rating: u8, comment: &str) -> NewReview {
        NewReview {
            rating,
            comment: comment.into(),
        }
    }

    #[tokio::test]
    async fn test_signed_out_review_is_rejected() {
        let backend = MemoryBackend::new();
        let session = SessionStore::start(Arc::new(backend.clone()), Arc::new(backend.clone()));
        session.resolved().await;
        let reviews = ReviewService::new(&backend, &session);

        let err = reviews
            .add_review(&ShopId::new("s1"), review(5, "Great"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotSignedIn));
        assert!(backend.documents("reviews").is_empty());
    }

    #[tokio::test]
    async fn test_add_and_list_reviews() {
        let backend = MemoryBackend::new();
        backend
            .sign_up(&Email::parse("c@x.com").unwrap(), "secret1")
            .await
            .unwrap();
        let session = SessionStore::start(Arc::new(backend.clone()), Arc::new(backend.clone()));
        session.refresh().await;
        let reviews = ReviewService::new(&backend, &session);
        let shop = ShopId::new("s1");

        reviews.add_review(&shop, review(4, "Neat work")).await.unwrap();
        reviews.add_review(&shop, review(5, "Fast")).await.unwrap();
        assert!(matches!(
            reviews.add_review(&shop, review(0, "Bad")).await,
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            reviews.add_review(&shop, review(3, " ")).await,
            Err(ClientError::Validation(_))
        ));

        let listed = reviews.list(&shop).await.unwrap();
        let comments: Vec<_> = listed.iter().map(|r| r.comment.as_str()).collect();
        assert_eq!(comments, vec!["Fast", "Neat work"]);
        assert_eq!(listed[0].user_name, ANONYMOUS);
        assert_eq!(listed[1].stars(), "★★★★☆");
    }
}
