//! Mutation operations and one-shot reads.
//!
//! # Services
//!
//! - `accounts` - Sign up, sign in and sign out
//! - `orders` - Placing orders, status and progress updates, tailor assignment
//! - `shops` - Shop and service management
//! - `tailors` - Tailor provisioning and listing
//! - `chat` - Customer/shop message threads
//! - `reviews` - Shop reviews
//! - `contact` - Contact form
//!
//! Services borrow the backends from [`crate::TailorHub`] and are cheap to
//! construct per call.

pub mod accounts;
pub mod chat;
pub mod contact;
pub mod orders;
pub mod reviews;
pub mod shops;
pub mod tailors;

pub use accounts::AccountService;
pub use chat::ChatService;
pub use contact::{ContactMessage, ContactService};
pub use orders::{DesignFile, OrderRequest, OrderService};
pub use reviews::{NewReview, ReviewService};
pub use shops::{NewService, ShopDetails, ShopService};
pub use tailors::{NewTailor, TailorService};

use tailor_hub_core::{DecodeDocument, UserId};

use crate::backend::{Document, DocumentRef, DocumentStore, Query};
use crate::error::{ClientError, Result};
use crate::session::SessionStore;

/// Collection names.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SHOPS: &str = "shops";
    pub const ORDERS: &str = "orders";
    pub const CHATS: &str = "chats";
    pub const MESSAGES: &str = "messages";
    pub const REVIEWS: &str = "reviews";
}

/// Trimmed text, or a validation error with `message` when blank.
fn required(value: &str, message: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClientError::validation(message));
    }
    Ok(trimmed.to_owned())
}

/// UID of the signed-in user.
fn signed_in_uid(session: &SessionStore) -> Result<UserId> {
    session
        .snapshot()
        .user
        .map(|u| u.uid)
        .ok_or(ClientError::NotSignedIn)
}

/// Read and decode one document.
async fn get_decoded<T: DecodeDocument>(
    store: &dyn DocumentStore,
    doc: &DocumentRef,
    what: &str,
) -> Result<T> {
    let document = store
        .get(doc)
        .await?
        .ok_or_else(|| ClientError::NotFound(what.to_owned()))?;
    Ok(document.decode()?)
}

/// Run a one-shot query and decode every result, skipping documents that
/// fail to decode.
async fn query_decoded<T: DecodeDocument>(
    store: &dyn DocumentStore,
    query: &Query,
) -> Result<Vec<T>> {
    let documents = store.query(query).await?;
    Ok(decode_all(&documents))
}

fn decode_all<T: DecodeDocument>(documents: &[Document]) -> Vec<T> {
    documents
        .iter()
        .filter_map(|doc| match doc.decode() {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(document = %doc.id, error = %e, "skipping undecodable document");
                None
            }
        })
        .collect()
}
