//! Canonical domain models.
//!
//! These are the normalized forms produced by [`crate::decode`]; views and
//! services never see raw documents.

pub mod chat;
pub mod order;
pub mod review;
pub mod shop;
pub mod user;

pub use chat::{ChatMessage, ChatThread};
pub use order::{Fulfillment, Measurement, Measurements, Order};
pub use review::Review;
pub use shop::{GarmentSizes, Service, Shop};
pub use user::UserProfile;

pub use crate::decode::progress::ProgressStep;
