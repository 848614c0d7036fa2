//! Tailor Hub Core - Domain types and document decoders.
//!
//! This crate provides the types shared by every Tailor Hub component:
//! - `client` - Session, live queries, navigation and mutations against the
//!   managed backend
//! - `integration-tests` - End-to-end scenarios against the in-memory backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no backend
//! SDK, no HTTP clients. Documents arrive from the backend as loosely-shaped
//! JSON maps; the [`decode`] module turns every legacy shape into one
//! canonical representation before it reaches a view.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, statuses, prices and progress
//! - [`models`] - Canonical users, shops, services, orders, chats and reviews
//! - [`decode`] - The document decoding boundary

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod decode;
pub mod models;
pub mod types;

pub use decode::{DecodeDocument, DecodeError};
pub use models::*;
pub use types::*;
