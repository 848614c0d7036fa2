//! Core types for Tailor Hub.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod progress;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use progress::{Progress, ProgressError};
pub use role::{Role, RoleError};
pub use status::*;
