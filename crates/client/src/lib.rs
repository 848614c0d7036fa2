//! Tailor Hub client library.
//!
//! Connects customers, shop owners and tailors through a managed backend:
//! - [`session`] - The signed-in user and their role, kept current
//! - [`live`] - Views bound to live document subscriptions
//! - [`services`] - Orders, shops, tailors, accounts, chat and reviews
//! - [`navigation`] - Routes, role-gated links and the route guard
//! - [`views`] - HTML fragments rendered with Askama
//! - [`backend`] - Collaborator traits with in-memory and REST implementations
//!
//! [`TailorHub`] ties them together.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod live;
pub mod navigation;
pub mod services;
pub mod session;
pub mod telemetry;
pub mod views;

pub use app::TailorHub;
pub use config::ClientConfig;
pub use error::{ClientError, Notice, Result};
pub use live::{LiveQuery, LiveState, OwnerOrders};
pub use navigation::{GuardPolicy, Route};
pub use session::{SessionSnapshot, SessionStore};
