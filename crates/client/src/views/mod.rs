//! View models rendered to HTML fragments with Askama.
//!
//! Each view is built from decoded documents (usually the current
//! [`LiveState`](crate::live::LiveState) of a subscription) and rendered with
//! [`askama::Template::render`]. Empty results render an explicit empty
//! state rather than an empty table.

pub mod nav;
pub mod orders;
pub mod shops;

pub use nav::{NavBar, NavItem};
pub use orders::{CustomerOrders, OrderDetail, OrderRow, OwnerOrderBoard, ShopOrders, TailorDashboard};
pub use shops::{ReviewRow, ServiceRow, ShopCard, ShopDirectory, Storefront};

use chrono::{DateTime, Utc};

/// Short date for tables, or `-` when unknown.
fn short_date(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "-".to_owned(), |at| at.format("%b %-d, %Y").to_string())
}
