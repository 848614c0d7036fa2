//! Order status decoding.
//!
//! Older screens wrote labels such as `"In Progress"` or `"Received"`, and
//! some documents wrap the value as `{ "status": "..." }`. A missing status
//! means the order was never touched after placement.

use serde::Deserialize;
use serde_json::Value;

use super::{Problem, shape_of};
use crate::types::OrderStatus;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Text(String),
    Nested { status: String },
}

/// Decode an order status value; `None` decodes as pending.
///
/// # Errors
///
/// Returns a [`Problem`] for unknown labels or unrecognized shapes.
pub fn decode(value: Option<&Value>) -> Result<OrderStatus, Problem> {
    let Some(value) = value else {
        return Ok(OrderStatus::Pending);
    };
    let raw =
        RawStatus::deserialize(value).map_err(|_| Problem::UnexpectedShape(shape_of(value)))?;
    let text = match raw {
        RawStatus::Text(text) | RawStatus::Nested { status: text } => text,
    };
    parse_label(&text).ok_or(Problem::InvalidValue(text))
}

/// Parse any known spelling of a status.
#[must_use]
pub fn parse_label(label: &str) -> Option<OrderStatus> {
    let normalized: String = label
        .trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    match normalized.as_str() {
        "" | "pending" | "received" | "placed" => Some(OrderStatus::Pending),
        "assigned" => Some(OrderStatus::Assigned),
        "inprogress" | "started" => Some(OrderStatus::InProgress),
        "completed" | "complete" | "done" => Some(OrderStatus::Completed),
        "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
        _ => None,
    }
}
