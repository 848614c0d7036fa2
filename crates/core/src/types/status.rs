//! Status enums for orders and services.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Stored documents carry many spellings of these values; see
/// [`crate::decode::status`] for the accepted legacy forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed by the customer, not yet picked up.
    #[default]
    Pending,
    /// A tailor has been assigned by the owner.
    Assigned,
    /// Stitching has started.
    InProgress,
    /// Finished.
    Completed,
    /// Cancelled by the owner.
    Cancelled,
}

impl OrderStatus {
    /// Every status in lifecycle order, as offered by the owner's status picker.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Assigned,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Wire representation written by this client.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Assigned => "Assigned",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether no further work is expected on the order.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How an order is fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentType {
    /// Against a predefined size template.
    Standard,
    /// Against customer-supplied body measurements.
    Custom,
}

impl FulfillmentType {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Custom => "custom",
        }
    }
}

impl std::str::FromStr for FulfillmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "template" => Ok(Self::Standard),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("invalid fulfillment type: {s}")),
        }
    }
}
