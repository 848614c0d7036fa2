//! Orders and their fulfillment details.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{ProgressStep, Service};
use crate::decode::{self, DecodeDocument, DecodeError, FieldReader, Fields, Problem};
use crate::types::{FulfillmentType, OrderId, OrderStatus, Price, Progress, ShopId, UserId};

/// One named body measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    /// Body part, e.g. "chest".
    pub part: String,
    /// Value as entered; may be empty when only the part was requested.
    pub value: String,
}

impl Measurement {
    /// Create a measurement.
    #[must_use]
    pub fn new(part: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            part: part.into(),
            value: value.into(),
        }
    }
}

/// Ordered set of measurements for a custom order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Measurements(Vec<Measurement>);

impl Measurements {
    /// Build from entries, keeping the last value for a repeated part.
    #[must_use]
    pub fn from_entries(entries: Vec<Measurement>) -> Self {
        let mut out: Vec<Measurement> = Vec::with_capacity(entries.len());
        for entry in entries {
            match out.iter_mut().find(|m| m.part == entry.part) {
                Some(existing) => existing.value = entry.value,
                None => out.push(entry),
            }
        }
        Self(out)
    }

    /// Iterate in stored order.
    pub fn iter(&self) -> std::slice::Iter<'_, Measurement> {
        self.0.iter()
    }

    /// Whether no measurements were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of measurements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Value recorded for a part.
    #[must_use]
    pub fn get(&self, part: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|m| m.part == part)
            .map(|m| m.value.as_str())
    }

    /// Encode as the `{part: value}` object written by new orders.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|m| (m.part.clone(), Value::String(m.value.clone())))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Measurements {
    type Item = &'a Measurement;
    type IntoIter = std::slice::Iter<'a, Measurement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// How an order is to be made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fulfillment {
    /// Made to one of the shop's template sizes.
    Standard {
        /// Chosen size label.
        template_size: Option<String>,
    },
    /// Made to the customer's measurements.
    Custom {
        /// Measurements supplied by the customer.
        measurements: Measurements,
    },
}

impl Fulfillment {
    /// The fulfillment type tag.
    #[must_use]
    pub const fn kind(&self) -> FulfillmentType {
        match self {
            Self::Standard { .. } => FulfillmentType::Standard,
            Self::Custom { .. } => FulfillmentType::Custom,
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Document ID.
    pub id: OrderId,
    /// Customer who placed the order.
    pub customer_id: UserId,
    /// Shop the order was placed with.
    pub shop_id: ShopId,
    /// Shop name at placement time.
    pub shop_name: Option<String>,
    /// Snapshot of the service at placement time.
    pub service: Option<Service>,
    /// Service name, from `serviceName` or the snapshot.
    pub service_name: String,
    /// Price at placement time.
    pub base_price: Price,
    /// Standard or custom details.
    pub fulfillment: Fulfillment,
    /// Uploaded design image.
    pub design_image_url: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Delivery address.
    pub address: String,
    /// Contact phone.
    pub phone: String,
    /// Current status.
    pub status: OrderStatus,
    /// Completion percentage.
    pub progress: Progress,
    /// Recorded progress steps.
    pub progress_history: Vec<ProgressStep>,
    /// Assigned tailor.
    pub tailor_id: Option<UserId>,
    /// When the order was placed.
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether a tailor has been assigned.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.tailor_id.is_some()
    }
}

impl DecodeDocument for Order {
    fn decode(id: &str, fields: &Fields) -> Result<Self, DecodeError> {
        let doc = FieldReader::new(id, fields);

        let service = doc.with("service", |value| match value {
            None => Ok(None),
            // Early orders stored only the service name here.
            Some(Value::String(_)) => Ok(None),
            Some(value) => Service::decode(value).map(Some),
        })?;
        let service_name = match doc.opt_string(&["serviceName"])? {
            Some(name) => name,
            None => match (&service, doc.get("service")) {
                (Some(service), _) => service.name.clone(),
                (None, Some(Value::String(name))) => name.clone(),
                _ => String::new(),
            },
        };
        let base_price = match doc.get("basePrice") {
            Some(value) => decode::price(value).map_err(|p| doc.error("basePrice", p))?,
            None => service
                .as_ref()
                .map_or_else(Price::zero, |s| s.base_price),
        };

        let kind = match doc.opt_string(&["type"])? {
            Some(raw) => raw
                .parse::<FulfillmentType>()
                .map_err(|e| doc.error("type", Problem::InvalidValue(e)))?,
            None if doc.get("measurements").is_some() => FulfillmentType::Custom,
            None => FulfillmentType::Standard,
        };
        let fulfillment = match kind {
            FulfillmentType::Standard => Fulfillment::Standard {
                template_size: doc.opt_string(&["template", "size"])?,
            },
            FulfillmentType::Custom => Fulfillment::Custom {
                measurements: doc.with("measurements", decode::measurements::decode)?,
            },
        };

        let progress = doc.with("progress", decode::progress::decode)?;
        let mut progress_history = progress.history;
        progress_history.extend(doc.with("progressHistory", decode::progress::decode_history)?);

        Ok(Self {
            id: OrderId::new(id),
            customer_id: UserId::new(doc.string(&["customerId", "userId"])?),
            shop_id: ShopId::new(doc.string(&["shopId"])?),
            shop_name: doc.opt_string(&["shopName"])?,
            service,
            service_name,
            base_price,
            fulfillment,
            design_image_url: doc.opt_string(&["designImageUrl", "designImage"])?,
            notes: doc.opt_string(&["notes"])?,
            address: doc.text(&["address"])?,
            phone: doc.text(&["phone"])?,
            status: doc.with("status", decode::status::decode)?,
            progress: progress.percent,
            progress_history,
            tailor_id: doc
                .opt_string(&["tailorId", "assignedTailorId"])?
                .map(UserId::new),
            created_at: doc.timestamp("createdAt")?,
        })
    }
}
