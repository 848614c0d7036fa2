//! Shops and the services they offer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::decode::{self, DecodeDocument, DecodeError, FieldReader, Fields, Problem, nullable};
use crate::types::{FulfillmentType, Price, ServiceId, ShopId, UserId};

/// Size labels offered when an owner does not configure any.
pub const DEFAULT_TEMPLATES: [&str; 4] = ["S", "M", "L", "XL"];

/// A tailor shop.
#[derive(Debug, Clone, PartialEq)]
pub struct Shop {
    /// Document ID.
    pub id: ShopId,
    /// Owning account.
    pub owner_id: UserId,
    /// Shop name.
    pub name: String,
    /// Free-form location.
    pub location: String,
    /// Description shown on the storefront.
    pub description: String,
    /// Image URL.
    pub image: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Average rating, 0 when unrated.
    pub rating: f64,
    /// Services offered.
    pub services: Vec<Service>,
    /// Size labels for standard orders.
    pub templates: Vec<String>,
    /// When the shop was created.
    pub created_at: Option<DateTime<Utc>>,
}

impl Shop {
    /// Find a service by ID, falling back to its name.
    #[must_use]
    pub fn service(&self, key: &str) -> Option<&Service> {
        self.services
            .iter()
            .find(|s| s.id.as_ref().is_some_and(|id| id.as_str() == key))
            .or_else(|| self.services.iter().find(|s| s.name == key))
    }

    /// Size labels for standard orders, defaulting to S/M/L/XL.
    #[must_use]
    pub fn template_sizes(&self) -> Vec<String> {
        if self.templates.is_empty() {
            DEFAULT_TEMPLATES.iter().map(ToString::to_string).collect()
        } else {
            self.templates.clone()
        }
    }
}

impl DecodeDocument for Shop {
    fn decode(id: &str, fields: &Fields) -> Result<Self, DecodeError> {
        let doc = FieldReader::new(id, fields);

        let services = doc.with("services", |value| match value {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(Service::decode).collect(),
            Some(other) => Err(Problem::UnexpectedShape(decode::shape_of(other))),
        })?;

        Ok(Self {
            id: ShopId::new(id),
            owner_id: UserId::new(doc.string(&["ownerId"])?),
            name: doc.string(&["name", "shopName"])?,
            location: doc.text(&["location"])?,
            description: doc.text(&["description"])?,
            image: doc.opt_string(&["image"])?,
            phone: doc.opt_string(&["phone"])?,
            rating: doc.number("rating")?.unwrap_or_default().clamp(0.0, 5.0),
            services,
            templates: doc.string_list("templates")?,
            created_at: doc.timestamp("createdAt")?,
        })
    }
}

/// Size chart for one garment within a standard service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GarmentSizes {
    /// Size labels in display order.
    pub sizes: Vec<String>,
    /// Reference image URL per size.
    pub images: BTreeMap<String, String>,
    /// Measurement notes per size.
    pub measurements: BTreeMap<String, String>,
}

/// A service offered by a shop, embedded in the shop document and copied
/// into every order placed against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Stable ID (`serviceID`), absent on some early services.
    pub id: Option<ServiceId>,
    /// Service name.
    pub name: String,
    /// Starting price.
    pub base_price: Price,
    /// Supported fulfillment types.
    pub types: Vec<FulfillmentType>,
    /// Standard size charts keyed by garment.
    pub standard_sizes: BTreeMap<String, GarmentSizes>,
    /// Measurement fields asked for on custom orders.
    pub custom_measurements: Vec<String>,
    /// Size labels specific to this service.
    pub templates: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawService {
    #[serde(default, rename = "serviceID", alias = "serviceId", alias = "id")]
    service_id: Option<Value>,
    #[serde(default, alias = "serviceName")]
    name: Option<String>,
    #[serde(default)]
    base_price: Option<Value>,
    #[serde(default, deserialize_with = "nullable")]
    types: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    standard_sizes: BTreeMap<String, RawGarment>,
    #[serde(default, deserialize_with = "nullable")]
    custom_measurements: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    templates: Vec<String>,
}

#[derive(Deserialize)]
struct RawGarment {
    #[serde(default, deserialize_with = "nullable")]
    sizes: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    images: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "nullable")]
    measurements: BTreeMap<String, Value>,
}

impl Service {
    /// Whether orders of the given type can be placed against this service.
    ///
    /// Services that never declared their types accept both.
    #[must_use]
    pub fn supports(&self, kind: FulfillmentType) -> bool {
        self.types.is_empty() || self.types.contains(&kind)
    }

    /// Decode an embedded service value.
    ///
    /// # Errors
    ///
    /// Returns a [`Problem`] when the value is not a service object, has no
    /// name, or lists an unknown fulfillment type.
    pub fn decode(value: &Value) -> Result<Self, Problem> {
        let raw = RawService::deserialize(value)
            .map_err(|e| Problem::InvalidValue(format!("service: {e}")))?;

        let name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(Problem::InvalidValue("service without a name".to_owned()))?;
        let base_price = match raw.base_price {
            None | Some(Value::Null) => Price::zero(),
            Some(value) => decode::price(&value)?,
        };
        let types = raw
            .types
            .iter()
            .map(|t| t.parse::<FulfillmentType>().map_err(Problem::InvalidValue))
            .collect::<Result<Vec<_>, _>>()?;
        let standard_sizes = raw
            .standard_sizes
            .into_iter()
            .map(|(garment, raw)| Ok((garment, GarmentSizes::from_raw(raw)?)))
            .collect::<Result<_, Problem>>()?;

        Ok(Self {
            id: raw
                .service_id
                .as_ref()
                .and_then(decode::scalar_text)
                .filter(|id| !id.is_empty())
                .map(ServiceId::new),
            name,
            base_price,
            types,
            standard_sizes,
            custom_measurements: raw.custom_measurements,
            templates: raw.templates,
        })
    }

    /// Encode the service in its stored form.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let standard_sizes: serde_json::Map<String, Value> = self
            .standard_sizes
            .iter()
            .map(|(garment, chart)| {
                (
                    garment.clone(),
                    json!({
                        "sizes": chart.sizes,
                        "images": chart.images,
                        "measurements": chart.measurements,
                    }),
                )
            })
            .collect();

        json!({
            "serviceID": self.id.as_ref().map(ServiceId::as_str),
            "name": self.name,
            "basePrice": self.base_price.to_wire(),
            "types": self.types.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
            "standardSizes": standard_sizes,
            "customMeasurements": self.custom_measurements,
            "templates": self.templates,
        })
    }
}

impl GarmentSizes {
    fn from_raw(raw: RawGarment) -> Result<Self, Problem> {
        let text_map = |map: BTreeMap<String, Value>| {
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(size, v)| {
                    decode::scalar_text(&v)
                        .map(|text| (size, text))
                        .ok_or(Problem::UnexpectedShape(decode::shape_of(&v)))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
        };
        Ok(Self {
            sizes: raw.sizes,
            images: text_map(raw.images)?,
            measurements: text_map(raw.measurements)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn shop(value: Value) -> Result<Shop, DecodeError> {
        let Value::Object(fields) = value else {
            unreachable!("test documents are objects");
        };
        Shop::decode("shop-1", &fields)
    }

    #[test]
    fn test_decode_full_shop() {
        let decoded = shop(json!({
            "ownerId": "owner-1",
            "name": "Stitch Co",
            "location": "Lahore",
            "description": "Bespoke suits",
            "rating": "4.5",
            "templates": ["S", "M"],
            "services": [{
                "serviceID": "svc1",
                "name": "Shirt Stitching",
                "basePrice": 20,
                "types": ["standard", "custom"],
                "standardSizes": {
                    "Shirt": { "sizes": ["S", "M"], "images": { "S": "https://img/s.png" } }
                },
                "customMeasurements": ["chest", "waist"]
            }]
        }))
        .unwrap();

        assert_eq!(decoded.name, "Stitch Co");
        assert!((decoded.rating - 4.5).abs() < f64::EPSILON);
        let service = decoded.service("svc1").unwrap();
        assert_eq!(service.base_price.display(), "$20.00");
        assert!(service.supports(FulfillmentType::Custom));
        assert_eq!(
            service.standard_sizes["Shirt"].images.get("S").map(String::as_str),
            Some("https://img/s.png")
        );
        assert_eq!(decoded.service("Shirt Stitching"), Some(service));
    }

    #[test]
    fn test_legacy_shop_name_and_missing_services() {
        let decoded = shop(json!({ "ownerId": "o", "shopName": "Old Name" })).unwrap();
        assert_eq!(decoded.name, "Old Name");
        assert!(decoded.services.is_empty());
        assert_eq!(decoded.template_sizes(), vec!["S", "M", "L", "XL"]);
    }

    #[test]
    fn test_service_with_unknown_type_fails() {
        let err = shop(json!({
            "ownerId": "o",
            "name": "n",
            "services": [{ "name": "Coat", "types": ["express"] }]
        }))
        .unwrap_err();
        assert_eq!(err.field, "services");
    }

    #[test]
    fn test_service_wire_round_trip() {
        let service = Service::decode(&json!({
            "serviceID": "svc9",
            "name": "Kurta",
            "basePrice": 12.5,
            "types": ["standard"],
            "templates": ["M"]
        }))
        .unwrap();
        let again = Service::decode(&service.to_wire()).unwrap();
        assert_eq!(again, service);
    }
}
