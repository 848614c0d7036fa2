//! Shop and service management for owners.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;
use tailor_hub_core::{
    FulfillmentType, GarmentSizes, Price, Service, ServiceId, Shop, ShopId, UserId,
};
use tracing::{info, instrument};

use super::{collections, get_decoded, query_decoded, required, signed_in_uid};
use crate::backend::{DocumentRef, DocumentStore, Patch, Query};
use crate::error::{ClientError, Result};
use crate::session::SessionStore;

/// Editable shop fields.
#[derive(Debug, Clone, Default)]
pub struct ShopDetails {
    pub name: String,
    pub description: String,
    pub location: String,
    pub image: Option<String>,
    pub phone: Option<String>,
    pub rating: f64,
    pub services: Vec<Service>,
    pub templates: Vec<String>,
}

impl ShopDetails {
    /// Current values of an existing shop, for the edit form.
    #[must_use]
    pub fn from_shop(shop: &Shop) -> Self {
        Self {
            name: shop.name.clone(),
            description: shop.description.clone(),
            location: shop.location.clone(),
            image: shop.image.clone(),
            phone: shop.phone.clone(),
            rating: shop.rating,
            services: shop.services.clone(),
            templates: shop.templates.clone(),
        }
    }

    fn patch(&self) -> Result<Patch> {
        let message = "Please fill all required fields";
        let optional = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map_or(Value::Null, Value::from)
        };
        Ok(Patch::new()
            .set("name", required(&self.name, message)?)
            .set("description", required(&self.description, message)?)
            .set("location", required(&self.location, message)?)
            .set("image", optional(&self.image))
            .set("phone", optional(&self.phone))
            .set(
                "rating",
                serde_json::Number::from_f64(self.rating.clamp(0.0, 5.0))
                    .map_or(Value::from(0), Value::Number),
            )
            .set(
                "services",
                Value::Array(self.services.iter().map(Service::to_wire).collect()),
            )
            .set("templates", self.templates.clone()))
    }
}

/// The add-service form.
#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    /// Price as typed.
    pub base_price: String,
    pub types: Vec<FulfillmentType>,
    pub standard_sizes: BTreeMap<String, GarmentSizes>,
    pub custom_measurements: Vec<String>,
    pub templates: Vec<String>,
}

impl NewService {
    fn build(self) -> Result<Service> {
        let name = required(&self.name, "Enter service name and price")?;
        let price_text = required(&self.base_price, "Enter service name and price")?;
        let base_price = price_text
            .parse::<Price>()
            .map_err(|_| ClientError::validation("Enter a valid price"))?;
        let standard = self.types.is_empty() || self.types.contains(&FulfillmentType::Standard);
        let custom = self.types.is_empty() || self.types.contains(&FulfillmentType::Custom);

        Ok(Service {
            id: Some(ServiceId::new(format!("svc{}", Utc::now().timestamp_millis()))),
            name,
            base_price,
            types: self.types,
            standard_sizes: if standard {
                self.standard_sizes
            } else {
                BTreeMap::new()
            },
            custom_measurements: if custom {
                self.custom_measurements
                    .into_iter()
                    .map(|m| m.trim().to_owned())
                    .filter(|m| !m.is_empty())
                    .collect()
            } else {
                Vec::new()
            },
            templates: self.templates,
        })
    }
}

/// Shop operations.
pub struct ShopService<'a> {
    store: &'a dyn DocumentStore,
    session: &'a SessionStore,
}

impl<'a> ShopService<'a> {
    /// Create a new shop service.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, session: &'a SessionStore) -> Self {
        Self { store, session }
    }

    /// Create a shop owned by the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` when name, description or location
    /// is blank.
    #[instrument(skip(self, details), fields(name = %details.name))]
    pub async fn create(&self, details: &ShopDetails) -> Result<ShopId> {
        let owner = signed_in_uid(self.session)?;
        let patch = details
            .patch()?
            .set("ownerId", owner.as_str())
            .server_timestamp("createdAt");
        let id = self.store.add(collections::SHOPS, patch).await?;
        info!(shop_id = %id, owner = %owner, "shop created");
        Ok(ShopId::new(id))
    }

    /// Replace a shop's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for blank required fields and
    /// `ClientError::Backend` when the shop does not exist.
    #[instrument(skip(self, details), fields(shop_id = %shop))]
    pub async fn update(&self, shop: &ShopId, details: &ShopDetails) -> Result<()> {
        self.store.update(&shop_ref(shop), details.patch()?).await?;
        Ok(())
    }

    /// Delete a shop.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the delete fails.
    #[instrument(skip(self), fields(shop_id = %shop))]
    pub async fn delete(&self, shop: &ShopId) -> Result<()> {
        self.store.delete(&shop_ref(shop)).await?;
        Ok(())
    }

    /// Append a service to a shop.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` without a name or a valid price.
    #[instrument(skip(self, service), fields(shop_id = %shop))]
    pub async fn add_service(&self, shop: &ShopId, service: NewService) -> Result<Service> {
        let service = service.build()?;
        self.store
            .update(
                &shop_ref(shop),
                Patch::new().array_union("services", vec![service.to_wire()]),
            )
            .await?;
        Ok(service)
    }

    /// Read one shop.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` when it does not exist.
    pub async fn get(&self, shop: &ShopId) -> Result<Shop> {
        get_decoded(self.store, &shop_ref(shop), "Shop").await
    }

    /// Every shop.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the read fails.
    pub async fn list_all(&self) -> Result<Vec<Shop>> {
        query_decoded(self.store, &all()).await
    }

    /// Shops run by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the read fails.
    pub async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Shop>> {
        query_decoded(self.store, &for_owner(owner)).await
    }
}

fn shop_ref(shop: &ShopId) -> DocumentRef {
    DocumentRef::new(collections::SHOPS, shop.as_str())
}

/// Every shop.
#[must_use]
pub fn all() -> Query {
    Query::collection(collections::SHOPS)
}

/// Shops run by `owner`.
#[must_use]
pub fn for_owner(owner: &UserId) -> Query {
    Query::collection(collections::SHOPS).where_eq("ownerId", owner.as_str())
}

/// A single shop document.
#[must_use]
pub fn document(shop: &ShopId) -> DocumentRef {
    shop_ref(shop)
}
