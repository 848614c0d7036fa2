//! Order placement and order updates.

use chrono::Utc;
use serde_json::Value;
use tailor_hub_core::{Fulfillment, Order, OrderId, OrderStatus, Progress, Shop, ShopId, UserId};
use tokio::sync::watch;
use tracing::{info, instrument};

use super::{collections, get_decoded, signed_in_uid};
use crate::backend::{
    BlobStorage, BlobUpload, Direction, DocumentRef, DocumentStore, Patch, Query, UploadProgress,
};
use crate::error::{ClientError, Result, add_breadcrumb};
use crate::session::SessionStore;

/// A design image attached to an order.
#[derive(Debug, Clone)]
pub struct DesignFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What the customer filled in on the order form.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Service ID, or its name for services stored without one.
    pub service: String,
    pub fulfillment: Fulfillment,
    pub notes: Option<String>,
    pub address: String,
    pub phone: String,
    pub design: Option<DesignFile>,
}

/// Order operations.
pub struct OrderService<'a> {
    store: &'a dyn DocumentStore,
    storage: &'a dyn BlobStorage,
    session: &'a SessionStore,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(
        store: &'a dyn DocumentStore,
        storage: &'a dyn BlobStorage,
        session: &'a SessionStore,
    ) -> Self {
        Self {
            store,
            storage,
            session,
        }
    }

    /// Place an order as the signed-in customer.
    ///
    /// # Errors
    ///
    /// See [`OrderService::place_order_with_progress`].
    pub async fn place_order(&self, shop: &Shop, request: OrderRequest) -> Result<OrderId> {
        let (progress, _) = watch::channel(UploadProgress::default());
        self.place_order_with_progress(shop, request, &progress)
            .await
    }

    /// Place an order, reporting design upload progress through `progress`.
    ///
    /// The design (if any) is uploaded and its URL obtained before the order
    /// is written; any failure leaves no order behind.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a session,
    /// `ClientError::Validation` for incomplete forms, and
    /// `ClientError::Backend` when the upload or the write fails.
    #[instrument(skip(self, shop, request, progress), fields(shop_id = %shop.id))]
    pub async fn place_order_with_progress(
        &self,
        shop: &Shop,
        request: OrderRequest,
        progress: &watch::Sender<UploadProgress>,
    ) -> Result<OrderId> {
        let customer = signed_in_uid(self.session)?;

        if request.address.trim().is_empty() || request.phone.trim().is_empty() {
            return Err(ClientError::validation("Please enter address and phone."));
        }
        let service = shop
            .service(&request.service)
            .ok_or_else(|| ClientError::validation("Please select a service."))?;
        let kind = request.fulfillment.kind();
        if !service.supports(kind) {
            return Err(ClientError::validation(format!(
                "{} does not offer {} orders.",
                service.name,
                kind.as_str()
            )));
        }

        let (template, measurements) = match &request.fulfillment {
            Fulfillment::Standard { template_size } => {
                let size = template_size
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ClientError::validation("Please select a size."))?;
                (Value::from(size), Value::Null)
            }
            Fulfillment::Custom { measurements } => (Value::Null, measurements.to_wire()),
        };

        let design_image_url = match request.design {
            Some(design) => Some(self.upload_design(&shop.id, &customer, design, progress).await?),
            None => None,
        };

        let patch = Patch::new()
            .set("customerId", customer.as_str())
            .set("shopId", shop.id.as_str())
            .set("shopName", shop.name.as_str())
            .set("service", service.to_wire())
            .set("serviceName", service.name.as_str())
            .set("basePrice", service.base_price.to_wire())
            .set("type", kind.as_str())
            .set("template", template)
            .set("measurements", measurements)
            .set("designImageUrl", design_image_url.map_or(Value::Null, Value::from))
            .set(
                "notes",
                request
                    .notes
                    .map(|n| n.trim().to_owned())
                    .filter(|n| !n.is_empty())
                    .map_or(Value::Null, Value::from),
            )
            .set("address", request.address.trim())
            .set("phone", request.phone.trim())
            .set("status", OrderStatus::Pending.as_str())
            .set("progress", Progress::NONE.value())
            .set("tailorId", Value::Null)
            .server_timestamp("createdAt");

        let id = self.store.add(collections::ORDERS, patch).await?;
        info!(order_id = %id, customer = %customer, "order placed");
        add_breadcrumb("order", "Placed order", Some(&[("shop_id", shop.id.as_str())]));
        Ok(OrderId::new(id))
    }

    async fn upload_design(
        &self,
        shop: &ShopId,
        customer: &UserId,
        design: DesignFile,
        progress: &watch::Sender<UploadProgress>,
    ) -> Result<String> {
        let path = design_path(shop, customer, &design.file_name);
        let stored = self
            .storage
            .upload(
                BlobUpload {
                    path,
                    content_type: design.content_type,
                    bytes: design.bytes,
                },
                progress,
            )
            .await?;
        Ok(self.storage.download_url(&stored).await?)
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the write fails.
    #[instrument(skip(self), fields(order_id = %order))]
    pub async fn update_status(&self, order: &OrderId, status: OrderStatus) -> Result<()> {
        self.store
            .update(
                &order_ref(order),
                Patch::new().set("status", status.as_str()),
            )
            .await?;
        Ok(())
    }

    /// Set an order's progress percentage.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the write fails.
    #[instrument(skip(self), fields(order_id = %order))]
    pub async fn update_progress(&self, order: &OrderId, progress: Progress) -> Result<()> {
        self.store
            .update(
                &order_ref(order),
                Patch::new().set("progress", progress.value()),
            )
            .await?;
        Ok(())
    }

    /// Assign a tailor; also moves the order to `assigned`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the write fails.
    #[instrument(skip(self), fields(order_id = %order, tailor_id = %tailor))]
    pub async fn assign_tailor(&self, order: &OrderId, tailor: &UserId) -> Result<()> {
        self.store
            .update(
                &order_ref(order),
                Patch::new()
                    .set("tailorId", tailor.as_str())
                    .set("status", OrderStatus::Assigned.as_str()),
            )
            .await?;
        Ok(())
    }

    /// Delete an order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the delete fails.
    #[instrument(skip(self), fields(order_id = %order))]
    pub async fn delete(&self, order: &OrderId) -> Result<()> {
        self.store.delete(&order_ref(order)).await?;
        Ok(())
    }

    /// Read one order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` when it does not exist.
    pub async fn get(&self, order: &OrderId) -> Result<Order> {
        get_decoded(self.store, &order_ref(order), "Order").await
    }
}

/// Storage path for a design image.
#[must_use]
pub fn design_path(shop: &ShopId, customer: &UserId, file_name: &str) -> String {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    format!(
        "orders/{shop}_{customer}/{}_{name}",
        Utc::now().timestamp_millis()
    )
}

fn order_ref(order: &OrderId) -> DocumentRef {
    DocumentRef::new(collections::ORDERS, order.as_str())
}

/// A customer's orders, newest first.
#[must_use]
pub fn for_customer(customer: &UserId) -> Query {
    Query::collection(collections::ORDERS)
        .where_eq("customerId", customer.as_str())
        .order_by("createdAt", Direction::Descending)
}

/// A shop's orders, newest first.
#[must_use]
pub fn for_shop(shop: &ShopId) -> Query {
    Query::collection(collections::ORDERS)
        .where_eq("shopId", shop.as_str())
        .order_by("createdAt", Direction::Descending)
}

/// Orders assigned to a tailor.
#[must_use]
pub fn for_tailor(tailor: &UserId) -> Query {
    Query::collection(collections::ORDERS).where_eq("tailorId", tailor.as_str())
}

/// A single order document.
#[must_use]
pub fn document(order: &OrderId) -> DocumentRef {
    order_ref(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tailor_hub_core::{DecodeDocument, Email, Measurement, Measurements};

    use super::*;
    use crate::backend::memory::Faults;
    use crate::backend::{IdentityService, MemoryBackend};

    async fn signed_in(backend: &MemoryBackend) -> SessionStore {
        let email = Email::parse("c@x.com").unwrap();
        let user = backend.sign_up(&email, "secret1").await.unwrap();
        backend.seed("users", user.uid.as_str(), json!({ "role": "customer" }));
        let session = SessionStore::start(Arc::new(backend.clone()), Arc::new(backend.clone()));
        session.refresh().await;
        session
    }

    fn shop() -> Shop {
        let serde_json::Value::Object(fields) = json!({
            "ownerId": "owner",
            "name": "Stitch Co",
            "services": [
                { "serviceID": "svc1", "name": "Shirt", "basePrice": 20, "types": ["standard", "custom"] },
                { "serviceID": "svc2", "name": "Hem", "basePrice": 5, "types": ["standard"] }
            ]
        }) else {
            unreachable!("shop fixture is an object");
        };
        Shop::decode("s1", &fields).unwrap()
    }

    fn standard(size: Option<&str>) -> OrderRequest {
        OrderRequest {
            service: "svc1".into(),
            fulfillment: Fulfillment::Standard {
                template_size: size.map(str::to_owned),
            },
            notes: None,
            address: "12 Mall Rd".into(),
            phone: "0300".into(),
            design: None,
        }
    }

    #[tokio::test]
    async fn test_place_standard_order() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend).await;
        let orders = OrderService::new(&backend, &backend, &session);

        let id = orders.place_order(&shop(), standard(Some("M"))).await.unwrap();
        let order = orders.get(&id).await.unwrap();

        assert_eq!(backend.documents("orders").len(), 1);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.progress, Progress::NONE);
        assert_eq!(order.service_name, "Shirt");
        assert_eq!(order.shop_name.as_deref(), Some("Stitch Co"));
        assert!(order.tailor_id.is_none());
        assert!(order.created_at.is_some());
        assert_eq!(
            order.fulfillment,
            Fulfillment::Standard {
                template_size: Some("M".into())
            }
        );
    }

    #[tokio::test]
    async fn test_validation_writes_nothing() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend).await;
        let orders = OrderService::new(&backend, &backend, &session);

        let mut blank_phone = standard(Some("M"));
        blank_phone.phone = "  ".into();
        let err = orders.place_order(&shop(), blank_phone).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        let err = orders.place_order(&shop(), standard(None)).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(msg) if msg == "Please select a size."));

        let mut unknown = standard(Some("M"));
        unknown.service = "svc9".into();
        assert!(orders.place_order(&shop(), unknown).await.is_err());

        let mut custom_hem = standard(None);
        custom_hem.service = "svc2".into();
        custom_hem.fulfillment = Fulfillment::Custom {
            measurements: Measurements::default(),
        };
        assert!(orders.place_order(&shop(), custom_hem).await.is_err());

        assert!(backend.documents("orders").is_empty());
    }

    #[tokio::test]
    async fn test_requires_session() {
        let backend = MemoryBackend::new();
        let session = SessionStore::start(Arc::new(backend.clone()), Arc::new(backend.clone()));
        session.resolved().await;
        let orders = OrderService::new(&backend, &backend, &session);
        let err = orders.place_order(&shop(), standard(Some("M"))).await.unwrap_err();
        assert!(matches!(err, ClientError::NotSignedIn));
    }

    #[tokio::test]
    async fn test_custom_order_with_design() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend).await;
        let orders = OrderService::new(&backend, &backend, &session);
        let (progress, rx) = watch::channel(UploadProgress::default());

        let request = OrderRequest {
            service: "Shirt".into(),
            fulfillment: Fulfillment::Custom {
                measurements: Measurements::from_entries(vec![
                    Measurement::new("chest", "40"),
                    Measurement::new("waist", "32"),
                ]),
            },
            notes: Some("slim fit".into()),
            address: "12 Mall Rd".into(),
            phone: "0300".into(),
            design: Some(DesignFile {
                file_name: "design.png".into(),
                content_type: "image/png".into(),
                bytes: vec![7; 40_000],
            }),
        };
        let id = orders
            .place_order_with_progress(&shop(), request, &progress)
            .await
            .unwrap();

        assert_eq!(rx.borrow().percent(), 100);
        let order = orders.get(&id).await.unwrap();
        let url = order.design_image_url.unwrap();
        assert!(url.starts_with("memory://"));
        match order.fulfillment {
            Fulfillment::Custom { measurements } => {
                assert_eq!(measurements.get("chest"), Some("40"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_interrupted_upload_writes_no_order() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend).await;
        backend.set_faults(Faults {
            upload_interrupt_after: Some(10_000),
            ..Faults::default()
        });
        let orders = OrderService::new(&backend, &backend, &session);

        let mut request = standard(Some("L"));
        request.design = Some(DesignFile {
            file_name: "design.png".into(),
            content_type: "image/png".into(),
            bytes: vec![1; 50_000],
        });
        let err = orders.place_order(&shop(), request).await.unwrap_err();
        assert!(matches!(err, ClientError::Backend(_)));
        assert!(backend.documents("orders").is_empty());
    }

    #[tokio::test]
    async fn test_status_progress_and_assignment() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend).await;
        let orders = OrderService::new(&backend, &backend, &session);
        let id = orders.place_order(&shop(), standard(Some("S"))).await.unwrap();

        for value in [0, 50, 100] {
            orders
                .update_progress(&id, Progress::new(value).unwrap())
                .await
                .unwrap();
            assert_eq!(
                i64::from(orders.get(&id).await.unwrap().progress.value()),
                value
            );
        }

        orders
            .assign_tailor(&id, &UserId::new("tailor-1"))
            .await
            .unwrap();
        let order = orders.get(&id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Assigned);
        assert_eq!(order.tailor_id, Some(UserId::new("tailor-1")));

        orders
            .update_status(&id, OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(orders.get(&id).await.unwrap().status, OrderStatus::Completed);

        orders.delete(&id).await.unwrap();
        assert!(matches!(
            orders.get(&id).await.unwrap_err(),
            ClientError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_update_missing_order_fails() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend).await;
        let orders = OrderService::new(&backend, &backend, &session);
        let err = orders
            .update_status(&OrderId::new("nope"), OrderStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Backend(_)));
    }

    #[test]
    fn test_design_path_shape() {
        let path = design_path(&ShopId::new("s1"), &UserId::new("u1"), "C:\\pics\\gown.jpg");
        assert!(path.starts_with("orders/s1_u1/"));
        assert!(path.ends_with("_gown.jpg"));
    }
}
