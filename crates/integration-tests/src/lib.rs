//! Integration test fixtures for Tailor Hub.
//!
//! Every scenario runs against a fresh [`MemoryBackend`] wrapped in a
//! [`TailorHub`]. The backend handle is kept so tests can seed documents,
//! inject faults and inspect what was written.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tailor-hub-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use serde_json::{Value, json};
use tailor_hub_client::backend::{DocumentStore, MemoryBackend};
use tailor_hub_client::services::OrderRequest;
use tailor_hub_client::{GuardPolicy, TailorHub};
use tailor_hub_core::{Fulfillment, Role, Shop, ShopId, UserId};

/// Password used for every test account.
pub const PASSWORD: &str = "secret1";

/// An application and the backend behind it.
pub struct TestApp {
    pub backend: MemoryBackend,
    pub app: TailorHub,
}

impl TestApp {
    /// A signed-out application.
    pub async fn new() -> Self {
        Self::with_guard(GuardPolicy::Advisory).await
    }

    /// A signed-out application with the given route guard.
    pub async fn with_guard(guard: GuardPolicy) -> Self {
        let backend = MemoryBackend::new();
        let app = TailorHub::with_backend(backend.clone(), guard);
        app.session().resolved().await;
        Self { backend, app }
    }

    /// An application with a freshly signed-up user of `role`.
    pub async fn signed_in(role: Role, email: &str) -> Self {
        let test = Self::new().await;
        test.app
            .accounts()
            .sign_up(email, PASSWORD, role)
            .await
            .unwrap();
        test
    }

    /// UID of the signed-in user.
    pub fn uid(&self) -> UserId {
        self.app.session().snapshot().user.unwrap().uid
    }

    /// Seed a shop owned by `owner` and return it decoded.
    pub async fn seed_shop(&self, id: &str, owner: &UserId, name: &str, services: Value) -> Shop {
        self.backend.seed(
            "shops",
            id,
            json!({
                "ownerId": owner.as_str(),
                "name": name,
                "description": "Tailoring",
                "location": "Lahore",
                "services": services,
                "templates": ["S", "M", "L"],
            }),
        );
        let doc = tailor_hub_client::services::shops::document(&ShopId::new(id));
        self.backend.get(&doc).await.unwrap().unwrap().decode().unwrap()
    }
}

/// A service offering both standard and custom orders.
#[must_use]
pub fn shirt_service() -> Value {
    json!([{
        "serviceID": "svc1",
        "name": "Shirt",
        "basePrice": 20,
        "types": ["standard", "custom"],
        "customMeasurements": ["chest", "waist"],
    }])
}

/// A standard order for `service` in size M.
#[must_use]
pub fn standard_request(service: &str) -> OrderRequest {
    OrderRequest {
        service: service.to_owned(),
        fulfillment: Fulfillment::Standard {
            template_size: Some("M".to_owned()),
        },
        notes: None,
        address: "12 Mall Rd".to_owned(),
        phone: "0300-1234567".to_owned(),
        design: None,
    }
}
