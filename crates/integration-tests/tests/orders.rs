//! Order placement, progress and assignment end to end.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;

use serde_json::json;
use tailor_hub_client::ClientError;
use tailor_hub_client::backend::memory::Faults;
use tailor_hub_client::backend::UploadProgress;
use tailor_hub_client::services::{DesignFile, NewService, OrderRequest, ShopDetails};
use tailor_hub_core::{
    Fulfillment, FulfillmentType, Measurement, Measurements, OrderStatus, Price, Progress, Role,
    UserId,
};
use tailor_hub_integration_tests::{PASSWORD, TestApp, shirt_service, standard_request};
use tokio::sync::watch;

fn custom_request(design: Option<DesignFile>) -> OrderRequest {
    OrderRequest {
        service: "svc1".to_owned(),
        fulfillment: Fulfillment::Custom {
            measurements: Measurements::from_entries(vec![
                Measurement::new("chest", "40"),
                Measurement::new("waist", "32"),
            ]),
        },
        notes: Some("Slim fit".to_owned()),
        address: "12 Mall Rd".to_owned(),
        phone: "0300-1234567".to_owned(),
        design,
    }
}

fn design(size: usize) -> DesignFile {
    DesignFile {
        file_name: "sketch.png".to_owned(),
        content_type: "image/png".to_owned(),
        bytes: vec![7; size],
    }
}

// =============================================================================
// Placement Tests
// =============================================================================

#[tokio::test]
async fn test_standard_order_is_pending_with_zero_progress() {
    let test = TestApp::signed_in(Role::Customer, "c@x.com").await;
    let shop = test
        .seed_shop("s1", &UserId::new("o1"), "Stitch Co", shirt_service())
        .await;

    let id = test
        .app
        .orders()
        .place_order(&shop, standard_request("svc1"))
        .await
        .unwrap();

    let stored = test.backend.documents("orders");
    assert_eq!(stored.len(), 1);

    let order = test.app.orders().get(&id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.progress, Progress::NONE);
    assert_eq!(order.customer_id, test.uid());
    assert_eq!(order.shop_name.as_deref(), Some("Stitch Co"));
    assert!(order.tailor_id.is_none());
    assert!(order.created_at.is_some());
    assert_eq!(
        order.fulfillment,
        Fulfillment::Standard {
            template_size: Some("M".to_owned())
        }
    );
}

#[tokio::test]
async fn test_incomplete_orders_write_nothing() {
    let test = TestApp::signed_in(Role::Customer, "c@x.com").await;
    let shop = test
        .seed_shop("s1", &UserId::new("o1"), "Stitch Co", shirt_service())
        .await;
    let orders = test.app.orders();

    let mut blank_phone = standard_request("svc1");
    blank_phone.phone = "   ".to_owned();
    let unknown_service = standard_request("svc404");
    let mut no_size = standard_request("svc1");
    no_size.fulfillment = Fulfillment::Standard {
        template_size: None,
    };

    for request in [blank_phone, unknown_service, no_size] {
        let err = orders.place_order(&shop, request).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)), "{err}");
    }
    assert!(test.backend.documents("orders").is_empty());
}

#[tokio::test]
async fn test_custom_order_with_completed_upload() {
    let test = TestApp::signed_in(Role::Customer, "c@x.com").await;
    let shop = test
        .seed_shop("s1", &UserId::new("o1"), "Stitch Co", shirt_service())
        .await;
    let (progress, updates) = watch::channel(UploadProgress::default());

    let id = test
        .app
        .orders()
        .place_order_with_progress(&shop, custom_request(Some(design(40_000))), &progress)
        .await
        .unwrap();

    assert_eq!(updates.borrow().percent(), 100);
    let order = test.app.orders().get(&id).await.unwrap();
    let url = order.design_image_url.unwrap();
    assert!(url.contains("sketch.png"));
    let Fulfillment::Custom { measurements } = order.fulfillment else {
        panic!("expected a custom order");
    };
    assert_eq!(measurements.get("chest"), Some("40"));
    assert_eq!(order.notes.as_deref(), Some("Slim fit"));
}

#[tokio::test]
async fn test_interrupted_upload_writes_no_order() {
    let test = TestApp::signed_in(Role::Customer, "c@x.com").await;
    let shop = test
        .seed_shop("s1", &UserId::new("o1"), "Stitch Co", shirt_service())
        .await;
    test.backend.set_faults(Faults {
        upload_interrupt_after: Some(20_000),
        ..Faults::default()
    });

    let err = test
        .app
        .orders()
        .place_order(&shop, custom_request(Some(design(64_000))))
        .await
        .unwrap_err();

    assert_eq!(err.notice().message, "Upload failed, please try again");
    assert!(test.backend.documents("orders").is_empty());
}

#[tokio::test]
async fn test_custom_order_without_design() {
    let test = TestApp::signed_in(Role::Customer, "c@x.com").await;
    let shop = test
        .seed_shop("s1", &UserId::new("o1"), "Stitch Co", shirt_service())
        .await;

    let id = test
        .app
        .orders()
        .place_order(&shop, custom_request(None))
        .await
        .unwrap();
    assert!(test.app.orders().get(&id).await.unwrap().design_image_url.is_none());
}

#[tokio::test]
async fn test_order_keeps_service_it_was_placed_with() {
    let test = TestApp::signed_in(Role::Owner, "o@x.com").await;
    let owner = test.uid();
    let shop = test
        .seed_shop("s1", &owner, "Stitch Co", shirt_service())
        .await;
    test.app.accounts().sign_out().await.unwrap();

    test.app
        .accounts()
        .sign_up("c@x.com", PASSWORD, Role::Customer)
        .await
        .unwrap();
    let id = test
        .app
        .orders()
        .place_order(&shop, standard_request("svc1"))
        .await
        .unwrap();
    test.app.accounts().sign_out().await.unwrap();

    test.app.accounts().sign_in("o@x.com", PASSWORD).await.unwrap();
    let shops = test.app.shops();
    let mut details = ShopDetails::from_shop(&shop);
    details.services[0].name = "Premium Shirt".to_owned();
    details.services[0].base_price = "35".parse::<Price>().unwrap();
    shops.update(&shop.id, &details).await.unwrap();
    shops
        .add_service(
            &shop.id,
            NewService {
                name: "Trousers".to_owned(),
                base_price: "15".to_owned(),
                types: vec![FulfillmentType::Standard],
                standard_sizes: BTreeMap::new(),
                custom_measurements: Vec::new(),
                templates: Vec::new(),
            },
        )
        .await
        .unwrap();

    let edited = shops.get(&shop.id).await.unwrap();
    assert_eq!(edited.services.len(), 2);
    assert_eq!(edited.services[0].name, "Premium Shirt");

    let order = test.app.orders().get(&id).await.unwrap();
    assert_eq!(order.service_name, "Shirt");
    assert_eq!(order.base_price.display(), "$20.00");
    let snapshot = order.service.unwrap();
    assert_eq!(snapshot.name, "Shirt");
    assert_eq!(snapshot.base_price.display(), "$20.00");
}

// =============================================================================
// Progress & Assignment Tests
// =============================================================================

#[tokio::test]
async fn test_progress_round_trip() {
    let test = TestApp::signed_in(Role::Customer, "c@x.com").await;
    let shop = test
        .seed_shop("s1", &UserId::new("o1"), "Stitch Co", shirt_service())
        .await;
    let orders = test.app.orders();
    let id = orders
        .place_order(&shop, standard_request("svc1"))
        .await
        .unwrap();

    for value in [0, 50, 100] {
        let progress = Progress::new(value).unwrap();
        orders.update_progress(&id, progress).await.unwrap();
        assert_eq!(orders.get(&id).await.unwrap().progress, progress);
    }
}

#[tokio::test]
async fn test_last_progress_write_wins() {
    let test = TestApp::signed_in(Role::Customer, "c@x.com").await;
    let shop = test
        .seed_shop("s1", &UserId::new("o1"), "Stitch Co", shirt_service())
        .await;
    let orders = test.app.orders();
    let id = orders
        .place_order(&shop, standard_request("svc1"))
        .await
        .unwrap();

    let live = test.app.live_customer_orders().await;
    assert_eq!(live.settled().await.items().len(), 1);

    let (first, second) = (Progress::new(70).unwrap(), Progress::new(40).unwrap());
    orders.update_progress(&id, first).await.unwrap();
    orders.update_progress(&id, second).await.unwrap();

    let state = live
        .wait_until(|s| s.items().first().is_some_and(|o| o.progress == second))
        .await;
    assert_eq!(state.items()[0].progress, second);
    assert_eq!(live.settled().await.items()[0].progress, second);
    assert_eq!(orders.get(&id).await.unwrap().progress, second);
}

#[tokio::test]
async fn test_owner_assigns_tailor_and_updates_status() {
    let test = TestApp::signed_in(Role::Customer, "c@x.com").await;
    let shop = test
        .seed_shop("s1", &UserId::new("o1"), "Stitch Co", shirt_service())
        .await;
    let orders = test.app.orders();
    let id = orders
        .place_order(&shop, standard_request("svc1"))
        .await
        .unwrap();

    orders.assign_tailor(&id, &UserId::new("t1")).await.unwrap();
    let order = orders.get(&id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Assigned);
    assert_eq!(order.tailor_id, Some(UserId::new("t1")));

    orders
        .update_status(&id, OrderStatus::Completed)
        .await
        .unwrap();
    assert_eq!(orders.get(&id).await.unwrap().status, OrderStatus::Completed);

    orders.delete(&id).await.unwrap();
    assert!(test.backend.documents("orders").is_empty());
}

// =============================================================================
// Legacy Document Tests
// =============================================================================

#[tokio::test]
async fn test_legacy_order_shapes_decode() {
    let test = TestApp::signed_in(Role::Customer, "c@x.com").await;
    test.backend.seed(
        "orders",
        "legacy",
        json!({
            "userId": "c9",
            "shopId": "s1",
            "service": "Shirt",
            "status": "Received",
            "progress": [{ "status": "Cutting done" }],
            "assignedTailorId": "t2",
        }),
    );

    let order = test
        .app
        .orders()
        .get(&tailor_hub_core::OrderId::new("legacy"))
        .await
        .unwrap();
    assert_eq!(order.customer_id, UserId::new("c9"));
    assert_eq!(order.service_name, "Shirt");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.progress, Progress::NONE);
    assert_eq!(order.progress_history.len(), 1);
    assert_eq!(order.tailor_id, Some(UserId::new("t2")));
}
