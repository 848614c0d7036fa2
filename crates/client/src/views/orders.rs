//! Order lists and the order detail page.

use askama::Template;
use tailor_hub_core::{Fulfillment, Order, Shop};

use super::short_date;
use crate::live::{LiveState, OwnerOrderRow};
use crate::navigation::Route;

const UNKNOWN_SHOP: &str = "Unknown";

/// One order in a table.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub href: String,
    pub shop_name: String,
    pub service_name: String,
    pub kind: &'static str,
    pub price: String,
    pub status: &'static str,
    pub progress: u8,
    pub assigned: bool,
    pub placed_on: String,
}

impl OrderRow {
    fn new(order: &Order, shop_name: &str, href: Route) -> Self {
        Self {
            href: href.path(),
            shop_name: shop_name.to_owned(),
            service_name: order.service_name.clone(),
            kind: fulfillment_label(&order.fulfillment),
            price: order.base_price.display(),
            status: order.status.label(),
            progress: order.progress.value(),
            assigned: order.is_assigned(),
            placed_on: short_date(order.created_at),
        }
    }
}

const fn fulfillment_label(fulfillment: &Fulfillment) -> &'static str {
    match fulfillment {
        Fulfillment::Standard { .. } => "Standard",
        Fulfillment::Custom { .. } => "Custom",
    }
}

/// The signed-in customer's orders.
#[derive(Debug, Template)]
#[template(path = "orders/customer.html")]
pub struct CustomerOrders {
    pub rows: Vec<OrderRow>,
    pub loading: bool,
}

impl CustomerOrders {
    #[must_use]
    pub fn from_state(state: &LiveState<Order>) -> Self {
        Self {
            rows: state
                .items()
                .iter()
                .map(|order| {
                    OrderRow::new(
                        order,
                        order.shop_name.as_deref().unwrap_or(UNKNOWN_SHOP),
                        Route::MyOrder(order.id.clone()),
                    )
                })
                .collect(),
            loading: state.is_loading(),
        }
    }
}

/// Every order across the owner's shops.
#[derive(Debug, Template)]
#[template(path = "orders/owner_board.html")]
pub struct OwnerOrderBoard {
    pub rows: Vec<OrderRow>,
    pub loading: bool,
}

impl OwnerOrderBoard {
    #[must_use]
    pub fn from_state(state: &LiveState<OwnerOrderRow>) -> Self {
        Self {
            rows: state
                .items()
                .iter()
                .map(|row| {
                    OrderRow::new(
                        &row.order,
                        &row.shop_name,
                        Route::OrderList(row.order.shop_id.clone()),
                    )
                })
                .collect(),
            loading: state.is_loading(),
        }
    }
}

/// Orders of one shop.
#[derive(Debug, Template)]
#[template(path = "orders/shop.html")]
pub struct ShopOrders {
    pub shop_name: String,
    pub rows: Vec<OrderRow>,
    pub loading: bool,
}

impl ShopOrders {
    #[must_use]
    pub fn from_state(shop: &Shop, state: &LiveState<Order>) -> Self {
        Self {
            shop_name: shop.name.clone(),
            rows: state
                .items()
                .iter()
                .map(|order| OrderRow::new(order, &shop.name, Route::OrderList(shop.id.clone())))
                .collect(),
            loading: state.is_loading(),
        }
    }
}

/// Orders assigned to the signed-in tailor.
#[derive(Debug, Template)]
#[template(path = "orders/tailor.html")]
pub struct TailorDashboard {
    pub rows: Vec<OrderRow>,
    pub loading: bool,
}

impl TailorDashboard {
    #[must_use]
    pub fn from_state(state: &LiveState<Order>) -> Self {
        Self {
            rows: state
                .items()
                .iter()
                .map(|order| {
                    OrderRow::new(
                        order,
                        order.shop_name.as_deref().unwrap_or(UNKNOWN_SHOP),
                        Route::TailorOrder(order.id.clone()),
                    )
                })
                .collect(),
            loading: state.is_loading(),
        }
    }
}

/// A measurement line on the detail page.
#[derive(Debug, Clone)]
pub struct MeasurementRow {
    pub part: String,
    pub value: String,
}

/// A progress history step on the detail page.
#[derive(Debug, Clone)]
pub struct StepRow {
    pub label: String,
    pub date: String,
}

/// A single order.
#[derive(Debug, Template)]
#[template(path = "orders/detail.html")]
pub struct OrderDetail {
    pub id: String,
    pub shop_name: String,
    pub service_name: String,
    pub kind: &'static str,
    pub price: String,
    pub status: &'static str,
    pub progress: u8,
    pub template_size: Option<String>,
    pub measurements: Vec<MeasurementRow>,
    pub history: Vec<StepRow>,
    pub design_image_url: Option<String>,
    pub notes: Option<String>,
    pub address: String,
    pub phone: String,
    pub tailor: Option<String>,
    pub placed_on: String,
}

impl OrderDetail {
    #[must_use]
    pub fn new(order: &Order) -> Self {
        let (template_size, measurements) = match &order.fulfillment {
            Fulfillment::Standard { template_size } => (template_size.clone(), Vec::new()),
            Fulfillment::Custom { measurements } => (
                None,
                measurements
                    .iter()
                    .map(|m| MeasurementRow {
                        part: m.part.clone(),
                        value: m.value.clone(),
                    })
                    .collect(),
            ),
        };

        Self {
            id: order.id.to_string(),
            shop_name: order
                .shop_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_SHOP.to_owned()),
            service_name: order.service_name.clone(),
            kind: fulfillment_label(&order.fulfillment),
            price: order.base_price.display(),
            status: order.status.label(),
            progress: order.progress.value(),
            template_size,
            measurements,
            history: order
                .progress_history
                .iter()
                .map(|step| StepRow {
                    label: step.label.clone(),
                    date: short_date(step.at),
                })
                .collect(),
            design_image_url: order.design_image_url.clone(),
            notes: order.notes.clone().filter(|n| !n.trim().is_empty()),
            address: order.address.clone(),
            phone: order.phone.clone(),
            tailor: order.tailor_id.as_ref().map(ToString::to_string),
            placed_on: short_date(order.created_at),
        }
    }
}
