//! Shop directory and storefront.

use askama::Template;
use tailor_hub_core::{FulfillmentType, Review, Service, Shop};

use super::short_date;
use crate::live::LiveState;
use crate::navigation::Route;

/// A shop in the directory.
#[derive(Debug, Clone)]
pub struct ShopCard {
    pub name: String,
    pub location: String,
    pub description: String,
    pub rating: String,
    pub image: Option<String>,
    pub href: String,
}

impl From<&Shop> for ShopCard {
    fn from(shop: &Shop) -> Self {
        Self {
            name: shop.name.clone(),
            location: shop.location.clone(),
            description: shop.description.clone(),
            rating: format!("{:.1}", shop.rating),
            image: shop.image.clone(),
            href: Route::Shop(shop.id.clone()).path(),
        }
    }
}

/// Every shop, for customers.
#[derive(Debug, Template)]
#[template(path = "shops/directory.html")]
pub struct ShopDirectory {
    pub shops: Vec<ShopCard>,
    pub loading: bool,
}

impl ShopDirectory {
    /// Build from the live shop list.
    #[must_use]
    pub fn from_state(state: &LiveState<Shop>) -> Self {
        Self {
            shops: state.items().iter().map(ShopCard::from).collect(),
            loading: state.is_loading(),
        }
    }
}

/// A row of the storefront's service table.
#[derive(Debug, Clone)]
pub struct ServiceRow {
    pub name: String,
    pub price: String,
    pub types: String,
    pub sizes: String,
}

impl From<&Service> for ServiceRow {
    fn from(service: &Service) -> Self {
        let types = [FulfillmentType::Standard, FulfillmentType::Custom]
            .into_iter()
            .filter(|kind| service.supports(*kind))
            .map(|kind| match kind {
                FulfillmentType::Standard => "Standard",
                FulfillmentType::Custom => "Custom",
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sizes = service
            .standard_sizes
            .values()
            .flat_map(|garment| garment.sizes.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            name: service.name.clone(),
            price: service.base_price.display(),
            types,
            sizes,
        }
    }
}

/// A review under the storefront.
#[derive(Debug, Clone)]
pub struct ReviewRow {
    pub user_name: String,
    pub stars: String,
    pub comment: String,
    pub date: String,
}

impl From<&Review> for ReviewRow {
    fn from(review: &Review) -> Self {
        Self {
            user_name: review.user_name.clone(),
            stars: review.stars(),
            comment: review.comment.clone(),
            date: short_date(review.created_at),
        }
    }
}

/// A shop's page: details, services and reviews.
#[derive(Debug, Template)]
#[template(path = "shops/storefront.html")]
pub struct Storefront {
    pub name: String,
    pub location: String,
    pub description: String,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub rating: String,
    pub services: Vec<ServiceRow>,
    pub templates: Vec<String>,
    pub reviews: Vec<ReviewRow>,
}

impl Storefront {
    #[must_use]
    pub fn new(shop: &Shop, reviews: &[Review]) -> Self {
        Self {
            name: shop.name.clone(),
            location: shop.location.clone(),
            description: shop.description.clone(),
            phone: shop.phone.clone(),
            image: shop.image.clone(),
            rating: format!("{:.1}", shop.rating),
            services: shop.services.iter().map(ServiceRow::from).collect(),
            templates: shop.template_sizes(),
            reviews: reviews.iter().map(ReviewRow::from).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tailor_hub_core::DecodeDocument;

    use super::*;

    fn shop(fields: serde_json::Value) -> Shop {
        let fields = fields.as_object().unwrap().clone();
        Shop::decode("s1", &fields).unwrap()
    }

    #[test]
    fn test_shop_without_services_says_so() {
        let shop = shop(json!({ "ownerId": "o1", "name": "Stitch Co", "location": "Lahore" }));
        let html = Storefront::new(&shop, &[]).render().unwrap();
        assert!(html.contains("Stitch Co"));
        assert!(html.contains("No services available"));
        assert!(html.contains("No reviews yet"));
    }

    #[test]
    fn test_services_table() {
        let shop = shop(json!({
            "ownerId": "o1",
            "name": "Stitch Co",
            "services": [
                { "name": "Kurta", "basePrice": 20, "types": ["standard"],
                  "standardSizes": { "kurta": { "sizes": ["S", "M"] } } },
                { "name": "Suit", "basePrice": "120.5", "types": ["custom"] }
            ]
        }));
        let html = Storefront::new(&shop, &[]).render().unwrap();
        assert!(!html.contains("No services available"));
        assert!(html.contains("Kurta"));
        assert!(html.contains("$20.00"));
        assert!(html.contains("$120.50"));
        assert!(html.contains("S, M"));
    }

    #[test]
    fn test_empty_directory() {
        let html = ShopDirectory::from_state(&LiveState::Ready(Vec::new()))
            .render()
            .unwrap();
        assert!(html.contains("No shops found"));

        let html = ShopDirectory::from_state(&LiveState::Loading).render().unwrap();
        assert!(html.contains("Loading shops"));
        assert!(!html.contains("No shops found"));
    }

    #[test]
    fn test_directory_links_to_storefront() {
        let shop = shop(json!({ "ownerId": "o1", "name": "Stitch <Co>", "rating": 4.3 }));
        let html = ShopDirectory::from_state(&LiveState::Ready(vec![shop]))
            .render()
            .unwrap();
        assert!(html.contains(r#"href="/shop/s1""#));
        assert!(!html.contains("<Co>"));
        assert!(html.contains("4.3"));
    }
}
