//! Typed browser routes.

use std::fmt;
use std::str::FromStr;

use tailor_hub_core::{ChatThreadId, MessageId, OrderId, Role, ShopId};

/// Who a route is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Anyone, signed in or not.
    Anyone,
    /// Signed-in users with the given role.
    Role(Role),
}

/// Every screen of the application.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Signup,
    Contact,
    Shops,
    Shop(ShopId),
    MyOrders,
    MyOrder(OrderId),
    Dashboard,
    CreateShop,
    EditShop(ShopId),
    ShopList,
    ShopDetail(ShopId),
    OrderList(ShopId),
    /// Same screen as [`Route::OrderList`], kept for old links.
    OrderDetail(ShopId),
    AllOrders,
    OwnerChat {
        chat: ChatThreadId,
        message: MessageId,
    },
    TailorHome,
    TailorOrder(OrderId),
}

/// A path that matches no route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no route for {0}")]
pub struct UnknownRoute(pub String);

impl Route {
    /// Parse a path such as `/shop/abc`. Query strings and fragments are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownRoute`] when the path matches no screen.
    pub fn parse(path: &str) -> Result<Self, UnknownRoute> {
        let bare = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<String> = bare
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::decode(s).map_or_else(|_| s.to_owned(), |d| d.into_owned()))
            .collect();
        let parts: Vec<&str> = segments.iter().map(String::as_str).collect();

        let route = match parts.as_slice() {
            [] => Self::Home,
            ["login"] => Self::Login,
            ["signup"] => Self::Signup,
            ["contact"] => Self::Contact,
            ["shops"] => Self::Shops,
            ["shop", id] => Self::Shop(ShopId::new(*id)),
            ["my-orders"] => Self::MyOrders,
            ["my-orders", id] => Self::MyOrder(OrderId::new(*id)),
            ["dashboard"] => Self::Dashboard,
            ["create_shop"] => Self::CreateShop,
            ["owner", id, "edit"] => Self::EditShop(ShopId::new(*id)),
            ["shop_list"] => Self::ShopList,
            ["shop_detail", id] => Self::ShopDetail(ShopId::new(*id)),
            ["order_list", id] => Self::OrderList(ShopId::new(*id)),
            ["order_detail", id] => Self::OrderDetail(ShopId::new(*id)),
            ["allorders"] => Self::AllOrders,
            ["owner", "chat", chat, "message", message] => Self::OwnerChat {
                chat: ChatThreadId::new(*chat),
                message: MessageId::new(*message),
            },
            ["tailor-home"] => Self::TailorHome,
            ["tailor", "orders", id] => Self::TailorOrder(OrderId::new(*id)),
            _ => return Err(UnknownRoute(path.to_owned())),
        };
        Ok(route)
    }

    /// The path for this route.
    #[must_use]
    pub fn path(&self) -> String {
        let enc = |s: &str| urlencoding::encode(s).into_owned();
        match self {
            Self::Home => "/".to_owned(),
            Self::Login => "/login".to_owned(),
            Self::Signup => "/signup".to_owned(),
            Self::Contact => "/contact".to_owned(),
            Self::Shops => "/shops".to_owned(),
            Self::Shop(id) => format!("/shop/{}", enc(id.as_str())),
            Self::MyOrders => "/my-orders".to_owned(),
            Self::MyOrder(id) => format!("/my-orders/{}", enc(id.as_str())),
            Self::Dashboard => "/dashboard".to_owned(),
            Self::CreateShop => "/create_shop".to_owned(),
            Self::EditShop(id) => format!("/owner/{}/edit", enc(id.as_str())),
            Self::ShopList => "/shop_list".to_owned(),
            Self::ShopDetail(id) => format!("/shop_detail/{}", enc(id.as_str())),
            Self::OrderList(id) => format!("/order_list/{}", enc(id.as_str())),
            Self::OrderDetail(id) => format!("/order_detail/{}", enc(id.as_str())),
            Self::AllOrders => "/allorders".to_owned(),
            Self::OwnerChat { chat, message } => format!(
                "/owner/chat/{}/message/{}",
                enc(chat.as_str()),
                enc(message.as_str())
            ),
            Self::TailorHome => "/tailor-home".to_owned(),
            Self::TailorOrder(id) => format!("/tailor/orders/{}", enc(id.as_str())),
        }
    }

    /// Who the screen is meant for.
    #[must_use]
    pub const fn audience(&self) -> Audience {
        match self {
            Self::Home | Self::Login | Self::Signup | Self::Contact => Audience::Anyone,
            Self::Shops | Self::Shop(_) | Self::MyOrders | Self::MyOrder(_) => {
                Audience::Role(Role::Customer)
            }
            Self::Dashboard
            | Self::CreateShop
            | Self::EditShop(_)
            | Self::ShopList
            | Self::ShopDetail(_)
            | Self::OrderList(_)
            | Self::OrderDetail(_)
            | Self::AllOrders
            | Self::OwnerChat { .. } => Audience::Role(Role::Owner),
            Self::TailorHome | Self::TailorOrder(_) => Audience::Role(Role::Tailor),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_static_routes() {
        assert_eq!(Route::parse("/").unwrap(), Route::Home);
        assert_eq!(Route::parse("").unwrap(), Route::Home);
        assert_eq!(Route::parse("/allorders").unwrap(), Route::AllOrders);
        assert_eq!(Route::parse("/tailor-home/").unwrap(), Route::TailorHome);
        assert_eq!(Route::parse("/my-orders?tab=1").unwrap(), Route::MyOrders);
    }

    #[test]
    fn test_parse_parameterized_routes() {
        assert_eq!(
            Route::parse("/owner/s1/edit").unwrap(),
            Route::EditShop(ShopId::new("s1"))
        );
        assert_eq!(
            Route::parse("/owner/chat/s1_u1/message/m9").unwrap(),
            Route::OwnerChat {
                chat: ChatThreadId::new("s1_u1"),
                message: MessageId::new("m9"),
            }
        );
        assert_eq!(
            Route::parse("/tailor/orders/o%201").unwrap(),
            Route::TailorOrder(OrderId::new("o 1"))
        );
    }

    #[test]
    fn test_unknown_paths_are_rejected() {
        assert!(Route::parse("/admin").is_err());
        assert!(Route::parse("/shop").is_err());
        assert!(Route::parse("/shop/a/b").is_err());
    }

    #[test]
    fn test_path_round_trips() {
        let routes = [
            Route::Shop(ShopId::new("a b")),
            Route::OrderDetail(ShopId::new("s1")),
            Route::OwnerChat {
                chat: ChatThreadId::new("s1_u1"),
                message: MessageId::new("m1"),
            },
            Route::CreateShop,
        ];
        for route in routes {
            assert_eq!(Route::parse(&route.path()).unwrap(), route);
        }
    }

    #[test]
    fn test_audiences() {
        assert_eq!(Route::Contact.audience(), Audience::Anyone);
        assert_eq!(Route::AllOrders.audience(), Audience::Role(Role::Owner));
        assert_eq!(
            Route::MyOrder(OrderId::new("o")).audience(),
            Audience::Role(Role::Customer)
        );
        assert_eq!(
            Route::TailorOrder(OrderId::new("o")).audience(),
            Audience::Role(Role::Tailor)
        );
    }
}
