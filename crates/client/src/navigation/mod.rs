//! Role-gated navigation.
//!
//! The navigation bar, the route guard and the owner dashboard tabs all
//! derive from the latest [`SessionSnapshot`].

mod route;

pub use route::{Audience, Route, UnknownRoute};

use std::str::FromStr;

use tailor_hub_core::Role;

use crate::session::SessionSnapshot;

/// Navigation state derived from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    /// The session has not resolved yet.
    Unresolved,
    Customer,
    Owner,
    Tailor,
    /// Signed out, or signed in without a role.
    Anonymous,
}

impl NavState {
    /// Derive the state from a session snapshot.
    #[must_use]
    pub const fn from_session(session: &SessionSnapshot) -> Self {
        if session.loading {
            return Self::Unresolved;
        }
        match session.role {
            Some(Role::Customer) => Self::Customer,
            Some(Role::Owner) => Self::Owner,
            Some(Role::Tailor) => Self::Tailor,
            None => Self::Anonymous,
        }
    }
}

/// What a navigation entry does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    Go(Route),
    Logout,
}

/// One entry of the navigation bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub label: &'static str,
    pub action: NavAction,
}

impl NavLink {
    const fn go(label: &'static str, route: Route) -> Self {
        Self {
            label,
            action: NavAction::Go(route),
        }
    }
}

/// Links shown for the current session, in display order.
#[must_use]
pub fn nav_links(session: &SessionSnapshot) -> Vec<NavLink> {
    let state = NavState::from_session(session);
    let mut links = vec![NavLink::go("Home", Route::Home)];

    match state {
        NavState::Customer => {
            links.push(NavLink::go("Shops", Route::Shops));
            links.push(NavLink::go("My Orders", Route::MyOrders));
        }
        NavState::Owner => {
            links.push(NavLink::go("Dashboard", Route::Dashboard));
            links.push(NavLink::go("Manage Orders", Route::AllOrders));
        }
        NavState::Tailor => links.push(NavLink::go("Tailor Panel", Route::TailorHome)),
        NavState::Unresolved | NavState::Anonymous => {}
    }

    links.push(NavLink::go("Contact", Route::Contact));

    match state {
        NavState::Unresolved => {}
        _ if session.is_signed_in() => links.push(NavLink {
            label: "Logout",
            action: NavAction::Logout,
        }),
        _ => {
            links.push(NavLink::go("Login", Route::Login));
            links.push(NavLink::go("Signup", Route::Signup));
        }
    }

    links
}

/// Where a role lands after signing in.
#[must_use]
pub const fn landing_route(role: Role) -> Route {
    match role {
        Role::Customer => Route::Home,
        Role::Owner => Route::Dashboard,
        Role::Tailor => Route::TailorHome,
    }
}

/// How route audiences are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardPolicy {
    /// Audiences are informational; every route renders.
    #[default]
    Advisory,
    /// Visits outside a route's audience are redirected.
    Enforce,
}

impl GuardPolicy {
    /// Redirect for a visit to `route`, if any.
    ///
    /// Nothing is redirected while the session is still resolving. Signed-out
    /// visitors go to the login screen; signed-in users with another role go
    /// to their landing route.
    #[must_use]
    pub fn check(self, route: &Route, session: &SessionSnapshot) -> Option<Route> {
        if self == Self::Advisory || session.loading {
            return None;
        }
        let Audience::Role(required) = route.audience() else {
            return None;
        };
        if !session.is_signed_in() {
            return Some(Route::Login);
        }
        match session.role {
            Some(role) if role == required => None,
            Some(role) => Some(landing_route(role)),
            None => Some(Route::Home),
        }
    }
}

impl FromStr for GuardPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(Self::Advisory),
            "enforce" => Ok(Self::Enforce),
            _ => Err(format!("expected 'advisory' or 'enforce', got '{s}'")),
        }
    }
}

/// Sections of the owner dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardTab {
    #[default]
    Shops,
    Orders,
    Chats,
    AddTailor,
    Tailors,
}

impl DashboardTab {
    /// Every tab in display order.
    pub const ALL: [Self; 5] = [
        Self::Shops,
        Self::Orders,
        Self::Chats,
        Self::AddTailor,
        Self::Tailors,
    ];

    /// Tab label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shops => "My Shops",
            Self::Orders => "Orders",
            Self::Chats => "Chats",
            Self::AddTailor => "Add Tailor",
            Self::Tailors => "Tailors",
        }
    }
}
