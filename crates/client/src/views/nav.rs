//! Navigation bar.

use askama::Template;

use crate::navigation::{NavAction, nav_links};
use crate::session::SessionSnapshot;

/// One rendered navigation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    /// Link target; `None` renders the logout button.
    pub href: Option<String>,
}

/// Navigation bar template.
#[derive(Debug, Template)]
#[template(path = "nav.html")]
pub struct NavBar {
    pub items: Vec<NavItem>,
}

impl NavBar {
    /// Links for the current session.
    #[must_use]
    pub fn for_session(session: &SessionSnapshot) -> Self {
        let items = nav_links(session)
            .into_iter()
            .map(|link| NavItem {
                label: link.label,
                href: match link.action {
                    NavAction::Go(route) => Some(route.path()),
                    NavAction::Logout => None,
                },
            })
            .collect();
        Self { items }
    }
}
