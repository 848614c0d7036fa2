//! Observable session store.
//!
//! Resolves the signed-in user and their role every time the identity
//! service reports an auth change, and publishes the result as immutable
//! [`SessionSnapshot`] values through a `watch` channel.

use std::sync::{Arc, OnceLock, Weak};

use tailor_hub_core::{Email, Role, UserProfile};
use tokio::sync::{Mutex, watch};
use tokio::task::AbortHandle;
use tracing::{debug, error, instrument, warn};

use crate::backend::{AuthUser, DocumentRef, DocumentStore, IdentityService};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::services::collections;

/// Who is signed in, as last resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The signed-in identity.
    pub user: Option<AuthUser>,
    /// Role read from the user's profile document.
    pub role: Option<Role>,
    /// True until the first resolution completes.
    pub loading: bool,
}

impl SessionSnapshot {
    const fn initial() -> Self {
        Self {
            user: None,
            role: None,
            loading: true,
        }
    }

    /// Whether someone is signed in.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

/// Session store shared by every screen.
///
/// Cheap to clone; clones observe the same session. The background
/// resolution task stops when the last clone is dropped.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    identity: Arc<dyn IdentityService>,
    store: Arc<dyn DocumentStore>,
    tx: watch::Sender<SessionSnapshot>,
    resolving: Mutex<()>,
    task: OnceLock<AbortHandle>,
}

impl SessionStore {
    /// Create the store and start following auth changes.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(identity: Arc<dyn IdentityService>, store: Arc<dyn DocumentStore>) -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::initial());
        let mut auth_rx = identity.auth_state();
        let inner = Arc::new(SessionStoreInner {
            identity,
            store,
            tx,
            resolving: Mutex::new(()),
            task: OnceLock::new(),
        });

        let weak: Weak<SessionStoreInner> = Arc::downgrade(&inner);
        let handle = tokio::spawn(async move {
            loop {
                auth_rx.borrow_and_update();
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.resolve().await;
                drop(inner);

                if auth_rx.changed().await.is_err() {
                    debug!("identity service closed; session store stopped");
                    break;
                }
            }
        });
        let _ = inner.task.set(handle.abort_handle());

        Self { inner }
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.tx.borrow().clone()
    }

    /// Receive every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.tx.subscribe()
    }

    /// Wait for the first resolution to complete.
    pub async fn resolved(&self) -> SessionSnapshot {
        let mut rx = self.inner.tx.subscribe();
        rx.wait_for(|s| !s.loading)
            .await
            .map_or_else(|_| self.snapshot(), |s| s.clone())
    }

    /// Re-run the resolution for the current user and return the result.
    ///
    /// Used once a role document has just been written, or after the
    /// identity session has been refreshed.
    pub async fn refresh(&self) -> SessionSnapshot {
        self.inner.resolve().await
    }
}

impl SessionStoreInner {
    #[instrument(skip(self))]
    async fn resolve(&self) -> SessionSnapshot {
        let _serial = self.resolving.lock().await;

        let user = self.identity.current_user();
        let role = match &user {
            Some(user) => self.lookup_role(user).await,
            None => None,
        };

        match &user {
            Some(user) => set_sentry_user(&user.uid, user.email.as_ref().map(Email::as_str)),
            None => clear_sentry_user(),
        }

        let next = SessionSnapshot {
            user,
            role,
            loading: false,
        };
        let published = next.clone();
        self.tx.send_if_modified(move |current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        debug!(signed_in = published.is_signed_in(), role = ?published.role, "session resolved");
        published
    }

    async fn lookup_role(&self, user: &AuthUser) -> Option<Role> {
        let doc = DocumentRef::new(collections::USERS, user.uid.as_str());
        match self.store.get(&doc).await {
            Ok(Some(document)) => match document.decode::<UserProfile>() {
                Ok(profile) => Some(profile.role),
                Err(e) => {
                    warn!(uid = %user.uid, error = %e, "user profile could not be decoded");
                    None
                }
            },
            Ok(None) => {
                debug!(uid = %user.uid, "no profile document for user");
                None
            }
            Err(e) => {
                error!(uid = %user.uid, error = %e, "role lookup failed");
                None
            }
        }
    }
}

impl Drop for SessionStoreInner {
    fn drop(&mut self) {
        if let Some(task) = self.task.get() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tailor_hub_core::UserId;

    use super::*;
    use crate::backend::memory::Faults;
    use crate::backend::MemoryBackend;

    fn store_for(backend: &MemoryBackend) -> SessionStore {
        SessionStore::start(Arc::new(backend.clone()), Arc::new(backend.clone()))
    }

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_signed_out_resolves_without_role() {
        let backend = MemoryBackend::new();
        let session = store_for(&backend);

        let snapshot = session.resolved().await;
        assert!(!snapshot.loading);
        assert!(snapshot.user.is_none());
        assert!(snapshot.role.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_resolves_role() {
        let backend = MemoryBackend::new();
        let user = backend.register_account(&email("o@x.com"), "secret1").unwrap();
        backend.seed(
            "users",
            user.uid.as_str(),
            json!({ "email": "o@x.com", "role": "owner" }),
        );
        let session = store_for(&backend);
        session.resolved().await;

        backend.sign_in(&email("o@x.com"), "secret1").await.unwrap();
        let mut rx = session.subscribe();
        let snapshot = rx
            .wait_for(|s| s.role.is_some())
            .await
            .unwrap()
            .clone();

        assert_eq!(snapshot.role, Some(Role::Owner));
        assert_eq!(snapshot.user.unwrap().uid, user.uid);
    }

    #[tokio::test]
    async fn test_missing_profile_gives_no_role() {
        let backend = MemoryBackend::new();
        backend.register_account(&email("c@x.com"), "secret1").unwrap();
        backend.sign_in(&email("c@x.com"), "secret1").await.unwrap();

        let snapshot = store_for(&backend).resolved().await;
        assert!(snapshot.user.is_some());
        assert!(snapshot.role.is_none());
    }

    #[tokio::test]
    async fn test_failed_lookup_gives_no_role() {
        let backend = MemoryBackend::new();
        let user = backend.register_account(&email("c@x.com"), "secret1").unwrap();
        backend.seed("users", user.uid.as_str(), json!({ "role": "customer" }));
        backend.sign_in(&email("c@x.com"), "secret1").await.unwrap();
        backend.set_faults(Faults {
            reads: Some("offline".into()),
            ..Faults::default()
        });

        let snapshot = store_for(&backend).resolved().await;
        assert_eq!(snapshot.user.map(|u| u.uid), Some(UserId::new(user.uid.as_str())));
        assert!(snapshot.role.is_none());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_profile() {
        let backend = MemoryBackend::new();
        let user = backend.sign_up(&email("n@x.com"), "secret1").await.unwrap();
        let session = store_for(&backend);
        session.resolved().await;

        backend.seed("users", user.uid.as_str(), json!({ "role": "customer" }));
        let snapshot = session.refresh().await;
        assert_eq!(snapshot.role, Some(Role::Customer));
        assert_eq!(session.snapshot().role, Some(Role::Customer));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let backend = MemoryBackend::new();
        let user = backend.sign_up(&email("n@x.com"), "secret1").await.unwrap();
        backend.seed("users", user.uid.as_str(), json!({ "role": "tailor" }));
        let session = store_for(&backend);
        assert_eq!(session.resolved().await.role, Some(Role::Tailor));

        backend.sign_out().await.unwrap();
        let mut rx = session.subscribe();
        let snapshot = rx.wait_for(|s| s.user.is_none()).await.unwrap().clone();
        assert!(snapshot.role.is_none());
        assert!(!snapshot.loading);
    }
}
