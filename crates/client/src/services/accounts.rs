//! Sign up, sign in and sign out.

use tailor_hub_core::{Email, Role};
use tracing::{info, instrument};

use super::collections;
use crate::backend::{AuthUser, DocumentRef, DocumentStore, IdentityService, Patch};
use crate::error::{ClientError, Result, add_breadcrumb};
use crate::navigation::{Route, landing_route};
use crate::session::SessionStore;

/// Account operations.
pub struct AccountService<'a> {
    identity: &'a dyn IdentityService,
    store: &'a dyn DocumentStore,
    session: &'a SessionStore,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(
        identity: &'a dyn IdentityService,
        store: &'a dyn DocumentStore,
        session: &'a SessionStore,
    ) -> Self {
        Self {
            identity,
            store,
            session,
        }
    }

    /// Create an account with the given role.
    ///
    /// The identity service signs the new user in; the role document is
    /// written before the session is resolved again.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an invalid email and
    /// `ClientError::Backend` for provider failures (existing account, weak
    /// password) or a failed profile write.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str, role: Role) -> Result<AuthUser> {
        let email = parse_email(email)?;
        let user = self.identity.sign_up(&email, password).await?;

        self.store
            .set(
                &DocumentRef::new(collections::USERS, user.uid.as_str()),
                Patch::new()
                    .set("email", email.as_str())
                    .set("role", role.as_str())
                    .server_timestamp("createdAt"),
            )
            .await?;
        self.session.refresh().await;

        info!(uid = %user.uid, %role, "account created");
        Ok(user)
    }

    /// Sign in and return the role's landing route.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Auth` when the account has no role document and
    /// `ClientError::Backend` for rejected credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Route> {
        let email = parse_email(email)?;
        self.identity.sign_in(&email, password).await?;

        let session = self.session.refresh().await;
        let role = session
            .role
            .ok_or_else(|| ClientError::Auth("User role not found.".to_owned()))?;

        add_breadcrumb("auth", "Signed in", Some(&[("role", role.as_str())]));
        Ok(landing_route(role))
    }

    /// Sign out.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the identity service fails.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        self.identity.sign_out().await?;
        self.session.refresh().await;
        Ok(())
    }
}

fn parse_email(email: &str) -> Result<Email> {
    Email::parse(email).map_err(|_| ClientError::validation("Please enter a valid email"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::MemoryBackend;

    fn session(backend: &MemoryBackend) -> SessionStore {
        SessionStore::start(Arc::new(backend.clone()), Arc::new(backend.clone()))
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let backend = MemoryBackend::new();
        let session = session(&backend);
        let accounts = AccountService::new(&backend, &backend, &session);

        let user = accounts
            .sign_up("Owner@X.com", "secret1", Role::Owner)
            .await
            .unwrap();
        assert_eq!(session.snapshot().role, Some(Role::Owner));
        assert!(backend.document("users", user.uid.as_str()).is_some());

        accounts.sign_out().await.unwrap();
        assert!(session.snapshot().user.is_none());

        let landing = accounts.sign_in("owner@x.com", "secret1").await.unwrap();
        assert_eq!(landing, Route::Dashboard);
    }

    #[tokio::test]
    async fn test_sign_in_without_role_document() {
        let backend = MemoryBackend::new();
        backend
            .register_account(&Email::parse("ghost@x.com").unwrap(), "secret1")
            .unwrap();
        let session = session(&backend);
        let accounts = AccountService::new(&backend, &backend, &session);

        let err = accounts.sign_in("ghost@x.com", "secret1").await.unwrap_err();
        assert!(matches!(&err, ClientError::Auth(msg) if msg == "User role not found."));
        assert_eq!(err.notice().message, "User role not found.");
    }

    #[tokio::test]
    async fn test_bad_credentials_and_weak_password() {
        let backend = MemoryBackend::new();
        let session = session(&backend);
        let accounts = AccountService::new(&backend, &backend, &session);

        let err = accounts.sign_in("nobody@x.com", "secret1").await.unwrap_err();
        assert_eq!(err.notice().message, "Invalid email or password");

        let err = accounts
            .sign_up("a@x.com", "123", Role::Customer)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Backend(_)));

        let err = accounts
            .sign_up("not an email", "secret1", Role::Customer)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}
