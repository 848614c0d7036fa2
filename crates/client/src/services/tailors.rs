//! Tailor accounts provisioned by owners.

use tailor_hub_core::{Email, Role, UserId, UserProfile};
use tracing::{info, instrument, warn};

use super::{collections, query_decoded, required, signed_in_uid};
use crate::backend::{DocumentRef, DocumentStore, IdentityService, Patch, Query};
use crate::error::{ClientError, Result};
use crate::session::SessionStore;

/// The add-tailor form.
#[derive(Debug, Clone)]
pub struct NewTailor {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub skills: String,
    pub password: String,
}

/// Tailor operations.
pub struct TailorService<'a> {
    identity: &'a dyn IdentityService,
    store: &'a dyn DocumentStore,
    session: &'a SessionStore,
}

impl<'a> TailorService<'a> {
    /// Create a new tailor service.
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

    /// Provision a tailor account for the signed-in owner.
    ///
    /// The account is created without touching the owner's session; the
    /// owner's session is refreshed afterwards whether or not provisioning
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for incomplete forms and
    /// `ClientError::Backend` when provisioning or the profile write fails.
    #[instrument(skip(self, tailor), fields(email = %tailor.email))]
    pub async fn add_tailor(&self, tailor: NewTailor) -> Result<UserId> {
        let owner = signed_in_uid(self.session)?;
        let name = required(&tailor.name, "Please enter the tailor's name")?;
        let email = Email::parse(&tailor.email)
            .map_err(|_| ClientError::validation("Please enter a valid email"))?;
        if tailor.password.is_empty() {
            return Err(ClientError::validation("Please enter a password"));
        }

        let result = self.provision(&owner, &name, &email, &tailor).await;

        if let Err(e) = self.identity.refresh_session().await {
            warn!(error = %e, "owner session refresh failed");
        }
        self.session.refresh().await;

        if let Ok(uid) = &result {
            info!(tailor = %uid, owner = %owner, "tailor added");
        }
        result
    }

    async fn provision(
        &self,
        owner: &UserId,
        name: &str,
        email: &Email,
        tailor: &NewTailor,
    ) -> Result<UserId> {
        let account = self
            .identity
            .provision_account(email, &tailor.password)
            .await?;
        let uid = account.uid;

        self.store
            .set(
                &DocumentRef::new(collections::USERS, uid.as_str()),
                Patch::new()
                    .set("ownerId", owner.as_str())
                    .set("uid", uid.as_str())
                    .set("name", name)
                    .set("email", email.as_str())
                    .set("phone", tailor.phone.trim())
                    .set("skills", tailor.skills.trim())
                    .set("role", Role::Tailor.as_str())
                    .server_timestamp("createdAt"),
            )
            .await?;
        Ok(uid)
    }

    /// Tailors provisioned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the read fails.
    pub async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<UserProfile>> {
        query_decoded(self.store, &for_owner(owner)).await
    }

    /// Every tailor account, as offered by the assignment picker.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the read fails.
    pub async fn list_all(&self) -> Result<Vec<UserProfile>> {
        query_decoded(self.store, &all()).await
    }
}

/// Every tailor account.
#[must_use]
pub fn all() -> Query {
    Query::collection(collections::USERS).where_eq("role", Role::Tailor.as_str())
}

/// Tailors provisioned by `owner`.
#[must_use]
pub fn for_owner(owner: &UserId) -> Query {
    all().where_eq("ownerId", owner.as_str())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::backend::memory::Faults;

    async fn owner_session(backend: &MemoryBackend) -> SessionStore {
        let user = backend
            .sign_up(&Email::parse("o@x.com").unwrap(), "secret1")
            .await
            .unwrap();
        backend.seed("users", user.uid.as_str(), json!({ "role": "owner" }));
        let session = SessionStore::start(Arc::new(backend.clone()), Arc::new(backend.clone()));
        session.refresh().await;
        session
    }

    fn form(email: &str) -> NewTailor {
        NewTailor {
            name: "Bilal".into(),
            email: email.into(),
            phone: "0301".into(),
            skills: "sherwani".into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn test_add_tailor_keeps_owner_session() {
        let backend = MemoryBackend::new();
        let session = owner_session(&backend).await;
        let owner = session.snapshot().user.unwrap().uid;
        let tailors = TailorService::new(&backend, &backend, &session);

        let uid = tailors.add_tailor(form("t@x.com")).await.unwrap();

        let after = session.snapshot();
        assert_eq!(after.user.unwrap().uid, owner);
        assert_eq!(after.role, Some(Role::Owner));

        let listed = tailors.list_for_owner(&owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, uid);
        assert_eq!(listed[0].owner_id, Some(owner));
        assert_eq!(listed[0].role, Role::Tailor);
        assert_eq!(tailors.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_profile_write_still_refreshes_owner() {
        let backend = MemoryBackend::new();
        let session = owner_session(&backend).await;
        let tailors = TailorService::new(&backend, &backend, &session);
        backend.set_faults(Faults {
            writes: Some("offline".into()),
            ..Faults::default()
        });

        let err = tailors.add_tailor(form("t@x.com")).await.unwrap_err();
        assert!(matches!(err, ClientError::Backend(_)));
        backend.clear_faults();
        assert_eq!(session.snapshot().role, Some(Role::Owner));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let backend = MemoryBackend::new();
        let session = owner_session(&backend).await;
        let tailors = TailorService::new(&backend, &backend, &session);

        let err = tailors.add_tailor(form("o@x.com")).await.unwrap_err();
        assert!(matches!(err, ClientError::Backend(_)));
        assert_eq!(err.notice().message, "An account with this email already exists");
    }

    #[tokio::test]
    async fn test_invalid_email_is_validation() {
        let backend = MemoryBackend::new();
        let session = owner_session(&backend).await;
        let tailors = TailorService::new(&backend, &backend, &session);
        let err = tailors.add_tailor(form("not-an-email")).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}
