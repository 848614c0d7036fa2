//! Collaborator seams for the managed backend.
//!
//! Everything the client does is a call against one of three services:
//! - [`IdentityService`] - email/password accounts and the current session
//! - [`DocumentStore`] - document CRUD, one-shot queries and live subscriptions
//! - [`BlobStorage`] - file uploads with progress and download URLs
//!
//! [`MemoryBackend`] implements all three in-process. The [`firebase`] module
//! talks to the hosted identity and storage REST APIs.

pub mod firebase;
pub mod memory;
mod query;
mod subscription;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tailor_hub_core::decode::Fields;
use tailor_hub_core::{DecodeDocument, DecodeError, Email, UserId};
use thiserror::Error;
use tokio::sync::watch;

pub use memory::MemoryBackend;
pub use query::{
    Direction, DocumentRef, Filter, ListenTarget, MAX_IN_VALUES, OrderBy, Query, compare_values,
};
pub use subscription::{SnapshotSender, Subscription};

/// Errors reported by backend collaborators.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The service could not be reached or refused the call.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The addressed document or object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The query violates the store's limits.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Security rules rejected the call.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// An upload stopped before all bytes were stored.
    #[error("upload interrupted: {0}")]
    UploadInterrupted(String),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("an account with this email already exists")]
    AccountExists,

    /// The provider rejected the password.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// The call needs a signed-in user.
    #[error("no signed-in user")]
    NoSession,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// The signed-in identity as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: UserId,
    pub email: Option<Email>,
}

/// A stored document: its ID and raw fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Decode into a canonical model.
    ///
    /// # Errors
    ///
    /// Returns the decoder's [`DecodeError`].
    pub fn decode<T: DecodeDocument>(&self) -> Result<T, DecodeError> {
        T::decode(&self.id, &self.fields)
    }
}

/// One delivery of a live subscription: the complete current result.
///
/// Document targets deliver zero or one document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

/// How a single field is written.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    /// Store the value as-is.
    Value(Value),
    /// Store the time the write is applied by the backend.
    ServerTimestamp,
    /// Append the values not already present in the array.
    ArrayUnion(Vec<Value>),
    /// Remove the field.
    Delete,
}

/// A set of field writes applied to one document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Patch {
    fields: BTreeMap<String, FieldWrite>,
}

impl Patch {
    /// Empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a value.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields
            .insert(field.into(), FieldWrite::Value(value.into()));
        self
    }

    /// Write the backend's clock.
    #[must_use]
    pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), FieldWrite::ServerTimestamp);
        self
    }

    /// Union values into an array field.
    #[must_use]
    pub fn array_union(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.fields
            .insert(field.into(), FieldWrite::ArrayUnion(values));
        self
    }

    /// Remove a field.
    #[must_use]
    pub fn delete(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), FieldWrite::Delete);
        self
    }

    /// Whether the patch writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over the writes in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldWrite)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Bytes transferred so far in an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadProgress {
    pub transferred: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Whole percent transferred; an empty upload counts as complete.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = self.transferred.min(self.total).saturating_mul(100) / self.total;
        u8::try_from(pct).unwrap_or(100)
    }
}

/// A file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobUpload {
    pub path: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Email/password identity provider.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Create an account and sign it in.
    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthUser, BackendError>;

    /// Sign in an existing account.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, BackendError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// The signed-in user, if any.
    fn current_user(&self) -> Option<AuthUser>;

    /// Auth-state notifications; the current value is the signed-in user.
    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>>;

    /// Create an account on behalf of the signed-in user.
    ///
    /// The caller's session is left untouched.
    async fn provision_account(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthUser, BackendError>;

    /// Reload the current session and re-announce it to auth-state
    /// listeners.
    async fn refresh_session(&self) -> Result<(), BackendError>;
}

/// Document database with live queries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document.
    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, BackendError>;

    /// Run a one-shot query.
    async fn query(&self, query: &Query) -> Result<Vec<Document>, BackendError>;

    /// Create a document with a generated ID and return the ID.
    async fn add(&self, collection: &str, patch: Patch) -> Result<String, BackendError>;

    /// Create or replace a document.
    async fn set(&self, doc: &DocumentRef, patch: Patch) -> Result<(), BackendError>;

    /// Create a document or merge fields into an existing one.
    async fn merge(&self, doc: &DocumentRef, patch: Patch) -> Result<(), BackendError>;

    /// Update fields of an existing document.
    ///
    /// Fails with [`BackendError::NotFound`] when the document is missing.
    async fn update(&self, doc: &DocumentRef, patch: Patch) -> Result<(), BackendError>;

    /// Delete a document; deleting a missing document succeeds.
    async fn delete(&self, doc: &DocumentRef) -> Result<(), BackendError>;

    /// Follow a query or document.
    ///
    /// The first delivery is the current result.
    async fn listen(&self, target: ListenTarget) -> Result<Subscription, BackendError>;
}

/// File storage.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Upload a file, reporting progress as bytes are sent.
    ///
    /// Returns the stored object's path.
    async fn upload(
        &self,
        upload: BlobUpload,
        progress: &watch::Sender<UploadProgress>,
    ) -> Result<String, BackendError>;

    /// Public download URL of a stored object.
    async fn download_url(&self, path: &str) -> Result<String, BackendError>;
}
