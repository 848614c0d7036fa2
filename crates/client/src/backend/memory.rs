//! In-process backend.
//!
//! Implements the identity, document and storage seams against shared
//! in-memory state. Listeners receive the full result of their target after
//! every write that changes it. Faults can be injected to exercise the
//! failure paths of the client.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde_json::Value;
use tailor_hub_core::decode::{Fields, timestamp};
use tailor_hub_core::{Email, UserId};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::{
    AuthUser, BackendError, BlobStorage, BlobUpload, Document, DocumentRef, DocumentStore,
    FieldWrite, IdentityService, ListenTarget, Patch, Query, Snapshot, SnapshotSender,
    Subscription, UploadProgress,
};

/// Shortest password the identity service accepts.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Bytes reported per upload progress step.
const UPLOAD_CHUNK: usize = 16 * 1024;

/// Failures to inject into subsequent calls.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Fail `get` and `query` with this message.
    pub reads: Option<String>,
    /// Fail every document write with this message.
    pub writes: Option<String>,
    /// Deliver this error as the first item of new subscriptions.
    pub listens: Option<String>,
    /// Interrupt uploads once more than this many bytes would be sent.
    pub upload_interrupt_after: Option<u64>,
}

/// In-memory identity, document and storage backend.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    auth: watch::Sender<Option<AuthUser>>,
    bucket: String,
}

struct Account {
    user: AuthUser,
    password: String,
}

struct Listener {
    target: ListenTarget,
    tx: SnapshotSender,
    last: Snapshot,
}

#[derive(Default)]
struct State {
    collections: BTreeMap<String, BTreeMap<String, Fields>>,
    accounts: HashMap<Email, Account>,
    listeners: BTreeMap<u64, Listener>,
    next_listener: u64,
    blobs: HashMap<String, Vec<u8>>,
    faults: Faults,
    clock: Option<DateTime<Utc>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Empty backend with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        let (auth, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                auth,
                bucket: "tailor-hub.local".to_owned(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.inner.state)
    }

    /// Replace the injected faults.
    pub fn set_faults(&self, faults: Faults) {
        self.state().faults = faults;
    }

    /// Clear all injected faults.
    pub fn clear_faults(&self) {
        self.set_faults(Faults::default());
    }

    /// Fail every active subscription with `message` and drop it.
    pub fn break_listeners(&self, message: &str) {
        let listeners = std::mem::take(&mut self.state().listeners);
        for listener in listeners.into_values() {
            let _ = listener
                .tx
                .send(Err(BackendError::Unavailable(message.to_owned())));
        }
    }

    /// Number of subscriptions currently delivering.
    #[must_use]
    pub fn active_listeners(&self) -> usize {
        self.state().listeners.len()
    }

    /// Write a document directly, bypassing faults.
    ///
    /// Non-object values are stored as empty documents.
    pub fn seed(&self, collection: &str, id: &str, value: Value) {
        let fields = match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        let mut state = self.state();
        state
            .collections
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), fields);
        state.notify();
    }

    /// Current fields of a document.
    #[must_use]
    pub fn document(&self, collection: &str, id: &str) -> Option<Fields> {
        self.state()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// All documents of a collection in ID order.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.state()
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Create an account without signing it in.
    ///
    /// # Errors
    ///
    /// Fails like [`IdentityService::sign_up`].
    pub fn register_account(&self, email: &Email, password: &str) -> Result<AuthUser, BackendError> {
        self.state().create_account(email, password)
    }

    /// Bytes of a stored object.
    #[must_use]
    pub fn blob(&self, path: &str) -> Option<Vec<u8>> {
        self.state().blobs.get(path).cloned()
    }

    fn check_reads(&self) -> Result<(), BackendError> {
        self.state()
            .faults
            .reads
            .clone()
            .map_or(Ok(()), |msg| Err(BackendError::Unavailable(msg)))
    }

    fn write(
        &self,
        doc: &DocumentRef,
        apply: impl FnOnce(Option<&mut Fields>, &Value) -> Result<Option<Fields>, BackendError>,
    ) -> Result<(), BackendError> {
        let mut state = self.state();
        if let Some(msg) = &state.faults.writes {
            return Err(BackendError::Unavailable(msg.clone()));
        }
        let now = state.tick();
        let docs = state.collections.entry(doc.collection.clone()).or_default();
        if let Some(created) = apply(docs.get_mut(&doc.id), &now)? {
            docs.insert(doc.id.clone(), created);
        }
        state.notify();
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl State {
    /// Server clock, strictly increasing at millisecond precision.
    fn tick(&mut self) -> Value {
        let now = Utc::now().trunc_subsecs(3);
        let next = match self.clock {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        timestamp::encode(next)
    }

    fn create_account(&mut self, email: &Email, password: &str) -> Result<AuthUser, BackendError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(BackendError::WeakPassword(format!(
                "password should be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        if self.accounts.contains_key(email) {
            return Err(BackendError::AccountExists);
        }
        let user = AuthUser {
            uid: UserId::new(uuid::Uuid::new_v4().simple().to_string()),
            email: Some(email.clone()),
        };
        self.accounts.insert(
            email.clone(),
            Account {
                user: user.clone(),
                password: password.to_owned(),
            },
        );
        Ok(user)
    }

    fn evaluate(&self, target: &ListenTarget) -> Snapshot {
        let documents = match target {
            ListenTarget::Document(doc) => self
                .collections
                .get(&doc.collection)
                .and_then(|docs| docs.get(&doc.id))
                .map(|fields| Document {
                    id: doc.id.clone(),
                    fields: fields.clone(),
                })
                .into_iter()
                .collect(),
            ListenTarget::Query(query) => self.run(query),
        };
        Snapshot { documents }
    }

    fn run(&self, query: &Query) -> Vec<Document> {
        let Some(docs) = self.collections.get(&query.collection) else {
            return Vec::new();
        };
        let mut hits: Vec<(&String, &Fields)> =
            docs.iter().filter(|(_, f)| query.matches(f)).collect();
        hits.sort_by(|a, b| query.compare((a.0, a.1), (b.0, b.1)));
        hits.into_iter()
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect()
    }

    /// Push fresh results to listeners whose result changed.
    fn notify(&mut self) {
        let mut closed = Vec::new();
        let updates: Vec<(u64, Snapshot)> = self
            .listeners
            .iter()
            .filter_map(|(id, l)| {
                let current = self.evaluate(&l.target);
                (current != l.last).then_some((*id, current))
            })
            .collect();

        for (id, snapshot) in updates {
            if let Some(listener) = self.listeners.get_mut(&id) {
                if listener.tx.send(Ok(snapshot.clone())).is_err() {
                    closed.push(id);
                } else {
                    listener.last = snapshot;
                }
            }
        }
        for id in closed {
            self.listeners.remove(&id);
        }
    }
}

fn apply_patch(fields: &mut Fields, patch: Patch, now: &Value) {
    for (field, write) in patch.iter() {
        match write {
            FieldWrite::Value(value) => {
                fields.insert(field.to_owned(), value.clone());
            }
            FieldWrite::ServerTimestamp => {
                fields.insert(field.to_owned(), now.clone());
            }
            FieldWrite::ArrayUnion(values) => {
                let mut items = match fields.remove(field) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                for value in values {
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                }
                fields.insert(field.to_owned(), Value::Array(items));
            }
            FieldWrite::Delete => {
                fields.remove(field);
            }
        }
    }
}

fn build(patch: Patch, now: &Value) -> Fields {
    let mut fields = Fields::new();
    apply_patch(&mut fields, patch, now);
    fields
}

#[async_trait]
impl IdentityService for MemoryBackend {
    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthUser, BackendError> {
        let user = self.state().create_account(email, password)?;
        self.inner.auth.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, BackendError> {
        let user = {
            let state = self.state();
            let account = state
                .accounts
                .get(email)
                .filter(|a| a.password == password)
                .ok_or(BackendError::InvalidCredentials)?;
            account.user.clone()
        };
        self.inner.auth.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.inner.auth.send_replace(None);
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.inner.auth.borrow().clone()
    }

    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.inner.auth.subscribe()
    }

    async fn provision_account(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthUser, BackendError> {
        self.register_account(email, password)
    }

    async fn refresh_session(&self) -> Result<(), BackendError> {
        if self.inner.auth.borrow().is_none() {
            return Err(BackendError::NoSession);
        }
        self.inner.auth.send_modify(|_| {});
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, BackendError> {
        self.check_reads()?;
        Ok(self.document(&doc.collection, &doc.id).map(|fields| Document {
            id: doc.id.clone(),
            fields,
        }))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, BackendError> {
        query.validate()?;
        self.check_reads()?;
        Ok(self.state().run(query))
    }

    async fn add(&self, collection: &str, patch: Patch) -> Result<String, BackendError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.write(&DocumentRef::new(collection, id.clone()), |_, now| {
            Ok(Some(build(patch, now)))
        })?;
        Ok(id)
    }

    async fn set(&self, doc: &DocumentRef, patch: Patch) -> Result<(), BackendError> {
        self.write(doc, |_, now| Ok(Some(build(patch, now))))
    }

    async fn merge(&self, doc: &DocumentRef, patch: Patch) -> Result<(), BackendError> {
        self.write(doc, |existing, now| match existing {
            Some(fields) => {
                apply_patch(fields, patch, now);
                Ok(None)
            }
            None => Ok(Some(build(patch, now))),
        })
    }

    async fn update(&self, doc: &DocumentRef, patch: Patch) -> Result<(), BackendError> {
        self.write(doc, |existing, now| match existing {
            Some(fields) => {
                apply_patch(fields, patch, now);
                Ok(None)
            }
            None => Err(BackendError::NotFound(doc.to_string())),
        })
    }

    async fn delete(&self, doc: &DocumentRef) -> Result<(), BackendError> {
        let mut state = self.state();
        if let Some(msg) = &state.faults.writes {
            return Err(BackendError::Unavailable(msg.clone()));
        }
        if let Some(docs) = state.collections.get_mut(&doc.collection) {
            docs.remove(&doc.id);
        }
        state.notify();
        Ok(())
    }

    async fn listen(&self, target: ListenTarget) -> Result<Subscription, BackendError> {
        if let ListenTarget::Query(query) = &target {
            query.validate()?;
        }

        let mut state = self.state();
        if let Some(msg) = &state.faults.listens {
            return Ok(Subscription::failed(BackendError::Unavailable(msg.clone())));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = state.next_listener;
        state.next_listener += 1;
        let initial = state.evaluate(&target);
        let _ = tx.send(Ok(initial.clone()));
        debug!(listener = id, ?target, "listener attached");
        state.listeners.insert(
            id,
            Listener {
                target,
                tx,
                last: initial,
            },
        );
        drop(state);

        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner.state).listeners.remove(&id);
            }
        }))
    }
}

#[async_trait]
impl BlobStorage for MemoryBackend {
    async fn upload(
        &self,
        upload: BlobUpload,
        progress: &watch::Sender<UploadProgress>,
    ) -> Result<String, BackendError> {
        let total = upload.bytes.len() as u64;
        let interrupt_after = self.state().faults.upload_interrupt_after;
        progress.send_replace(UploadProgress {
            transferred: 0,
            total,
        });

        let mut sent = 0_u64;
        for chunk in upload.bytes.chunks(UPLOAD_CHUNK) {
            let next = sent + chunk.len() as u64;
            if interrupt_after.is_some_and(|limit| next > limit) {
                return Err(BackendError::UploadInterrupted(format!(
                    "stopped after {sent} of {total} bytes"
                )));
            }
            sent = next;
            progress.send_replace(UploadProgress {
                transferred: sent,
                total,
            });
            tokio::task::yield_now().await;
        }

        self.state()
            .blobs
            .insert(upload.path.clone(), upload.bytes);
        Ok(upload.path)
    }

    async fn download_url(&self, path: &str) -> Result<String, BackendError> {
        if !self.state().blobs.contains_key(path) {
            return Err(BackendError::NotFound(path.to_owned()));
        }
        Ok(format!(
            "memory://{}/{}",
            self.inner.bucket,
            urlencoding::encode(path)
        ))
    }
}
