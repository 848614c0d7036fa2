//! Customer/shop chat.

use tailor_hub_core::{ChatMessage, ChatThread, ChatThreadId, MessageId, Shop, ShopId, UserId};
use tracing::{debug, instrument};

use super::{collections, query_decoded, required, shops, signed_in_uid};
use crate::backend::{Direction, DocumentRef, DocumentStore, Patch, Query};
use crate::error::Result;
use crate::session::SessionStore;

/// Chat operations.
pub struct ChatService<'a> {
    store: &'a dyn DocumentStore,
    session: &'a SessionStore,
}

impl<'a> ChatService<'a> {
    /// Create a new chat service.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, session: &'a SessionStore) -> Self {
        Self { store, session }
    }

    /// Send a message from the signed-in customer to a shop.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for blank text and
    /// `ClientError::NotSignedIn` without a session.
    #[instrument(skip(self, text), fields(shop_id = %shop))]
    pub async fn send_to_shop(&self, shop: &ShopId, text: &str) -> Result<MessageId> {
        let customer = signed_in_uid(self.session)?;
        let thread = ChatThreadId::for_pair(shop, &customer);
        let participants = Some((shop.clone(), customer.clone()));
        self.send(&thread, &customer, participants, text).await
    }

    /// Reply in an existing thread as the signed-in user.
    ///
    /// The thread header gets the shop and customer taken from the key, so
    /// threads that only ever had messages show up for the owner afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for blank text and
    /// `ClientError::NotSignedIn` without a session.
    #[instrument(skip(self, text), fields(thread = %thread))]
    pub async fn reply(&self, thread: &ChatThreadId, text: &str) -> Result<MessageId> {
        let sender = signed_in_uid(self.session)?;
        self.send(thread, &sender, thread.participants(), text)
            .await
    }

    async fn send(
        &self,
        thread: &ChatThreadId,
        sender: &UserId,
        participants: Option<(ShopId, UserId)>,
        text: &str,
    ) -> Result<MessageId> {
        let text = required(text, "Message cannot be empty")?;

        let id = self
            .store
            .add(
                &messages_collection(thread),
                Patch::new()
                    .set("text", text)
                    .set("senderId", sender.as_str())
                    .server_timestamp("createdAt"),
            )
            .await?;

        let mut header = Patch::new().server_timestamp("lastMessageAt");
        if let Some((shop, customer)) = participants {
            header = header
                .set("shopId", shop.as_str())
                .set("customerId", customer.as_str());
        }
        self.store
            .merge(
                &DocumentRef::new(collections::CHATS, thread.as_str()),
                header,
            )
            .await?;

        debug!(message = %id, "message sent");
        Ok(MessageId::new(id))
    }

    /// Messages of a thread, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when the read fails.
    pub async fn messages(&self, thread: &ChatThreadId) -> Result<Vec<ChatMessage>> {
        query_decoded(self.store, &messages(thread)).await
    }

    /// Threads of every shop `owner` runs, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Backend` when a read fails.
    pub async fn threads_for_owner(&self, owner: &UserId) -> Result<Vec<ChatThread>> {
        let owned: Vec<Shop> =
            query_decoded(self.store, &shops::for_owner(owner)).await?;
        if owned.is_empty() {
            return Ok(Vec::new());
        }
        let threads = Query::collection(collections::CHATS)
            .where_in("shopId", owned.iter().map(|s| s.id.as_str().to_owned()))
            .order_by("lastMessageAt", Direction::Descending);
        query_decoded(self.store, &threads).await
    }
}

fn messages_collection(thread: &ChatThreadId) -> String {
    format!(
        "{}/{}/{}",
        collections::CHATS,
        thread.as_str(),
        collections::MESSAGES
    )
}

/// Messages of a thread, oldest first.
#[must_use]
pub fn messages(thread: &ChatThreadId) -> Query {
    Query::collection(messages_collection(thread)).order_by("createdAt", Direction::Ascending)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tailor_hub_core::Email;

    use super::*;
    use crate::backend::{IdentityService, MemoryBackend};
    use crate::error::ClientError;

    async fn signed_in(backend: &MemoryBackend, email: &str, role: &str) -> SessionStore {
        let user = backend
            .sign_up(&Email::parse(email).unwrap(), "secret1")
            .await
            .unwrap();
        backend.seed("users", user.uid.as_str(), json!({ "role": role }));
        let session = SessionStore::start(Arc::new(backend.clone()), Arc::new(backend.clone()));
        session.refresh().await;
        session
    }

    #[tokio::test]
    async fn test_customer_message_creates_thread() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend, "c@x.com", "customer").await;
        let uid = session.snapshot().user.unwrap().uid;
        let chat = ChatService::new(&backend, &session);
        let shop = ShopId::new("s1");

        chat.send_to_shop(&shop, "Do you stitch sherwanis?").await.unwrap();
        chat.send_to_shop(&shop, "  And kurtas?  ").await.unwrap();

        let thread = ChatThreadId::for_pair(&shop, &uid);
        let messages = chat.messages(&thread).await.unwrap();
        let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Do you stitch sherwanis?", "And kurtas?"]);
        assert!(messages.iter().all(|m| m.is_from(&uid)));

        let header = backend.document("chats", thread.as_str()).unwrap();
        assert_eq!(header["shopId"], json!("s1"));
        assert!(header.contains_key("lastMessageAt"));
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let backend = MemoryBackend::new();
        let session = signed_in(&backend, "c@x.com", "customer").await;
        let chat = ChatService::new(&backend, &session);
        let err = chat.send_to_shop(&ShopId::new("s1"), "   ").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_owner_sees_threads_of_own_shops() {
        let backend = MemoryBackend::new();
        let owner = signed_in(&backend, "o@x.com", "owner").await;
        let owner_id = owner.snapshot().user.unwrap().uid;
        backend.seed("shops", "s1", json!({ "ownerId": owner_id.as_str(), "name": "Mine" }));
        backend.seed("shops", "s2", json!({ "ownerId": "someone", "name": "Theirs" }));
        backend.seed(
            "chats",
            "s1_c1",
            json!({ "shopId": "s1", "customerId": "c1", "lastMessageAt": "2025-01-01T00:00:00Z" }),
        );
        backend.seed(
            "chats",
            "s2_c2",
            json!({ "shopId": "s2", "customerId": "c2", "lastMessageAt": "2025-01-02T00:00:00Z" }),
        );

        let chat = ChatService::new(&backend, &owner);
        let threads = chat.threads_for_owner(&owner_id).await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].customer_id.as_str(), "c1");

        chat.reply(&threads[0].id, "Yes we do").await.unwrap();
        let messages = chat.messages(&threads[0].id).await.unwrap();
        assert!(messages[0].is_from(&owner_id));
    }

    #[tokio::test]
    async fn test_owner_reply_lists_thread_without_header() {
        let backend = MemoryBackend::new();
        let owner = signed_in(&backend, "o@x.com", "owner").await;
        let owner_id = owner.snapshot().user.unwrap().uid;
        backend.seed("shops", "s1", json!({ "ownerId": owner_id.as_str(), "name": "Mine" }));
        backend.seed(
            "chats/s1_c1/messages",
            "m1",
            json!({ "text": "Hello?", "senderId": "c1", "createdAt": "2025-01-01T00:00:00Z" }),
        );

        let chat = ChatService::new(&backend, &owner);
        assert!(chat.threads_for_owner(&owner_id).await.unwrap().is_empty());

        let thread = ChatThreadId::new("s1_c1");
        chat.reply(&thread, "Yes").await.unwrap();

        let header = backend.document("chats", "s1_c1").unwrap();
        assert_eq!(header["shopId"], json!("s1"));
        assert_eq!(header["customerId"], json!("c1"));
        let threads = chat.threads_for_owner(&owner_id).await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, thread);
        assert_eq!(chat.messages(&thread).await.unwrap().len(), 2);
    }
}
