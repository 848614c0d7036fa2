//! Customer/shop chat threads.

use chrono::{DateTime, Utc};

use crate::decode::{DecodeDocument, DecodeError, FieldReader, Fields};
use crate::types::{ChatThreadId, MessageId, ShopId, UserId};

/// A message in `chats/{threadId}/messages`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Whether `user` wrote this message.
    #[must_use]
    pub fn is_from(&self, user: &UserId) -> bool {
        &self.sender_id == user
    }
}

impl DecodeDocument for ChatMessage {
    fn decode(id: &str, fields: &Fields) -> Result<Self, DecodeError> {
        let doc = FieldReader::new(id, fields);
        Ok(Self {
            id: MessageId::new(id),
            sender_id: UserId::new(doc.string(&["senderId"])?),
            text: doc.text(&["text"])?,
            created_at: doc.timestamp("createdAt")?,
        })
    }
}

/// The thread document at `chats/{shopId}_{customerId}`.
///
/// Threads created before the document itself was written have no fields;
/// their participants are recovered from the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatThread {
    pub id: ChatThreadId,
    pub shop_id: ShopId,
    pub customer_id: UserId,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl DecodeDocument for ChatThread {
    fn decode(id: &str, fields: &Fields) -> Result<Self, DecodeError> {
        let doc = FieldReader::new(id, fields);
        let thread = ChatThreadId::new(id);
        let from_key = thread.participants();

        let shop_id = match (doc.opt_string(&["shopId"])?, &from_key) {
            (Some(shop), _) => ShopId::new(shop),
            (None, Some((shop, _))) => shop.clone(),
            (None, None) => ShopId::new(id),
        };
        let customer_id = match (doc.opt_string(&["customerId"])?, from_key) {
            (Some(customer), _) => UserId::new(customer),
            (None, Some((_, customer))) => customer,
            (None, None) => return Err(doc.error("customerId", crate::decode::Problem::Missing)),
        };

        Ok(Self {
            id: thread,
            shop_id,
            customer_id,
            last_message_at: doc.timestamp("lastMessageAt")?,
        })
    }
}
