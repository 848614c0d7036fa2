//! Newtype IDs for type-safe document references.
//!
//! Backend document IDs are opaque strings. Use the `define_id!` macro to
//! create wrappers that prevent accidentally mixing IDs from different
//! collections.

/// Macro to define a type-safe document ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use tailor_hub_core::define_id;
/// define_id!(CustomerId);
/// define_id!(InvoiceId);
///
/// let customer = CustomerId::new("u_1");
/// let invoice = InvoiceId::new("u_1");
///
/// // These are different types, so this won't compile:
/// // let _: CustomerId = invoice;
/// assert_eq!(customer.as_str(), invoice.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Identity provider UID, also the key of the `users` collection.
define_id!(UserId);
define_id!(ShopId);
define_id!(ServiceId);
define_id!(OrderId);
define_id!(MessageId);
define_id!(ReviewId);

/// Chat thread key.
///
/// Customer threads are keyed by the shop and customer pair so that both
/// sides derive the same thread without a lookup.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ChatThreadId(String);

impl ChatThreadId {
    /// Thread between a shop and one of its customers.
    #[must_use]
    pub fn for_pair(shop: &ShopId, customer: &UserId) -> Self {
        Self(format!("{shop}_{customer}"))
    }

    /// Wrap an existing thread key (e.g. taken from a route parameter).
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shop and customer encoded in a `{shop}_{customer}` key.
    ///
    /// Returns `None` when the key has no separator or either half is empty.
    #[must_use]
    pub fn participants(&self) -> Option<(ShopId, UserId)> {
        let (shop, customer) = self.0.split_once('_')?;
        if shop.is_empty() || customer.is_empty() {
            return None;
        }
        Some((ShopId::new(shop), UserId::new(customer)))
    }
}

impl core::fmt::Display for ChatThreadId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversions() {
        let id = OrderId::new("ord_42");
        assert_eq!(id.to_string(), "ord_42");
        assert_eq!(id.as_str(), "ord_42");
        assert_eq!(String::from(id.clone()), "ord_42");
        assert_eq!(OrderId::from("ord_42"), id);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = ShopId::new("shop-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"shop-1\"");
        let back: ShopId = serde_json::from_str("\"shop-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_chat_thread_for_pair() {
        let thread = ChatThreadId::for_pair(&ShopId::new("s1"), &UserId::new("u9"));
        assert_eq!(thread.as_str(), "s1_u9");
        assert_eq!(
            thread.participants(),
            Some((ShopId::new("s1"), UserId::new("u9")))
        );
    }

    #[test]
    fn test_chat_thread_without_pair() {
        assert_eq!(ChatThreadId::new("support").participants(), None);
        assert_eq!(ChatThreadId::new("s1_").participants(), None);
    }
}
