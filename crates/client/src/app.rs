//! Application handle shared by every screen.

use std::sync::Arc;

use tailor_hub_core::{ChatMessage, ChatThreadId, Order, Review, Shop, ShopId, UserId};

use crate::backend::firebase::{IdentityToolkit, StorageClient};
use crate::backend::{BlobStorage, DocumentStore, IdentityService, MemoryBackend};
use crate::config::ClientConfig;
use crate::live::{LiveQuery, OwnerOrders};
use crate::navigation::{GuardPolicy, Route};
use crate::services::{
    AccountService, ChatService, ContactService, OrderService, ReviewService, ShopService,
    TailorService, chat, orders, reviews, shops,
};
use crate::session::SessionStore;

/// Backends, the session store and the route guard.
///
/// Cheaply cloneable via `Arc`. Must be created inside a Tokio runtime, since
/// the session store starts listening immediately.
#[derive(Clone)]
pub struct TailorHub {
    inner: Arc<TailorHubInner>,
}

struct TailorHubInner {
    identity: Arc<dyn IdentityService>,
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn BlobStorage>,
    session: SessionStore,
    guard: GuardPolicy,
}

impl TailorHub {
    /// Assemble the application from its three backends.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn BlobStorage>,
        guard: GuardPolicy,
    ) -> Self {
        let session = SessionStore::start(Arc::clone(&identity), Arc::clone(&store));
        Self {
            inner: Arc::new(TailorHubInner {
                identity,
                store,
                storage,
                session,
                guard,
            }),
        }
    }

    /// Run entirely against an in-memory backend.
    #[must_use]
    pub fn with_backend(backend: MemoryBackend, guard: GuardPolicy) -> Self {
        let shared = Arc::new(backend);
        let identity: Arc<dyn IdentityService> = shared.clone();
        let store: Arc<dyn DocumentStore> = shared.clone();
        Self::new(identity, store, shared, guard)
    }

    /// Use the hosted identity and storage services with the given document
    /// store.
    ///
    /// No hosted `DocumentStore` ships in this crate; [`MemoryBackend`] is the
    /// only in-tree implementation, so callers bring their own realtime store.
    #[must_use]
    pub fn firebase(config: &ClientConfig, store: Arc<dyn DocumentStore>) -> Self {
        let identity = IdentityToolkit::new(&config.backend);
        let storage = StorageClient::new(&config.backend, identity.clone());
        Self::new(
            Arc::new(identity),
            store,
            Arc::new(storage),
            config.route_guard,
        )
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn guard(&self) -> GuardPolicy {
        self.inner.guard
    }

    /// Where a visit to `route` should go instead, if anywhere.
    #[must_use]
    pub fn redirect_for(&self, route: &Route) -> Option<Route> {
        self.inner.guard.check(route, &self.inner.session.snapshot())
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    // -------------------------------------------------------------------------
    // Services
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(
            self.inner.identity.as_ref(),
            self.inner.store.as_ref(),
            &self.inner.session,
        )
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(
            self.inner.store.as_ref(),
            self.inner.storage.as_ref(),
            &self.inner.session,
        )
    }

    #[must_use]
    pub fn shops(&self) -> ShopService<'_> {
        ShopService::new(self.inner.store.as_ref(), &self.inner.session)
    }

    #[must_use]
    pub fn tailors(&self) -> TailorService<'_> {
        TailorService::new(
            self.inner.identity.as_ref(),
            self.inner.store.as_ref(),
            &self.inner.session,
        )
    }

    #[must_use]
    pub fn chat(&self) -> ChatService<'_> {
        ChatService::new(self.inner.store.as_ref(), &self.inner.session)
    }

    #[must_use]
    pub fn reviews(&self) -> ReviewService<'_> {
        ReviewService::new(self.inner.store.as_ref(), &self.inner.session)
    }

    #[must_use]
    pub const fn contact(&self) -> ContactService {
        ContactService
    }

    // -------------------------------------------------------------------------
    // Live views
    // -------------------------------------------------------------------------

    /// Every shop, for the directory.
    pub async fn live_shops(&self) -> LiveQuery<Shop> {
        LiveQuery::bind(self.store_handle(), Some(shops::all().into())).await
    }

    /// One shop, for its storefront.
    pub async fn live_shop(&self, shop: &ShopId) -> LiveQuery<Shop> {
        LiveQuery::bind(self.store_handle(), Some(shops::document(shop).into())).await
    }

    /// Reviews of a shop.
    pub async fn live_reviews(&self, shop: &ShopId) -> LiveQuery<Review> {
        LiveQuery::bind(self.store_handle(), Some(reviews::for_shop(shop).into())).await
    }

    /// The signed-in customer's orders; idle when signed out.
    pub async fn live_customer_orders(&self) -> LiveQuery<Order> {
        let target = self
            .current_uid()
            .map(|uid| orders::for_customer(&uid).into());
        LiveQuery::bind(self.store_handle(), target).await
    }

    /// Orders assigned to the signed-in tailor; idle when signed out.
    pub async fn live_tailor_orders(&self) -> LiveQuery<Order> {
        let target = self.current_uid().map(|uid| orders::for_tailor(&uid).into());
        LiveQuery::bind(self.store_handle(), target).await
    }

    /// Orders of one shop.
    pub async fn live_shop_orders(&self, shop: &ShopId) -> LiveQuery<Order> {
        LiveQuery::bind(self.store_handle(), Some(orders::for_shop(shop).into())).await
    }

    /// Messages of a chat thread.
    pub async fn live_messages(&self, thread: &ChatThreadId) -> LiveQuery<ChatMessage> {
        LiveQuery::bind(self.store_handle(), Some(chat::messages(thread).into())).await
    }

    /// Orders across every shop `owner` runs.
    pub async fn owner_orders(&self, owner: &UserId) -> OwnerOrders {
        OwnerOrders::load(self.store_handle(), owner).await
    }

    fn store_handle(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.inner.store)
    }

    fn current_uid(&self) -> Option<UserId> {
        self.inner.session.snapshot().user.map(|u| u.uid)
    }
}

impl std::fmt::Debug for TailorHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailorHub")
            .field("session", &self.inner.session.snapshot())
            .field("guard", &self.inner.guard)
            .finish_non_exhaustive()
    }
}
