//! Live query binder.
//!
//! A [`LiveQuery`] follows one [`ListenTarget`] and republishes every
//! delivery as a decoded [`LiveState`]. Each delivery replaces the previous
//! result wholesale, in the order the backend sorted it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tailor_hub_core::{DecodeDocument, Order, ShopId, Shop, UserId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::backend::{Direction, DocumentStore, ListenTarget, Query, Snapshot, Subscription};
use crate::services::collections;

/// What a live view currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveState<T> {
    /// No target yet (identifiers not available); nothing is subscribed.
    Idle,
    /// Subscribed, waiting for the first delivery.
    Loading,
    /// The latest complete result.
    Ready(Vec<T>),
    /// The subscription failed; shown as empty.
    Unavailable,
}

impl<T> LiveState<T> {
    /// The items to render; empty unless ready.
    #[must_use]
    pub fn items(&self) -> &[T] {
        match self {
            Self::Ready(items) => items,
            _ => &[],
        }
    }

    /// Whether the view is waiting for its first delivery.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    fn map<U>(&self, f: impl FnOnce(&[T]) -> Vec<U>) -> LiveState<U> {
        match self {
            Self::Idle => LiveState::Idle,
            Self::Loading => LiveState::Loading,
            Self::Ready(items) => LiveState::Ready(f(items)),
            Self::Unavailable => LiveState::Unavailable,
        }
    }
}

/// A subscription bound to a view.
///
/// Dropping the binder tears the subscription down; [`LiveQuery::dispose`]
/// does the same and waits for it to finish.
pub struct LiveQuery<T> {
    store: Arc<dyn DocumentStore>,
    target: Option<ListenTarget>,
    state: Arc<watch::Sender<LiveState<T>>>,
    epoch: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl<T> LiveQuery<T>
where
    T: DecodeDocument + Clone + PartialEq + Send + Sync + 'static,
{
    /// A binder with no target.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (state, _) = watch::channel(LiveState::Idle);
        Self {
            store,
            target: None,
            state: Arc::new(state),
            epoch: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    /// Create a binder and subscribe to `target`.
    pub async fn bind(store: Arc<dyn DocumentStore>, target: Option<ListenTarget>) -> Self {
        let mut live = Self::new(store);
        live.rebind(target).await;
        live
    }

    /// Follow a new target.
    ///
    /// Rebinding to the current target is a no-op unless the subscription
    /// has failed, in which case it is re-established. A `None` target
    /// leaves the binder idle with no subscription.
    pub async fn rebind(&mut self, target: Option<ListenTarget>) {
        let failed = matches!(*self.state.borrow(), LiveState::Unavailable);
        if self.target == target && !failed {
            return;
        }

        self.stop().await;
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.target.clone_from(&target);

        let Some(target) = target else {
            self.state.send_replace(LiveState::Idle);
            return;
        };
        self.state.send_replace(LiveState::Loading);

        match self.store.listen(target.clone()).await {
            Ok(subscription) => {
                debug!(?target, "live query bound");
                self.task = Some(tokio::spawn(pump(
                    subscription,
                    Arc::clone(&self.state),
                    Arc::clone(&self.epoch),
                    epoch,
                )));
            }
            Err(e) => {
                error!(?target, error = %e, "live query could not subscribe");
                publish(&self.state, &self.epoch, epoch, LiveState::Unavailable);
            }
        }
    }

    /// The current target.
    #[must_use]
    pub const fn target(&self) -> Option<&ListenTarget> {
        self.target.as_ref()
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> LiveState<T> {
        self.state.borrow().clone()
    }

    /// Receive every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LiveState<T>> {
        self.state.subscribe()
    }

    /// Wait for the first delivery (or failure) after the latest bind.
    pub async fn settled(&self) -> LiveState<T> {
        self.wait_until(|s| !s.is_loading()).await
    }

    /// Wait until the state satisfies `predicate`.
    pub async fn wait_until(&self, predicate: impl FnMut(&LiveState<T>) -> bool) -> LiveState<T> {
        let mut rx = self.state.subscribe();
        rx.wait_for(predicate)
            .await
            .map_or_else(|_| self.state(), |s| s.clone())
    }

    /// Tear the subscription down and wait until it has stopped.
    pub async fn dispose(mut self) {
        self.stop().await;
    }

    async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T> std::fmt::Debug for LiveQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("target", &self.target)
            .field("active", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

/// Publish unless a newer bind has taken over.
fn publish<T: PartialEq>(
    state: &watch::Sender<LiveState<T>>,
    epoch: &AtomicU64,
    mine: u64,
    next: LiveState<T>,
) {
    state.send_if_modified(|current| {
        if epoch.load(Ordering::SeqCst) != mine || *current == next {
            return false;
        }
        *current = next;
        true
    });
}

async fn pump<T>(
    mut subscription: Subscription,
    state: Arc<watch::Sender<LiveState<T>>>,
    epoch: Arc<AtomicU64>,
    mine: u64,
) where
    T: DecodeDocument + PartialEq,
{
    let mut reported = HashSet::new();
    while let Some(delivery) = subscription.next().await {
        match delivery {
            Ok(snapshot) => {
                let items = decode_snapshot(&snapshot, &mut reported);
                publish(&state, &epoch, mine, LiveState::Ready(items));
            }
            Err(e) => {
                error!(error = %e, "live subscription failed");
                publish(&state, &epoch, mine, LiveState::Unavailable);
                return;
            }
        }
    }
}

/// Decode every document, skipping (and reporting once) the ones that fail.
fn decode_snapshot<T: DecodeDocument>(
    snapshot: &Snapshot,
    reported: &mut HashSet<String>,
) -> Vec<T> {
    snapshot
        .documents
        .iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(item) => Some(item),
            Err(e) => {
                if reported.insert(doc.id.clone()) {
                    warn!(document = %doc.id, error = %e, "skipping undecodable document");
                }
                None
            }
        })
        .collect()
}

/// A row of the owner's order board.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerOrderRow {
    pub order: Order,
    /// Name of the order's shop as read when the board was loaded.
    pub shop_name: String,
}

/// Live orders across every shop an owner runs.
///
/// The owner's shops are read once; when there are none nothing is
/// subscribed and the board is empty. Shop names are captured at the same
/// time, so a renamed or newly created shop shows up after the board is
/// loaded again.
#[derive(Debug)]
pub struct OwnerOrders {
    shop_names: HashMap<ShopId, String>,
    board: Board,
}

#[derive(Debug)]
enum Board {
    NoShops,
    ShopsUnavailable,
    Live(LiveQuery<Order>),
}

impl OwnerOrders {
    /// Read the owner's shops and subscribe to their orders.
    pub async fn load(store: Arc<dyn DocumentStore>, owner: &UserId) -> Self {
        let shops_query =
            Query::collection(collections::SHOPS).where_eq("ownerId", owner.as_str());
        let shops: Vec<Shop> = match store.query(&shops_query).await {
            Ok(documents) => decode_snapshot(&Snapshot { documents }, &mut HashSet::new()),
            Err(e) => {
                error!(owner = %owner, error = %e, "could not read owner shops");
                return Self {
                    shop_names: HashMap::new(),
                    board: Board::ShopsUnavailable,
                };
            }
        };

        if shops.is_empty() {
            debug!(owner = %owner, "owner has no shops; not subscribing");
            return Self {
                shop_names: HashMap::new(),
                board: Board::NoShops,
            };
        }

        let query = Query::collection(collections::ORDERS)
            .where_in("shopId", shops.iter().map(|s| s.id.as_str().to_owned()))
            .order_by("createdAt", Direction::Descending);
        let live = LiveQuery::bind(store, Some(query.into())).await;

        Self {
            shop_names: shops.into_iter().map(|s| (s.id, s.name)).collect(),
            board: Board::Live(live),
        }
    }

    /// Whether a live subscription backs the board.
    #[must_use]
    pub const fn subscription_active(&self) -> bool {
        matches!(self.board, Board::Live(_))
    }

    /// The current rows.
    #[must_use]
    pub fn state(&self) -> LiveState<OwnerOrderRow> {
        match &self.board {
            Board::NoShops => LiveState::Ready(Vec::new()),
            Board::ShopsUnavailable => LiveState::Unavailable,
            Board::Live(live) => self.rows(&live.state()),
        }
    }

    /// Wait for the first delivery (or failure).
    pub async fn settled(&self) -> LiveState<OwnerOrderRow> {
        match &self.board {
            Board::Live(live) => self.rows(&live.settled().await),
            _ => self.state(),
        }
    }

    /// Wait until the order list satisfies `predicate`.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&LiveState<Order>) -> bool,
    ) -> LiveState<OwnerOrderRow> {
        match &self.board {
            Board::Live(live) => self.rows(&live.wait_until(predicate).await),
            _ => self.state(),
        }
    }

    /// Tear the subscription down.
    pub async fn dispose(self) {
        if let Board::Live(live) = self.board {
            live.dispose().await;
        }
    }

    fn rows(&self, state: &LiveState<Order>) -> LiveState<OwnerOrderRow> {
        state.map(|orders| {
            orders
                .iter()
                .map(|order| OwnerOrderRow {
                    shop_name: self
                        .shop_names
                        .get(&order.shop_id)
                        .cloned()
                        .unwrap_or_else(|| "Unknown".to_owned()),
                    order: order.clone(),
                })
                .collect()
        })
    }
}
