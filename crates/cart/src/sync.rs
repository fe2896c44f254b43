//! Cart synchronizer.
//!
//! Drives the anonymous/authenticated state machine over the session-status
//! signal from the identity provider:
//!
//! - **Login** (edge into `Authenticated`): fetch the remote cart, merge the
//!   locally accumulated cart into it (quantity sum on matching lines,
//!   local-only lines appended), replace the store, write the merge back.
//! - **While authenticated**: write-behind - every store mutation persists
//!   the post-mutation cart to the repository. The store's watch channel is
//!   the depth-1 coalescing queue, so superseded snapshots are dropped and
//!   saves run serially; an older write never clobbers a newer one.
//! - **External change** (another tab/device synced): re-fetch and replace
//!   the store wholesale. Remote wins; no merge.
//! - **Sign-out**: the store retains its contents, and nothing is written
//!   remotely without a user id.
//!
//! All remote failures are logged, never surfaced: the local store stays
//! correct even when durability is temporarily lost.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use clementine_core::{LineItem, UserId};

use crate::remote::CartRepository;
use crate::store::CartStore;

/// Session authentication status, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// The provider has not resolved the session yet.
    Loading,
    /// No signed-in user.
    Unauthenticated,
    /// A signed-in user with an opaque provider-issued id.
    Authenticated(UserId),
}

impl AuthStatus {
    /// The signed-in user id, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Loading | Self::Unauthenticated => None,
        }
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

enum SyncEvent {
    ExternalChange,
}

/// Handle for feeding external events into a running synchronizer.
#[derive(Clone)]
pub struct SyncHandle {
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl SyncHandle {
    /// Signal that another tab or device changed the remote cart.
    ///
    /// While authenticated, the synchronizer re-fetches and replaces the
    /// store contents wholesale. Ignored while unauthenticated or after the
    /// synchronizer stopped.
    pub fn notify_external_change(&self) {
        let _ = self.events.send(SyncEvent::ExternalChange);
    }
}

/// Merge a locally accumulated cart into a remote one.
///
/// Remote ordering comes first; a local line whose identity already exists
/// in the remote cart adds its quantity into that line (sum, not replace - a
/// user who added the same product both offline and on another device gets
/// the combined quantity); local-only lines are appended in local order.
#[must_use]
pub fn merge_carts(remote: Vec<LineItem>, local: &[LineItem]) -> Vec<LineItem> {
    let mut merged = remote;
    for item in local {
        if let Some(existing) = merged.iter_mut().find(|m| m.line_id == item.line_id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            merged.push(item.clone());
        }
    }
    merged
}

/// Reconciles the cart store with the remote repository.
pub struct CartSynchronizer<R> {
    store: CartStore,
    repository: R,
}

impl<R: CartRepository> CartSynchronizer<R> {
    /// Create a synchronizer over the given store and repository.
    pub const fn new(store: CartStore, repository: R) -> Self {
        Self { store, repository }
    }

    /// Merge the local cart with the remote one and converge both on the
    /// result, returning the snapshot written to the store.
    ///
    /// A fetch failure is treated as an empty remote cart - local items are
    /// never dropped, and the follow-up save re-establishes remote state.
    /// The store is replaced before the remote save, so a mutation arriving
    /// mid-save lands on top of the merge instead of being overwritten. A
    /// save failure leaves the store correct and is only logged.
    #[instrument(skip(self))]
    pub async fn sync_on_login(&self, user: &UserId) -> Vec<LineItem> {
        let remote = match self.repository.fetch(user).await {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to fetch remote cart; treating as empty");
                Vec::new()
            }
        };

        let local = self.store.items();
        let merged = merge_carts(remote, &local);
        debug!(lines = merged.len(), "Merged local cart into remote");
        self.store.set_items(merged.clone());

        if let Err(e) = self.repository.save(user, &merged).await {
            error!(error = %e, "Failed to save merged cart");
        }
        merged
    }

    /// Replace the store with the current remote cart ("remote wins"),
    /// returning the snapshot written to the store.
    ///
    /// Used when another tab or device already synced; a missing remote
    /// document replaces the store with the empty cart. On a fetch failure
    /// the store keeps its local contents and `None` is returned.
    #[instrument(skip(self))]
    pub async fn refresh(&self, user: &UserId) -> Option<Vec<LineItem>> {
        match self.repository.fetch(user).await {
            Ok(items) => {
                let items = items.unwrap_or_default();
                self.store.set_items(items.clone());
                Some(items)
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh cart from remote; keeping local contents");
                None
            }
        }
    }

    /// Persist a post-mutation snapshot, best-effort.
    #[instrument(skip(self, items))]
    pub async fn persist(&self, user: &UserId, items: &[LineItem]) {
        if let Err(e) = self.repository.save(user, items).await {
            warn!(error = %e, "Failed to persist cart; will retry on the next mutation");
        }
    }

    /// Consume the store notification produced by one of our own writes.
    ///
    /// A mutation that landed between that write and this call shows up as
    /// a snapshot differing from `written`; it is persisted immediately
    /// rather than dropped along with the notification.
    async fn settle(
        &self,
        items_rx: &mut watch::Receiver<Vec<LineItem>>,
        user: &UserId,
        written: Vec<LineItem>,
    ) {
        let current = items_rx.borrow_and_update().clone();
        if current != written {
            self.persist(user, &current).await;
        }
    }
}

impl<R> CartSynchronizer<R>
where
    R: CartRepository + Send + Sync + 'static,
{
    /// Spawn the synchronizer task.
    ///
    /// The task follows `auth` for login/logout edges and the store for
    /// write-behind persistence, and stops when the auth sender is dropped.
    /// The returned [`SyncHandle`] feeds in cross-tab change notifications.
    #[must_use]
    pub fn run(self, auth: watch::Receiver<AuthStatus>) -> (JoinHandle<()>, SyncHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SyncHandle { events: tx.clone() };
        let task = tokio::spawn(self.drive(auth, rx, tx));
        (task, handle)
    }

    async fn drive(
        self,
        mut auth: watch::Receiver<AuthStatus>,
        mut events: mpsc::UnboundedReceiver<SyncEvent>,
        // Held so the event channel never closes under a live task.
        _events_tx: mpsc::UnboundedSender<SyncEvent>,
    ) {
        let mut items_rx = self.store.subscribe();
        items_rx.mark_unchanged();

        let mut status = auth.borrow_and_update().clone();
        if let AuthStatus::Authenticated(user) = status.clone() {
            // Already signed in when the task starts: that is the login edge.
            let written = self.sync_on_login(&user).await;
            self.settle(&mut items_rx, &user, written).await;
        }

        loop {
            tokio::select! {
                changed = auth.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = auth.borrow_and_update().clone();
                    if let AuthStatus::Authenticated(user) = &next {
                        // Edge-triggered: only a transition into this user's
                        // authenticated state runs the login merge.
                        if status.user_id() != Some(user) {
                            let written = self.sync_on_login(user).await;
                            self.settle(&mut items_rx, user, written).await;
                        }
                    }
                    status = next;
                }
                changed = items_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let items = items_rx.borrow_and_update().clone();
                    if let Some(user) = status.user_id() {
                        self.persist(user, &items).await;
                    }
                }
                event = events.recv() => {
                    if matches!(event, Some(SyncEvent::ExternalChange)) {
                        if let Some(user) = status.user_id() {
                            let user = user.clone();
                            if let Some(written) = self.refresh(&user).await {
                                self.settle(&mut items_rx, &user, written).await;
                            }
                        }
                    }
                }
            }
        }

        info!("Cart synchronizer stopped");
    }
}
