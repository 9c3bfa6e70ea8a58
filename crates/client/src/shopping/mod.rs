//! Shopping state engine: cart and wishlist with optimistic mutations.
//!
//! # Semantics
//!
//! - Mutations apply to local state immediately, then confirm with the
//!   backend. A confirmed response replaces the collection wholesale (the
//!   server is the source of truth post-confirmation); a failure restores
//!   the pre-mutation snapshot verbatim. Failures never propagate to
//!   callers - surfacing them is the UI's concern.
//! - Cart mutations fire their request immediately. Two rapid calls on the
//!   same line may race; each success replaces the whole cart, so the last
//!   response to arrive wins regardless of send order.
//! - Wishlist confirmations are debounced 300ms per product: a new toggle
//!   supersedes the pending one, so at most one confirmation per product is
//!   outstanding and only the final state inside the window reaches the
//!   backend.
//! - While a product's confirmation is in flight, silent refreshes are
//!   skipped so a stale server read cannot clobber a newer optimistic
//!   write.

mod debounce;

pub use debounce::DebounceRegistry;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use wildflower_core::{CartItem, Product, ProductId};

use crate::api::types::AddToCartRequest;
use crate::api::{ApiError, CommerceApi};
use crate::store::Store;

/// Debounce window for wishlist confirmation requests.
const WISHLIST_DEBOUNCE: Duration = Duration::from_millis(300);

/// Snapshot of shopping state exposed to subscribers.
#[derive(Debug, Clone, Default)]
pub struct ShoppingState {
    /// Cart lines, optimistic or confirmed.
    pub cart: Vec<CartItem>,
    /// Wishlist product snapshots, keyed by product ID.
    pub wishlist: Vec<Product>,
    /// Product IDs with a cart request in flight.
    pub pending_cart: HashSet<ProductId>,
    /// Product IDs with a wishlist confirmation in flight.
    pub pending_wishlist: HashSet<ProductId>,
}

impl ShoppingState {
    /// Sum of `quantity × effective price` across all lines.
    ///
    /// Lines whose product reference is not hydrated contribute zero;
    /// never fails.
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.cart.iter().map(CartItem::line_total).sum()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn cart_item_count(&self) -> u32 {
        self.cart.iter().map(|item| item.quantity).sum()
    }

    /// Whether the product is currently in the local wishlist.
    #[must_use]
    pub fn is_in_wishlist(&self, product_id: &ProductId) -> bool {
        self.wishlist.iter().any(|p| &p.id == product_id)
    }
}

/// Cart and wishlist store.
///
/// Cheap to clone; clones share state. Created at session start and torn
/// down with [`ShoppingStore::reset`] on logout.
pub struct ShoppingStore<A> {
    inner: Arc<ShoppingInner<A>>,
}

struct ShoppingInner<A> {
    api: A,
    state: Store<ShoppingState>,
    debounce: DebounceRegistry<ProductId>,
    // Session epoch, bumped by reset(). Confirmations capture it when
    // issued and write back only if it still matches, so a response that
    // resolves after teardown cannot resurrect cleared state.
    epoch: AtomicU64,
}

impl<A> Clone for ShoppingStore<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> ShoppingStore<A>
where
    A: CommerceApi + 'static,
{
    /// Create a store with empty state.
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            inner: Arc::new(ShoppingInner {
                api,
                state: Store::default(),
                debounce: DebounceRegistry::new(),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> ShoppingState {
        self.inner.state.get()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ShoppingState> {
        self.inner.state.subscribe()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current cart total. See [`ShoppingState::cart_total`].
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.inner.state.with(ShoppingState::cart_total)
    }

    /// Current cart item count.
    #[must_use]
    pub fn cart_item_count(&self) -> u32 {
        self.inner.state.with(ShoppingState::cart_item_count)
    }

    /// Whether the product is currently wishlisted.
    #[must_use]
    pub fn is_in_wishlist(&self, product_id: &ProductId) -> bool {
        self.inner.state.with(|s| s.is_in_wishlist(product_id))
    }

    // =========================================================================
    // Cart Mutations
    // =========================================================================

    /// Add a product to the cart.
    ///
    /// Increments the quantity of an existing line with the same
    /// `(product, size, variant)` identity, or appends a new line.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(
        &self,
        product: Product,
        quantity: u32,
        size: Option<String>,
        variant: Option<String>,
    ) {
        let product_id = product.id.clone();
        let request = AddToCartRequest {
            product_id: product_id.clone(),
            quantity,
            size: size.clone(),
            variant: variant.clone(),
        };

        let apply_id = product_id.clone();
        self.mutate_cart(
            product_id,
            move |cart| {
                if let Some(line) = cart
                    .iter_mut()
                    .find(|l| l.matches(&apply_id, size.as_deref(), variant.as_deref()))
                {
                    line.quantity += quantity;
                } else {
                    cart.push(CartItem::new(product, quantity, size, variant));
                }
            },
            self.inner.api.add_to_cart(&request),
        )
        .await;
    }

    /// Remove a cart line.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_cart(
        &self,
        product_id: ProductId,
        size: Option<String>,
        variant: Option<String>,
    ) {
        let apply_id = product_id.clone();
        let (apply_size, apply_variant) = (size.clone(), variant.clone());
        self.mutate_cart(
            product_id.clone(),
            move |cart| {
                cart.retain(|l| {
                    !l.matches(&apply_id, apply_size.as_deref(), apply_variant.as_deref())
                });
            },
            self.inner.api.remove_from_cart(&product_id, size.as_deref(), variant.as_deref()),
        )
        .await;
    }

    /// Set a cart line's quantity.
    ///
    /// A quantity of zero (or less) is defined as removal, not an error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_cart_quantity(
        &self,
        product_id: ProductId,
        quantity: u32,
        size: Option<String>,
        variant: Option<String>,
    ) {
        if quantity == 0 {
            self.remove_from_cart(product_id, size, variant).await;
            return;
        }

        let apply_id = product_id.clone();
        let (apply_size, apply_variant) = (size.clone(), variant.clone());
        self.mutate_cart(
            product_id.clone(),
            move |cart| {
                if let Some(line) = cart
                    .iter_mut()
                    .find(|l| l.matches(&apply_id, apply_size.as_deref(), apply_variant.as_deref()))
                {
                    line.quantity = quantity;
                }
            },
            self.inner.api.update_cart_quantity(
                &product_id,
                quantity,
                size.as_deref(),
                variant.as_deref(),
            ),
        )
        .await;
    }

    /// Optimistic cart mutation: snapshot, apply locally, confirm, and
    /// either adopt the authoritative cart or restore the snapshot.
    ///
    /// All-or-nothing per call; no partial-failure state is retained.
    async fn mutate_cart<F, Fut>(&self, product_id: ProductId, apply: F, confirm: Fut)
    where
        F: FnOnce(&mut Vec<CartItem>),
        Fut: Future<Output = Result<Vec<CartItem>, ApiError>>,
    {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let snapshot = self.inner.state.with(|s| s.cart.clone());

        self.inner.state.update(|s| {
            apply(&mut s.cart);
            s.pending_cart.insert(product_id.clone());
        });

        match confirm.await {
            Ok(server_cart) => {
                self.update_if_current(epoch, |s| {
                    s.cart = server_cart;
                    s.pending_cart.remove(&product_id);
                });
            }
            Err(e) => {
                warn!(error = %e, product_id = %product_id, "Cart mutation failed, rolling back");
                self.update_if_current(epoch, |s| {
                    s.cart = snapshot;
                    s.pending_cart.remove(&product_id);
                });
            }
        }
    }

    /// Apply a mutation only if the session that issued it is still live.
    ///
    /// Responses resolving after a [`reset`](Self::reset) are discarded.
    fn update_if_current(&self, epoch: u64, f: impl FnOnce(&mut ShoppingState)) {
        if self.inner.epoch.load(Ordering::SeqCst) == epoch {
            self.inner.state.update(f);
        } else {
            debug!("Session reset since request was issued, discarding response");
        }
    }

    // =========================================================================
    // Wishlist Mutations
    // =========================================================================

    /// Add a product to the wishlist.
    ///
    /// The local toggle is immediate; the network confirmation is debounced
    /// per product, so rapid repeated toggles send only the final state.
    pub fn add_to_wishlist(&self, product: Product) {
        let product_id = product.id.clone();
        let snapshot = self.inner.state.with(|s| s.wishlist.clone());

        self.inner.state.update(|s| {
            if !s.is_in_wishlist(&product.id) {
                s.wishlist.push(product);
            }
        });

        self.schedule_wishlist_confirm(product_id, snapshot);
    }

    /// Remove a product from the wishlist.
    pub fn remove_from_wishlist(&self, product_id: ProductId) {
        let snapshot = self.inner.state.with(|s| s.wishlist.clone());

        self.inner.state.update(|s| {
            s.wishlist.retain(|p| p.id != product_id);
        });

        self.schedule_wishlist_confirm(product_id, snapshot);
    }

    /// Schedule (or reschedule) the debounced confirmation for a product.
    fn schedule_wishlist_confirm(&self, product_id: ProductId, snapshot: Vec<Product>) {
        let store = self.clone();
        let key = product_id.clone();
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        self.inner.debounce.schedule(key, WISHLIST_DEBOUNCE, async move {
            store.confirm_wishlist(product_id, snapshot, epoch).await;
        });
    }

    /// Send the confirmation reflecting the current local membership, then
    /// reconcile against the server's wishlist.
    ///
    /// `epoch` is the session epoch at toggle time; once the timer has
    /// fired the registry entry is gone and `cancel_all` can no longer
    /// abort this task, so the epoch check is what keeps a late response
    /// out of a torn-down session.
    #[instrument(skip(self, snapshot), fields(product_id = %product_id))]
    async fn confirm_wishlist(&self, product_id: ProductId, snapshot: Vec<Product>, epoch: u64) {
        self.inner.debounce.complete(&product_id);
        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Session reset since toggle, skipping confirmation");
            return;
        }

        self.update_if_current(epoch, |s| {
            s.pending_wishlist.insert(product_id.clone());
        });

        let desired = self.inner.state.with(|s| s.is_in_wishlist(&product_id));
        let result = if desired {
            self.inner.api.add_to_wishlist(&product_id).await
        } else {
            self.inner.api.remove_from_wishlist(&product_id).await
        };

        match result {
            Ok(server_wishlist) => {
                self.update_if_current(epoch, |s| {
                    s.pending_wishlist.remove(&product_id);
                    // Replace wholesale only when the sets actually differ,
                    // to avoid spurious notifications.
                    if wishlists_differ(&s.wishlist, &server_wishlist) {
                        s.wishlist = server_wishlist;
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, product_id = %product_id, "Wishlist confirmation failed, rolling back");
                self.update_if_current(epoch, |s| {
                    s.pending_wishlist.remove(&product_id);
                    s.wishlist = snapshot;
                });
            }
        }
    }

    // =========================================================================
    // Refresh & Lifecycle
    // =========================================================================

    /// Refresh the cart from the server.
    ///
    /// A silent refresh is a no-op while any cart request is in flight, so
    /// a stale server read cannot overwrite a newer optimistic write.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self, silent: bool) {
        if silent && self.inner.state.with(|s| !s.pending_cart.is_empty()) {
            debug!("Skipping silent cart refresh, operations in flight");
            return;
        }

        match self.inner.api.fetch_cart().await {
            Ok(cart) => self.inner.state.update(|s| s.cart = cart),
            Err(e) => warn!(error = %e, "Cart refresh failed"),
        }
    }

    /// Refresh the wishlist from the server.
    ///
    /// A silent refresh is a no-op while any wishlist confirmation is in
    /// flight.
    #[instrument(skip(self))]
    pub async fn fetch_wishlist(&self, silent: bool) {
        if silent && self.inner.state.with(|s| !s.pending_wishlist.is_empty()) {
            debug!("Skipping silent wishlist refresh, operations in flight");
            return;
        }

        match self.inner.api.fetch_wishlist().await {
            Ok(wishlist) => self.inner.state.update(|s| s.wishlist = wishlist),
            Err(e) => warn!(error = %e, "Wishlist refresh failed"),
        }
    }

    /// Load cart and wishlist concurrently at login.
    ///
    /// A no-op until the user has completed onboarding.
    #[instrument(skip(self))]
    pub async fn initialize_user_data(&self, onboarding_complete: bool) {
        if !onboarding_complete {
            debug!("Onboarding incomplete, skipping user data load");
            return;
        }

        tokio::join!(self.fetch_cart(false), self.fetch_wishlist(false));
    }

    /// Clear all shopping state, cancel pending debounce timers, and
    /// invalidate in-flight confirmations.
    ///
    /// Called on logout. Timers that have not fired are aborted
    /// synchronously; a confirmation already past its timer checks the
    /// session epoch before writing back, so neither path lands state in
    /// the new session.
    pub fn reset(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.debounce.cancel_all();
        self.inner.state.replace(ShoppingState::default());
    }
}

/// Whether local and server wishlists differ as ID sets.
fn wishlists_differ(local: &[Product], server: &[Product]) -> bool {
    let local_ids: HashSet<&ProductId> = local.iter().map(|p| &p.id).collect();
    let server_ids: HashSet<&ProductId> = server.iter().map(|p| &p.id).collect();
    local_ids != server_ids
}
