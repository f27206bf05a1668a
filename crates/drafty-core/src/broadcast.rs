#![forbid(unsafe_code)]

//! Broadcast registry: two ordered subscriber lists and their tokens.
//!
//! # Design
//!
//! Each registration occupies a slot tagged with a monotonically increasing
//! [`SlotId`]. A [`Subscription`] remembers its target and slot id plus a
//! weak handle to the registry, so unsubscribing removes exactly that slot
//! regardless of how many other slots were removed before it.
//!
//! Broadcasts take a snapshot of the callback list and release the borrow
//! before calling anything. A callback that unsubscribes itself or others,
//! or calls `unsubscribe_all`, does not change the pass already in progress.
//!
//! # Failure Modes
//!
//! - **Panicking subscriber**: the panic unwinds through the broadcast; the
//!   remaining subscribers of that pass are not called.
//! - **Dropped container**: tokens outlive the container safely; `unsubscribe`
//!   then reports `false`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::event::Target;

pub(crate) type NowCallback<S> = Rc<dyn Fn(&S)>;
pub(crate) type DraftCallback<S> = Rc<dyn Fn(Option<&S>)>;

/// Stable identifier of a subscriber slot, unique within one container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl SlotId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

struct Slot<F: ?Sized> {
    id: SlotId,
    callback: Rc<F>,
}

/// Subscriber lists owned by one container.
pub(crate) struct BroadcastRegistry<S> {
    next_id: u64,
    now: Vec<Slot<dyn Fn(&S)>>,
    draft: Vec<Slot<dyn Fn(Option<&S>)>>,
}

impl<S> BroadcastRegistry<S> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            now: Vec::new(),
            draft: Vec::new(),
        }
    }

    fn allocate(&mut self) -> SlotId {
        let id = SlotId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn push_now(&mut self, callback: NowCallback<S>) -> SlotId {
        let id = self.allocate();
        self.now.push(Slot { id, callback });
        id
    }

    pub(crate) fn push_draft(&mut self, callback: DraftCallback<S>) -> SlotId {
        let id = self.allocate();
        self.draft.push(Slot { id, callback });
        id
    }

    pub(crate) fn now_snapshot(&self) -> Vec<NowCallback<S>> {
        self.now.iter().map(|s| Rc::clone(&s.callback)).collect()
    }

    pub(crate) fn draft_snapshot(&self) -> Vec<DraftCallback<S>> {
        self.draft.iter().map(|s| Rc::clone(&s.callback)).collect()
    }

    pub(crate) fn len(&self, target: Target) -> usize {
        match target {
            Target::Now => self.now.len(),
            Target::Draft => self.draft.len(),
        }
    }

    fn remove(&mut self, target: Target, id: SlotId) -> bool {
        let before = self.len(target);
        match target {
            Target::Now => self.now.retain(|s| s.id != id),
            Target::Draft => self.draft.retain(|s| s.id != id),
        }
        self.len(target) != before
    }

    fn contains(&self, target: Target, id: SlotId) -> bool {
        match target {
            Target::Now => self.now.iter().any(|s| s.id == id),
            Target::Draft => self.draft.iter().any(|s| s.id == id),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.now.clear();
        self.draft.clear();
    }
}

/// Type-erased view of a registry, so tokens do not carry the state type.
pub(crate) trait SlotOwner {
    fn remove_slot(&self, target: Target, id: SlotId) -> bool;
    fn has_slot(&self, target: Target, id: SlotId) -> bool;
}

impl<S> SlotOwner for RefCell<BroadcastRegistry<S>> {
    fn remove_slot(&self, target: Target, id: SlotId) -> bool {
        self.borrow_mut().remove(target, id)
    }

    fn has_slot(&self, target: Target, id: SlotId) -> bool {
        self.borrow().contains(target, id)
    }
}

/// Capability to remove one subscriber registration.
///
/// Dropping a `Subscription` does **not** unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe) or convert it with
/// [`into_guard`](Self::into_guard) for drop-based cleanup.
#[must_use = "dropping a Subscription keeps the callback registered; keep it to unsubscribe later"]
pub struct Subscription {
    target: Target,
    id: SlotId,
    owner: Weak<dyn SlotOwner>,
}

impl Subscription {
    pub(crate) fn new(target: Target, id: SlotId, owner: Weak<dyn SlotOwner>) -> Self {
        Self { target, id, owner }
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    #[must_use]
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Whether the slot is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.owner
            .upgrade()
            .is_some_and(|owner| owner.has_slot(self.target, self.id))
    }

    /// Remove this registration. Returns `false` if it was already removed
    /// (or the container is gone).
    pub fn unsubscribe(&self) -> bool {
        match self.owner.upgrade() {
            Some(owner) => owner.remove_slot(self.target, self.id),
            None => false,
        }
    }

    /// Turn the token into a guard that unsubscribes on drop.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { inner: Some(self) }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("target", &self.target)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// RAII guard around a [`Subscription`].
#[derive(Debug)]
pub struct SubscriptionGuard {
    inner: Option<Subscription>,
}

impl SubscriptionGuard {
    /// Give the token back without unsubscribing.
    #[must_use]
    pub fn release(mut self) -> Subscription {
        // Only `release` and `drop` take the token, and both consume the guard.
        self.inner.take().expect("guard holds a subscription until released")
    }

    #[must_use]
    pub fn subscription(&self) -> Option<&Subscription> {
        self.inner.as_ref()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(sub) = self.inner.take() {
            sub.unsubscribe();
        }
    }
}
