//! Framework-agnostic binding for render loops.
//!
//! A [`Watch`] reads `now` and `draft` once when attached, subscribes to the
//! selected targets, and keeps the latest values plus a dirty flag. A render
//! loop polls [`Watch::take_dirty`] to decide whether to redraw. Detaching
//! (or dropping) the watch removes its subscriptions.
//!
//! An untracked draft reads as `None`. An untracked `now` keeps the value
//! captured at attach time.
//!
//! A watch never mutates the container it observes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::broadcast::SubscriptionGuard;
use crate::container::Container;
use crate::event::Target;
use crate::value::StateValue;

/// Which targets a [`Watch`] follows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WatchTarget {
    /// Both `now` and `draft`.
    #[default]
    Both,
    Now,
    Draft,
}

impl WatchTarget {
    #[must_use]
    pub const fn includes(self, target: Target) -> bool {
        match self {
            Self::Both => true,
            Self::Now => matches!(target, Target::Now),
            Self::Draft => matches!(target, Target::Draft),
        }
    }
}

/// Latest-value tracker attached to a container.
pub struct Watch<S> {
    target: WatchTarget,
    now: Rc<RefCell<S>>,
    draft: Rc<RefCell<Option<S>>>,
    dirty: Rc<Cell<bool>>,
    changes: Rc<Cell<u64>>,
    guards: Vec<SubscriptionGuard>,
}

impl<S: StateValue> Watch<S> {
    /// Snapshot the container and subscribe to `target`.
    #[must_use]
    pub fn attach(container: &Container<S>, target: WatchTarget) -> Self {
        let now = Rc::new(RefCell::new(container.now()));
        let draft = Rc::new(RefCell::new(if target.includes(Target::Draft) {
            container.draft()
        } else {
            None
        }));
        let dirty = Rc::new(Cell::new(false));
        let changes = Rc::new(Cell::new(0u64));
        let mut guards = Vec::with_capacity(2);

        if target.includes(Target::Now) {
            let (now, dirty, changes) = (Rc::clone(&now), Rc::clone(&dirty), Rc::clone(&changes));
            let sub = container.subscribe(move |value: &S| {
                *now.borrow_mut() = value.clone();
                dirty.set(true);
                changes.set(changes.get() + 1);
            });
            guards.push(sub.into_guard());
        }

        if target.includes(Target::Draft) {
            let (draft, dirty, changes) =
                (Rc::clone(&draft), Rc::clone(&dirty), Rc::clone(&changes));
            let sub = container.subscribe_draft(move |value: Option<&S>| {
                *draft.borrow_mut() = value.cloned();
                dirty.set(true);
                changes.set(changes.get() + 1);
            });
            guards.push(sub.into_guard());
        }

        Self {
            target,
            now,
            draft,
            dirty,
            changes,
            guards,
        }
    }

    /// Latest `now` seen by this watch; the attach snapshot when `now` is
    /// not tracked.
    #[must_use]
    pub fn now(&self) -> S {
        self.now.borrow().clone()
    }

    /// Latest draft seen by this watch; always `None` when the draft is not
    /// tracked.
    #[must_use]
    pub fn draft(&self) -> Option<S> {
        self.draft.borrow().clone()
    }

    #[must_use]
    pub fn target(&self) -> WatchTarget {
        self.target
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Return and clear the dirty flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }

    /// Broadcasts received since attach.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.changes.get()
    }

    /// Stop following the container.
    pub fn detach(self) {
        drop(self);
    }
}

impl<S: fmt::Debug> fmt::Debug for Watch<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("target", &self.target)
            .field("now", &self.now.borrow())
            .field("draft", &self.draft.borrow())
            .field("dirty", &self.dirty.get())
            .field("subscriptions", &self.guards.len())
            .finish()
    }
}
