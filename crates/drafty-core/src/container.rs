#![forbid(unsafe_code)]

//! The container engine.
//!
//! # Design
//!
//! [`Container<S>`] wraps a committed value (`now`) and an optional pending
//! value (`draft`) in shared, reference-counted storage. Cloning a container
//! creates a new handle to the **same** state, subscribers and middlewares.
//!
//! Every mutating operation follows the same shape:
//!
//! ```text
//! candidate ──equal?──► no-op
//!     │
//!     ▼
//! before:<op> ─► write ─► after:<op> ─► [before:broadcast ─► subscribers ─► after:broadcast]
//! ```
//!
//! The bracketed part is skipped when [`Options::silent`] is set.
//!
//! # Failure Modes
//!
//! - **Middleware error**: aborts the operation at the failing event and
//!   propagates. Writes that already happened stay in place.
//! - **Re-entrant borrow**: calling a mutating operation from inside
//!   [`Container::with_now`] or [`Container::with_draft`] panics (`RefCell`
//!   rules). Every other callback runs with no borrow held.
//! - **Unbounded recursion**: a `now` subscriber that unconditionally calls
//!   `set` with a fresh value recurses until the stack overflows.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::broadcast::{BroadcastRegistry, SlotOwner, Subscription};
use crate::error::Result;
use crate::event::{EventType, Options, Target};
use crate::extension::{Extended, Extensions};
use crate::middleware::{self, Middleware};
use crate::update::Update;
use crate::value::{self, StateValue};

/// Configuration for a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Label attached to log events. Defaults to `"container"`.
    pub label: Option<String>,
}

impl ContainerConfig {
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

struct Values<S> {
    now: S,
    draft: Option<S>,
    version: u64,
}

struct Shared<S> {
    values: RefCell<Values<S>>,
    registry: Rc<RefCell<BroadcastRegistry<S>>>,
    middlewares: RefCell<Vec<Rc<dyn Middleware<S>>>>,
    config: ContainerConfig,
}

/// A reactive value with a draft/commit protocol.
///
/// # Invariants
///
/// 1. `draft` is either absent or a single value.
/// 2. `now` is only written by `set` and `publish`.
/// 3. `version` increments by exactly 1 each time `now` or `draft` changes;
///    a publish changes both and therefore advances it by 2.
/// 4. A write whose candidate equals the current value emits nothing.
pub struct Container<S> {
    shared: Rc<Shared<S>>,
}

impl<S> Clone for Container<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

/// Handles compare by identity, so containers can be nested inside state.
impl<S> PartialEq for Container<S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<S> Eq for Container<S> {}

impl<S: fmt::Debug> fmt::Debug for Container<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.shared.values.borrow();
        let registry = self.shared.registry.borrow();
        f.debug_struct("Container")
            .field("label", &self.shared.config.label)
            .field("now", &values.now)
            .field("draft", &values.draft)
            .field("version", &values.version)
            .field("now_subscribers", &registry.len(Target::Now))
            .field("draft_subscribers", &registry.len(Target::Draft))
            .field("middlewares", &self.shared.middlewares.borrow().len())
            .finish()
    }
}

impl<S: StateValue> Container<S> {
    /// Create a container holding `initial` as its committed value.
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self::with_config(initial, ContainerConfig::default())
    }

    #[must_use]
    pub fn with_config(initial: S, config: ContainerConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                values: RefCell::new(Values {
                    now: initial,
                    draft: None,
                    version: 0,
                }),
                registry: Rc::new(RefCell::new(BroadcastRegistry::new())),
                middlewares: RefCell::new(Vec::new()),
                config,
            }),
        }
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// Clone of the committed value.
    #[must_use]
    pub fn now(&self) -> S {
        self.shared.values.borrow().now.clone()
    }

    /// Clone of the pending draft, if any.
    #[must_use]
    pub fn draft(&self) -> Option<S> {
        self.shared.values.borrow().draft.clone()
    }

    /// Borrow the committed value without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls a mutating operation on this container.
    pub fn with_now<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.shared.values.borrow().now)
    }

    /// Borrow the pending draft without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls a mutating operation on this container.
    pub fn with_draft<R>(&self, f: impl FnOnce(Option<&S>) -> R) -> R {
        f(self.shared.values.borrow().draft.as_ref())
    }

    #[must_use]
    pub fn has_draft(&self) -> bool {
        self.shared.values.borrow().draft.is_some()
    }

    /// Number of changes to `now` or `draft` so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.values.borrow().version
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.shared.config.label.as_deref().unwrap_or("container")
    }

    #[must_use]
    pub fn config(&self) -> &ContainerConfig {
        &self.shared.config
    }

    // ── Mutations ──────────────────────────────────────────────────────

    /// Replace `now`, or transform a clone of it. See [`Self::set_with_options`].
    pub fn set<'a>(&self, input: impl Into<Update<'a, S>>) -> Result<&Self> {
        self.set_with_options(input, Options::default())
    }

    /// Transform a clone of `now`.
    pub fn set_with(&self, f: impl FnOnce(S) -> S) -> Result<&Self> {
        self.set_with_options(Update::with(f), Options::default())
    }

    /// Write a new committed value.
    ///
    /// No-op when the candidate equals `now`. Otherwise emits
    /// `before:set`/`after:set` around the write and, unless silent,
    /// broadcasts to `now` subscribers.
    pub fn set_with_options<'a>(
        &self,
        input: impl Into<Update<'a, S>>,
        options: Options,
    ) -> Result<&Self> {
        let candidate = input.into().resolve(|| self.with_now(value::detached));
        if self.with_now(|now| value::equal(now, &candidate)) {
            trace!(label = self.label(), "set skipped: value unchanged");
            return Ok(self);
        }

        self.emit(EventType::BeforeSet)?;
        let version = self.write(|values| values.now = candidate);
        debug!(label = self.label(), version, silent = options.silent, "now set");
        self.emit(EventType::AfterSet)?;

        if !options.silent {
            self.broadcast_now()?;
        }
        Ok(self)
    }

    /// Replace the draft, or transform a clone of the draft (falling back to
    /// `now` when there is none). See [`Self::sketch_with_options`].
    pub fn sketch<'a>(&self, input: impl Into<Update<'a, S>>) -> Result<&Self> {
        self.sketch_with_options(input, Options::default())
    }

    /// Transform a clone of the draft, or of `now` when there is no draft.
    pub fn sketch_with(&self, f: impl FnOnce(S) -> S) -> Result<&Self> {
        self.sketch_with_options(Update::with(f), Options::default())
    }

    /// Write a new draft.
    ///
    /// No-op when the candidate equals the previous draft; an absent draft
    /// never equals a candidate. Otherwise emits `before:sketch`/`after:sketch`
    /// and, unless silent, broadcasts to draft subscribers.
    pub fn sketch_with_options<'a>(
        &self,
        input: impl Into<Update<'a, S>>,
        options: Options,
    ) -> Result<&Self> {
        let candidate = input.into().resolve(|| {
            self.with_draft(|draft| draft.map(value::detached))
                .unwrap_or_else(|| self.with_now(value::detached))
        });
        if self.with_draft(|draft| value::equal_draft(draft, Some(&candidate))) {
            trace!(label = self.label(), "sketch skipped: draft unchanged");
            return Ok(self);
        }

        self.emit(EventType::BeforeSketch)?;
        let version = self.write(|values| values.draft = Some(candidate));
        debug!(label = self.label(), version, silent = options.silent, "draft sketched");
        self.emit(EventType::AfterSketch)?;

        if !options.silent {
            self.broadcast_draft()?;
        }
        Ok(self)
    }

    /// Commit the draft into `now`. See [`Self::publish_with_options`].
    pub fn publish(&self) -> Result<&Self> {
        self.publish_with_options(Options::default())
    }

    /// Commit the draft into `now`.
    ///
    /// No-op without a draft, and also when the draft equals `now` (the draft
    /// is kept in that case). Otherwise emits `before:publish`/`after:publish`
    /// around the write, discards the draft with the same options, and then,
    /// unless silent, broadcasts to `now` subscribers.
    pub fn publish_with_options(&self, options: Options) -> Result<&Self> {
        let Some(draft) = self.draft() else {
            return Ok(self);
        };
        if self.with_now(|now| value::equal(now, &draft)) {
            trace!(label = self.label(), "publish skipped: draft equals now");
            return Ok(self);
        }

        self.emit(EventType::BeforePublish)?;
        let version = self.write(|values| values.now = draft);
        debug!(label = self.label(), version, silent = options.silent, "draft published");
        self.emit(EventType::AfterPublish)?;

        self.discard_with_options(options)?;

        if !options.silent {
            self.broadcast_now()?;
        }
        Ok(self)
    }

    /// Drop the draft. See [`Self::discard_with_options`].
    pub fn discard(&self) -> Result<&Self> {
        self.discard_with_options(Options::default())
    }

    /// Drop the draft without committing it.
    ///
    /// No-op without a draft. Otherwise emits `before:discard`/`after:discard`
    /// and, unless silent, broadcasts the absent draft.
    pub fn discard_with_options(&self, options: Options) -> Result<&Self> {
        if !self.has_draft() {
            return Ok(self);
        }

        self.emit(EventType::BeforeDiscard)?;
        let version = self.write(|values| values.draft = None);
        debug!(label = self.label(), version, silent = options.silent, "draft discarded");
        self.emit(EventType::AfterDiscard)?;

        if !options.silent {
            self.broadcast_draft()?;
        }
        Ok(self)
    }

    // ── Subscribers ────────────────────────────────────────────────────

    /// Call `callback` with every new committed value.
    pub fn subscribe(&self, callback: impl Fn(&S) + 'static) -> Subscription {
        let id = self.shared.registry.borrow_mut().push_now(Rc::new(callback));
        Subscription::new(Target::Now, id, self.slot_owner())
    }

    /// Call `callback` with every new draft, including `None` after a discard.
    pub fn subscribe_draft(&self, callback: impl Fn(Option<&S>) + 'static) -> Subscription {
        let id = self
            .shared
            .registry
            .borrow_mut()
            .push_draft(Rc::new(callback));
        Subscription::new(Target::Draft, id, self.slot_owner())
    }

    /// Subscribe to either target with one callback shape. `Now` callbacks
    /// always receive `Some`.
    pub fn subscribe_to(
        &self,
        target: Target,
        callback: impl Fn(Option<&S>) + 'static,
    ) -> Subscription {
        match target {
            Target::Now => self.subscribe(move |value: &S| callback(Some(value))),
            Target::Draft => self.subscribe_draft(callback),
        }
    }

    /// Remove every `now` and draft subscriber. A broadcast already in
    /// progress still reaches the subscribers it started with.
    pub fn unsubscribe_all(&self) {
        self.shared.registry.borrow_mut().clear();
        debug!(label = self.label(), "all subscribers removed");
    }

    #[must_use]
    pub fn subscriber_count(&self, target: Target) -> usize {
        self.shared.registry.borrow().len(target)
    }

    // ── Middlewares & extensions ───────────────────────────────────────

    /// Append one middleware and send it `init`.
    pub fn use_middleware(&self, middleware: impl Middleware<S> + 'static) -> Result<&Self> {
        self.use_middlewares([Box::new(middleware) as Box<dyn Middleware<S>>])
    }

    /// Append middlewares, then send `init` to the newly added ones only.
    pub fn use_middlewares<I>(&self, middlewares: I) -> Result<&Self>
    where
        I: IntoIterator<Item = Box<dyn Middleware<S>>>,
    {
        let added: Vec<Rc<dyn Middleware<S>>> = middlewares.into_iter().map(Rc::from).collect();
        self.shared
            .middlewares
            .borrow_mut()
            .extend(added.iter().cloned());
        debug!(
            label = self.label(),
            added = added.len(),
            total = self.middleware_count(),
            "middlewares registered"
        );
        middleware::dispatch(&added, EventType::Init, self)?;
        Ok(self)
    }

    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.shared.middlewares.borrow().len()
    }

    /// Layer named extensions on top of this container.
    #[must_use]
    pub fn extend(&self, extensions: Extensions<S>) -> Extended<S> {
        Extended::new(self.clone(), extensions)
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn write(&self, f: impl FnOnce(&mut Values<S>)) -> u64 {
        let mut values = self.shared.values.borrow_mut();
        f(&mut values);
        values.version += 1;
        values.version
    }

    fn emit(&self, event: EventType) -> Result<()> {
        let middlewares = self.shared.middlewares.borrow().clone();
        if middlewares.is_empty() {
            return Ok(());
        }
        middleware::dispatch(&middlewares, event, self)
    }

    fn broadcast_now(&self) -> Result<()> {
        self.emit(EventType::BeforeBroadcastNow)?;
        let subscribers = self.shared.registry.borrow().now_snapshot();
        if !subscribers.is_empty() {
            trace!(label = self.label(), subscribers = subscribers.len(), "broadcast now");
            for subscriber in &subscribers {
                // Re-read per subscriber: an earlier one may have written again.
                let value = self.now();
                subscriber(&value);
            }
        }
        self.emit(EventType::AfterBroadcastNow)
    }

    fn broadcast_draft(&self) -> Result<()> {
        self.emit(EventType::BeforeBroadcastDraft)?;
        let subscribers = self.shared.registry.borrow().draft_snapshot();
        if !subscribers.is_empty() {
            trace!(label = self.label(), subscribers = subscribers.len(), "broadcast draft");
            for subscriber in &subscribers {
                let value = self.draft();
                subscriber(value.as_ref());
            }
        }
        self.emit(EventType::AfterBroadcastDraft)
    }

    fn slot_owner(&self) -> std::rc::Weak<dyn SlotOwner> {
        let owner: Rc<dyn SlotOwner> = self.shared.registry.clone();
        Rc::downgrade(&owner)
    }
}
