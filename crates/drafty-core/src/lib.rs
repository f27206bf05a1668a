#![forbid(unsafe_code)]

//! Reactive state container with a two-phase draft/commit protocol.
//!
//! This crate provides the container engine and its pluggable seams:
//!
//! - [`Container`]: owns the committed value (`now`) and an optional pending
//!   value (`draft`), and implements `set`, `sketch`, `publish`, `discard`.
//! - [`Subscription`]: capability token returned by `subscribe`, removing
//!   exactly one registration.
//! - [`Middleware`]: ordered interceptors invoked at every [`EventType`]
//!   around the mutating operations.
//! - [`Extension`]: named operations layered on top of a container via
//!   [`Container::extend`].
//! - [`Watch`]: framework-agnostic binding that tracks the latest values and a
//!   dirty flag for a render loop.
//!
//! # Architecture
//!
//! `Container<S>` is a handle onto `Rc`-shared, single-threaded state. No
//! `RefCell` borrow is held while user code runs, so subscribers, middlewares,
//! mutators and extensions may call back into the container; such calls are
//! ordinary nested calls.
//!
//! # Invariants
//!
//! 1. There is at most one pending draft.
//! 2. `now` only changes through `set` or `publish`.
//! 3. A mutation that produces a value equal to the previous one emits no
//!    middleware events and no broadcasts.
//! 4. Subscribers are notified in registration order; the list is
//!    snapshotted at the start of every pass.
//! 5. Mutator closures receive an owned clone, never the stored value.

pub mod broadcast;
pub mod container;
pub mod diagnostic;
pub mod error;
pub mod event;
pub mod extension;
pub mod middleware;
pub mod update;
pub mod value;
pub mod watch;

pub use broadcast::{SlotId, Subscription, SubscriptionGuard};
pub use container::{Container, ContainerConfig};
pub use diagnostic::Diagnostic;
pub use error::{Error, Result};
pub use event::{EventType, Options, Target};
pub use extension::{Extended, Extension, Extensions, FnExtension};
pub use middleware::{FnMiddleware, Middleware};
pub use update::Update;
pub use value::StateValue;
pub use watch::{Watch, WatchTarget};
