#![forbid(unsafe_code)]

//! Persistence for drafty containers.
//!
//! [`Persist`] is a [`drafty_core::Middleware`] that hydrates a container
//! from a [`KeyValueStore`] when registered and writes committed values back
//! as JSON. Draft persistence is opt-in through [`PersistConfig::with_draft`].
//!
//! ```
//! use drafty_core::Container;
//! use drafty_persist::{KeyValueStore, MemoryStore, persist};
//!
//! let store = MemoryStore::new().with_entry("count", "3");
//! let count = Container::new(0);
//! count.use_middleware(persist("count", store.clone())).unwrap();
//! assert_eq!(count.now(), 3);
//!
//! count.set(4).unwrap();
//! assert_eq!(store.get("count").unwrap().as_deref(), Some("4"));
//! ```
//!
//! # Failure Modes
//!
//! - A store reporting [`StoreError::Unavailable`] fails the triggering
//!   operation with a fatal [`drafty_core::Diagnostic`].
//! - Decode, encode and backend failures surface as [`PersistError`] inside
//!   [`drafty_core::Error::External`].

pub mod error;
pub mod persist;
pub mod store;

pub use error::PersistError;
pub use persist::{Persist, PersistConfig, persist};
pub use store::{KeyValueStore, MemoryStore, StoreError};
