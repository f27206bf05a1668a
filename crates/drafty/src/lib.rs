#![forbid(unsafe_code)]

//! drafty public facade crate.
//!
//! Re-exports the container engine and, with the default `persist` feature,
//! the persistence middleware. [`logging`] installs a `tracing` subscriber
//! for applications that do not bring their own.
//!
//! ```
//! use drafty::prelude::*;
//!
//! let count = Container::new(0);
//! count.sketch(5)?.publish()?;
//! assert_eq!(count.now(), 5);
//! # Ok::<(), drafty::Error>(())
//! ```

pub mod logging;

pub use drafty_core::*;

#[cfg(feature = "persist")]
pub use drafty_persist as persist;

pub mod prelude {
    pub use drafty_core::middleware::from_fn as middleware_fn;
    pub use drafty_core::extension::from_fn as extension_fn;
    pub use drafty_core::{
        Container, ContainerConfig, Error, EventType, Extended, Extension, Extensions, Middleware,
        Options, Result, StateValue, Subscription, SubscriptionGuard, Target, Update, Watch,
        WatchTarget,
    };

    #[cfg(feature = "persist")]
    pub use drafty_persist::{KeyValueStore, MemoryStore, Persist, PersistConfig, persist};

    pub use crate::logging::{LogConfig, LogFormat};
}
