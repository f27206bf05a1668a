//! The persistence middleware.
//!
//! # Lifecycle
//!
//! | event           | action                                               |
//! |-----------------|------------------------------------------------------|
//! | `init`          | read `key` and `set` it; with drafts on, read the draft key and `sketch` it |
//! | `after:set`     | write `now`                                          |
//! | `after:publish` | write `now`                                          |
//! | `after:sketch`  | write the draft (drafts on)                          |
//! | `after:discard` | remove the draft key (drafts on)                     |
//!
//! A write whose JSON equals the text just hydrated from the same key is
//! skipped: the store already holds it. Any other write during hydration, for
//! example one made by a subscriber reacting to the hydrated value, goes
//! through.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use drafty_core::{Container, EventType, Middleware, Result, StateValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::error::{PersistError, from_store};
use crate::store::KeyValueStore;

const DRAFT_SUFFIX: &str = "__draft";

/// Persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistConfig {
    /// Store key for `now`.
    pub key: String,
    /// Also persist the draft under `"{key}__draft"`. Off by default.
    pub draft: bool,
}

impl PersistConfig {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            draft: false,
        }
    }

    #[must_use]
    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    #[must_use]
    pub fn draft_key(&self) -> String {
        format!("{}{DRAFT_SUFFIX}", self.key)
    }
}

/// Middleware mirroring a container into a [`KeyValueStore`] as JSON.
pub struct Persist<K> {
    config: PersistConfig,
    store: K,
    /// Raw JSON read during hydration, per key, until the key is rewritten.
    hydrated: RefCell<BTreeMap<String, String>>,
}

/// Persist `now` under `key` in `store`.
pub fn persist<K: KeyValueStore>(key: impl Into<String>, store: K) -> Persist<K> {
    Persist::new(PersistConfig::new(key), store)
}

impl<K: KeyValueStore> Persist<K> {
    #[must_use]
    pub fn new(config: PersistConfig, store: K) -> Self {
        Self {
            config,
            store,
            hydrated: RefCell::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &K {
        &self.store
    }

    fn read<S: DeserializeOwned>(&self, key: &str) -> Result<Option<S>> {
        let Some(raw) = self
            .store
            .get(key)
            .map_err(|err| from_store(key, "get", err))?
        else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw).map_err(|source| {
            drafty_core::Error::external(PersistError::Deserialize {
                key: key.to_string(),
                source,
            })
        })?;
        self.hydrated.borrow_mut().insert(key.to_string(), raw);
        Ok(Some(value))
    }

    fn write<S: Serialize>(&self, key: &str, value: &S) -> Result<()> {
        let json = serde_json::to_string(value).map_err(|source| {
            drafty_core::Error::external(PersistError::Serialize {
                key: key.to_string(),
                source,
            })
        })?;
        if self.hydrated.borrow().get(key) == Some(&json) {
            trace!(key, "write skipped: store already holds hydrated value");
            return Ok(());
        }
        self.store
            .set(key, &json)
            .map_err(|err| from_store(key, "set", err))?;
        self.hydrated.borrow_mut().remove(key);
        trace!(key, bytes = json.len(), "persisted");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.store
            .remove(key)
            .map_err(|err| from_store(key, "remove", err))?;
        self.hydrated.borrow_mut().remove(key);
        trace!(key, "removed");
        Ok(())
    }

    fn hydrate<S>(&self, container: &Container<S>) -> Result<()>
    where
        S: StateValue + Serialize + DeserializeOwned,
    {
        if let Some(now) = self.read::<S>(&self.config.key)? {
            debug!(key = %self.config.key, label = container.label(), "hydrating now");
            container.set(now)?;
        }
        if self.config.draft {
            let draft_key = self.config.draft_key();
            if let Some(draft) = self.read::<S>(&draft_key)? {
                debug!(key = %draft_key, label = container.label(), "hydrating draft");
                container.sketch(draft)?;
            }
        }
        Ok(())
    }
}

impl<K: fmt::Debug> fmt::Debug for Persist<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persist")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<S, K> Middleware<S> for Persist<K>
where
    S: StateValue + Serialize + DeserializeOwned,
    K: KeyValueStore,
{
    fn name(&self) -> &str {
        "persist"
    }

    fn on_event(&self, event: EventType, container: &Container<S>) -> Result<()> {
        if event == EventType::Init {
            return self.hydrate(container);
        }
        if !event.is_after() || event.is_broadcast() {
            return Ok(());
        }

        match event {
            EventType::AfterSet | EventType::AfterPublish => {
                container.with_now(|now| self.write(&self.config.key, now))
            }
            EventType::AfterSketch if self.config.draft => match container.draft() {
                Some(draft) => self.write(&self.config.draft_key(), &draft),
                None => Ok(()),
            },
            EventType::AfterDiscard if self.config.draft => self.remove(&self.config.draft_key()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use serde::Deserialize;
    use std::cell::Cell;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Todo {
        title: String,
        done: bool,
    }

    fn todo(title: &str) -> Todo {
        Todo {
            title: title.into(),
            done: false,
        }
    }

    #[test]
    fn draft_key_suffix() {
        assert_eq!(PersistConfig::new("count").draft_key(), "count__draft");
    }

    #[test]
    fn hydrates_now_on_init() {
        let store = MemoryStore::new().with_entry("count", "42");
        let count = Container::new(0);
        count.use_middleware(persist("count", store)).unwrap();
        assert_eq!(count.now(), 42);
        assert_eq!(count.draft(), None);
    }

    #[test]
    fn missing_key_keeps_initial() {
        let count = Container::new(7);
        count
            .use_middleware(persist("count", MemoryStore::new()))
            .unwrap();
        assert_eq!(count.now(), 7);
        assert_eq!(count.version(), 0);
    }

    #[test]
    fn hydrates_draft_when_enabled() {
        let store = MemoryStore::new()
            .with_entry("todos", r#"[{"title":"a","done":false}]"#)
            .with_entry("todos__draft", r#"[{"title":"b","done":true}]"#);
        let todos: Container<Vec<Todo>> = Container::new(Vec::new());
        todos
            .use_middleware(Persist::new(
                PersistConfig::new("todos").with_draft(true),
                store,
            ))
            .unwrap();
        assert_eq!(todos.now(), vec![todo("a")]);
        assert_eq!(todos.draft().unwrap()[0].title, "b");
    }

    #[test]
    fn draft_ignored_when_disabled() {
        let store = MemoryStore::new().with_entry("count__draft", "3");
        let count = Container::new(0);
        count.use_middleware(persist("count", store.clone())).unwrap();
        count.sketch(9).unwrap();
        assert_eq!(count.draft(), Some(9));
        assert_eq!(store.get("count__draft").unwrap().as_deref(), Some("3"));
        assert!(!store.contains("count"));
    }

    #[test]
    fn hydration_does_not_write_back() {
        #[derive(Default)]
        struct Counting {
            inner: MemoryStore,
            writes: Cell<u32>,
        }
        impl KeyValueStore for Counting {
            fn get(&self, key: &str) -> std::result::Result<Option<String>, StoreError> {
                self.inner.get(key)
            }
            fn set(&self, key: &str, value: &str) -> std::result::Result<(), StoreError> {
                self.writes.set(self.writes.get() + 1);
                self.inner.set(key, value)
            }
            fn remove(&self, key: &str) -> std::result::Result<(), StoreError> {
                self.inner.remove(key)
            }
        }

        let store = std::rc::Rc::new(Counting {
            inner: MemoryStore::new().with_entry("n", "5"),
            writes: Cell::new(0),
        });
        let n = Container::new(0);
        n.use_middleware(persist("n", std::rc::Rc::clone(&store)))
            .unwrap();
        assert_eq!(n.now(), 5);
        assert_eq!(store.writes.get(), 0);

        n.set(6).unwrap();
        assert_eq!(store.writes.get(), 1);
    }

    #[test]
    fn corrupt_entry_is_external_error() {
        let store = MemoryStore::new().with_entry("count", "not json");
        let count = Container::new(0);
        let err = count.use_middleware(persist("count", store)).unwrap_err();
        assert!(err.diagnostic().is_none());
        assert!(err.to_string().starts_with("cannot decode 'count'"));
        assert_eq!(count.now(), 0);
    }
}
