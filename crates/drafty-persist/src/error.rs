use std::fmt;

use drafty_core::{Diagnostic, Error};

use crate::store::StoreError;

/// Recoverable persistence failures, carried as [`Error::External`].
#[derive(Debug)]
pub enum PersistError {
    /// The state could not be encoded as JSON.
    Serialize {
        key: String,
        source: serde_json::Error,
    },
    /// The stored JSON does not decode into the state type.
    Deserialize {
        key: String,
        source: serde_json::Error,
    },
    /// The backend rejected a read or write.
    Store { key: String, source: StoreError },
}

impl PersistError {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Serialize { key, .. } | Self::Deserialize { key, .. } | Self::Store { key, .. } => {
                key
            }
        }
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialize { key, source } => write!(f, "cannot encode '{key}': {source}"),
            Self::Deserialize { key, source } => write!(f, "cannot decode '{key}': {source}"),
            Self::Store { key, source } => write!(f, "cannot access '{key}': {source}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialize { source, .. } | Self::Deserialize { source, .. } => Some(source),
            Self::Store { source, .. } => Some(source),
        }
    }
}

/// Map a store failure on `key` to a container error.
///
/// `Unavailable` becomes a fatal diagnostic; anything else stays a
/// recoverable [`PersistError`].
pub(crate) fn from_store(key: &str, operation: &str, err: StoreError) -> Error {
    match err {
        StoreError::Unavailable { reason } => Error::from(
            Diagnostic::new("The persistence store is not available in this environment.")
                .with_intelligence("key", key)
                .with_intelligence("operation", operation)
                .with_intelligence("reason", &reason)
                .with_solution(
                    "Make sure the store backend exists before registering the persistence middleware.",
                )
                .with_solution("Use `MemoryStore` where no durable storage is available, e.g. in tests.")
                .with_reference("drafty_persist::KeyValueStore"),
        ),
        other => Error::external(PersistError::Store {
            key: key.to_string(),
            source: other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn unavailable_is_fatal() {
        let err = from_store(
            "todos",
            "get",
            StoreError::Unavailable {
                reason: "sandboxed".into(),
            },
        );
        let diag = err.diagnostic().expect("fatal");
        assert!(diag.what().contains("not available"));
        assert!(
            diag.intelligence()
                .iter()
                .any(|(k, v)| k == "reason" && v.contains("sandboxed"))
        );
        assert_eq!(diag.solutions().len(), 2);
    }

    #[test]
    fn backend_is_external() {
        let err = from_store("todos", "set", StoreError::Backend("quota".into()));
        assert!(err.diagnostic().is_none());
        assert_eq!(err.to_string(), "cannot access 'todos': store error: quota");
        assert!(err.source().is_some());
    }

    #[test]
    fn key_accessor() {
        let source = serde_json::from_str::<i32>("x").unwrap_err();
        let err = PersistError::Deserialize {
            key: "n".into(),
            source,
        };
        assert_eq!(err.key(), "n");
        assert!(err.to_string().starts_with("cannot decode 'n'"));
    }
}
