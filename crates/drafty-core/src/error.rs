//! Error type shared by the container and its collaborators.
//!
//! The engine never produces an error on its own. Errors enter through
//! middlewares and extensions and propagate unchanged to the caller of the
//! operation that triggered them.

use std::fmt;

use crate::diagnostic::Diagnostic;

/// Errors surfaced by container operations.
#[derive(Debug)]
pub enum Error {
    /// An environment the caller depends on is unavailable.
    Fatal(Box<Diagnostic>),
    /// `Extended::call` was given a name nobody registered.
    UnknownExtension { name: String },
    /// An extension was called with argument or return types that differ
    /// from the ones it was registered with.
    ExtensionSignature {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    /// Error raised by a middleware, extension or other collaborator.
    External(Box<dyn std::error::Error + 'static>),
}

impl Error {
    /// Wrap a collaborator error.
    pub fn external(err: impl std::error::Error + 'static) -> Self {
        Self::External(Box::new(err))
    }

    /// The diagnostic, for `Fatal` errors.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Fatal(diag) => Some(diag),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal(diag) => write!(f, "{diag}"),
            Self::UnknownExtension { name } => write!(f, "unknown extension '{name}'"),
            Self::ExtensionSignature {
                name,
                expected,
                found,
            } => write!(
                f,
                "extension '{name}' expects {expected}, called with {found}"
            ),
            Self::External(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::External(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<Diagnostic> for Error {
    fn from(diag: Diagnostic) -> Self {
        Self::Fatal(Box::new(diag))
    }
}

/// Result alias for container operations.
pub type Result<T> = std::result::Result<T, Error>;
