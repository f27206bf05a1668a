//! Input accepted by `set` and `sketch`.

use std::fmt;

/// Either a replacement value or a transform of the previous value.
///
/// Transforms receive an owned clone of the base value, so they can mutate
/// freely without touching container storage.
pub enum Update<'a, S> {
    Replace(S),
    Transform(Box<dyn FnOnce(S) -> S + 'a>),
}

impl<'a, S> Update<'a, S> {
    /// Build a transform.
    pub fn with(f: impl FnOnce(S) -> S + 'a) -> Self {
        Self::Transform(Box::new(f))
    }

    /// Compute the candidate value. `base` is only called for transforms.
    pub(crate) fn resolve(self, base: impl FnOnce() -> S) -> S {
        match self {
            Self::Replace(value) => value,
            Self::Transform(f) => f(base()),
        }
    }
}

impl<S> From<S> for Update<'_, S> {
    fn from(value: S) -> Self {
        Self::Replace(value)
    }
}

impl<S: fmt::Debug> fmt::Debug for Update<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Self::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}
