#![forbid(unsafe_code)]

//! Equality oracle and value cloner.
//!
//! Both roles are type-level: structural equality is `PartialEq` and the
//! detached copy handed to mutator closures is `Clone`. Deriving both on a
//! state type gives deep comparison and deep copies of every nested field.
//!
//! Associative collections (`HashMap`, `BTreeMap`) and uniqueness collections
//! (`HashSet`, `BTreeSet`) go through their own `Clone` impls, so a clone keeps
//! its concrete collection type and hasher.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Aliased clone | `Rc<RefCell<_>>` inside state | Mutator can reach stored value |
//! | Never-equal value | `f64::NAN` inside state | Every write broadcasts |
//! | Cyclic value | Self-referencing `Rc` graph | Not supported |

/// A value that can live inside a [`Container`](crate::Container).
///
/// Implemented for every `Clone + PartialEq + 'static` type.
pub trait StateValue: Clone + PartialEq + 'static {}

impl<T: Clone + PartialEq + 'static> StateValue for T {}

/// Structural equality used to gate broadcasts.
#[inline]
#[must_use]
pub fn equal<S: StateValue>(a: &S, b: &S) -> bool {
    a == b
}

/// Equality over optional drafts. Two absent drafts are equal; an absent and
/// a present draft never are.
#[must_use]
pub fn equal_draft<S: StateValue>(a: Option<&S>, b: Option<&S>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Independent copy of `value`, safe to hand to a mutator.
#[inline]
#[must_use]
pub fn detached<S: StateValue>(value: &S) -> S {
    value.clone()
}
