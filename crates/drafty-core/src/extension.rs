//! Extension registry.
//!
//! An [`Extension`] is a named operation layered on top of a container. It
//! receives the live container and the caller's arguments and returns a
//! value (or `()`). Returned values are handed back to the caller as-is; an
//! extension that wants to change state calls `set`/`sketch`/`publish`
//! itself.
//!
//! Extensions are stored type-erased by name. [`Extended::call`] checks the
//! argument and output types against the registered ones and reports a
//! mismatch as [`Error::ExtensionSignature`].

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::rc::Rc;

use tracing::trace;

use crate::container::Container;
use crate::error::{Error, Result};
use crate::value::StateValue;

/// A named operation applied against a container.
pub trait Extension<S> {
    type Args;
    type Output;

    fn apply(&self, container: &Container<S>, args: Self::Args) -> Result<Self::Output>;
}

/// Extension backed by a closure. Build one with [`from_fn`].
pub struct FnExtension<F, A, R> {
    f: F,
    _signature: PhantomData<fn(A) -> R>,
}

impl<F, A, R> fmt::Debug for FnExtension<F, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExtension")
            .field("args", &type_name::<A>())
            .field("output", &type_name::<R>())
            .finish_non_exhaustive()
    }
}

/// Wrap a closure as an [`Extension`].
pub fn from_fn<S, A, R, F>(f: F) -> FnExtension<F, A, R>
where
    F: Fn(&Container<S>, A) -> Result<R>,
{
    FnExtension {
        f,
        _signature: PhantomData,
    }
}

impl<S, A, R, F> Extension<S> for FnExtension<F, A, R>
where
    F: Fn(&Container<S>, A) -> Result<R>,
{
    type Args = A;
    type Output = R;

    fn apply(&self, container: &Container<S>, args: A) -> Result<R> {
        (self.f)(container, args)
    }
}

/// Object-safe view of an extension with its types erased.
trait ErasedExtension<S> {
    fn args_type(&self) -> &'static str;
    fn output_type(&self) -> &'static str;
    fn accepts(&self, args: &dyn Any) -> bool;
    fn call(&self, container: &Container<S>, args: Box<dyn Any>) -> Result<Box<dyn Any>>;
}

impl<S, E> ErasedExtension<S> for E
where
    E: Extension<S>,
    E::Args: 'static,
    E::Output: 'static,
{
    fn args_type(&self) -> &'static str {
        type_name::<E::Args>()
    }

    fn output_type(&self) -> &'static str {
        type_name::<E::Output>()
    }

    fn accepts(&self, args: &dyn Any) -> bool {
        args.is::<E::Args>()
    }

    fn call(&self, container: &Container<S>, args: Box<dyn Any>) -> Result<Box<dyn Any>> {
        // `Extended::call` checks `accepts` first.
        let args = args.downcast::<E::Args>().map_err(|_| Error::ExtensionSignature {
            name: String::new(),
            expected: self.args_type(),
            found: "a different argument type",
        })?;
        let output = self.apply(container, *args)?;
        Ok(Box::new(output))
    }
}

/// Named extensions to attach with [`Container::extend`].
pub struct Extensions<S> {
    entries: BTreeMap<String, Rc<dyn ErasedExtension<S>>>,
}

impl<S> Default for Extensions<S> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<S> fmt::Debug for Extensions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl<S> Extensions<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `extension` under `name`, replacing any previous entry.
    #[must_use]
    pub fn with<E>(mut self, name: impl Into<String>, extension: E) -> Self
    where
        S: 'static,
        E: Extension<S> + 'static,
        E::Args: 'static,
        E::Output: 'static,
    {
        self.entries.insert(name.into(), Rc::new(extension));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A container handle with extensions attached.
///
/// Dereferences to the base [`Container`], so every base operation stays
/// available. Cloning shares both the container and the extension table.
pub struct Extended<S> {
    container: Container<S>,
    extensions: Rc<Extensions<S>>,
}

impl<S> Clone for Extended<S> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            extensions: Rc::clone(&self.extensions),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Extended<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extended")
            .field("container", &self.container)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl<S> Deref for Extended<S> {
    type Target = Container<S>;

    fn deref(&self) -> &Container<S> {
        &self.container
    }
}

impl<S: StateValue> Extended<S> {
    pub(crate) fn new(container: Container<S>, extensions: Extensions<S>) -> Self {
        Self {
            container,
            extensions: Rc::new(extensions),
        }
    }

    /// The base container.
    #[must_use]
    pub fn container(&self) -> &Container<S> {
        &self.container
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.extensions.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.extensions.entries.contains_key(name)
    }

    /// Layer more extensions on top. Names in `more` shadow existing ones.
    #[must_use]
    pub fn extend(&self, more: Extensions<S>) -> Self {
        let mut entries = self.extensions.entries.clone();
        entries.extend(more.entries);
        Self {
            container: self.container.clone(),
            extensions: Rc::new(Extensions { entries }),
        }
    }

    /// Invoke the extension registered as `name`.
    pub fn call<A: 'static, R: 'static>(&self, name: &str, args: A) -> Result<R> {
        let extension = self
            .extensions
            .entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownExtension {
                name: name.to_string(),
            })?;

        if !extension.accepts(&args) {
            return Err(Error::ExtensionSignature {
                name: name.to_string(),
                expected: extension.args_type(),
                found: type_name::<A>(),
            });
        }

        trace!(label = self.container.label(), extension = name, "extension call");
        let output = extension.call(&self.container, Box::new(args))?;
        output
            .downcast::<R>()
            .map(|boxed| *boxed)
            .map_err(|_| Error::ExtensionSignature {
                name: name.to_string(),
                expected: extension.output_type(),
                found: type_name::<R>(),
            })
    }
}
