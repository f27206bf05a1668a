//! Middleware pipeline.
//!
//! A middleware is a strategy object notified of every [`EventType`] a
//! container emits. It receives the live container handle and may call any
//! container operation, including mutating ones; nested calls emit their own
//! events through the same pipeline.
//!
//! # Invariants
//!
//! 1. Middlewares run synchronously, in registration order.
//! 2. `Init` reaches only the middlewares added by the call that registered
//!    them.
//! 3. The first error aborts the dispatch; later middlewares do not see the
//!    event and the error reaches the caller unchanged.

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::container::Container;
use crate::error::Result;
use crate::event::EventType;

/// Interceptor invoked around every mutating operation.
pub trait Middleware<S> {
    /// Name used in log fields.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Handle one lifecycle event.
    fn on_event(&self, event: EventType, container: &Container<S>) -> Result<()>;
}

/// Middleware backed by a closure. Build one with [`from_fn`].
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

impl<F> FnMiddleware<F> {
    /// Replace the default name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Wrap a closure as a [`Middleware`].
pub fn from_fn<S, F>(f: F) -> FnMiddleware<F>
where
    F: Fn(EventType, &Container<S>) -> Result<()>,
{
    FnMiddleware {
        name: "fn".to_string(),
        f,
    }
}

impl<S, F> Middleware<S> for FnMiddleware<F>
where
    F: Fn(EventType, &Container<S>) -> Result<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, event: EventType, container: &Container<S>) -> Result<()> {
        (self.f)(event, container)
    }
}

/// Deliver `event` to each middleware in order.
pub(crate) fn dispatch<S>(
    middlewares: &[Rc<dyn Middleware<S>>],
    event: EventType,
    container: &Container<S>,
) -> Result<()> {
    for middleware in middlewares {
        trace!(middleware = middleware.name(), %event, "dispatch");
        middleware.on_event(event, container)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Tagged(&'static str, Rc<RefCell<Vec<&'static str>>>);

    impl Middleware<i32> for Tagged {
        fn name(&self) -> &str {
            self.0
        }

        fn on_event(&self, _: EventType, _: &Container<i32>) -> Result<()> {
            self.1.borrow_mut().push(self.0);
            Ok(())
        }
    }

    #[test]
    fn dispatch_runs_in_registration_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let chain: Vec<Rc<dyn Middleware<i32>>> = vec![
            Rc::new(Tagged("a", Rc::clone(&seen))),
            Rc::new(Tagged("b", Rc::clone(&seen))),
        ];
        dispatch(&chain, EventType::BeforeSet, &Container::new(0)).unwrap();
        assert_eq!(*seen.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn first_error_stops_dispatch() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let failing = from_fn(|_: EventType, _: &Container<i32>| {
            Err(crate::Error::UnknownExtension {
                name: "stop".into(),
            })
        });
        let chain: Vec<Rc<dyn Middleware<i32>>> =
            vec![Rc::new(failing), Rc::new(Tagged("late", Rc::clone(&seen)))];
        assert!(dispatch(&chain, EventType::AfterSet, &Container::new(0)).is_err());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn fn_middleware_names() {
        let mw = from_fn(|_: EventType, _: &Container<i32>| Ok(()));
        assert_eq!(Middleware::<i32>::name(&mw), "fn");
        let mw = mw.named("audit");
        assert_eq!(Middleware::<i32>::name(&mw), "audit");
        assert!(format!("{mw:?}").contains("audit"));
    }
}
