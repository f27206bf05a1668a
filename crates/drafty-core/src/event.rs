#![forbid(unsafe_code)]

//! Lifecycle events, broadcast targets and per-call options.

use std::fmt;

/// Lifecycle event delivered to every [`Middleware`](crate::Middleware).
///
/// Every mutating operation emits a `Before*`/`After*` pair. `Init` is only
/// sent once, to the middlewares added by a single `use_middlewares` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    Init,
    BeforeSet,
    AfterSet,
    BeforeSketch,
    AfterSketch,
    BeforePublish,
    AfterPublish,
    BeforeDiscard,
    AfterDiscard,
    BeforeBroadcastNow,
    AfterBroadcastNow,
    BeforeBroadcastDraft,
    AfterBroadcastDraft,
}

impl EventType {
    /// Wire name, e.g. `"before:broadcast:now"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::BeforeSet => "before:set",
            Self::AfterSet => "after:set",
            Self::BeforeSketch => "before:sketch",
            Self::AfterSketch => "after:sketch",
            Self::BeforePublish => "before:publish",
            Self::AfterPublish => "after:publish",
            Self::BeforeDiscard => "before:discard",
            Self::AfterDiscard => "after:discard",
            Self::BeforeBroadcastNow => "before:broadcast:now",
            Self::AfterBroadcastNow => "after:broadcast:now",
            Self::BeforeBroadcastDraft => "before:broadcast:draft",
            Self::AfterBroadcastDraft => "after:broadcast:draft",
        }
    }

    #[must_use]
    pub const fn is_before(self) -> bool {
        matches!(
            self,
            Self::BeforeSet
                | Self::BeforeSketch
                | Self::BeforePublish
                | Self::BeforeDiscard
                | Self::BeforeBroadcastNow
                | Self::BeforeBroadcastDraft
        )
    }

    #[must_use]
    pub const fn is_after(self) -> bool {
        !matches!(self, Self::Init) && !self.is_before()
    }

    /// Whether this event brackets a subscriber broadcast.
    #[must_use]
    pub const fn is_broadcast(self) -> bool {
        matches!(
            self,
            Self::BeforeBroadcastNow
                | Self::AfterBroadcastNow
                | Self::BeforeBroadcastDraft
                | Self::AfterBroadcastDraft
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which subscriber list a registration or broadcast refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Target {
    /// The committed value.
    #[default]
    Now,
    /// The pending draft.
    Draft,
}

impl Target {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Draft => "draft",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call options for the mutating operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Skip the subscriber broadcast and its `broadcast:*` events. State is
    /// still mutated and the operation's own events still fire.
    pub silent: bool,
}

impl Options {
    /// Options with `silent` set.
    #[must_use]
    pub const fn silent() -> Self {
        Self { silent: true }
    }

    #[must_use]
    pub const fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }
}
