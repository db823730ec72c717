//! Activity tracking for the signed-in user.
//!
//! While a user is signed in, a listener for every tracked interaction kind
//! sits in the `ListenerRegistry`, and a timer fires every five minutes.
//! Both deliver `ActivitySignal`s on a channel; the owner of the
//! `SessionManager` drains it and calls `update_last_activity()`, so all
//! mutations stay on one logical thread.
//!
//! `ActivityTracker::start` hands back an `ActivityGuard`. Dropping the
//! guard unregisters every listener and stops the timer.

pub mod registry;
pub mod tracker;

pub use registry::{ListenerId, ListenerRegistry, SharedRegistry};
pub use tracker::{ActivityGuard, ActivityTracker, ACTIVITY_TICK_INTERVAL};

/// Interaction kinds that count as user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 6] = [
        ActivityKind::PointerDown,
        ActivityKind::PointerMove,
        ActivityKind::KeyPress,
        ActivityKind::Scroll,
        ActivityKind::TouchStart,
        ActivityKind::Click,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActivityKind::PointerDown => "pointer-down",
            ActivityKind::PointerMove => "pointer-move",
            ActivityKind::KeyPress => "key-press",
            ActivityKind::Scroll => "scroll",
            ActivityKind::TouchStart => "touch-start",
            ActivityKind::Click => "click",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivitySignal {
    Input(ActivityKind),
    /// Periodic timer fired.
    Tick,
}
