use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::error::ActivityError;

use super::registry::{ListenerId, ListenerRegistry, SharedRegistry};
use super::{ActivityKind, ActivitySignal};

/// How often the timer records activity on its own.
pub const ACTIVITY_TICK_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct ActivityTracker {
    registry: SharedRegistry,
}

impl ActivityTracker {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Forward an input event to whatever listeners are installed.
    pub fn dispatch(&self, kind: ActivityKind) -> usize {
        ListenerRegistry::lock(&self.registry).dispatch(kind)
    }

    /// Install one listener per tracked kind and start the timer.
    ///
    /// Must be called from within a tokio runtime. If the timer cannot be
    /// started, the listeners already installed are removed before the error
    /// is returned.
    pub fn start(&self) -> Result<(ActivityGuard, UnboundedReceiver<ActivitySignal>), ActivityError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut guard = ActivityGuard {
            registry: self.registry.clone(),
            listener_ids: Vec::with_capacity(ActivityKind::ALL.len()),
            timer: None,
        };

        {
            let mut registry = ListenerRegistry::lock(&self.registry);
            for kind in ActivityKind::ALL {
                guard.listener_ids.push(registry.add(kind, tx.clone()));
            }
        }

        let handle = Handle::try_current().map_err(|e| ActivityError::NoRuntime(e.to_string()))?;
        let period = ACTIVITY_TICK_INTERVAL;
        guard.timer = Some(handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(ActivitySignal::Tick).is_err() {
                    break;
                }
            }
        }));

        debug!(
            listeners = guard.listener_ids.len(),
            interval_secs = period.as_secs(),
            "Activity tracking started"
        );
        Ok((guard, rx))
    }
}

/// Live activity tracking. Dropping it removes the listeners and stops the
/// timer.
pub struct ActivityGuard {
    registry: SharedRegistry,
    listener_ids: Vec<ListenerId>,
    timer: Option<JoinHandle<()>>,
}

impl ActivityGuard {
    pub fn listener_count(&self) -> usize {
        self.listener_ids.len()
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        {
            let mut registry = ListenerRegistry::lock(&self.registry);
            for id in self.listener_ids.drain(..) {
                registry.remove(id);
            }
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        debug!("Activity tracking stopped");
    }
}
