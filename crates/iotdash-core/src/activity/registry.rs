use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use super::{ActivityKind, ActivitySignal};

/// Registry shared between the input dispatcher and the guards that
/// unregister on drop.
pub type SharedRegistry = Arc<Mutex<ListenerRegistry>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    kind: ActivityKind,
    tx: UnboundedSender<ActivitySignal>,
}

/// Input listeners keyed by id, each interested in one `ActivityKind`.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: HashMap<ListenerId, Listener>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Lock a shared registry. A panic while holding the lock cannot leave
    /// the map half-updated, so poisoning is ignored.
    pub fn lock(registry: &SharedRegistry) -> MutexGuard<'_, ListenerRegistry> {
        registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&mut self, kind: ActivityKind, tx: UnboundedSender<ActivitySignal>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, Listener { kind, tx });
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Deliver an input event to every listener for its kind. Returns how
    /// many listeners received it.
    pub fn dispatch(&self, kind: ActivityKind) -> usize {
        let delivered = self
            .listeners
            .values()
            .filter(|l| l.kind == kind)
            .filter(|l| l.tx.send(ActivitySignal::Input(kind)).is_ok())
            .count();
        trace!(kind = kind.name(), delivered, "Dispatched input event");
        delivered
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn count_for(&self, kind: ActivityKind) -> usize {
        self.listeners.values().filter(|l| l.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_dispatch_reaches_matching_kind_only() {
        let mut registry = ListenerRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add(ActivityKind::KeyPress, tx.clone());
        registry.add(ActivityKind::Click, tx);

        assert_eq!(registry.dispatch(ActivityKind::KeyPress), 1);
        assert_eq!(registry.dispatch(ActivityKind::Scroll), 0);
        assert_eq!(rx.try_recv().unwrap(), ActivitySignal::Input(ActivityKind::KeyPress));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_remove_listener() {
        let mut registry = ListenerRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.add(ActivityKind::Scroll, tx);

        assert_eq!(registry.count_for(ActivityKind::Scroll), 1);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_closed_receiver_is_not_counted() {
        let mut registry = ListenerRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.add(ActivityKind::Click, tx);
        drop(rx);
        assert_eq!(registry.dispatch(ActivityKind::Click), 0);
    }
}
