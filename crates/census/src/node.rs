//! The tracking node embedded in every tracked instance.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::chain::SlotId;
use crate::{Registry, TrackError, Tracked};

struct NodeState<T> {
    slot: Option<SlotId>,
    owner: Weak<T>,
}

/// Node state shared between a [`Tracker`] and its chain link.
///
/// Written only while the owning registry's chain is borrowed, so `slot` and
/// `owner` always agree with the chain. Reads need no registry lock.
pub(crate) struct NodeCell<T> {
    state: Mutex<NodeState<T>>,
}

impl<T> NodeCell<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(NodeState {
                slot: None,
                owner: Weak::new(),
            }),
        }
    }

    pub(crate) fn attach(&self, slot: SlotId, owner: Weak<T>) {
        let mut state = self.state.lock();
        state.slot = Some(slot);
        state.owner = owner;
    }

    /// Returns the node to idle, handing back the former owner.
    pub(crate) fn reset(&self) -> Weak<T> {
        let mut state = self.state.lock();
        state.slot = None;
        std::mem::take(&mut state.owner)
    }

    pub(crate) fn slot(&self) -> Option<SlotId> {
        self.state.lock().slot
    }

    pub(crate) fn owner(&self) -> Weak<T> {
        self.state.lock().owner.clone()
    }
}

/// Links an instance of `T` into a [`Registry`] for as long as it is tracked.
///
/// A tracker is meant to be a field of the value it tracks. The value lives in
/// an `Arc`, and the tracker refers back to it through a `Weak`, which is most
/// easily obtained with [`Arc::new_cyclic`]:
///
/// ```rust
/// use std::sync::{Arc, Weak};
/// use census::{Registry, Tracker};
///
/// struct Session {
///     user: String,
///     tracker: Tracker<Session>,
/// }
///
/// let sessions = Registry::named("sessions");
/// let session = Arc::new_cyclic(|me: &Weak<Session>| Session {
///     user: "amos".to_string(),
///     tracker: Tracker::new_in(&sessions, me),
/// });
///
/// assert!(session.tracker.is_tracking());
/// assert_eq!(sessions.count(), 1);
/// drop(session);
/// assert_eq!(sessions.count(), 0);
/// ```
///
/// Dropping the tracker (and therefore the value) ends tracking.
pub struct Tracker<T> {
    registry: Registry<T>,
    cell: Arc<NodeCell<T>>,
}

impl<T: Tracked> Tracker<T> {
    /// Tracks `instance` in the default registry of `T`.
    ///
    /// A dangling `instance` leaves the tracker idle.
    pub fn new(instance: &Weak<T>) -> Self {
        Self::new_in(&T::registry(), instance)
    }

    /// An idle tracker bound to the default registry of `T`.
    pub fn idle() -> Self {
        Self::idle_in(&T::registry())
    }
}

impl<T> Tracker<T> {
    /// Tracks `instance` in `registry`.
    ///
    /// A dangling `instance` leaves the tracker idle.
    pub fn new_in(registry: &Registry<T>, instance: &Weak<T>) -> Self {
        let tracker = Self::idle_in(registry);
        let _ = tracker.begin_tracking(instance);
        tracker
    }

    /// An idle tracker bound to `registry`.
    pub fn idle_in(registry: &Registry<T>) -> Self {
        Self {
            registry: registry.clone(),
            cell: Arc::new(NodeCell::new()),
        }
    }

    /// Appends `instance` at the tail of the registry.
    ///
    /// Fails with [`TrackError::AlreadyTracking`] if this tracker is linked
    /// already, and with [`TrackError::NoInstance`] if `instance` is dangling.
    pub fn begin_tracking(&self, instance: &Weak<T>) -> Result<(), TrackError> {
        if self.is_tracking() {
            return Err(TrackError::AlreadyTracking);
        }
        self.registry.attach(&self.cell, instance)
    }

    /// Splices this tracker out of the registry.
    pub fn end_tracking(&self) -> Result<(), TrackError> {
        if !self.is_tracking() {
            return Err(TrackError::NotTracking);
        }
        self.registry.detach(&self.cell)
    }

    pub fn is_tracking(&self) -> bool {
        self.cell.slot().is_some()
    }

    /// The tracked instance, if tracking and still alive.
    pub fn tracked_instance(&self) -> Option<Arc<T>> {
        self.cell.owner().upgrade()
    }

    pub fn registry(&self) -> &Registry<T> {
        &self.registry
    }
}

impl<T> Drop for Tracker<T> {
    fn drop(&mut self) {
        let _ = self.end_tracking();
    }
}

impl<T> fmt::Debug for Tracker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("registry", &self.registry.name())
            .field("tracking", &self.is_tracking())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        id: u32,
        tracker: Tracker<Probe>,
    }

    fn probe(registry: &Registry<Probe>, id: u32) -> Arc<Probe> {
        Arc::new_cyclic(|me| Probe {
            id,
            tracker: Tracker::new_in(registry, me),
        })
    }

    #[test]
    fn constructed_tracker_is_tracking() {
        let registry = Registry::named("node.tests.constructed");
        let p = probe(&registry, 7);
        assert!(p.tracker.is_tracking());
        assert_eq!(p.tracker.tracked_instance().map(|i| i.id), Some(7));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn begin_tracking_twice_is_refused() {
        let registry = Registry::named("node.tests.twice");
        let p = probe(&registry, 1);
        let weak = Arc::downgrade(&p);
        assert_eq!(
            p.tracker.begin_tracking(&weak),
            Err(TrackError::AlreadyTracking)
        );
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn end_tracking_on_idle_is_refused() {
        let registry = Registry::named("node.tests.idle");
        let p = probe(&registry, 1);
        assert_eq!(p.tracker.end_tracking(), Ok(()));
        assert!(!p.tracker.is_tracking());
        assert!(p.tracker.tracked_instance().is_none());
        assert_eq!(p.tracker.end_tracking(), Err(TrackError::NotTracking));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn dangling_instance_leaves_tracker_idle() {
        let registry = Registry::<Probe>::named("node.tests.dangling");
        let tracker = Tracker::new_in(&registry, &Weak::new());
        assert!(!tracker.is_tracking());
        assert_eq!(
            tracker.begin_tracking(&Weak::new()),
            Err(TrackError::NoInstance)
        );
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn idle_tracker_attaches_later() {
        let registry = Registry::named("node.tests.late");
        let p = Arc::new(Probe {
            id: 3,
            tracker: Tracker::idle_in(&registry),
        });
        assert!(!p.tracker.is_tracking());
        p.tracker
            .begin_tracking(&Arc::downgrade(&p))
            .expect("idle tracker should attach");
        assert_eq!(registry.count(), 1);
        assert_eq!(p.tracker.tracked_instance().map(|i| i.id), Some(3));
    }

    #[test]
    fn dropping_the_instance_ends_tracking() {
        let registry = Registry::named("node.tests.drop");
        let a = probe(&registry, 1);
        let b = probe(&registry, 2);
        drop(a);
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.snapshot().iter().map(|p| p.id).collect::<Vec<_>>(), [2]);
        drop(b);
        assert!(registry.is_empty());
    }
}
