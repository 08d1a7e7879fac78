use std::any::type_name;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Weak};

use census_types::{RegistryCensus, SortReport};
use tracing::{debug, trace};

use crate::census::RegistryStats;
use crate::chain::{Chain, SlotId};
use crate::cursor::{Cursor, Traversal};
use crate::lock::ChainLock;
use crate::node::NodeCell;
use crate::{TrackError, sort};

struct Shared<T> {
    chain: ChainLock<Chain<T>>,
    stats: Arc<RegistryStats>,
}

/// The set of currently tracked instances of `T`.
///
/// A `Registry` is a handle: clones refer to the same chain. Instances join
/// it through a [`Tracker`](crate::Tracker) and are visited in the order they
/// began tracking, unless the chain has been reordered with
/// [`sort_by`](Self::sort_by).
///
/// Every structural change takes the registry lock for one splice. An open
/// [`Traversal`] or [`Cursor`] holds the lock for its whole lifetime, so
/// other threads attaching, detaching or traversing block until it is
/// dropped. The thread holding the traversal may still attach and detach
/// instances; it may not sort.
pub struct Registry<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Registry<T> {
    /// A registry labelled with the name of `T`.
    pub fn new() -> Self {
        Self::named(type_name::<T>())
    }

    /// A registry with an explicit label, shown in census output.
    pub fn named(name: impl Into<String>) -> Self {
        let stats = Arc::new(RegistryStats::new(name.into(), type_name::<T>()));
        crate::census::enroll(&stats);
        debug!(registry = %stats.name(), ty = type_name::<T>(), "created registry");
        Self {
            shared: Arc::new(Shared {
                chain: ChainLock::new(Chain::new()),
                stats,
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.shared.stats.name()
    }

    /// Number of tracked instances.
    pub fn count(&self) -> usize {
        self.shared.stats.live()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Highest count observed so far.
    pub fn peak(&self) -> usize {
        self.shared.stats.peak()
    }

    /// Successful registrations since creation.
    pub fn total_tracked(&self) -> u64 {
        self.shared.stats.total_tracked()
    }

    pub fn census(&self) -> RegistryCensus {
        self.shared.stats.census()
    }

    /// True if both handles refer to the same chain.
    pub fn same_registry(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Opens a traversal, blocking until the lock is available.
    pub fn lock(&self) -> Traversal<'_, T> {
        Traversal::open(self, self.shared.chain.lock())
    }

    /// Opens a traversal if the lock is free or held by this thread.
    pub fn try_lock(&self) -> Option<Traversal<'_, T>> {
        let guard = self.shared.chain.try_lock()?;
        Some(Traversal::open(self, guard))
    }

    /// A cursor on the first instance, owning the lock until dropped.
    pub fn begin(&self) -> Cursor<'_, T> {
        Cursor::owning(self.lock())
    }

    /// The end sentinel. Comparison only; it holds no lock.
    pub fn end(&self) -> Cursor<'_, T> {
        Cursor::sentinel(self)
    }

    /// Clones every live instance out under a short lock hold.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.lock().iter().collect()
    }

    /// Visits every live instance under one lock hold.
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        let traversal = self.lock();
        for instance in traversal.iter() {
            f(&instance);
        }
    }

    /// Reorders the chain in place so that no instance compares `Less` than
    /// the one before it.
    ///
    /// Only links move; the instances stay where they are. Instances that are
    /// still being constructed or already being dropped keep their position
    /// relative to their neighbors. Ties keep their relative order.
    ///
    /// Fails with [`TrackError::TraversalOpen`] when called from a thread
    /// that has a traversal of this registry open.
    ///
    /// # Panics
    ///
    /// If `compare` touches this registry's chain: attaching or detaching
    /// instances, or opening a traversal through [`lock`](Self::lock),
    /// [`begin`](Self::begin), [`snapshot`](Self::snapshot) or
    /// [`for_each`](Self::for_each).
    pub fn sort_by<F>(&self, compare: F) -> Result<SortReport, TrackError>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let guard = self.shared.chain.lock();
        let (report, pins) = {
            let mut chain = guard.borrow_mut();
            if chain.traversals() > 0 {
                return Err(TrackError::TraversalOpen);
            }
            let pins = sort::Pins::collect(&chain);
            let report = sort::bubble(&mut chain, &pins, compare);
            (report, pins)
        };
        drop(guard);
        // Pins may hold the last reference to an instance whose drop detaches it.
        drop(pins);

        debug!(
            registry = %self.name(),
            len = report.len,
            passes = report.passes,
            swaps = report.swaps,
            "sorted registry"
        );
        Ok(report)
    }

    /// Like [`sort_by`](Self::sort_by), ordering by a derived key.
    pub fn sort_by_key<K, F>(&self, mut key: F) -> Result<SortReport, TrackError>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        self.sort_by(|a, b| key(a).cmp(&key(b)))
    }

    pub(crate) fn attach(
        &self,
        cell: &Arc<NodeCell<T>>,
        instance: &Weak<T>,
    ) -> Result<(), TrackError> {
        if Weak::ptr_eq(instance, &Weak::new()) {
            return Err(TrackError::NoInstance);
        }

        let guard = self.shared.chain.lock();
        let mut chain = guard.borrow_mut();
        if cell.slot().is_some() {
            return Err(TrackError::AlreadyTracking);
        }
        let slot = chain.push_back(Arc::clone(cell), instance.clone());
        let live = chain.live();
        self.shared.stats.record_attach(live);
        trace!(registry = %self.name(), slot = slot.index(), live, "began tracking");
        Ok(())
    }

    pub(crate) fn detach(&self, cell: &NodeCell<T>) -> Result<(), TrackError> {
        let guard = self.shared.chain.lock();
        let slot = cell.slot().ok_or(TrackError::NotTracking)?;
        self.detach_slot(&guard, slot)
            .map(drop)
            .ok_or(TrackError::NotTracking)
    }

    /// Detaches `slot` from a chain whose lock the caller already holds,
    /// returning the former owner.
    pub(crate) fn detach_slot(
        &self,
        chain: &RefCell<Chain<T>>,
        slot: SlotId,
    ) -> Option<Weak<T>> {
        let mut chain = chain.borrow_mut();
        let owner = chain.detach(slot)?;
        let live = chain.live();
        self.shared.stats.record_detach(live);
        trace!(registry = %self.name(), slot = slot.index(), live, "ended tracking");
        Some(owner)
    }
}

impl<T: Ord> Registry<T> {
    /// Sorts by the natural order of `T`. See [`sort_by`](Self::sort_by).
    pub fn sort(&self) -> Result<SortReport, TrackError> {
        self.sort_by(T::cmp)
    }
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name())
            .field("count", &self.count())
            .field("chain", &self.shared.chain)
            .finish()
    }
}
