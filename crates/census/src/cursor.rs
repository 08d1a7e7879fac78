//! Traversal of a registry under its lock.
//!
//! [`Traversal`] is the explicit form: the lock is held from
//! [`Registry::lock`] until the guard is dropped. [`Cursor`] steps through
//! the chain one link at a time and can remove the instance it is visiting
//! without losing its place. [`Iter`] adapts a cursor to `Iterator`.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::Registry;
use crate::chain::{Chain, SlotId};
use crate::lock::ChainGuard;

/// An open traversal of a registry.
///
/// Holds the registry lock until dropped. While it is open, other threads
/// block on every operation that touches the chain. The owning thread may
/// still attach and detach instances: detached ones are skipped by every
/// cursor and unlinked once the last traversal closes.
pub struct Traversal<'a, T> {
    registry: &'a Registry<T>,
    guard: ChainGuard<'a, Chain<T>>,
}

impl<'a, T> Traversal<'a, T> {
    pub(crate) fn open(registry: &'a Registry<T>, guard: ChainGuard<'a, Chain<T>>) -> Self {
        guard.borrow_mut().open_traversal();
        Self { registry, guard }
    }

    /// Tracked nodes in the registry.
    ///
    /// An upper bound on what [`iter`](Self::iter) yields: nodes whose
    /// instance is still being constructed, or is being dropped on another
    /// thread that waits for this lock, are counted but not visited.
    pub fn len(&self) -> usize {
        self.guard.borrow().live()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn registry(&self) -> &'a Registry<T> {
        self.registry
    }

    /// A cursor on the first instance, borrowing this traversal's lock.
    pub fn cursor(&self) -> Cursor<'_, T> {
        Cursor::borrowing(self)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.cursor())
    }

    fn chain(&self) -> &RefCell<Chain<T>> {
        &self.guard
    }
}

impl<T> Drop for Traversal<'_, T> {
    fn drop(&mut self) {
        let purged = self.guard.borrow_mut().close_traversal();
        if purged > 0 {
            debug!(registry = %self.registry.name(), purged, "unlinked detached links");
        }
    }
}

impl<T> fmt::Debug for Traversal<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traversal")
            .field("registry", &self.registry.name())
            .field("len", &self.len())
            .finish()
    }
}

impl<'a, T> IntoIterator for &'a Traversal<'_, T> {
    type Item = Arc<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

enum Lease<'a, T> {
    Owned(Traversal<'a, T>),
    Borrowed(&'a Traversal<'a, T>),
    Sentinel,
}

/// Where a cursor stands.
///
/// `At` is the visited link. `Removed` records the successor captured when
/// the visited link was removed, so the next step does not read through the
/// removed link. `End` is one past the tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    At(SlotId),
    Removed { next: Option<SlotId> },
    End,
}

/// A position in a registry's chain.
///
/// Cursors from [`Registry::begin`] own the registry lock until dropped;
/// cursors from [`Traversal::cursor`] borrow it. [`Registry::end`] returns a
/// sentinel that holds no lock and only serves for comparison.
///
/// ```rust
/// use std::sync::{Arc, Weak};
/// use census::{Registry, Tracker};
///
/// struct Job {
///     done: bool,
///     tracker: Tracker<Job>,
/// }
///
/// let jobs = Registry::named("jobs");
/// let job = |done| Arc::new_cyclic(|me: &Weak<Job>| Job { done, tracker: Tracker::new_in(&jobs, me) });
/// let all = [job(false), job(true), job(false)];
///
/// let mut cursor = jobs.begin();
/// while cursor != jobs.end() {
///     if cursor.get().is_some_and(|job| job.done) {
///         cursor.remove_current();
///     }
///     cursor.move_next();
/// }
/// drop(cursor);
///
/// assert_eq!(jobs.count(), 2);
/// assert!(!all[1].tracker.is_tracking());
/// ```
pub struct Cursor<'a, T> {
    registry: &'a Registry<T>,
    lease: Lease<'a, T>,
    position: Position,
}

impl<'a, T> Cursor<'a, T> {
    pub(crate) fn owning(traversal: Traversal<'a, T>) -> Self {
        let registry = traversal.registry;
        let mut cursor = Self {
            registry,
            lease: Lease::Owned(traversal),
            position: Position::End,
        };
        cursor.position = cursor.first();
        cursor
    }

    pub(crate) fn borrowing(traversal: &'a Traversal<'a, T>) -> Self {
        let mut cursor = Self {
            registry: traversal.registry,
            lease: Lease::Borrowed(traversal),
            position: Position::End,
        };
        cursor.position = cursor.first();
        cursor
    }

    pub(crate) fn sentinel(registry: &'a Registry<T>) -> Self {
        Self {
            registry,
            lease: Lease::Sentinel,
            position: Position::End,
        }
    }

    fn chain(&self) -> Option<&RefCell<Chain<T>>> {
        match &self.lease {
            Lease::Owned(traversal) => Some(traversal.chain()),
            Lease::Borrowed(traversal) => Some(traversal.chain()),
            Lease::Sentinel => None,
        }
    }

    fn first(&self) -> Position {
        let Some(chain) = self.chain() else {
            return Position::End;
        };
        let chain = chain.borrow();
        chain.next_live(chain.head()).map_or(Position::End, Position::At)
    }

    fn current(&self) -> Option<SlotId> {
        match self.position {
            Position::At(slot) => Some(slot),
            Position::Removed { .. } | Position::End => None,
        }
    }

    /// True if this cursor holds the registry lock.
    pub fn owns_lock(&self) -> bool {
        matches!(self.lease, Lease::Owned(_))
    }

    /// True once the cursor has stepped past the tail.
    pub fn is_end(&self) -> bool {
        self.position == Position::End
    }

    /// The instance being visited.
    ///
    /// `None` at the end, right after [`remove_current`](Self::remove_current),
    /// and when the visited instance is being constructed or dropped.
    pub fn get(&self) -> Option<Arc<T>> {
        let slot = self.current()?;
        let owner = {
            let chain = self.chain()?.borrow();
            let link = chain.link(slot).filter(|link| !link.detached)?;
            link.node.owner()
        };
        owner.upgrade()
    }

    /// True if the cursor is visiting `instance`.
    pub fn points_to(&self, instance: &T) -> bool {
        let Some(slot) = self.current() else {
            return false;
        };
        let Some(chain) = self.chain() else {
            return false;
        };
        let chain = chain.borrow();
        chain
            .link(slot)
            .filter(|link| !link.detached)
            .is_some_and(|link| std::ptr::eq(link.node.owner().as_ptr(), instance))
    }

    /// Steps to the next attached link.
    ///
    /// Stepping an end cursor is a caller error: it asserts in debug builds and
    /// leaves the cursor at the end otherwise.
    pub fn move_next(&mut self) {
        let next = match (self.position, self.chain()) {
            (Position::End, _) | (_, None) => {
                debug_assert!(false, "advanced a cursor past the end of its registry");
                Position::End
            }
            (Position::At(slot), Some(chain)) => {
                let chain = chain.borrow();
                chain
                    .next_live(chain.next_of(slot))
                    .map_or(Position::End, Position::At)
            }
            (Position::Removed { next }, Some(chain)) => chain
                .borrow()
                .next_live(next)
                .map_or(Position::End, Position::At),
        };
        self.position = next;
    }

    /// Removes the visited instance from the registry and returns it.
    ///
    /// The cursor keeps the successor, so the next [`move_next`](Self::move_next)
    /// continues with the rest of the chain. Returns `None` if there is nothing
    /// to remove. The instance itself is returned only if still alive.
    pub fn remove_current(&mut self) -> Option<Arc<T>> {
        let slot = self.current()?;
        let (owner, next) = {
            let chain = self.chain()?;
            let next = chain.borrow().next_of(slot);
            (self.registry.detach_slot(chain, slot)?, next)
        };
        self.position = Position::Removed { next };
        owner.upgrade()
    }

    pub fn registry(&self) -> &'a Registry<T> {
        self.registry
    }
}

impl<T> PartialEq for Cursor<'_, T> {
    /// Cursors are equal when they visit the same link. Every cursor that is
    /// not visiting a link equals the end sentinel.
    fn eq(&self, other: &Self) -> bool {
        match (self.current(), other.current()) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b && self.registry.same_registry(other.registry),
            _ => false,
        }
    }
}

impl<T> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("registry", &self.registry.name())
            .field("position", &self.position)
            .field("owns_lock", &self.owns_lock())
            .finish()
    }
}

impl<'a, T> IntoIterator for Cursor<'a, T> {
    type Item = Arc<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        Iter::new(self)
    }
}

/// Iterator over live instances, in chain order.
///
/// Instances that are being constructed or dropped are skipped. The cursor
/// steps past a yielded instance only when the next one is requested, so
/// instances registered by the loop body are still reached.
pub struct Iter<'a, T> {
    cursor: Cursor<'a, T>,
    yielded: bool,
}

impl<'a, T> Iter<'a, T> {
    fn new(cursor: Cursor<'a, T>) -> Self {
        Self {
            cursor,
            yielded: false,
        }
    }
}

impl<T> Iterator for Iter<'_, T> {
    type Item = Arc<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if std::mem::take(&mut self.yielded) {
                self.cursor.move_next();
            }
            match self.cursor.position {
                Position::End => return None,
                Position::Removed { .. } => self.cursor.move_next(),
                Position::At(_) => {
                    self.yielded = true;
                    if let Some(instance) = self.cursor.get() {
                        return Some(instance);
                    }
                }
            }
        }
    }
}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.cursor).finish()
    }
}
