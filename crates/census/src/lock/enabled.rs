use std::cell::RefCell;
use std::fmt;

pub(crate) type ChainGuard<'a, C> = parking_lot::ReentrantMutexGuard<'a, RefCell<C>>;

/// Reentrant lock around a chain.
pub(crate) struct ChainLock<C>(parking_lot::ReentrantMutex<RefCell<C>>);

impl<C> ChainLock<C> {
    #[inline]
    pub(crate) fn new(chain: C) -> Self {
        Self(parking_lot::ReentrantMutex::new(RefCell::new(chain)))
    }

    /// Blocks until the lock is free or already held by this thread.
    #[inline]
    pub(crate) fn lock(&self) -> ChainGuard<'_, C> {
        self.0.lock()
    }

    #[inline]
    pub(crate) fn try_lock(&self) -> Option<ChainGuard<'_, C>> {
        self.0.try_lock()
    }
}

impl<C> fmt::Debug for ChainLock<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainLock")
            .field("locked", &self.0.is_locked())
            .finish()
    }
}
