use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;

/// Pass-through guard, accepting the same calls as the locking backend.
pub(crate) struct ChainGuard<'a, C>(&'a RefCell<C>);

impl<C> Deref for ChainGuard<'_, C> {
    type Target = RefCell<C>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.0
    }
}

/// Single-threaded stand-in for the reentrant lock.
pub(crate) struct ChainLock<C>(RefCell<C>);

impl<C> ChainLock<C> {
    #[inline]
    pub(crate) fn new(chain: C) -> Self {
        Self(RefCell::new(chain))
    }

    #[inline]
    pub(crate) fn lock(&self) -> ChainGuard<'_, C> {
        ChainGuard(&self.0)
    }

    #[inline]
    pub(crate) fn try_lock(&self) -> Option<ChainGuard<'_, C>> {
        Some(ChainGuard(&self.0))
    }
}

impl<C> fmt::Debug for ChainLock<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainLock").finish_non_exhaustive()
    }
}
