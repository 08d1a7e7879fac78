//! Mutual exclusion for registry chains.
//!
//! With the `locking` feature (the default), every chain sits behind a
//! `parking_lot::ReentrantMutex`, so registries can be shared across threads
//! and the thread holding an open traversal may still attach or detach
//! instances of the same registry.
//!
//! Without it, the lock compiles down to a bare `RefCell`: registries become
//! `!Send`/`!Sync` and must stay on the thread that created them.
//!
//! Either way the chain itself is guarded by a `RefCell`, and callers only
//! borrow it for the duration of one structural step.

#[cfg(not(feature = "locking"))]
mod disabled;
#[cfg(feature = "locking")]
mod enabled;

#[cfg(not(feature = "locking"))]
pub(crate) use disabled::*;
#[cfg(feature = "locking")]
pub(crate) use enabled::*;
