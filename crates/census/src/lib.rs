//! Self-registering instance registries.
//!
//! A type opts in by embedding a [`Tracker`]. Every instance whose tracker is
//! active is linked into a [`Registry`], in registration order, so the live
//! population of the type can be counted, walked and reordered at any time
//! without the application keeping its own list.
//!
//! ```rust
//! use std::sync::{Arc, Weak};
//! use census::{Tracked, Tracker};
//!
//! struct Connection {
//!     peer: String,
//!     tracker: Tracker<Connection>,
//! }
//!
//! census::tracked!(Connection, "connections");
//!
//! fn connect(peer: &str) -> Arc<Connection> {
//!     Arc::new_cyclic(|me: &Weak<Connection>| Connection {
//!         peer: peer.to_string(),
//!         tracker: Tracker::new(me),
//!     })
//! }
//!
//! let a = connect("10.0.0.1");
//! let b = connect("10.0.0.2");
//!
//! let peers: Vec<String> = Connection::registry()
//!     .snapshot()
//!     .iter()
//!     .map(|c| c.peer.clone())
//!     .collect();
//! assert_eq!(peers, ["10.0.0.1", "10.0.0.2"]);
//!
//! drop(a);
//! assert_eq!(Connection::registry().count(), 1);
//! # drop(b);
//! ```
//!
//! # Registries
//!
//! [`tracked!`] gives a type one process-wide default registry, reachable
//! through [`Tracked::registry`]. Explicit registries built with
//! [`Registry::named`] can be handed to [`Tracker::new_in`] instead, and a
//! type may embed several trackers to appear in several registries at once.
//!
//! Every registry also reports into [`census::snapshot`], which lists the
//! live, peak and total counts of all registries in the process.
//!
//! # Cargo features
//!
//! | Feature | Effect |
//! |---------|--------|
//! | `locking` *(default)* | Registries sit behind a reentrant mutex and can be shared across threads. |
//! | *(none)* | No lock at all; registries are `!Send`/`!Sync` and default registries are per-thread. |

mod chain;
mod cursor;
mod error;
mod lock;
mod node;
mod registry;
mod sort;

pub mod census;

pub use census_types::{CensusSnapshot, RegistryCensus, SortReport};
pub use cursor::{Cursor, Iter, Traversal};
pub use error::TrackError;
pub use node::Tracker;
pub use registry::Registry;

/// A type with a process-wide default registry.
///
/// Implement it with [`tracked!`] rather than by hand.
pub trait Tracked: Sized + 'static {
    /// The default registry of `Self`, created on first use.
    fn registry() -> Registry<Self>;
}

/// Declares the default registry of a type.
///
/// `tracked!(Type)` labels the registry with the type's name;
/// `tracked!(Type, "label")` picks the label.
#[macro_export]
macro_rules! tracked {
    ($ty:ty) => {
        $crate::tracked!($ty, ::std::any::type_name::<$ty>());
    };
    ($ty:ty, $name:expr) => {
        impl $crate::Tracked for $ty {
            fn registry() -> $crate::Registry<Self> {
                $crate::__default_registry!($ty, $name)
            }
        }
    };
}

#[cfg(feature = "locking")]
#[doc(hidden)]
#[macro_export]
macro_rules! __default_registry {
    ($ty:ty, $name:expr) => {{
        static REGISTRY: ::std::sync::LazyLock<$crate::Registry<$ty>> =
            ::std::sync::LazyLock::new(|| $crate::Registry::named($name));
        ::std::clone::Clone::clone(&*REGISTRY)
    }};
}

#[cfg(not(feature = "locking"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __default_registry {
    ($ty:ty, $name:expr) => {{
        ::std::thread_local! {
            static REGISTRY: $crate::Registry<$ty> = $crate::Registry::named($name);
        }
        REGISTRY.with(::std::clone::Clone::clone)
    }};
}
