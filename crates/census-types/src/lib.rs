//! Snapshot types describing the state of census registries.
//!
//! These are plain data: the `census` crate produces them, tooling consumes
//! them (usually as JSON via `facet-json`).

use facet::Facet;

/// State of one registry at snapshot time.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct RegistryCensus {
    /// Registry label. Defaults to the tracked type's name.
    pub name: String,

    /// Fully qualified name of the tracked type.
    pub type_name: String,

    /// Instances currently tracked.
    pub live: u64,

    /// Highest `live` value ever observed.
    pub peak: u64,

    /// Successful registrations since the registry was created.
    pub total_tracked: u64,
}

impl RegistryCensus {
    /// Registrations that have since ended, either explicitly or by drop.
    pub fn released(&self) -> u64 {
        self.total_tracked.saturating_sub(self.live)
    }
}

/// Process-wide view over every registry that is still alive.
#[derive(Facet, Debug, Clone, Default, PartialEq, Eq)]
pub struct CensusSnapshot {
    /// Capture time, milliseconds since the unix epoch.
    pub taken_at_unix_ms: u64,

    /// One entry per registry, ordered by name.
    pub registries: Vec<RegistryCensus>,
}

impl CensusSnapshot {
    /// Sum of live instances across all registries.
    pub fn total_live(&self) -> u64 {
        self.registries.iter().map(|r| r.live).sum()
    }

    /// Looks up a registry by its label.
    pub fn find(&self, name: &str) -> Option<&RegistryCensus> {
        self.registries.iter().find(|r| r.name == name)
    }

    /// Registries that still hold live instances.
    pub fn non_empty(&self) -> impl Iterator<Item = &RegistryCensus> {
        self.registries.iter().filter(|r| r.live > 0)
    }
}

/// Outcome of one in-place sort of a registry chain.
#[derive(Facet, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortReport {
    /// Number of live links when the sort started.
    pub len: u64,

    /// Bubbling passes performed, including the final swap-free one.
    pub passes: u32,

    /// Adjacent pairs relinked.
    pub swaps: u64,
}

impl SortReport {
    /// True when the chain was already in order.
    pub fn was_sorted(&self) -> bool {
        self.swaps == 0
    }
}
