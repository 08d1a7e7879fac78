//! Process-wide directory of registries.
//!
//! Every [`Registry`](crate::Registry) enrolls its statistics here when it is
//! created. [`snapshot`] reports the live count of every registry that still
//! exists, which is the quickest way to spot a type whose instances are
//! leaking.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use census_types::{CensusSnapshot, RegistryCensus};
use parking_lot::Mutex;

static DIRECTORY: LazyLock<Mutex<Vec<Weak<RegistryStats>>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));

/// Counters shared between a registry and the directory.
///
/// Only written while the registry's chain is borrowed.
pub(crate) struct RegistryStats {
    name: String,
    type_name: &'static str,
    live: AtomicUsize,
    peak: AtomicUsize,
    total_tracked: AtomicU64,
}

impl RegistryStats {
    pub(crate) fn new(name: String, type_name: &'static str) -> Self {
        Self {
            name,
            type_name,
            live: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            total_tracked: AtomicU64::new(0),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    pub(crate) fn total_tracked(&self) -> u64 {
        self.total_tracked.load(Ordering::Relaxed)
    }

    pub(crate) fn record_attach(&self, live: usize) {
        self.live.store(live, Ordering::Release);
        self.peak.fetch_max(live, Ordering::Relaxed);
        self.total_tracked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_detach(&self, live: usize) {
        self.live.store(live, Ordering::Release);
    }

    pub(crate) fn census(&self) -> RegistryCensus {
        RegistryCensus {
            name: self.name.clone(),
            type_name: self.type_name.to_string(),
            live: self.live() as u64,
            peak: self.peak() as u64,
            total_tracked: self.total_tracked(),
        }
    }
}

pub(crate) fn enroll(stats: &Arc<RegistryStats>) {
    let mut directory = DIRECTORY.lock();
    directory.retain(|entry| entry.strong_count() > 0);
    directory.push(Arc::downgrade(stats));
}

/// Reports every registry that still exists, ordered by name.
pub fn snapshot() -> CensusSnapshot {
    let mut registries: Vec<RegistryCensus> = {
        let mut directory = DIRECTORY.lock();
        directory.retain(|entry| entry.strong_count() > 0);
        directory
            .iter()
            .filter_map(Weak::upgrade)
            .map(|stats| stats.census())
            .collect()
    };
    registries.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.type_name.cmp(&b.type_name))
    });

    CensusSnapshot {
        taken_at_unix_ms: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64,
        registries,
    }
}

/// Renders a snapshot as JSON.
pub fn to_json(snapshot: &CensusSnapshot) -> Result<String, String> {
    facet_json::to_string(snapshot).map_err(|e| e.to_string())
}

/// Renders a snapshot as an aligned text table, one registry per line.
pub fn to_text(snapshot: &CensusSnapshot) -> String {
    let width = snapshot
        .registries
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max("registry".len());

    let mut out = format!(
        "{:<width$}  {:>8}  {:>8}  {:>8}\n",
        "registry", "live", "peak", "total"
    );
    for r in &snapshot.registries {
        out.push_str(&format!(
            "{:<width$}  {:>8}  {:>8}  {:>8}\n",
            r.name, r.live, r.peak, r.total_tracked
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_track_peak_and_total() {
        let stats = RegistryStats::new("census.tests.stats".to_string(), "u32");
        stats.record_attach(1);
        stats.record_attach(2);
        stats.record_detach(1);
        stats.record_attach(2);
        stats.record_detach(1);
        stats.record_detach(0);

        let census = stats.census();
        assert_eq!(census.live, 0);
        assert_eq!(census.peak, 2);
        assert_eq!(census.total_tracked, 3);
        assert_eq!(census.released(), 3);
    }

    #[test]
    fn dropped_registries_leave_the_directory() {
        let stats = Arc::new(RegistryStats::new("census.tests.gone".to_string(), "u32"));
        enroll(&stats);
        assert!(snapshot().find("census.tests.gone").is_some());

        drop(stats);
        assert!(snapshot().find("census.tests.gone").is_none());
    }

    #[test]
    fn text_table_lists_each_registry() {
        let snapshot = CensusSnapshot {
            taken_at_unix_ms: 0,
            registries: vec![RegistryCensus {
                name: "widgets".to_string(),
                type_name: "app::Widget".to_string(),
                live: 3,
                peak: 5,
                total_tracked: 9,
            }],
        };
        let text = to_text(&snapshot);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("registry"));
        assert!(lines[1].starts_with("widgets "));
        assert!(lines[1].ends_with("       9"));
    }
}
