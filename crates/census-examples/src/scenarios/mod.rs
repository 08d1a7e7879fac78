pub mod churn;
pub mod leak_report;
pub mod registration_order;
pub mod remove_during_traversal;
pub mod sort;

use std::sync::{Arc, Weak};

use census::{Registry, Tracker};

use crate::{AnyResult, Config};

/// The tracked type most scenarios populate their registries with.
pub(crate) struct Widget {
    pub(crate) id: usize,
    pub(crate) weight: u32,
    pub(crate) tracker: Tracker<Widget>,
}

pub(crate) fn widget(registry: &Registry<Widget>, id: usize, weight: u32) -> Arc<Widget> {
    Arc::new_cyclic(|me: &Weak<Widget>| Widget {
        id,
        weight,
        tracker: Tracker::new_in(registry, me),
    })
}

/// Deterministic weights, so runs are reproducible.
pub(crate) fn weights(count: usize) -> impl Iterator<Item = u32> {
    let mut state: u32 = 0x9e37_79b9;
    (0..count).map(move |_| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state % 100
    })
}

pub(crate) fn ids(registry: &Registry<Widget>) -> Vec<usize> {
    registry.snapshot().iter().map(|w| w.id).collect()
}

/// Prints the process-wide census, as a table or as JSON.
pub(crate) fn print_census(cfg: &Config) -> AnyResult<()> {
    let snapshot = census::census::snapshot();
    if cfg.json {
        println!("{}", census::census::to_json(&snapshot)?);
    } else {
        println!();
        print!("{}", census::census::to_text(&snapshot));
    }
    Ok(())
}
