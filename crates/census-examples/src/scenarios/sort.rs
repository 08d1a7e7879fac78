use census::Registry;
use tracing::info;

use super::{Widget, print_census, weights, widget};
use crate::{AnyResult, Config};

fn weights_in_order(registry: &Registry<Widget>) -> Vec<u32> {
    registry.snapshot().iter().map(|w| w.weight).collect()
}

pub fn run(cfg: &Config) -> AnyResult<()> {
    let registry = Registry::named("examples.sort");
    let _widgets: Vec<_> = weights(cfg.count)
        .enumerate()
        .map(|(id, weight)| widget(&registry, id, weight))
        .collect();
    println!("registered: {:?}", weights_in_order(&registry));

    let report = registry
        .sort_by_key(|w| w.weight)
        .map_err(|e| e.to_string())?;
    info!(passes = report.passes, swaps = report.swaps, "sorted by weight");
    println!("sorted:     {:?}", weights_in_order(&registry));
    println!(
        "            {} widgets, {} passes, {} swaps",
        report.len, report.passes, report.swaps
    );

    let again = registry
        .sort_by_key(|w| w.weight)
        .map_err(|e| e.to_string())?;
    println!(
        "again:      {} passes, {} swaps (already sorted: {})",
        again.passes,
        again.swaps,
        again.was_sorted()
    );

    let traversal = registry.lock();
    let refused = registry.sort_by_key(|w| w.id);
    drop(traversal);
    match refused {
        Err(err) => println!("inside a traversal: {err}"),
        Ok(_) => return Err("sorting inside a traversal should be refused".to_string()),
    }

    print_census(cfg)
}
