use std::sync::Arc;
use std::time::Instant;

use census::Registry;
use parking_lot::Mutex;
use tracing::info;

use super::{print_census, weights, widget};
use crate::{AnyResult, Config};

pub fn run(cfg: &Config) -> AnyResult<()> {
    let registry = Registry::named("examples.churn");
    let kept = Mutex::new(Vec::new());
    let rounds = cfg.count.max(1) * 100;
    let started = Instant::now();

    std::thread::scope(|s| {
        for t in 0..cfg.threads {
            let registry = &registry;
            let kept = &kept;
            s.spawn(move || {
                for (round, weight) in weights(rounds).enumerate() {
                    let w = widget(registry, t * rounds + round, weight);
                    if round % 10 == 0 {
                        kept.lock().push(w);
                    }
                }
            });
        }
        s.spawn(|| {
            for _ in 0..cfg.count {
                let traversal = registry.lock();
                let heaviest = traversal.iter().map(|w| w.weight).max();
                info!(len = traversal.len(), ?heaviest, "observed churn");
            }
        });
    });

    let kept: Vec<Arc<_>> = kept.into_inner();
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "churn finished");
    println!(
        "{} threads x {rounds} rounds: {} kept, {} live, peak {}, {} tracked in total",
        cfg.threads,
        kept.len(),
        registry.count(),
        registry.peak(),
        registry.total_tracked()
    );
    if registry.count() != kept.len() {
        return Err(format!(
            "registry lost track: {} live but {} kept",
            registry.count(),
            kept.len()
        ));
    }

    print_census(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kept_widget_stays_tracked() {
        let cfg = Config {
            json: true,
            count: 1,
            threads: 3,
        };
        run(&cfg).expect("churn keeps the registry in step with the kept widgets");
    }
}
