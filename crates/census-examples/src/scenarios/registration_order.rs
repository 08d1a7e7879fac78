use tracing::info;

use super::{ids, print_census, widget};
use crate::{AnyResult, Config};

pub fn run(cfg: &Config) -> AnyResult<()> {
    let registry = census::Registry::named("examples.registration_order");
    let widgets: Vec<_> = (0..cfg.count).map(|id| widget(&registry, id, 0)).collect();
    println!("registered:  {:?}", ids(&registry));

    let Some(middle) = widgets.get(widgets.len() / 2) else {
        println!("nothing registered; pass --count to add widgets");
        return print_census(cfg);
    };
    middle.tracker.end_tracking().map_err(|e| e.to_string())?;
    info!(id = middle.id, "ended tracking of the middle widget");
    println!("without {}: {:?}", middle.id, ids(&registry));

    middle
        .tracker
        .begin_tracking(&std::sync::Arc::downgrade(middle))
        .map_err(|e| e.to_string())?;
    println!("re-tracked:  {:?}", ids(&registry));

    print_census(cfg)
}
