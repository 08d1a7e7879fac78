use std::sync::Arc;

use census::Registry;
use tracing::debug;

use super::{ids, print_census, widget};
use crate::{AnyResult, Config};

pub fn run(cfg: &Config) -> AnyResult<()> {
    let registry = Registry::named("examples.remove_during_traversal");
    let widgets: Vec<_> = (0..cfg.count).map(|id| widget(&registry, id, 0)).collect();
    println!("registered: {:?}", ids(&registry));

    // Cursor form: remove every odd widget while walking.
    let mut visited = Vec::new();
    let mut removed = Vec::new();
    let mut cursor = registry.begin();
    while cursor != registry.end() {
        if let Some(current) = cursor.get() {
            visited.push(current.id);
            if current.id % 2 == 1 {
                if let Some(gone) = cursor.remove_current() {
                    debug!(id = gone.id, "removed through cursor");
                    removed.push(gone.id);
                }
            }
        }
        cursor.move_next();
    }
    drop(cursor);
    println!("visited:    {visited:?}");
    println!("removed:    {removed:?}");
    println!("remaining:  {:?}", ids(&registry));

    // Drop form: the last reference goes away inside the loop.
    let mut owned: Vec<Option<Arc<_>>> = widgets.into_iter().map(Some).collect();
    let mut dropped = 0;
    for w in registry.lock().iter() {
        let index = w.id;
        drop(w);
        if let Some(slot) = owned.get_mut(index) {
            *slot = None;
            dropped += 1;
        }
    }
    println!("dropped {dropped} inside a traversal, {} left", registry.count());

    print_census(cfg)
}
