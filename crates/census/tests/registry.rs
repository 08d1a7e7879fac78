use std::cmp::Ordering;
use std::sync::{Arc, Weak};

use census::{Registry, TrackError, Tracker};

struct Item {
    value: u32,
    tracker: Tracker<Item>,
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Item {}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Item {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

fn item(registry: &Registry<Item>, value: u32) -> Arc<Item> {
    Arc::new_cyclic(|me: &Weak<Item>| Item {
        value,
        tracker: Tracker::new_in(registry, me),
    })
}

fn values(registry: &Registry<Item>) -> Vec<u32> {
    registry.snapshot().iter().map(|i| i.value).collect()
}

#[test]
fn traversal_follows_registration_order() {
    let registry = Registry::named("registry.order");
    let _a = item(&registry, 1);
    let _b = item(&registry, 2);
    let _c = item(&registry, 3);

    assert_eq!(values(&registry), [1, 2, 3]);
    assert_eq!(registry.count(), 3);
}

#[test]
fn end_tracking_drops_out_of_traversal() {
    let registry = Registry::named("registry.end_tracking");
    let _a = item(&registry, 1);
    let b = item(&registry, 2);
    let _c = item(&registry, 3);

    b.tracker.end_tracking().expect("b was tracking");
    assert_eq!(values(&registry), [1, 3]);
    assert_eq!(registry.count(), 2);
}

#[test]
fn removal_from_every_position_keeps_neighbors_linked() {
    // head, interior, tail, then the sole survivor
    let registry = Registry::named("registry.positions");
    let items: Vec<_> = (1..=4).map(|v| item(&registry, v)).collect();

    items[0].tracker.end_tracking().expect("head");
    assert_eq!(values(&registry), [2, 3, 4]);

    items[2].tracker.end_tracking().expect("interior");
    assert_eq!(values(&registry), [2, 4]);

    items[3].tracker.end_tracking().expect("tail");
    assert_eq!(values(&registry), [2]);

    items[1].tracker.end_tracking().expect("sole");
    assert!(values(&registry).is_empty());
    assert!(registry.is_empty());

    // The chain is usable again after being emptied.
    let e = item(&registry, 5);
    let f = item(&registry, 6);
    assert_eq!(values(&registry), [5, 6]);
    drop((e, f));
}

#[test]
fn misuse_leaves_the_chain_unchanged() {
    let registry = Registry::named("registry.misuse");
    let a = item(&registry, 1);
    let b = item(&registry, 2);

    assert_eq!(
        a.tracker.begin_tracking(&Arc::downgrade(&a)),
        Err(TrackError::AlreadyTracking)
    );
    assert_eq!(values(&registry), [1, 2]);

    b.tracker.end_tracking().expect("b was tracking");
    assert_eq!(b.tracker.end_tracking(), Err(TrackError::NotTracking));
    assert_eq!(values(&registry), [1]);
    assert_eq!(registry.count(), 1);
}

#[test]
fn retracking_appends_at_the_tail() {
    let registry = Registry::named("registry.retrack");
    let a = item(&registry, 1);
    let _b = item(&registry, 2);

    a.tracker.end_tracking().expect("a was tracking");
    a.tracker
        .begin_tracking(&Arc::downgrade(&a))
        .expect("a is idle");
    assert_eq!(values(&registry), [2, 1]);
    assert_eq!(registry.total_tracked(), 3);
}

#[test]
fn count_matches_tracking_nodes_over_a_mixed_sequence() {
    let registry = Registry::named("registry.count");
    let items: Vec<_> = (0..16).map(|v| item(&registry, v)).collect();

    for (step, it) in items.iter().enumerate() {
        let weak = Arc::downgrade(it);
        match step % 3 {
            0 => {
                let _ = it.tracker.end_tracking();
            }
            1 => {
                let _ = it.tracker.end_tracking();
                let _ = it.tracker.begin_tracking(&weak);
            }
            _ => {
                let _ = it.tracker.begin_tracking(&weak);
            }
        }
        let tracking = items.iter().filter(|i| i.tracker.is_tracking()).count();
        assert_eq!(registry.count(), tracking);
        assert_eq!(registry.snapshot().len(), tracking);
    }
}

#[test]
fn sort_orders_by_value_with_two_swaps() {
    let registry = Registry::named("registry.sort");
    let _items: Vec<_> = [5, 1, 3].into_iter().map(|v| item(&registry, v)).collect();

    let report = registry.sort().expect("no traversal is open");
    assert_eq!(values(&registry), [1, 3, 5]);
    assert_eq!(report.len, 3);
    assert_eq!(report.swaps, 2);
}

#[test]
fn sorted_chain_is_non_decreasing_and_sorting_again_is_a_no_op() {
    let registry = Registry::named("registry.sort_idempotent");
    let _items: Vec<_> = [9, 4, 7, 4, 0, 12, 3, 8]
        .into_iter()
        .map(|v| item(&registry, v))
        .collect();

    registry.sort().expect("first sort");
    let sorted = values(&registry);
    assert!(sorted.windows(2).all(|w| w[0] <= w[1]));

    let again = registry.sort().expect("second sort");
    assert!(again.was_sorted());
    assert_eq!(again.passes, 1);
    assert_eq!(values(&registry), sorted);
}

#[test]
fn sort_by_accepts_any_ordering() {
    let registry = Registry::named("registry.sort_by");
    let _items: Vec<_> = [2, 8, 5].into_iter().map(|v| item(&registry, v)).collect();

    registry
        .sort_by(|a, b| b.value.cmp(&a.value))
        .expect("descending");
    assert_eq!(values(&registry), [8, 5, 2]);

    registry
        .sort_by_key(|i| i.value % 4)
        .expect("by remainder");
    assert_eq!(values(&registry), [8, 5, 2]);
}

#[test]
fn sorting_does_not_move_instances() {
    let registry = Registry::named("registry.sort_identity");
    let items: Vec<_> = [3, 2, 1].into_iter().map(|v| item(&registry, v)).collect();
    registry.sort().expect("sort");

    let visited = registry.snapshot();
    assert!(Arc::ptr_eq(&visited[0], &items[2]));
    assert!(Arc::ptr_eq(&visited[2], &items[0]));
}

#[test]
fn trackers_on_separate_registries_are_independent_dimensions() {
    struct Worker {
        id: u32,
        all: Tracker<Worker>,
        busy: Tracker<Worker>,
    }

    let all = Registry::named("registry.workers.all");
    let busy = Registry::named("registry.workers.busy");
    let worker = |id| {
        Arc::new_cyclic(|me: &Weak<Worker>| Worker {
            id,
            all: Tracker::new_in(&all, me),
            busy: Tracker::idle_in(&busy),
        })
    };
    let workers: Vec<_> = (1..=3).map(worker).collect();

    workers[1]
        .busy
        .begin_tracking(&Arc::downgrade(&workers[1]))
        .expect("idle");
    assert_eq!(all.count(), 3);
    assert_eq!(busy.count(), 1);
    assert_eq!(busy.snapshot()[0].id, 2);

    workers[1].all.end_tracking().expect("tracking");
    assert_eq!(all.count(), 2);
    assert!(workers[1].busy.is_tracking());
}

#[test]
fn registry_statistics_follow_the_population() {
    let registry = Registry::named("registry.stats");
    let a = item(&registry, 1);
    let b = item(&registry, 2);
    drop(a);
    let c = item(&registry, 3);

    let census = registry.census();
    assert_eq!(census.name, "registry.stats");
    assert!(census.type_name.ends_with("Item"));
    assert_eq!(census.live, 2);
    assert_eq!(census.peak, 2);
    assert_eq!(census.total_tracked, 3);
    assert_eq!(registry.peak(), 2);
    drop((b, c));
    assert_eq!(registry.census().released(), 3);
}

#[test]
fn clones_share_one_chain() {
    let registry = Registry::named("registry.clones");
    let other = registry.clone();
    let _a = item(&other, 1);

    assert!(registry.same_registry(&other));
    assert_eq!(registry.count(), 1);
    assert!(!registry.same_registry(&Registry::named("registry.clones")));
}
