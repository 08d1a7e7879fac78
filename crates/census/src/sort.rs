//! In-place ordering of a chain.
//!
//! Instances are shared and never move, so the chain is reordered by
//! relinking: repeated bubbling passes over the links, swapping adjacent
//! pairs that are out of order. Each pass settles the largest remaining
//! instance at the end of the scanned range, so the range shrinks by one per
//! pass, and a pass without swaps ends the sort. Quadratic, which is fine for
//! diagnostic-sized populations.

use std::cmp::Ordering;
use std::sync::Arc;

use census_types::SortReport;

use crate::chain::{Chain, SlotId};

/// Strong references to every live instance, indexed by slot.
///
/// Held for the whole sort so no instance can finish dropping mid-sort.
pub(crate) struct Pins<T> {
    by_slot: Vec<Option<Arc<T>>>,
}

impl<T> Pins<T> {
    pub(crate) fn collect(chain: &Chain<T>) -> Self {
        let mut by_slot: Vec<Option<Arc<T>>> = Vec::new();
        for slot in chain.ids() {
            let Some(link) = chain.link(slot) else {
                continue;
            };
            if by_slot.len() <= slot.index() {
                by_slot.resize_with(slot.index() + 1, || None);
            }
            by_slot[slot.index()] = link.node.owner().upgrade();
        }
        Self { by_slot }
    }

    fn get(&self, slot: SlotId) -> Option<&T> {
        self.by_slot.get(slot.index())?.as_deref()
    }
}

/// Bubble-sorts the chain so that no link compares `Less` than its
/// predecessor. Instances missing from `pins` never swap.
pub(crate) fn bubble<T, F>(chain: &mut Chain<T>, pins: &Pins<T>, mut compare: F) -> SortReport
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = chain.live();
    let mut report = SortReport {
        len: len as u64,
        passes: 0,
        swaps: 0,
    };
    if len < 2 {
        return report;
    }

    let last_pass = len - 1;
    for pass in 0..last_pass {
        let mut swaps = 0u64;
        let mut current = chain.head();

        for _ in 0..last_pass - pass {
            let Some(curr) = current else {
                debug_assert!(false, "chain ended before its live count");
                break;
            };
            let Some(next) = chain.next_of(curr) else {
                debug_assert!(false, "link {curr:?} has no successor inside the scan range");
                break;
            };

            let out_of_order = match (pins.get(curr), pins.get(next)) {
                (Some(a), Some(b)) => compare(b, a) == Ordering::Less,
                _ => false,
            };
            if out_of_order {
                chain.swap_with_next(curr);
                swaps += 1;
            } else {
                current = Some(next);
            }
        }

        report.passes += 1;
        report.swaps += swaps;
        if swaps == 0 {
            break;
        }
    }
    report
}
