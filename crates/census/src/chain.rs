//! The doubly-linked chain behind every registry.
//!
//! Links live in a slot arena and refer to each other by [`SlotId`]. A slot
//! that is released bumps its generation, so an id that outlives its link
//! resolves to nothing instead of to whatever reuses the slot.
//!
//! Removing a link while a traversal is open only detaches it: the link stays
//! spliced in as a tombstone so cursors parked on it can still step forward.
//! Tombstones are unlinked once the last traversal closes.

use std::sync::{Arc, Weak};

use crate::node::NodeCell;

/// Generational handle to a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotId {
    index: u32,
    generation: u32,
}

impl SlotId {
    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

pub(crate) struct Link<T> {
    pub(crate) node: Arc<NodeCell<T>>,
    pub(crate) prev: Option<SlotId>,
    pub(crate) next: Option<SlotId>,
    pub(crate) detached: bool,
}

struct Slot<T> {
    generation: u32,
    link: Option<Link<T>>,
}

pub(crate) struct Chain<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    live: usize,
    tombstones: usize,
    traversals: usize,
}

impl<T> Chain<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            live: 0,
            tombstones: 0,
            traversals: 0,
        }
    }

    /// Links that are attached, tombstones excluded.
    pub(crate) fn live(&self) -> usize {
        self.live
    }

    pub(crate) fn traversals(&self) -> usize {
        self.traversals
    }

    pub(crate) fn head(&self) -> Option<SlotId> {
        self.head
    }

    pub(crate) fn link(&self, id: SlotId) -> Option<&Link<T>> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.link.as_ref()
    }

    fn link_mut(&mut self, id: SlotId) -> Option<&mut Link<T>> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.link.as_mut()
    }

    /// True if `id` names an attached link.
    #[cfg(test)]
    pub(crate) fn contains(&self, id: SlotId) -> bool {
        self.link(id).is_some_and(|link| !link.detached)
    }

    /// Appends `node` at the tail and binds it to `owner`.
    pub(crate) fn push_back(&mut self, node: Arc<NodeCell<T>>, owner: Weak<T>) -> SlotId {
        let prev = self.tail;
        let id = self.allocate(Link {
            node: Arc::clone(&node),
            prev,
            next: None,
            detached: false,
        });

        match prev.and_then(|prev| self.link_mut(prev)) {
            Some(prev) => prev.next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.live += 1;

        node.attach(id, owner);
        id
    }

    /// Detaches `id`, resetting its node to idle. Returns the former owner.
    ///
    /// With a traversal open the link stays in place as a tombstone.
    pub(crate) fn detach(&mut self, id: SlotId) -> Option<Weak<T>> {
        let traversing = self.traversals > 0;
        let link = self.link_mut(id)?;
        if link.detached {
            return None;
        }
        let owner = link.node.reset();

        if traversing {
            link.detached = true;
            self.tombstones += 1;
        } else {
            self.unlink(id);
            self.release(id);
        }
        self.live -= 1;
        Some(owner)
    }

    fn allocate(&mut self, link: Link<T>) -> SlotId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.link = Some(link);
            return SlotId {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or_else(|_| {
            panic!("registry chain exceeded {} links", u32::MAX);
        });
        self.slots.push(Slot {
            generation: 0,
            link: Some(link),
        });
        SlotId {
            index,
            generation: 0,
        }
    }

    fn release(&mut self, id: SlotId) {
        let slot = &mut self.slots[id.index()];
        slot.link = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
    }

    /// Splices `id` out, relinking its neighbors.
    fn unlink(&mut self, id: SlotId) {
        let Some(link) = self.link_mut(id) else {
            return;
        };
        let (prev, next) = (link.prev.take(), link.next.take());

        match prev.and_then(|prev| self.link_mut(prev)) {
            Some(prev) => prev.next = next,
            None => self.head = next,
        }
        match next.and_then(|next| self.link_mut(next)) {
            Some(next) => next.prev = prev,
            None => self.tail = prev,
        }
    }

    /// Swaps `a` with its successor by relinking the surrounding pointers.
    ///
    /// Returns false if `a` has no successor.
    pub(crate) fn swap_with_next(&mut self, a: SlotId) -> bool {
        let Some(link) = self.link(a) else {
            return false;
        };
        let Some(b) = link.next else {
            return false;
        };
        let before = link.prev;
        let after = self.link(b).and_then(|link| link.next);

        if let Some(link) = self.link_mut(a) {
            link.prev = Some(b);
            link.next = after;
        }
        if let Some(link) = self.link_mut(b) {
            link.prev = before;
            link.next = Some(a);
        }
        match before.and_then(|before| self.link_mut(before)) {
            Some(before) => before.next = Some(b),
            None => self.head = Some(b),
        }
        match after.and_then(|after| self.link_mut(after)) {
            Some(after) => after.prev = Some(a),
            None => self.tail = Some(a),
        }
        true
    }

    /// First attached link at or after `from`.
    pub(crate) fn next_live(&self, mut from: Option<SlotId>) -> Option<SlotId> {
        while let Some(id) = from {
            let link = self.link(id)?;
            if !link.detached {
                return Some(id);
            }
            from = link.next;
        }
        None
    }

    /// Raw successor of `id`, tombstones included.
    pub(crate) fn next_of(&self, id: SlotId) -> Option<SlotId> {
        self.link(id).and_then(|link| link.next)
    }

    pub(crate) fn open_traversal(&mut self) {
        self.traversals += 1;
    }

    /// Closes one traversal. The last one to close purges tombstones and
    /// returns how many it removed.
    pub(crate) fn close_traversal(&mut self) -> usize {
        debug_assert!(self.traversals > 0, "closed a traversal that was never opened");
        self.traversals = self.traversals.saturating_sub(1);
        if self.traversals > 0 || self.tombstones == 0 {
            return 0;
        }
        self.purge()
    }

    fn purge(&mut self) -> usize {
        let mut purged = 0;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let Some(link) = self.link(id) else {
                break;
            };
            cursor = link.next;
            if link.detached {
                self.unlink(id);
                self.release(id);
                purged += 1;
            }
        }
        self.tombstones = 0;
        purged
    }

    /// Attached links in chain order.
    pub(crate) fn ids(&self) -> Vec<SlotId> {
        let mut ids = Vec::with_capacity(self.live);
        let mut cursor = self.next_live(self.head);
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.next_live(self.next_of(id));
        }
        ids
    }

    /// Verifies the doubly-linked invariants. Test-only.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut prev: Option<SlotId> = None;
        let mut cursor = self.head;
        let mut attached = 0;
        let mut detached = 0;
        while let Some(id) = cursor {
            let link = self.link(id).expect("chain references a released slot");
            assert_eq!(link.prev, prev, "prev link of {id:?} is inconsistent");
            if link.detached {
                detached += 1;
            } else {
                attached += 1;
                assert_eq!(link.node.slot(), Some(id), "node of {id:?} disagrees with chain");
            }
            prev = Some(id);
            cursor = link.next;
            assert!(attached + detached <= self.slots.len(), "chain has a cycle");
        }
        assert_eq!(self.tail, prev, "tail does not match last link");
        assert_eq!(attached, self.live, "live count does not match chain");
        assert_eq!(detached, self.tombstones, "tombstone count does not match chain");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(u32);

    fn chain_of(n: u32) -> (Chain<Item>, Vec<Arc<Item>>, Vec<Arc<NodeCell<Item>>>, Vec<SlotId>) {
        let mut chain = Chain::new();
        let mut items = Vec::new();
        let mut nodes = Vec::new();
        let mut ids = Vec::new();
        for value in 0..n {
            let item = Arc::new(Item(value));
            let node = Arc::new(NodeCell::new());
            ids.push(chain.push_back(Arc::clone(&node), Arc::downgrade(&item)));
            items.push(item);
            nodes.push(node);
        }
        (chain, items, nodes, ids)
    }

    fn values(chain: &Chain<Item>) -> Vec<u32> {
        chain
            .ids()
            .into_iter()
            .map(|id| {
                let link = chain.link(id).expect("live id");
                link.node.owner().upgrade().expect("owner alive").0
            })
            .collect()
    }

    #[test]
    fn push_back_keeps_registration_order() {
        let (chain, _items, nodes, ids) = chain_of(3);
        chain.assert_consistent();
        assert_eq!(values(&chain), [0, 1, 2]);
        assert_eq!(chain.live(), 3);
        assert_eq!(nodes[1].slot(), Some(ids[1]));
    }

    #[test]
    fn detach_each_position() {
        for victim in 0..3 {
            let (mut chain, _items, nodes, ids) = chain_of(3);
            assert!(chain.detach(ids[victim]).is_some());
            chain.assert_consistent();
            assert_eq!(chain.live(), 2);
            assert_eq!(nodes[victim].slot(), None);
            let expected: Vec<u32> = (0..3).filter(|v| *v != victim as u32).collect();
            assert_eq!(values(&chain), expected);
        }
    }

    #[test]
    fn detach_sole_link_empties_chain() {
        let (mut chain, _items, _nodes, ids) = chain_of(1);
        assert!(chain.detach(ids[0]).is_some());
        chain.assert_consistent();
        assert_eq!(chain.head(), None);
        assert!(chain.ids().is_empty());
    }

    #[test]
    fn stale_id_does_not_resolve_after_reuse() {
        let (mut chain, items, _nodes, ids) = chain_of(2);
        assert!(chain.detach(ids[0]).is_some());
        assert!(chain.detach(ids[0]).is_none());

        let node = Arc::new(NodeCell::new());
        let reused = chain.push_back(Arc::clone(&node), Arc::downgrade(&items[0]));
        assert_eq!(reused.index(), ids[0].index());
        assert_ne!(reused, ids[0]);
        assert!(chain.link(ids[0]).is_none());
        assert!(chain.contains(reused));
        chain.assert_consistent();
    }

    #[test]
    fn detach_during_traversal_leaves_tombstone_until_close() {
        let (mut chain, _items, _nodes, ids) = chain_of(3);
        chain.open_traversal();
        assert!(chain.detach(ids[1]).is_some());
        chain.assert_consistent();
        assert_eq!(chain.next_of(ids[1]), Some(ids[2]));
        assert_eq!(chain.next_live(Some(ids[1])), Some(ids[2]));
        assert_eq!(values(&chain), [0, 2]);

        assert_eq!(chain.close_traversal(), 1);
        chain.assert_consistent();
        assert!(chain.link(ids[1]).is_none());
        assert_eq!(values(&chain), [0, 2]);
    }

    #[test]
    fn nested_traversals_purge_on_last_close() {
        let (mut chain, _items, _nodes, ids) = chain_of(2);
        chain.open_traversal();
        chain.open_traversal();
        assert!(chain.detach(ids[0]).is_some());
        assert_eq!(chain.close_traversal(), 0);
        assert!(chain.link(ids[0]).is_some());
        assert_eq!(chain.close_traversal(), 1);
        chain.assert_consistent();
    }

    #[test]
    fn swap_with_next_relinks_all_neighbors() {
        let (mut chain, _items, _nodes, ids) = chain_of(4);
        assert!(chain.swap_with_next(ids[1]));
        chain.assert_consistent();
        assert_eq!(values(&chain), [0, 2, 1, 3]);

        assert!(chain.swap_with_next(ids[0]));
        chain.assert_consistent();
        assert_eq!(values(&chain), [2, 0, 1, 3]);

        assert!(chain.swap_with_next(ids[1]));
        chain.assert_consistent();
        assert_eq!(values(&chain), [2, 0, 3, 1]);

        assert!(!chain.swap_with_next(ids[1]));
    }
}
