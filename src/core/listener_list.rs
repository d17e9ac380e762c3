// ============================================================================
// spark-reactive - Listener List
// Arena-backed circular doubly linked list with a sentinel slot
// ============================================================================
//
// Slot 0 is the sentinel: an empty list is the sentinel linked to itself.
// New nodes are inserted just before the sentinel (at the tail), so walking
// `next` from the sentinel visits listeners in registration order.
//
// A node is either linked (both links set) or unlinked (no links at all).
// Unlinked slots go on a free list and get a fresh generation when reused,
// which lets stale NodeKeys be recognised and ignored.
// ============================================================================

use std::rc::Rc;

use smallvec::SmallVec;

const SENTINEL: usize = 0;

/// Inline capacity of an emission snapshot before it spills to the heap.
pub const INLINE_SNAPSHOT: usize = 8;

/// Snapshot of linked node keys, in list order
pub type KeySnapshot = SmallVec<[NodeKey; INLINE_SNAPSHOT]>;

/// Handle to one node of a [`ListenerList`].
///
/// The default key points at the sentinel and is never contained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeKey {
    index: u32,
    generation: u32,
}

struct Slot<F: ?Sized> {
    /// (prev, next) while linked, None once unlinked
    links: Option<(usize, usize)>,
    generation: u32,
    callback: Option<Rc<F>>,
}

impl<F: ?Sized> Slot<F> {
    fn sentinel() -> Self {
        Self {
            links: Some((SENTINEL, SENTINEL)),
            generation: 0,
            callback: None,
        }
    }
}

/// The listener storage behind an emitter.
pub struct ListenerList<F: ?Sized> {
    slots: Vec<Slot<F>>,
    free: Vec<usize>,
    len: usize,
}

impl<F: ?Sized> ListenerList<F> {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::sentinel()],
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of linked listeners
    pub fn len(&self) -> usize {
        self.len
    }

    /// True iff the circular list holds nothing but the sentinel
    pub fn is_empty(&self) -> bool {
        self.next_of(SENTINEL) == SENTINEL
    }

    /// Link a new node just before the sentinel. O(1).
    pub fn push_back(&mut self, callback: Rc<F>) -> NodeKey {
        let tail = self.prev_of(SENTINEL);

        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation = slot.generation.wrapping_add(1);
                slot.links = Some((tail, SENTINEL));
                slot.callback = Some(callback);
                index
            }
            None => {
                self.slots.push(Slot {
                    links: Some((tail, SENTINEL)),
                    generation: 0,
                    callback: Some(callback),
                });
                self.slots.len() - 1
            }
        };

        self.set_next(tail, index);
        self.set_prev(SENTINEL, index);
        self.len += 1;

        NodeKey {
            index: index as u32,
            generation: self.slots[index].generation,
        }
    }

    /// Unlink a node. O(1). Only the node and its two neighbours are touched.
    ///
    /// Returns the unlinked callback, or None if the key is stale or already
    /// removed. Callers drop it only after releasing their borrow of the list.
    pub fn remove(&mut self, key: NodeKey) -> Option<Rc<F>> {
        if !self.contains(key) {
            return None;
        }
        let index = key.index as usize;
        let (prev, next) = self.slots[index].links.take()?;

        self.set_next(prev, next);
        self.set_prev(next, prev);
        self.free.push(index);
        self.len -= 1;
        self.slots[index].callback.take()
    }

    /// Whether the key refers to a currently linked node
    pub fn contains(&self, key: NodeKey) -> bool {
        let index = key.index as usize;
        index != SENTINEL
            && self
                .slots
                .get(index)
                .is_some_and(|slot| slot.generation == key.generation && slot.links.is_some())
    }

    /// Callback of a linked node
    pub fn callback(&self, key: NodeKey) -> Option<Rc<F>> {
        if !self.contains(key) {
            return None;
        }
        self.slots[key.index as usize].callback.clone()
    }

    /// Keys of all linked nodes, walking `next` from the sentinel.
    pub fn keys(&self) -> KeySnapshot {
        let mut keys = KeySnapshot::with_capacity(self.len);
        let mut cursor = self.next_of(SENTINEL);
        while cursor != SENTINEL {
            keys.push(NodeKey {
                index: cursor as u32,
                generation: self.slots[cursor].generation,
            });
            cursor = self.next_of(cursor);
        }
        keys
    }

    /// Sever every node's links, leaving the sentinel alone. O(n).
    ///
    /// Returns the unlinked callbacks in list order.
    pub fn clear(&mut self) -> Vec<Rc<F>> {
        let mut drained = Vec::with_capacity(self.len);
        for index in 1..self.slots.len() {
            let slot = &mut self.slots[index];
            if slot.links.take().is_some() {
                drained.extend(slot.callback.take());
                self.free.push(index);
            }
        }
        self.slots[SENTINEL].links = Some((SENTINEL, SENTINEL));
        self.len = 0;
        drained
    }

    fn prev_of(&self, index: usize) -> usize {
        self.slots[index].links.map_or(SENTINEL, |(prev, _)| prev)
    }

    fn next_of(&self, index: usize) -> usize {
        self.slots[index].links.map_or(SENTINEL, |(_, next)| next)
    }

    fn set_prev(&mut self, index: usize, prev: usize) {
        if let Some(links) = self.slots[index].links.as_mut() {
            links.0 = prev;
        }
    }

    fn set_next(&mut self, index: usize, next: usize) {
        if let Some(links) = self.slots[index].links.as_mut() {
            links.1 = next;
        }
    }
}

impl<F: ?Sized> Default for ListenerList<F> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    type Cb = dyn Fn() -> u32;

    fn cb(n: u32) -> Rc<Cb> {
        Rc::new(move || n)
    }

    fn values(list: &ListenerList<Cb>) -> Vec<u32> {
        list.keys()
            .into_iter()
            .filter_map(|k| list.callback(k))
            .map(|f| f())
            .collect()
    }

    #[test]
    fn empty_list_is_sentinel_only() {
        let list: ListenerList<Cb> = ListenerList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.keys().is_empty());
    }

    #[test]
    fn push_back_keeps_insertion_order() {
        let mut list = ListenerList::new();
        for n in 1..=4 {
            list.push_back(cb(n));
        }
        assert_eq!(values(&list), vec![1, 2, 3, 4]);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn remove_relinks_neighbours() {
        let mut list = ListenerList::new();
        let _a = list.push_back(cb(1));
        let b = list.push_back(cb(2));
        let _c = list.push_back(cb(3));

        let removed = list.remove(b).map(|f| f());
        assert_eq!(removed, Some(2));
        assert_eq!(values(&list), vec![1, 3]);
        assert!(!list.contains(b));

        // Second removal is a no-op
        assert!(list.remove(b).is_none());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn removing_head_and_tail() {
        let mut list = ListenerList::new();
        let a = list.push_back(cb(1));
        let _b = list.push_back(cb(2));
        let c = list.push_back(cb(3));

        list.remove(a);
        list.remove(c);
        assert_eq!(values(&list), vec![2]);

        list.push_back(cb(4));
        assert_eq!(values(&list), vec![2, 4]);
    }

    #[test]
    fn reused_slot_rejects_stale_key() {
        let mut list = ListenerList::new();
        let a = list.push_back(cb(1));
        list.remove(a);

        let b = list.push_back(cb(2));
        assert_ne!(a, b);
        assert!(!list.contains(a));
        assert!(list.contains(b));
        assert!(list.callback(a).is_none());
        assert!(list.remove(a).is_none());
        assert_eq!(values(&list), vec![2]);
    }

    #[test]
    fn clear_unlinks_everything() {
        let mut list = ListenerList::new();
        let keys: Vec<_> = (0..5).map(|n| list.push_back(cb(n))).collect();

        let drained: Vec<u32> = list.clear().iter().map(|f| f()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        for key in keys {
            assert!(!list.contains(key));
        }

        list.push_back(cb(9));
        assert_eq!(values(&list), vec![9]);
    }

    #[test]
    fn sentinel_key_is_never_contained() {
        let list: ListenerList<Cb> = ListenerList::new();
        let sentinel = NodeKey {
            index: 0,
            generation: 0,
        };
        assert!(!list.contains(sentinel));
    }
}
