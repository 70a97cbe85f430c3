use crate::common::types::Identifier;
use core::num::NonZeroUsize;

/// Fixed-capacity rotation of the names a worker currently keeps alive.
///
/// Slot `cursor` is the next one to be reused; after every
/// [`record`](Window::record) the cursor advances by one, wrapping at the
/// capacity. The window starts empty, so the first `capacity` records never
/// evict anything.
#[derive(Debug)]
pub struct Window {
    slots: Box<[Option<Identifier>]>,
    cursor: usize,
}

impl Window {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: vec![None; capacity.get()].into_boxed_slice(),
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// The identifier occupying the slot under the cursor, if any.
    pub fn current(&self) -> Option<&Identifier> {
        self.slots[self.cursor].as_ref()
    }

    /// Empties the slot under the cursor without moving it.
    pub fn take_current(&mut self) -> Option<Identifier> {
        self.slots[self.cursor].take()
    }

    /// Stores `id` under the cursor, advances the cursor and returns whatever
    /// the slot held before.
    pub fn record(&mut self, id: Identifier) -> Option<Identifier> {
        let evicted = self.slots[self.cursor].replace(id);
        self.cursor = (self.cursor + 1) % self.slots.len();
        evicted
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Occupied slots in slot order (not creation order).
    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.slots.iter().flatten()
    }

    /// Empties every slot, returning the occupants in slot order.
    pub fn drain(&mut self) -> Vec<Identifier> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(capacity: usize) -> Window {
        Window::new(NonZeroUsize::new(capacity).unwrap())
    }

    fn id(seq: u64) -> Identifier {
        Identifier::new("hp", seq)
    }

    #[test]
    fn starts_empty() {
        let w = window(3);
        assert_eq!(w.capacity(), 3);
        assert!(w.is_empty());
        assert_eq!(w.len(), 0);
        assert!(w.current().is_none());
    }

    #[test]
    fn first_capacity_records_never_evict() {
        let mut w = window(3);
        for seq in 0..3 {
            assert!(w.current().is_none());
            assert!(w.record(id(seq)).is_none());
        }
        assert_eq!(w.len(), 3);
        assert_eq!(w.cursor(), 0);
    }

    #[test]
    fn holds_the_most_recent_distinct_ids() {
        for capacity in 1..=5_usize {
            let mut w = window(capacity);
            for seq in 0..(capacity as u64 * 4 + 1) {
                let evicted = w.record(id(seq));
                if seq >= capacity as u64 {
                    assert_eq!(evicted, Some(id(seq - capacity as u64)));
                }

                let taken = seq + 1;
                if taken >= capacity as u64 {
                    let mut live: Vec<_> = w.iter().map(Identifier::seq).collect();
                    live.sort_unstable();
                    let expected: Vec<_> = (taken - capacity as u64..taken).collect();
                    assert_eq!(live, expected);
                }
            }
        }
    }

    #[test]
    fn take_current_keeps_the_cursor() {
        let mut w = window(2);
        w.record(id(0));
        w.record(id(1));
        assert_eq!(w.take_current(), Some(id(0)));
        assert_eq!(w.cursor(), 0);
        assert!(w.current().is_none());
        assert_eq!(w.len(), 1);
        assert!(w.record(id(2)).is_none());
        assert_eq!(w.cursor(), 1);
    }

    #[test]
    fn cursor_wraps() {
        let mut w = window(2);
        w.record(id(0));
        assert_eq!(w.cursor(), 1);
        w.record(id(1));
        assert_eq!(w.cursor(), 0);
        assert_eq!(w.current(), Some(&id(0)));
    }

    #[test]
    fn drain_empties_in_slot_order() {
        let mut w = window(2);
        for seq in 0..3 {
            w.record(id(seq));
        }
        // slot 0 = hp-2, slot 1 = hp-1
        assert_eq!(w.drain(), vec![id(2), id(1)]);
        assert!(w.is_empty());
        assert!(w.drain().is_empty());
    }
}
