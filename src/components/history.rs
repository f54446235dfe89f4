use log::debug;

use crate::canvas::{Bitmap, PixelStore};

/// Snapshots kept in each direction.
pub const HISTORY_DEPTH: usize = 10;

// ============================================================================
// SNAPSHOT — full deep copy of the working canvas
// ============================================================================

/// A complete copy of the working canvas, taken before a destructive
/// operation. Never aliases the live canvas.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub description: String,
    pub bitmap: Bitmap,
}

impl Snapshot {
    pub fn capture<S: PixelStore>(description: impl Into<String>, bmp: &Bitmap<S>) -> Self {
        Self { description: description.into(), bitmap: bmp.to_owned_bitmap() }
    }

    pub fn memory_size(&self) -> usize {
        self.bitmap.data().len() * std::mem::size_of::<u32>()
    }
}

// ============================================================================
// SNAPSHOT RING — fixed-capacity circular buffer (head + len)
// ============================================================================

/// Pushing into a full ring evicts the oldest entry; popping takes the
/// newest. No entries are ever shifted.
#[derive(Debug)]
pub struct SnapshotRing {
    slots: Vec<Option<Snapshot>>,
    head: usize,
    len: usize,
    total_memory: usize,
}

impl SnapshotRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_memory: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the evicted snapshot when the ring was full.
    pub fn push(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        let cap = self.capacity();
        self.total_memory += snapshot.memory_size();

        if self.len == cap {
            let evicted = self.slots[self.head].replace(snapshot);
            self.head = (self.head + 1) % cap;
            if let Some(old) = &evicted {
                self.total_memory = self.total_memory.saturating_sub(old.memory_size());
            }
            evicted
        } else {
            let tail = (self.head + self.len) % cap;
            self.slots[tail] = Some(snapshot);
            self.len += 1;
            None
        }
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        if self.len == 0 {
            return None;
        }
        let newest = (self.head + self.len - 1) % self.capacity();
        self.len -= 1;
        let snapshot = self.slots[newest].take();
        if let Some(s) = &snapshot {
            self.total_memory = self.total_memory.saturating_sub(s.memory_size());
        }
        snapshot
    }

    /// Newest entry.
    pub fn peek(&self) -> Option<&Snapshot> {
        if self.len == 0 {
            return None;
        }
        self.slots[(self.head + self.len - 1) % self.capacity()].as_ref()
    }

    /// Entries from newest to oldest.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &Snapshot> {
        let cap = self.capacity();
        (0..self.len)
            .rev()
            .filter_map(move |i| self.slots[(self.head + i) % cap].as_ref())
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
        self.total_memory = 0;
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }
}

// ============================================================================
// HISTORY — paired undo/redo rings
// ============================================================================

#[derive(Debug)]
pub struct History {
    undo: SnapshotRing,
    redo: SnapshotRing,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_DEPTH)
    }
}

impl History {
    pub fn new(depth: usize) -> Self {
        Self { undo: SnapshotRing::new(depth), redo: SnapshotRing::new(depth) }
    }

    /// Record the canvas before a mutation. Discards the redo ring.
    pub fn push<S: PixelStore>(&mut self, bmp: &Bitmap<S>) {
        self.push_labeled("Edit", bmp);
    }

    pub fn push_labeled<S: PixelStore>(&mut self, description: impl Into<String>, bmp: &Bitmap<S>) {
        let snapshot = Snapshot::capture(description, bmp);
        debug!("history: push '{}' ({}x{})", snapshot.description, bmp.w, bmp.h);
        if let Some(evicted) = self.undo.push(snapshot) {
            debug!("history: evicted oldest snapshot '{}'", evicted.description);
        }
        self.redo.clear();
    }

    /// Step back. `current` goes onto the redo ring and the newest undo
    /// snapshot is returned for the caller to install. `None` when empty.
    pub fn undo<S: PixelStore>(&mut self, current: &Bitmap<S>) -> Option<Bitmap> {
        let snapshot = self.undo.pop()?;
        debug!("history: undo '{}'", snapshot.description);
        self.redo.push(Snapshot::capture(snapshot.description.clone(), current));
        Some(snapshot.bitmap)
    }

    /// Step forward. `current` goes back onto the undo ring; the redo ring
    /// is left intact so repeated redos keep walking forward.
    pub fn redo<S: PixelStore>(&mut self, current: &Bitmap<S>) -> Option<Bitmap> {
        let snapshot = self.redo.pop()?;
        debug!("history: redo '{}'", snapshot.description);
        self.undo.push(Snapshot::capture(snapshot.description.clone(), current));
        Some(snapshot.bitmap)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo.peek().map(|s| s.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo.peek().map(|s| s.description.as_str())
    }

    /// Get all undo descriptions (most recent first)
    pub fn undo_history(&self) -> Vec<&str> {
        self.undo.iter_newest_first().map(|s| s.description.as_str()).collect()
    }

    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    /// Bytes held by both rings.
    pub fn memory_usage(&self) -> usize {
        self.undo.memory_usage() + self.redo.memory_usage()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(v: u32) -> Bitmap {
        let mut bmp = Bitmap::new(3, 2);
        bmp.clear(v);
        bmp
    }

    #[test]
    fn ring_evicts_oldest() {
        let mut ring = SnapshotRing::new(3);
        for i in 0..5 {
            ring.push(Snapshot::capture(format!("s{i}"), &solid(i)));
        }
        assert_eq!(ring.len(), 3);
        let names: Vec<_> = ring.iter_newest_first().map(|s| s.description.clone()).collect();
        assert_eq!(names, ["s4", "s3", "s2"]);
        assert_eq!(ring.pop().map(|s| s.description), Some("s4".to_string()));
        assert_eq!(ring.memory_usage(), 2 * 6 * 4);
    }

    #[test]
    fn ring_pop_after_wraparound() {
        let mut ring = SnapshotRing::new(2);
        ring.push(Snapshot::capture("a", &solid(1)));
        ring.push(Snapshot::capture("b", &solid(2)));
        ring.push(Snapshot::capture("c", &solid(3)));
        assert_eq!(ring.pop().map(|s| s.bitmap.getpixel(0, 0)), Some(3));
        assert_eq!(ring.pop().map(|s| s.bitmap.getpixel(0, 0)), Some(2));
        assert!(ring.pop().is_none());
        assert_eq!(ring.memory_usage(), 0);
    }

    #[test]
    fn empty_history_is_noop() {
        let mut history = History::default();
        assert!(history.undo(&solid(0)).is_none());
        assert!(history.redo(&solid(0)).is_none());
        assert_eq!(history.redo_count(), 0);
    }

    #[test]
    fn undo_then_redo_walks_both_ways() {
        let mut history = History::default();
        let before = solid(1);
        history.push(&before);
        let after = solid(2);

        let restored = history.undo(&after).unwrap();
        assert_eq!(restored, before);
        assert!(history.can_redo());

        let again = history.redo(&restored).unwrap();
        assert_eq!(again, after);
        assert_eq!(history.undo_count(), 1);
    }

    #[test]
    fn push_clears_redo() {
        let mut history = History::default();
        history.push(&solid(1));
        history.undo(&solid(2));
        assert!(history.can_redo());
        history.push_labeled("Fill", &solid(3));
        assert!(!history.can_redo());
        assert_eq!(history.undo_description(), Some("Fill"));
    }

    #[test]
    fn eleventh_push_drops_first() {
        let mut history = History::default();
        for i in 1..=11 {
            history.push(&solid(i));
        }
        let mut current = solid(12);
        let mut seen = Vec::new();
        while let Some(prev) = history.undo(&current) {
            seen.push(prev.getpixel(0, 0));
            current = prev;
        }
        assert_eq!(seen, (2..=11).rev().collect::<Vec<_>>());
    }
}
