use std::collections::VecDeque;

/// Fixed-capacity, insertion-ordered window of slots.
///
/// The window always holds exactly `capacity` slots; a slot is either
/// occupied or empty. Pushing evicts whatever sits at index 0 (occupied or
/// not) and appends at the tail. Clearing a slot leaves every other slot
/// where it was, so positions stay stable for operators addressing notes by
/// index.
#[derive(Debug, Clone)]
pub struct BoundedWindow<T> {
    slots: VecDeque<Option<T>>,
}

impl<T> BoundedWindow<T> {
    pub fn new(capacity: usize) -> Self {
        let mut slots = VecDeque::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Evict slot 0 and append `item` at the tail.
    pub fn push(&mut self, item: T) {
        if self.slots.is_empty() {
            return;
        }
        self.slots.pop_front();
        self.slots.push_back(Some(item));
    }

    /// Occupied slots in their original relative order. Re-reading does not consume.
    pub fn items(&self) -> impl Iterator<Item = &T> + Clone + '_ {
        self.slots.iter().flatten()
    }

    /// Occupied slots together with their slot index.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (i, item)))
    }

    pub fn slot(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Empty slot `index` without shifting the others, returning what it held.
    /// Callers validate `index` against [`capacity`](Self::capacity); an
    /// out-of-range index is a no-op.
    pub fn take(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn clear(&mut self, index: usize) {
        self.take(index);
    }

    /// Overwrite an occupied slot in place. Returns the previous item, or
    /// `None` (and leaves the window untouched) if the slot was empty.
    pub fn replace(&mut self, index: usize, item: T) -> Option<T> {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_some() => slot.replace(item),
            _ => None,
        }
    }

    /// Index of the first occupied slot matching `pred`.
    pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(&mut pred))
    }

    pub fn occupied(&self) -> usize {
        self.items().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}
