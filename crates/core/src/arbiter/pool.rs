use std::sync::Mutex;

use rand::Rng;

use crate::memory::window::BoundedWindow;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("message does not exist in pool")]
    NotFound,
    #[error("slot {index} out of range (capacity {capacity})")]
    IndexOutOfRange { index: usize, capacity: usize },
}

/// Fixed-capacity pool of pending chat messages.
///
/// Insertion evicts slot 0 like [`BoundedWindow`]; extraction picks a
/// uniformly random occupied slot and empties it in place. Slot position
/// carries no priority, only occupancy does.
#[derive(Debug)]
pub struct EvictionPool {
    slots: Mutex<BoundedWindow<String>>,
}

impl EvictionPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(BoundedWindow::new(capacity)),
        }
    }

    pub fn add(&self, text: impl Into<String>) {
        let mut slots = self.lock();
        if slots.slot(0).is_some() {
            tracing::debug!("chat pool full, oldest pending message evicted");
        }
        slots.push(text.into());
    }

    /// Remove and return a random pending message.
    pub fn pick(&self) -> Option<String> {
        let mut slots = self.lock();
        if slots.is_empty() {
            return None;
        }
        let mut rng = rand::rng();
        loop {
            let index = rng.random_range(0..slots.capacity());
            if let Some(text) = slots.take(index) {
                return Some(text);
            }
        }
    }

    /// Replace the first pending message equal to `old` with `new`, keeping its slot.
    pub fn edit(&self, old: &str, new: impl Into<String>) -> Result<(), PoolError> {
        let mut slots = self.lock();
        let index = slots.position(|text| text == old).ok_or(PoolError::NotFound)?;
        slots.replace(index, new.into());
        Ok(())
    }

    /// Drop whatever sits in slot `index` without disturbing the others.
    pub fn delete(&self, index: usize) -> Result<(), PoolError> {
        let mut slots = self.lock();
        let capacity = slots.capacity();
        if index >= capacity {
            return Err(PoolError::IndexOutOfRange { index, capacity });
        }
        slots.clear(index);
        Ok(())
    }

    /// Pending messages with their slot index, for display.
    pub fn snapshot(&self) -> Vec<(usize, String)> {
        self.lock()
            .indexed()
            .map(|(i, text)| (i, text.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().occupied()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BoundedWindow<String>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}
