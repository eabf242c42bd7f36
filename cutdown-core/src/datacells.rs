use core::cell::Cell;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// A single-slot cell holding the latest value of something, safe to
/// touch from the tick path and from a collaborator task.
///
/// Writers overwrite, readers copy out; there is no queueing and no
/// blocking. This is the only sharing primitive the core offers its
/// collaborators: a latest-value slot, never shared mutation.
pub struct DataCell<T: Copy> {
    slot: Mutex<CriticalSectionRawMutex, Cell<T>>,
}

impl<T: Copy> DataCell<T> {
    pub const fn new(initial: T) -> Self {
        Self {
            slot: Mutex::new(Cell::new(initial)),
        }
    }

    /// Overwrites the slot with a new value.
    pub fn store(&self, value: T) {
        self.slot.lock(|cell| cell.set(value));
    }

    /// Copies out the latest value.
    pub fn load(&self) -> T {
        self.slot.lock(|cell| cell.get())
    }

    /// Replaces the slot's value, returning the previous one. Used for
    /// consume-on-read signals.
    pub fn swap(&self, value: T) -> T {
        self.slot.lock(|cell| cell.replace(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_load() {
        let cell = DataCell::new(0u32);
        assert_eq!(cell.load(), 0);
        cell.store(17);
        assert_eq!(cell.load(), 17);
    }

    #[test]
    fn swap_consumes_a_signal() {
        let cell = DataCell::new(false);
        cell.store(true);
        assert!(cell.swap(false));
        assert!(!cell.swap(false));
    }
}
