//! Register cache, listener dispatch and the pending-write queue
//!
//! Listeners live in one arena (`Vec`) in registration order; an ordered map
//! from address to arena indices finds the listeners of an address without
//! scanning the whole arena. Callbacks only receive the raw value, so they
//! cannot reach back into the cache and register more listeners while a
//! dispatch is running.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::debug;

/// Consumer callback invoked with the raw 16-bit value of an updated register.
pub type RegisterCallback = Box<dyn FnMut(u16)>;

struct Listener {
    address: u16,
    callback: RegisterCallback,
}

/// Last known register values plus the consumers interested in them.
#[derive(Default)]
pub struct RegisterCache {
    values: HashMap<u16, u16>,
    listeners: Vec<Listener>,
    by_address: BTreeMap<u16, Vec<usize>>,
    pending_writes: Vec<(u16, u16)>,
}

impl RegisterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value and run every listener of that address in registration order.
    pub fn update(&mut self, address: u16, value: u16) {
        self.values.insert(address, value);
        if let Some(indices) = self.by_address.get(&address) {
            for &index in indices {
                (self.listeners[index].callback)(value);
            }
        }
    }

    /// Last value seen for `address`, if any.
    #[inline]
    pub fn get(&self, address: u16) -> Option<u16> {
        self.values.get(&address).copied()
    }

    /// Number of addresses with a cached value.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Add a listener. Registering the same callback twice makes it fire twice.
    pub fn register_listener(&mut self, address: u16, callback: RegisterCallback) {
        let index = self.listeners.len();
        self.listeners.push(Listener { address, callback });
        self.by_address.entry(address).or_default().push(index);
    }

    #[inline]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Queue a write for the next idle opportunity. Does no I/O.
    pub fn enqueue_write(&mut self, address: u16, value: u16) {
        self.pending_writes.push((address, value));
        debug!("Queued write: register {} = {}", address, value);
    }

    #[inline]
    pub fn has_pending_writes(&self) -> bool {
        !self.pending_writes.is_empty()
    }

    #[inline]
    pub fn pending_writes(&self) -> &[(u16, u16)] {
        &self.pending_writes
    }

    /// Remove and return up to `max` queued writes, oldest first.
    pub fn take_writes(&mut self, max: usize) -> Vec<(u16, u16)> {
        let count = self.pending_writes.len().min(max);
        self.pending_writes.drain(..count).collect()
    }
}

/// What a consumer entity sees of the driver.
///
/// Implemented by [`AuroraDriver`](crate::driver::AuroraDriver) and by the bare
/// [`RegisterCache`], where writes only land in the pending queue.
pub trait RegisterAccess {
    fn register_listener(&mut self, address: u16, callback: RegisterCallback);

    fn write_register(&mut self, address: u16, value: u16);

    fn get_register(&self, address: u16) -> Option<u16>;
}

impl RegisterAccess for RegisterCache {
    fn register_listener(&mut self, address: u16, callback: RegisterCallback) {
        RegisterCache::register_listener(self, address, callback);
    }

    fn write_register(&mut self, address: u16, value: u16) {
        self.enqueue_write(address, value);
    }

    fn get_register(&self, address: u16) -> Option<u16> {
        self.get(address)
    }
}

impl fmt::Debug for RegisterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterCache")
            .field("values", &self.values.len())
            .field("listeners", &self.listeners.len())
            .field(
                "listened_addresses",
                &self.listeners.iter().map(|l| l.address).collect::<Vec<_>>(),
            )
            .field("pending_writes", &self.pending_writes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<(&'static str, u16)>>>, tag: &'static str) -> RegisterCallback {
        let log = Rc::clone(log);
        Box::new(move |value| log.borrow_mut().push((tag, value)))
    }

    #[test]
    fn test_get_absent_until_updated() {
        let mut cache = RegisterCache::new();
        assert_eq!(cache.get(745), None);
        cache.update(745, 680);
        assert_eq!(cache.get(745), Some(680));
        cache.update(745, 690);
        assert_eq!(cache.get(745), Some(690));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_listeners_fire_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut cache = RegisterCache::new();
        cache.register_listener(747, recorder(&log, "first"));
        cache.register_listener(746, recorder(&log, "other"));
        cache.register_listener(747, recorder(&log, "second"));

        cache.update(747, 710);
        assert_eq!(*log.borrow(), vec![("first", 710), ("second", 710)]);
    }

    #[test]
    fn test_duplicate_registration_fires_twice() {
        let count = Rc::new(RefCell::new(0));
        let mut cache = RegisterCache::new();
        for _ in 0..2 {
            let count = Rc::clone(&count);
            cache.register_listener(30, Box::new(move |_| *count.borrow_mut() += 1));
        }
        cache.update(30, 9);
        assert_eq!(*count.borrow(), 2);
        assert_eq!(cache.listener_count(), 2);
    }

    #[test]
    fn test_unlistened_address_is_cached_silently() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut cache = RegisterCache::new();
        cache.register_listener(1, recorder(&log, "one"));
        cache.update(2, 5);
        assert!(log.borrow().is_empty());
        assert_eq!(cache.get(2), Some(5));
    }

    #[test]
    fn test_write_queue_drains_in_order() {
        let mut cache = RegisterCache::new();
        cache.enqueue_write(12619, 700);
        cache.enqueue_write(12620, 730);
        cache.enqueue_write(12606, 3);
        assert!(cache.has_pending_writes());

        assert_eq!(cache.take_writes(2), vec![(12619, 700), (12620, 730)]);
        assert_eq!(cache.pending_writes(), &[(12606, 3)]);
        assert_eq!(cache.take_writes(10), vec![(12606, 3)]);
        assert!(!cache.has_pending_writes());
    }
}
