//! In-process bookkeeping: one slot per ticket and one lock per user.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

use crate::ticket::{Ticket, TicketNumber};

/// A ticket's slot. Holding the lock serializes every transition of that
/// ticket, including gateway calls made on its behalf. `None` means the
/// ticket is not loaded yet.
pub(crate) type TicketSlot = Arc<AsyncMutex<Option<Ticket>>>;

/// Deleted tickets kept in memory so a repeated delete still sees `Deleted`.
pub(crate) const RETAINED_DELETED: usize = 1024;

/// Known tickets, keyed by number.
///
/// Deleted tickets are kept up to a fixed count, oldest evicted first. An
/// evicted number resolves as not found, since its container is gone.
pub(crate) struct TicketRegistry {
    slots: Mutex<HashMap<TicketNumber, TicketSlot>>,
    retired: Mutex<VecDeque<TicketNumber>>,
    retain_deleted: usize,
}

impl Default for TicketRegistry {
    fn default() -> Self {
        Self::new(RETAINED_DELETED)
    }
}

impl TicketRegistry {
    pub fn new(retain_deleted: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            retired: Mutex::new(VecDeque::new()),
            retain_deleted,
        }
    }

    /// The slot for `number`, created empty if unknown.
    pub fn slot(&self, number: TicketNumber) -> TicketSlot {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(number)
            .or_default()
            .clone()
    }

    /// Current view of a ticket. Waits for any in-flight transition.
    pub async fn get(&self, number: TicketNumber) -> Option<Ticket> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&number)
            .cloned()?;
        let entry = slot.lock().await;
        entry.clone()
    }

    /// Forget the slot for `number` if it holds no ticket and nobody else
    /// references it. The caller must have dropped its own handle.
    pub fn discard_if_vacant(&self, number: TicketNumber) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let vacant = slots.get(&number).is_some_and(|slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|entry| entry.is_none())
        });
        if vacant {
            slots.remove(&number);
        }
        vacant
    }

    /// Note that `number` reached `Deleted`, evicting the oldest deleted
    /// tickets beyond the retention limit.
    pub fn retire(&self, number: TicketNumber) {
        let mut retired = self.retired.lock().unwrap_or_else(PoisonError::into_inner);
        retired.push_back(number);
        if retired.len() <= self.retain_deleted {
            return;
        }
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        while retired.len() > self.retain_deleted {
            if let Some(evicted) = retired.pop_front() {
                slots.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Async mutexes handed out per key and dropped once nobody holds them.
pub(crate) struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash + Copy> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The lock for `key`. Pass it back to [`KeyedLocks::release`] when done.
    pub fn acquire(&self, key: K) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone()
    }

    /// Drop our reference and forget the key if no one else is waiting.
    pub fn release(&self, key: K, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks.get(&key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&key);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{ChannelId, TicketCategory, UserId};
    use chrono::Utc;

    fn ticket(number: u64) -> Ticket {
        Ticket::new(
            TicketNumber(number),
            UserId(2),
            TicketCategory::Other,
            ChannelId(number + 100),
            Utc::now(),
        )
    }

    async fn store(registry: &TicketRegistry, ticket: Ticket) {
        let slot = registry.slot(ticket.number);
        *slot.lock().await = Some(ticket);
    }

    #[tokio::test]
    async fn test_slot_is_shared() {
        let registry = TicketRegistry::default();
        store(&registry, ticket(1)).await;

        let a = registry.slot(TicketNumber(1));
        let b = registry.slot(TicketNumber(1));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.get(TicketNumber(1)).await.unwrap().owner_id, UserId(2));
        assert!(registry.get(TicketNumber(9)).await.is_none());
    }

    #[tokio::test]
    async fn test_vacant_slot_is_discarded() {
        let registry = TicketRegistry::default();
        store(&registry, ticket(1)).await;

        let empty = registry.slot(TicketNumber(2));
        // Still referenced.
        assert!(!registry.discard_if_vacant(TicketNumber(2)));
        drop(empty);
        assert!(registry.discard_if_vacant(TicketNumber(2)));

        // Occupied slots stay.
        assert!(!registry.discard_if_vacant(TicketNumber(1)));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_retired_tickets_are_bounded() {
        let registry = TicketRegistry::new(2);
        for n in 1..=4 {
            store(&registry, ticket(n)).await;
            registry.retire(TicketNumber(n));
        }
        store(&registry, ticket(5)).await;

        assert_eq!(registry.len(), 3);
        assert!(registry.get(TicketNumber(1)).await.is_none());
        assert!(registry.get(TicketNumber(2)).await.is_none());
        assert!(registry.get(TicketNumber(3)).await.is_some());
        assert!(registry.get(TicketNumber(5)).await.is_some());
    }

    #[tokio::test]
    async fn test_keyed_locks_are_released() {
        let locks: KeyedLocks<u64> = KeyedLocks::new();

        let first = locks.acquire(1);
        let second = locks.acquire(1);
        assert!(Arc::ptr_eq(&first, &second));

        locks.release(1, first);
        assert_eq!(locks.len(), 1);
        locks.release(1, second);
        assert_eq!(locks.len(), 0);
    }
}
