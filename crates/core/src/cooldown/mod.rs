//! Per-user cooldown gating ticket creation.
//!
//! Records are spread over independently locked shards so unrelated users
//! never contend on one global lock. Every decision for a given user happens
//! under that user's shard lock, which rules out two concurrent attempts both
//! passing the check.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::ticket::UserId;

const SHARD_COUNT: usize = 16;

/// Proof that an attempt passed the guard. Hand it back to
/// [`CooldownGuard::rollback`] if the attempt is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownMark {
    pub user_id: UserId,
    pub marked_at: DateTime<Utc>,
    previous: Option<DateTime<Utc>>,
}

/// Outcome of [`CooldownGuard::check_and_mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Allowed(CooldownMark),
    Blocked { remaining: Duration },
}

impl CooldownDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownDecision::Allowed(_))
    }
}

type Shard = HashMap<UserId, DateTime<Utc>>;

/// Sharded per-user rate limiter with a single uniform window.
pub struct CooldownGuard {
    window: Duration,
    window_delta: TimeDelta,
    max_entries_per_shard: usize,
    shards: Vec<Mutex<Shard>>,
}

impl CooldownGuard {
    /// Create a guard. `max_entries` bounds memory; a value of 0 disables the bound.
    pub fn new(window: Duration, max_entries: usize) -> Self {
        let max_entries_per_shard = if max_entries == 0 {
            usize::MAX
        } else {
            max_entries.div_ceil(SHARD_COUNT).max(1)
        };
        Self {
            window,
            window_delta: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
            max_entries_per_shard,
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn shard(&self, user_id: UserId) -> MutexGuard<'_, Shard> {
        let mut hasher = DefaultHasher::new();
        user_id.hash(&mut hasher);
        let index = (hasher.finish() as usize) % SHARD_COUNT;
        // The map holds plain timestamps, so a poisoned shard is still consistent.
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Allow the attempt and record `now`, or report how long the user must wait.
    ///
    /// A blocked attempt leaves the record untouched, so retrying while blocked
    /// never extends the window.
    pub fn check_and_mark(&self, user_id: UserId, now: DateTime<Utc>) -> CooldownDecision {
        let mut shard = self.shard(user_id);
        let previous = shard.get(&user_id).copied();

        if let Some(last) = previous {
            let elapsed = (now - last).max(TimeDelta::zero());
            if elapsed < self.window_delta {
                let remaining = (self.window_delta - elapsed).to_std().unwrap_or_default();
                return CooldownDecision::Blocked { remaining };
            }
        }

        if previous.is_none() && shard.len() >= self.max_entries_per_shard {
            self.evict(&mut shard, now);
        }
        shard.insert(user_id, now);

        CooldownDecision::Allowed(CooldownMark {
            user_id,
            marked_at: now,
            previous,
        })
    }

    /// Undo a mark, restoring the previous timestamp.
    ///
    /// Compare-and-set: nothing happens if the record changed since the mark
    /// was taken. Returns whether the record was restored.
    pub fn rollback(&self, mark: &CooldownMark) -> bool {
        let mut shard = self.shard(mark.user_id);
        if shard.get(&mark.user_id) != Some(&mark.marked_at) {
            return false;
        }
        match mark.previous {
            Some(previous) => {
                shard.insert(mark.user_id, previous);
            }
            None => {
                shard.remove(&mark.user_id);
            }
        }
        true
    }

    pub fn last_issued_at(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.shard(user_id).get(&user_id).copied()
    }

    /// Number of tracked users.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop records whose window has fully elapsed. Returns how many were removed.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        self.shards
            .iter()
            .map(|s| {
                let mut shard = s.lock().unwrap_or_else(PoisonError::into_inner);
                let before = shard.len();
                shard.retain(|_, last| now - *last < self.window_delta);
                before - shard.len()
            })
            .sum()
    }

    /// Make room in a full shard: expired records first, then the oldest one.
    fn evict(&self, shard: &mut Shard, now: DateTime<Utc>) {
        shard.retain(|_, last| now - *last < self.window_delta);
        if shard.len() < self.max_entries_per_shard {
            return;
        }
        if let Some(oldest) = shard.iter().min_by_key(|(_, last)| **last).map(|(id, _)| *id) {
            shard.remove(&oldest);
            tracing::debug!(user = %oldest, "Evicted cooldown record to bound memory");
        }
    }
}
