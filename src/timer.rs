//! Phase-expiry timer queue: globally sorted by deadline, at most one
//! entry per room. The dispatcher loop (server module) pops expired
//! entries at least once a second and re-verifies the room's phase so
//! stale entries are dropped silently.
//!
//! Durability: the queue itself is in-memory; the durable source of truth
//! is `Room.phase_ends_at` in the store. On startup the queue is rebuilt
//! from every room sitting in a timed phase, and past deadlines drain on
//! the first tick.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use crate::game::room::{GamePhase, Room, RoomId};

/// One scheduled phase expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEntry {
    pub room_id: RoomId,
    pub phase: GamePhase,
    pub deadline: DateTime<Utc>,
}

#[derive(Default)]
struct Queue {
    /// Sorted by deadline; the room id disambiguates equal deadlines.
    by_deadline: BTreeMap<(DateTime<Utc>, RoomId), GamePhase>,
    by_room: HashMap<RoomId, DateTime<Utc>>,
}

/// Deadline queue shared between the engine (schedule/cancel) and the
/// dispatcher loop (pop). All operations are atomic under one lock.
#[derive(Default)]
pub struct TimerService {
    queue: Mutex<Queue>,
    notify: Notify,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the room's phase expiry, replacing any prior entry for
    /// the room. Wakes the dispatcher so immediate deadlines (early vote
    /// termination) fire without waiting for the next tick.
    pub fn schedule(&self, entry: TimerEntry) {
        {
            let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(old) = queue.by_room.remove(&entry.room_id) {
                queue.by_deadline.remove(&(old, entry.room_id));
            }
            queue
                .by_deadline
                .insert((entry.deadline, entry.room_id), entry.phase);
            queue.by_room.insert(entry.room_id, entry.deadline);
        }
        self.notify.notify_one();
    }

    /// Remove all entries for a room.
    pub fn cancel(&self, room_id: RoomId) {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(deadline) = queue.by_room.remove(&room_id) {
            queue.by_deadline.remove(&(deadline, room_id));
        }
    }

    /// Atomically pop every entry with `deadline <= now`.
    pub fn pop_expired(&self, now: DateTime<Utc>) -> Vec<TimerEntry> {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        let mut expired = Vec::new();
        while let Some((&(deadline, room_id), &phase)) = queue.by_deadline.iter().next() {
            if deadline > now {
                break;
            }
            queue.by_deadline.remove(&(deadline, room_id));
            queue.by_room.remove(&room_id);
            expired.push(TimerEntry {
                room_id,
                phase,
                deadline,
            });
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .by_room
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sleep until the next tick or an earlier wake-up from `schedule`.
    pub async fn wait_tick(&self, tick: Duration) {
        let _ = tokio::time::timeout(tick, self.notify.notified()).await;
    }

    /// Re-seed the queue from rooms persisted in a timed phase. Entries
    /// whose deadline already passed are scheduled at `now` and drain on
    /// the first dispatcher tick, which is how interrupted transitions
    /// resume after a restart.
    pub fn rebuild(&self, rooms: &[Room], now: DateTime<Utc>) {
        for room in rooms {
            let Some(ends_at) = room.phase_ends_at else {
                continue;
            };
            if !room.phase.is_timed() {
                continue;
            }
            self.schedule(TimerEntry {
                room_id: room.id,
                phase: room.phase,
                deadline: ends_at.max(now),
            });
        }
    }
}
