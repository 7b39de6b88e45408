//! Registry of active (non-terminal) rooms.

use dashmap::DashMap;

use crate::game::room::RoomId;

/// Lightweight handle for an active room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub room_id: RoomId,
    pub code: String,
}

/// Map of room id to active handle. Rooms are registered at creation,
/// dropped on entry to a terminal state, and drained on shutdown.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, RoomHandle>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, room_id: RoomId, code: String) {
        self.rooms.insert(room_id, RoomHandle { room_id, code });
    }

    pub fn deregister(&self, room_id: RoomId) {
        self.rooms.remove(&room_id);
    }

    pub fn contains(&self, room_id: RoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    pub fn active_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn active_rooms(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|r| r.room_id).collect()
    }

    /// Remove and return every handle; used by graceful shutdown.
    pub fn drain(&self) -> Vec<RoomHandle> {
        let handles: Vec<RoomHandle> = self.rooms.iter().map(|r| r.clone()).collect();
        self.rooms.clear();
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn register_lookup_deregister() {
        let registry = RoomRegistry::new();
        let room_id = Uuid::new_v4();
        registry.register(room_id, "AB12CD".to_string());
        assert!(registry.contains(room_id));
        assert_eq!(registry.active_count(), 1);

        registry.deregister(room_id);
        assert!(!registry.contains(room_id));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn drain_empties_the_registry() {
        let registry = RoomRegistry::new();
        registry.register(Uuid::new_v4(), "AAAAAA".to_string());
        registry.register(Uuid::new_v4(), "BBBBBB".to_string());
        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(registry.active_count(), 0);
    }
}
