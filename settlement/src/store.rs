//! Injected store abstractions for rooms and settlement records
//!
//! The engine only ever talks to these traits. The in-memory
//! implementations back tests and development; a relational store slots
//! in behind the same seams without touching the engine.

use crate::types::{Room, RoomStatus, SettlementRecord};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use wallet_core::{RoomId, UserId};

/// Room lookups and updates
pub trait RoomStore: Send + Sync {
    /// Fetch a room by ID
    fn get(&self, room_id: &RoomId) -> Result<Option<Room>>;

    /// Insert or replace a room
    fn put(&self, room: Room) -> Result<()>;

    /// All rooms currently open to new participants
    fn list_open(&self) -> Result<Vec<Room>>;
}

/// Settlement record persistence, keyed by (room, user)
pub trait SettlementStore: Send + Sync {
    /// Fetch one member's record
    fn get(&self, room_id: &RoomId, user_id: &UserId) -> Result<Option<SettlementRecord>>;

    /// Insert or replace one member's record
    fn upsert(&self, record: SettlementRecord) -> Result<()>;

    /// All records for a room
    fn list_for_room(&self, room_id: &RoomId) -> Result<Vec<SettlementRecord>>;
}

/// In-memory room store
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<RoomId, Room>>,
}

impl MemoryRoomStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryRoomStore {
    fn get(&self, room_id: &RoomId) -> Result<Option<Room>> {
        Ok(self.rooms.read().get(room_id).cloned())
    }

    fn put(&self, room: Room) -> Result<()> {
        self.rooms.write().insert(room.room_id.clone(), room);
        Ok(())
    }

    fn list_open(&self) -> Result<Vec<Room>> {
        Ok(self
            .rooms
            .read()
            .values()
            .filter(|r| r.status == RoomStatus::Open)
            .cloned()
            .collect())
    }
}

/// In-memory settlement record store
#[derive(Default)]
pub struct MemorySettlementStore {
    records: RwLock<HashMap<(RoomId, UserId), SettlementRecord>>,
}

impl MemorySettlementStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettlementStore for MemorySettlementStore {
    fn get(&self, room_id: &RoomId, user_id: &UserId) -> Result<Option<SettlementRecord>> {
        Ok(self
            .records
            .read()
            .get(&(room_id.clone(), user_id.clone()))
            .cloned())
    }

    fn upsert(&self, record: SettlementRecord) -> Result<()> {
        if record.room_id.as_str().is_empty() {
            return Err(Error::Store("Record missing room ID".to_string()));
        }
        self.records
            .write()
            .insert((record.room_id.clone(), record.user_id.clone()), record);
        Ok(())
    }

    fn list_for_room(&self, room_id: &RoomId) -> Result<Vec<SettlementRecord>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| &r.room_id == room_id)
            .cloned()
            .collect())
    }
}
