//! Room inventory and occupancy bookkeeping.

pub mod domain;
pub mod occupancy;

pub use domain::{
    Gender, MaintenanceStatus, Room, RoomDraft, RoomIdentity, RoomStatus, MAX_CAPACITY,
    MIN_CAPACITY,
};
pub use occupancy::{allocate, availability_error, release, transfer};
