use serde::{Deserialize, Serialize};

use crate::ledger::error::LedgerError;
use crate::ledger::ids::{RoomId, StudentId};
use crate::ledger::pricing::{Amenities, PriceBreakdown, PriceCalculator, RoomType, MAX_FAN_COUNT};

pub const MIN_CAPACITY: u8 = 1;
pub const MAX_CAPACITY: u8 = 6;
pub const MAX_FLOOR: u8 = 8;

/// Gender restriction applied to a room's occupants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Boys,
    Girls,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Boys => "boys",
            Self::Girls => "girls",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
    Reserved,
    Blocked,
}

impl RoomStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
            Self::Reserved => "reserved",
            Self::Blocked => "blocked",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    None,
    UnderMaintenance,
    Blocked,
}

impl MaintenanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::UnderMaintenance => "under_maintenance",
            Self::Blocked => "blocked",
        }
    }
}

/// The compound key that must be unique across the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomIdentity {
    pub room_number: String,
    #[serde(default)]
    pub block: String,
    pub gender: Gender,
}

impl RoomIdentity {
    pub fn normalized(&self) -> Self {
        Self {
            room_number: self.room_number.trim().to_string(),
            block: self.block.trim().to_string(),
            gender: self.gender,
        }
    }
}

/// Admin input used to create a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDraft {
    pub identity: RoomIdentity,
    pub floor: u8,
    pub room_type: RoomType,
    pub capacity: u8,
    #[serde(default)]
    pub amenities: Amenities,
    #[serde(default = "default_allow_room_changes")]
    pub allow_room_changes: bool,
}

fn default_allow_room_changes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub identity: RoomIdentity,
    pub floor: u8,
    pub room_type: RoomType,
    pub capacity: u8,
    pub current_occupancy: u8,
    pub occupants: Vec<StudentId>,
    pub amenities: Amenities,
    pub base_price: u64,
    pub amenities_price: u64,
    pub total_price: u64,
    pub status: RoomStatus,
    pub maintenance_status: MaintenanceStatus,
    pub allow_room_changes: bool,
}

impl Room {
    /// Build a priced, empty room from admin input.
    pub fn from_draft(
        id: RoomId,
        draft: RoomDraft,
        calculator: &PriceCalculator,
    ) -> Result<Self, LedgerError> {
        validate_shape(draft.capacity, draft.floor, &draft.amenities)?;
        let identity = draft.identity.normalized();
        if identity.room_number.is_empty() {
            return Err(LedgerError::validation("room number is required"));
        }

        let price = calculator.compute_price(draft.room_type, &draft.amenities);
        let mut room = Self {
            id,
            identity,
            floor: draft.floor,
            room_type: draft.room_type,
            capacity: draft.capacity,
            current_occupancy: 0,
            occupants: Vec::new(),
            amenities: draft.amenities,
            base_price: 0,
            amenities_price: 0,
            total_price: 0,
            status: RoomStatus::Available,
            maintenance_status: MaintenanceStatus::None,
            allow_room_changes: draft.allow_room_changes,
        };
        room.apply_price(price);
        Ok(room)
    }

    pub fn price(&self) -> PriceBreakdown {
        PriceBreakdown {
            base_price: self.base_price,
            amenities_price: self.amenities_price,
            total_price: self.total_price,
        }
    }

    /// Replace amenities and recompute every price field from them.
    pub fn reprice(
        &mut self,
        amenities: Amenities,
        calculator: &PriceCalculator,
    ) -> Result<PriceBreakdown, LedgerError> {
        validate_shape(self.capacity, self.floor, &amenities)?;
        self.amenities = amenities;
        let price = calculator.compute_price(self.room_type, &self.amenities);
        self.apply_price(price);
        Ok(price)
    }

    pub fn set_maintenance(&mut self, maintenance: MaintenanceStatus) {
        self.maintenance_status = maintenance;
        self.status = match maintenance {
            MaintenanceStatus::None if self.current_occupancy > 0 => RoomStatus::Occupied,
            MaintenanceStatus::None => RoomStatus::Available,
            MaintenanceStatus::UnderMaintenance | MaintenanceStatus::Blocked => {
                RoomStatus::Maintenance
            }
        };
    }

    pub fn is_full(&self) -> bool {
        self.current_occupancy >= self.capacity
    }

    pub fn available_slots(&self) -> u8 {
        self.capacity.saturating_sub(self.current_occupancy)
    }

    pub fn has_occupant(&self, student: &StudentId) -> bool {
        self.occupants.iter().any(|occupant| occupant == student)
    }

    pub fn label(&self) -> String {
        if self.identity.block.is_empty() {
            self.identity.room_number.clone()
        } else {
            format!("{}-{}", self.identity.block, self.identity.room_number)
        }
    }

    fn apply_price(&mut self, price: PriceBreakdown) {
        self.base_price = price.base_price;
        self.amenities_price = price.amenities_price;
        self.total_price = price.base_price + price.amenities_price;
    }
}

fn validate_shape(capacity: u8, floor: u8, amenities: &Amenities) -> Result<(), LedgerError> {
    if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
        return Err(LedgerError::validation(format!(
            "capacity must be between {MIN_CAPACITY} and {MAX_CAPACITY}, found {capacity}"
        )));
    }
    if floor > MAX_FLOOR {
        return Err(LedgerError::validation(format!(
            "floor must be between 0 and {MAX_FLOOR}, found {floor}"
        )));
    }
    if amenities.fan_count > MAX_FAN_COUNT {
        return Err(LedgerError::validation(format!(
            "fan count must be at most {MAX_FAN_COUNT}, found {}",
            amenities.fan_count
        )));
    }
    Ok(())
}
