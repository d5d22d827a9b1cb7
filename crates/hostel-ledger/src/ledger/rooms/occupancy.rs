//! Occupancy mutations. Every function leaves `0 <= current_occupancy <= capacity`
//! and `current_occupancy == occupants.len()`.

use tracing::debug;

use super::domain::{MaintenanceStatus, Room, RoomStatus};
use crate::ledger::error::{LedgerError, RecordKind};
use crate::ledger::ids::StudentId;

/// Reasons a room can refuse new occupants, `None` when it can take one.
pub fn availability_error(room: &Room) -> Option<LedgerError> {
    if room.maintenance_status != MaintenanceStatus::None {
        return Some(LedgerError::unavailable(
            &room.id,
            format!("maintenance status is {}", room.maintenance_status.label()),
        ));
    }
    if !matches!(room.status, RoomStatus::Available | RoomStatus::Occupied) {
        return Some(LedgerError::unavailable(
            &room.id,
            format!("room status is {}", room.status.label()),
        ));
    }
    if room.is_full() {
        return Some(LedgerError::RoomFull {
            room: room.id.clone(),
            capacity: room.capacity,
        });
    }
    None
}

pub fn allocate(room: &mut Room, student: &StudentId) -> Result<(), LedgerError> {
    if let Some(error) = availability_error(room) {
        return Err(error);
    }
    if room.has_occupant(student) {
        return Err(LedgerError::Conflict(format!(
            "student {student} already occupies room {}",
            room.id
        )));
    }

    room.occupants.push(student.clone());
    room.current_occupancy += 1;
    room.status = RoomStatus::Occupied;
    debug!(room = %room.id, %student, occupancy = room.current_occupancy, "bed allocated");
    Ok(())
}

pub fn release(room: &mut Room, student: &StudentId) -> Result<(), LedgerError> {
    let position = room
        .occupants
        .iter()
        .position(|occupant| occupant == student)
        .ok_or_else(|| {
            LedgerError::not_found(RecordKind::Occupant, format!("{student} in room {}", room.id))
        })?;

    room.occupants.remove(position);
    room.current_occupancy = room.current_occupancy.saturating_sub(1);
    if room.current_occupancy == 0 {
        room.status = if room.maintenance_status == MaintenanceStatus::None {
            RoomStatus::Available
        } else {
            RoomStatus::Maintenance
        };
    }
    debug!(room = %room.id, %student, occupancy = room.current_occupancy, "bed released");
    Ok(())
}

/// Move `student` between rooms. Both rooms are updated or neither is.
pub fn transfer(from: &mut Room, to: &mut Room, student: &StudentId) -> Result<(), LedgerError> {
    if from.id == to.id {
        return Err(LedgerError::validation(
            "source and target rooms must differ",
        ));
    }

    let mut staged_from = from.clone();
    let mut staged_to = to.clone();
    release(&mut staged_from, student)?;
    allocate(&mut staged_to, student)?;

    *from = staged_from;
    *to = staged_to;
    Ok(())
}
