use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::ids::{RoomId, StudentId};
use super::rooms::Gender;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomAllocationStatus {
    #[default]
    None,
    PendingPayment,
    Confirmed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentPaymentStatus {
    #[default]
    NotStarted,
    PaymentPending,
    Paid,
    Failed,
}

/// Enrollment input accepted from the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDraft {
    pub name: String,
    pub gender: Gender,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub gender: Gender,
    pub room: Option<RoomId>,
    pub room_allocation_status: RoomAllocationStatus,
    pub payment_status: StudentPaymentStatus,
    /// Full room price owed by this student alone.
    pub amount_to_pay: u64,
}

impl Student {
    pub fn enroll(id: StudentId, draft: StudentDraft) -> Result<Self, LedgerError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::validation("student name is required"));
        }
        Ok(Self {
            id,
            name,
            gender: draft.gender,
            room: None,
            room_allocation_status: RoomAllocationStatus::None,
            payment_status: StudentPaymentStatus::NotStarted,
            amount_to_pay: 0,
        })
    }

    pub fn assign_room(&mut self, room: RoomId, amount_to_pay: u64) {
        self.room = Some(room);
        self.amount_to_pay = amount_to_pay;
        if amount_to_pay == 0 {
            self.confirm_payment();
        } else {
            self.room_allocation_status = RoomAllocationStatus::PendingPayment;
            self.payment_status = StudentPaymentStatus::PaymentPending;
        }
    }

    /// Confirmation requires a room; without one this is a no-op.
    pub fn confirm_payment(&mut self) {
        if self.room.is_some() {
            self.room_allocation_status = RoomAllocationStatus::Confirmed;
            self.payment_status = StudentPaymentStatus::Paid;
        }
    }

    pub fn vacate(&mut self) {
        self.room = None;
        self.amount_to_pay = 0;
        self.room_allocation_status = RoomAllocationStatus::None;
        self.payment_status = StudentPaymentStatus::NotStarted;
    }
}
