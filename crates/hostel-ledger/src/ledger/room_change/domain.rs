use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ledger::error::LedgerError;
use crate::ledger::fees::Fee;
use crate::ledger::ids::{RoomChangeId, RoomId, StudentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomChangeStatus {
    Pending,
    PendingPayment,
    UnderReview,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl RoomChangeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingPayment => "pending_payment",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }

    /// Open requests block a second submission by the same student.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::PendingPayment | Self::UnderReview)
    }

    pub const fn initial(upgrade_payment_required: u64) -> Self {
        if upgrade_payment_required > 0 {
            Self::PendingPayment
        } else {
            Self::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomChangeAction {
    PaymentSettled,
    BeginReview,
    Approve,
    Complete,
    Reject,
    Cancel,
}

impl RoomChangeAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PaymentSettled => "settle the upgrade payment of",
            Self::BeginReview => "review",
            Self::Approve => "approve",
            Self::Complete => "complete",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradePaymentStatus {
    NotRequired,
    Pending,
    Paid,
}

impl UpgradePaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotRequired => "not_required",
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

/// Student-facing submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomChangeSubmission {
    pub student: StudentId,
    pub requested_room: RoomId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomChangeRequest {
    pub id: RoomChangeId,
    pub student: StudentId,
    pub current_room: RoomId,
    pub requested_room: RoomId,
    pub reason: String,
    pub current_room_price: u64,
    pub requested_room_price: u64,
    pub price_difference: i64,
    pub already_paid_surplus: u64,
    pub upgrade_payment_required: u64,
    pub downgrade_wallet_credit: u64,
    pub payment_status: UpgradePaymentStatus,
    /// Fee-shaped obligation for the upgrade; recorded in the fee table on approval.
    pub upgrade_obligation: Option<Fee>,
    pub status: RoomChangeStatus,
    pub rejection_reason: Option<String>,
    pub admin_notes: Option<String>,
    pub submitted_on: NaiveDate,
    pub reviewed_on: Option<NaiveDate>,
    pub completed_on: Option<NaiveDate>,
    pub old_room_occupancy_before: Option<u8>,
    pub new_room_occupancy_before: Option<u8>,
}

impl RoomChangeRequest {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn upgrade_paid(&self) -> u64 {
        self.upgrade_obligation
            .as_ref()
            .map_or(0, |obligation| obligation.paid_amount)
    }

    pub fn upgrade_outstanding(&self) -> u64 {
        self.upgrade_payment_required
            .saturating_sub(self.upgrade_paid())
    }

    /// Central transition table for room-change requests.
    pub fn next_status(&self, action: RoomChangeAction) -> Result<RoomChangeStatus, LedgerError> {
        use RoomChangeAction::*;
        use RoomChangeStatus::*;

        let payment_blocked =
            self.payment_status == UpgradePaymentStatus::Pending && self.upgrade_payment_required > 0;

        match (self.status, action) {
            (Pending | PendingPayment | UnderReview, Approve) if payment_blocked => {
                Err(LedgerError::PaymentRequired {
                    request: self.id.clone(),
                    outstanding: self.upgrade_outstanding(),
                })
            }
            (PendingPayment, PaymentSettled) => Ok(Pending),
            (UnderReview, PaymentSettled) => Ok(UnderReview),
            (Pending | PendingPayment, BeginReview) => Ok(UnderReview),
            (Pending | UnderReview, Approve) => Ok(Approved),
            (Approved, Complete) => Ok(Completed),
            (Pending | PendingPayment | UnderReview, Reject) => Ok(Rejected),
            (Pending | PendingPayment | UnderReview, Cancel) => Ok(Cancelled),
            (from, action) => Err(LedgerError::InvalidTransition {
                entity: "room change request",
                from: from.label(),
                action: action.label(),
            }),
        }
    }

    pub fn advance(&mut self, action: RoomChangeAction) -> Result<RoomChangeStatus, LedgerError> {
        self.status = self.next_status(action)?;
        Ok(self.status)
    }
}
