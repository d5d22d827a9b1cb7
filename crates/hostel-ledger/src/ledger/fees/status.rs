use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::Fee;
use crate::ledger::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeStatus {
    Pending,
    Partial,
    Overdue,
    Paid,
}

/// Events that move a fee between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeEvent {
    PaymentApplied { settled: bool },
    LateFeeAccrued,
    AmountCorrected { settled: bool },
}

impl FeeEvent {
    const fn label(self) -> &'static str {
        match self {
            Self::PaymentApplied { .. } => "apply a payment to",
            Self::LateFeeAccrued => "accrue a late fee on",
            Self::AmountCorrected { .. } => "correct the amount of",
        }
    }
}

impl FeeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Overdue => "overdue",
            Self::Paid => "paid",
        }
    }

    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Paid)
    }

    /// Central transition table for fee statuses.
    pub fn next(self, event: FeeEvent) -> Result<Self, LedgerError> {
        use FeeEvent::*;
        use FeeStatus::*;

        match (self, event) {
            (Pending | Partial | Overdue, PaymentApplied { settled: true }) => Ok(Paid),
            (Pending | Partial | Overdue, PaymentApplied { settled: false }) => Ok(Partial),
            (Pending | Partial | Overdue, LateFeeAccrued) => Ok(Overdue),
            (Pending | Partial | Overdue, AmountCorrected { settled: true }) => Ok(Paid),
            (status @ (Pending | Partial | Overdue), AmountCorrected { settled: false }) => {
                Ok(status)
            }
            (Paid, event) => Err(LedgerError::InvalidTransition {
                entity: "fee",
                from: Paid.label(),
                action: event.label(),
            }),
        }
    }
}

/// Status as observed on `today`: settled fees are paid even past their due date.
pub fn derive_status(fee: &Fee, today: NaiveDate) -> FeeStatus {
    if fee.is_settled() {
        FeeStatus::Paid
    } else if today > fee.due_date || fee.late_fee > 0 {
        FeeStatus::Overdue
    } else if fee.paid_amount > 0 {
        FeeStatus::Partial
    } else {
        FeeStatus::Pending
    }
}
