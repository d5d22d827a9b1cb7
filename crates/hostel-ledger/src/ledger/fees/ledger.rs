use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{Fee, FeeType, PaymentInput, PaymentReceipt};
use super::status::{FeeEvent, FeeStatus};
use crate::ledger::error::LedgerError;
use crate::ledger::ids::{FeeId, StudentId};
use crate::ledger::rooms::Room;

pub const DEFAULT_GRACE_DAYS: u32 = 10;
pub const DEFAULT_DAILY_PENALTY: u64 = 50;

/// Late-fee policy. The due date counts as the first day of the grace window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateFeePolicy {
    pub grace_days: u32,
    pub daily_penalty: u64,
}

impl Default for LateFeePolicy {
    fn default() -> Self {
        Self {
            grace_days: DEFAULT_GRACE_DAYS,
            daily_penalty: DEFAULT_DAILY_PENALTY,
        }
    }
}

impl LateFeePolicy {
    /// Last calendar day on which no penalty is owed.
    pub fn last_free_day(&self, due_date: NaiveDate) -> NaiveDate {
        let extra = u64::from(self.grace_days.saturating_sub(1));
        due_date
            .checked_add_days(Days::new(extra))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// Penalty added by one accrual run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LateFeeCharge {
    pub fee: FeeId,
    pub student: StudentId,
    pub days_charged: u32,
    pub amount: u64,
    pub late_fee_total: u64,
    pub days_overdue: i64,
}

/// Fee lifecycle rules: assignment, payment application, late-fee accrual.
#[derive(Debug, Clone, Default)]
pub struct FeeLedger {
    policy: LateFeePolicy,
}

impl FeeLedger {
    pub fn new(policy: LateFeePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LateFeePolicy {
        &self.policy
    }

    /// Rent-style fee priced from the room's full total; rooms are not cost-shared.
    pub fn assign(
        &self,
        student: &StudentId,
        room: &Room,
        fee_type: FeeType,
        due_date: NaiveDate,
    ) -> Fee {
        let description = format!(
            "{} for room {} ({})",
            fee_type.label(),
            room.label(),
            room.room_type.label()
        );
        new_fee(
            student,
            Some(room),
            fee_type,
            room.total_price,
            due_date,
            description,
        )
    }

    /// Periodic charge (mess, utility, deposit) with an explicit amount.
    pub fn assign_charge(
        &self,
        student: &StudentId,
        fee_type: FeeType,
        amount: u64,
        due_date: NaiveDate,
        description: Option<String>,
    ) -> Result<Fee, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "charges must be greater than zero",
            });
        }
        let description = description.unwrap_or_else(|| fee_type.label().to_string());
        Ok(new_fee(student, None, fee_type, amount, due_date, description))
    }

    pub fn apply_payment(
        &self,
        fee: &mut Fee,
        payment: PaymentInput,
    ) -> Result<PaymentReceipt, LedgerError> {
        if payment.amount == 0 {
            return Err(LedgerError::InvalidAmount {
                amount: payment.amount,
                reason: "payments must be greater than zero",
            });
        }
        let transaction_id = payment.transaction_id.trim().to_string();
        if transaction_id.is_empty() {
            return Err(LedgerError::validation("transaction id is required"));
        }
        if fee.has_transaction(&transaction_id) {
            return Err(LedgerError::AlreadySettled {
                fee: fee.id.clone(),
                transaction_id: Some(transaction_id),
            });
        }
        if fee.is_settled() {
            return Err(LedgerError::AlreadySettled {
                fee: fee.id.clone(),
                transaction_id: None,
            });
        }
        let paid_amount = fee
            .paid_amount
            .checked_add(payment.amount)
            .filter(|paid| *paid <= fee.amount.saturating_add(fee.late_fee))
            .ok_or(LedgerError::InvalidAmount {
                amount: payment.amount,
                reason: "payment exceeds the outstanding balance",
            })?;
        let settled = paid_amount >= fee.amount;
        let status = fee.status.next(FeeEvent::PaymentApplied { settled })?;

        fee.paid_amount = paid_amount;
        fee.status = status;
        fee.paid_date = Some(payment.paid_on);
        fee.payment_method = Some(payment.method);
        fee.transaction_id = Some(transaction_id.clone());

        let receipt = PaymentReceipt {
            fee: fee.id.clone(),
            transaction_id,
            amount: payment.amount,
            method: payment.method,
            paid_on: payment.paid_on,
            paid_amount_after: paid_amount,
            status_after: status,
        };
        fee.payments.push(receipt.clone());

        info!(
            fee = %fee.id,
            student = %fee.student,
            amount = payment.amount,
            paid = fee.paid_amount,
            status = status.label(),
            "payment applied"
        );
        Ok(receipt)
    }

    /// Accrue every chargeable day not yet charged; at most one run per calendar day.
    pub fn accrue_late_fee(
        &self,
        fee: &mut Fee,
        today: NaiveDate,
    ) -> Result<Option<LateFeeCharge>, LedgerError> {
        fee.check_consistency()?;

        if !fee.is_open()
            || fee.fee_type == FeeType::LateFee
            || fee.last_late_fee_date == Some(today)
        {
            return Ok(None);
        }

        let last_free_day = self.policy.last_free_day(fee.due_date);
        if today <= last_free_day {
            return Ok(None);
        }

        let charged_through = match fee.last_late_fee_date {
            Some(previous) if previous > last_free_day => previous,
            _ => last_free_day,
        };
        let days = (today - charged_through).num_days();
        if days <= 0 {
            return Ok(None);
        }
        let days_charged = u32::try_from(days).unwrap_or(u32::MAX);
        let amount = self
            .policy
            .daily_penalty
            .saturating_mul(u64::from(days_charged));

        fee.status = fee.status.next(FeeEvent::LateFeeAccrued)?;
        fee.late_fee = fee.late_fee.saturating_add(amount);
        fee.last_late_fee_date = Some(today);

        let charge = LateFeeCharge {
            fee: fee.id.clone(),
            student: fee.student.clone(),
            days_charged,
            amount,
            late_fee_total: fee.late_fee,
            days_overdue: (today - fee.due_date).num_days(),
        };
        debug!(
            fee = %fee.id,
            days = days_charged,
            late_fee = fee.late_fee,
            "late fee accrued"
        );
        Ok(Some(charge))
    }

    /// Move the penalty still unpaid on a settled fee into a `late_fee` charge of its own.
    ///
    /// The settled fee keeps only the penalty that was actually paid, so its status stays
    /// `paid` while the remainder remains collectable. Penalties never accrue on the carried
    /// charge.
    pub fn carry_late_fee(&self, fee: &mut Fee, today: NaiveDate) -> Option<Fee> {
        if fee.is_open() || fee.fee_type == FeeType::LateFee {
            return None;
        }
        let unpaid = fee.outstanding();
        if unpaid == 0 {
            return None;
        }

        fee.late_fee = fee.late_fee.saturating_sub(unpaid);
        let description = format!("late fee carried from {} ({})", fee.id, fee.description);
        let mut carried = new_fee(
            &fee.student,
            None,
            FeeType::LateFee,
            unpaid,
            today,
            description,
        );
        carried.room = fee.room.clone();

        info!(
            fee = %fee.id,
            carried = %carried.id,
            amount = unpaid,
            "unpaid late fee carried"
        );
        Some(carried)
    }

    /// Shift an open fee by a room's price change, never below what was already paid.
    pub fn apply_price_change(
        &self,
        fee: &mut Fee,
        previous_price: u64,
        new_price: u64,
    ) -> Result<bool, LedgerError> {
        let amount = if new_price >= previous_price {
            fee.amount.saturating_add(new_price - previous_price)
        } else {
            fee.amount.saturating_sub(previous_price - new_price)
        };
        self.correct_amount(fee, amount)
    }

    /// Re-point an open fee at a new obligation without dropping below what was paid.
    pub fn correct_amount(&self, fee: &mut Fee, amount: u64) -> Result<bool, LedgerError> {
        let corrected = amount.max(fee.paid_amount);
        if corrected == fee.amount {
            return Ok(false);
        }
        let settled = fee.paid_amount >= corrected;
        fee.status = fee.status.next(FeeEvent::AmountCorrected { settled })?;
        fee.amount = corrected;
        Ok(true)
    }
}

fn new_fee(
    student: &StudentId,
    room: Option<&Room>,
    fee_type: FeeType,
    amount: u64,
    due_date: NaiveDate,
    description: String,
) -> Fee {
    Fee {
        id: FeeId::next(),
        student: student.clone(),
        room: room.map(|room| room.id.clone()),
        fee_type,
        amount,
        paid_amount: 0,
        due_date,
        paid_date: None,
        status: if amount == 0 {
            FeeStatus::Paid
        } else {
            FeeStatus::Pending
        },
        late_fee: 0,
        last_late_fee_date: None,
        payment_method: None,
        transaction_id: None,
        description,
        payments: Vec::new(),
    }
}
