use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::status::FeeStatus;
use crate::ledger::error::LedgerError;
use crate::ledger::ids::{FeeId, RoomId, StudentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    Rent,
    Deposit,
    Utility,
    Maintenance,
    LateFee,
    MessFee,
    Other,
}

impl FeeType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::Deposit => "deposit",
            Self::Utility => "utility",
            Self::Maintenance => "maintenance",
            Self::LateFee => "late_fee",
            Self::MessFee => "mess_fee",
            Self::Other => "other",
        }
    }
}

/// Settlement channel reported by the gateway adapter (or the wallet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    #[serde(alias = "credit_card", alias = "debit_card")]
    Card,
    #[serde(alias = "online_payment")]
    Online,
    BankTransfer,
    Upi,
    Netbanking,
    Wallet,
}

impl PaymentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Online => "online",
            Self::BankTransfer => "bank_transfer",
            Self::Upi => "upi",
            Self::Netbanking => "netbanking",
            Self::Wallet => "wallet",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace(' ', "_").as_str() {
            "cash" => Some(Self::Cash),
            "card" | "credit_card" | "debit_card" => Some(Self::Card),
            "online" | "online_payment" => Some(Self::Online),
            "bank_transfer" => Some(Self::BankTransfer),
            "upi" => Some(Self::Upi),
            "netbanking" | "net_banking" => Some(Self::Netbanking),
            "wallet" => Some(Self::Wallet),
            _ => None,
        }
    }
}

/// Gateway callback payload applied to a fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInput {
    pub amount: u64,
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub paid_on: NaiveDate,
}

/// Applied payment as recorded against a fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub fee: FeeId,
    pub transaction_id: String,
    pub amount: u64,
    pub method: PaymentMethod,
    pub paid_on: NaiveDate,
    pub paid_amount_after: u64,
    pub status_after: FeeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub id: FeeId,
    pub student: StudentId,
    pub room: Option<RoomId>,
    pub fee_type: FeeType,
    pub amount: u64,
    pub paid_amount: u64,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub status: FeeStatus,
    pub late_fee: u64,
    pub last_late_fee_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub transaction_id: Option<String>,
    pub description: String,
    pub payments: Vec<PaymentReceipt>,
}

impl Fee {
    pub fn is_settled(&self) -> bool {
        self.paid_amount >= self.amount
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Amount still owed including accrued penalties.
    pub fn outstanding(&self) -> u64 {
        self.amount
            .saturating_add(self.late_fee)
            .saturating_sub(self.paid_amount)
    }

    pub fn has_transaction(&self, transaction_id: &str) -> bool {
        self.payments
            .iter()
            .any(|receipt| receipt.transaction_id == transaction_id)
    }

    /// Structural checks run before any mutation of a stored record.
    pub fn check_consistency(&self) -> Result<(), LedgerError> {
        if self.paid_amount > self.amount.saturating_add(self.late_fee) {
            return Err(LedgerError::validation(format!(
                "fee {} is malformed: paid {} exceeds amount {} plus late fee {}",
                self.id, self.paid_amount, self.amount, self.late_fee
            )));
        }
        if (self.status == FeeStatus::Paid) != self.is_settled() {
            return Err(LedgerError::validation(format!(
                "fee {} is malformed: status {} disagrees with paid {} of {}",
                self.id,
                self.status.label(),
                self.paid_amount,
                self.amount
            )));
        }
        Ok(())
    }
}
