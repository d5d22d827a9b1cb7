//! Per-student credit balance. The balance never goes negative.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::LedgerError;
use super::ids::{FeeId, RoomChangeId, StudentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletEntryKind {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletReason {
    RoomDowngrade,
    MessFee,
    HostelFee,
    Refund,
    Adjustment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub kind: WalletEntryKind,
    pub amount: u64,
    pub reason: WalletReason,
    pub description: String,
    pub room_change: Option<RoomChangeId>,
    pub fee: Option<FeeId>,
    pub recorded_on: NaiveDate,
}

/// Link from a wallet movement to the record that caused it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletReference {
    pub room_change: Option<RoomChangeId>,
    pub fee: Option<FeeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub student: StudentId,
    pub balance: u64,
    pub transactions: Vec<WalletTransaction>,
}

impl Wallet {
    pub fn new(student: StudentId) -> Self {
        Self {
            student,
            balance: 0,
            transactions: Vec::new(),
        }
    }

    pub fn credit(
        &mut self,
        amount: u64,
        reason: WalletReason,
        description: impl Into<String>,
        reference: WalletReference,
        recorded_on: NaiveDate,
    ) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "wallet credits must be greater than zero",
            });
        }

        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount {
                amount,
                reason: "wallet balance would overflow",
            })?;
        self.push(
            WalletEntryKind::Credit,
            amount,
            reason,
            description.into(),
            reference,
            recorded_on,
        );
        info!(student = %self.student, amount, balance = self.balance, "wallet credited");
        Ok(self.balance)
    }

    pub fn debit(
        &mut self,
        amount: u64,
        reason: WalletReason,
        description: impl Into<String>,
        reference: WalletReference,
        recorded_on: NaiveDate,
    ) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "wallet debits must be greater than zero",
            });
        }
        if amount > self.balance {
            return Err(LedgerError::InsufficientBalance {
                student: self.student.clone(),
                available: self.balance,
                requested: amount,
            });
        }

        self.balance -= amount;
        self.push(
            WalletEntryKind::Debit,
            amount,
            reason,
            description.into(),
            reference,
            recorded_on,
        );
        info!(student = %self.student, amount, balance = self.balance, "wallet debited");
        Ok(self.balance)
    }

    fn push(
        &mut self,
        kind: WalletEntryKind,
        amount: u64,
        reason: WalletReason,
        description: String,
        reference: WalletReference,
        recorded_on: NaiveDate,
    ) {
        self.transactions.push(WalletTransaction {
            kind,
            amount,
            reason,
            description,
            room_change: reference.room_change,
            fee: reference.fee,
            recorded_on,
        });
    }
}
