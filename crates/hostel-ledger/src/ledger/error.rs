use std::fmt;

use axum::http::StatusCode;
use serde::Serialize;

use super::ids::{FeeId, RoomChangeId, RoomId, StudentId};
use super::store::RepositoryError;

/// Aggregate kinds addressed by `NotFound` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Room,
    Student,
    Fee,
    RoomChange,
    Wallet,
    Occupant,
}

impl RecordKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Student => "student",
            Self::Fee => "fee",
            Self::RoomChange => "room change request",
            Self::Wallet => "wallet",
            Self::Occupant => "occupant",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Typed failures raised by the ledgers and the settlement state machine.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: u64, reason: &'static str },
    #[error(
        "fee {fee} is already settled{}",
        .transaction_id
            .as_ref()
            .map(|id| format!(" by transaction {id}"))
            .unwrap_or_default()
    )]
    AlreadySettled {
        fee: FeeId,
        transaction_id: Option<String>,
    },
    #[error("room {room} is full ({capacity} beds occupied)")]
    RoomFull { room: RoomId, capacity: u8 },
    #[error("room {room} is unavailable: {reason}")]
    RoomUnavailable { room: RoomId, reason: String },
    #[error(
        "payment required before approval: {outstanding} outstanding on the upgrade for request {request}"
    )]
    PaymentRequired {
        request: RoomChangeId,
        outstanding: u64,
    },
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: String },
    #[error("cannot {action} a {entity} in {from} status")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        action: &'static str,
    },
    #[error("insufficient wallet balance for {student}: available {available}, requested {requested}")]
    InsufficientBalance {
        student: StudentId,
        available: u64,
        requested: u64,
    },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LedgerError {
    pub fn not_found(kind: RecordKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status the router answers with for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAmount { .. } | Self::Validation(_) | Self::InsufficientBalance { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::AlreadySettled { .. }
            | Self::InvalidTransition { .. }
            | Self::Conflict(_)
            | Self::RoomFull { .. }
            | Self::RoomUnavailable { .. }
            | Self::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Repository(RepositoryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn unavailable(room: &RoomId, reason: impl Into<String>) -> Self {
        Self::RoomUnavailable {
            room: room.clone(),
            reason: reason.into(),
        }
    }
}
