//! Room pricing, fee reconciliation, wallet credit, and room-change settlement.
//!
//! Every multi-record mutation runs through [`store::run_in_transaction`], so a
//! failure part-way through a settlement leaves no partial writes behind.

pub mod error;
pub mod fees;
pub mod ids;
pub mod notify;
pub mod pricing;
pub mod room_change;
pub mod rooms;
pub mod router;
pub mod service;
pub mod store;
pub mod students;
pub mod wallet;

#[cfg(test)]
mod tests;

pub use error::{LedgerError, RecordKind};
pub use fees::{
    derive_status, Fee, FeeLedger, FeeStatus, FeeType, LateFeeCharge, LateFeePolicy,
    PaymentInput, PaymentMethod, PaymentReceipt,
};
pub use ids::{FeeId, RoomChangeId, RoomId, StudentId};
pub use notify::{Notice, Notifier, NotifyError};
pub use pricing::{
    Amenities, AmenityLine, AmenityPrices, PriceBreakdown, PriceCalculator, PricingTable, RoomType,
    MAX_FAN_COUNT,
};
pub use room_change::{
    RoomChangeQuote, RoomChangeRequest, RoomChangeSettlement, RoomChangeStatus,
    RoomChangeSubmission, UpgradePaymentStatus,
};
pub use rooms::{Gender, MaintenanceStatus, Room, RoomDraft, RoomIdentity, RoomStatus};
pub use router::ledger_router;
pub use service::{
    Allocation, AmenityUpdate, FeeAssignment, HostelService, LateFeeSweepReport, LedgerSettings,
    RoomQuote, WalletApplication, WalletCredit,
};
pub use store::{HostelRepository, MemoryHostelRepository, RepositoryError, UnitOfWork};
pub use students::{RoomAllocationStatus, Student, StudentDraft, StudentPaymentStatus};
pub use wallet::{Wallet, WalletEntryKind, WalletReason, WalletTransaction};
