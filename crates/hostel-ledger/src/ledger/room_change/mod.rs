//! Room-change requests: pricing the move, collecting upgrade payments, and settling approval.

pub mod domain;
pub mod quote;
pub mod settlement;

pub use domain::{
    RoomChangeAction, RoomChangeRequest, RoomChangeStatus, RoomChangeSubmission,
    UpgradePaymentStatus,
};
pub use quote::{already_paid_surplus, RoomChangeQuote};
pub use settlement::RoomChangeSettlement;
