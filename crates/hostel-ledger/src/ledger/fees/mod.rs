//! Fee records, payment application, and late-fee accrual.

pub mod domain;
pub mod ledger;
pub mod status;

pub use domain::{Fee, FeeType, PaymentInput, PaymentMethod, PaymentReceipt};
pub use ledger::{FeeLedger, LateFeeCharge, LateFeePolicy};
pub use status::{derive_status, FeeEvent, FeeStatus};
