//! Hostel ledger: room pricing, fee reconciliation, and room-change settlement.

pub mod config;
pub mod error;
pub mod ledger;
pub mod telemetry;
