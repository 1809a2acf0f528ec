//! Collateral Ledger Module
//!
//! Single source of truth for collateral balances, debt positions, accrued
//! interest and global debt accounting. Every mutation enforces the solvency
//! invariants atomically; a failed check aborts the whole call.

pub mod state;

pub use state::{CollateralType, Ledger, Position};
