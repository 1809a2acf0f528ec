//! CDP Engine Core
//!
//! Accounting core of a collateralized-debt protocol implemented as a native
//! Solana-style state library. Two components: the collateral ledger (single
//! source of truth for collateral, debt positions, accrued interest and
//! global debt accounting) and the debt auction house (decreasing-quantity
//! auction that recapitalizes the system by selling newly minted protocol
//! tokens for internal coins).

pub mod constants;
pub mod error;
pub mod math;
pub mod params;

// Core components
pub mod auction;
pub mod ledger;

pub use auction::{AccountingEngine, Bid, DebtAuctionHouse, ProtocolToken};
pub use error::CdpEngineError;
pub use ledger::{CollateralType, Ledger, Position};
pub use math::scales::{Rad, Ray, SignedRad, Wad, RAD, RAY, WAD};
pub use params::ParamValue;
