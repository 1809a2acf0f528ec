//! Debt Auction Module
//!
//! Decreasing-quantity auction house: bidders pay a fixed amount of internal
//! coins and compete by accepting ever-smaller lots of newly minted protocol
//! tokens. Recapitalizes the ledger when it carries unbacked debt.

pub mod state;

pub use state::{AccountingEngine, Bid, DebtAuctionHouse, ProtocolToken};
