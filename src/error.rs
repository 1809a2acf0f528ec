//! Error types for the CDP engine
//!
//! Every failure is a synchronous, all-or-nothing abort: the attempted call
//! returns one of these and leaves state untouched.

use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Custom error type for the CDP engine
#[derive(Clone, Debug, Eq, Error, FromPrimitive, PartialEq)]
pub enum CdpEngineError {
    // Access and lifecycle errors (7000-7009)
    #[error("Caller lacks the required capability")]
    Unauthorized = 7000,

    #[error("Operation requires the contract to be enabled")]
    NotEnabled = 7001,

    #[error("Owner or counterparty consent missing")]
    NotConsented = 7002,

    #[error("Collateral type already initialized")]
    AlreadyInitialized = 7003,

    #[error("Collateral type not initialized")]
    CollateralTypeNotInitialized = 7004,

    #[error("Unrecognized parameter name")]
    UnrecognizedParameter = 7005,

    // Solvency errors (7010-7019)
    #[error("Debt ceiling exceeded")]
    CeilingExceeded = 7010,

    #[error("Position would not be safe")]
    PositionNotSafe = 7011,

    #[error("Position debt below the debt floor")]
    DustPosition = 7012,

    // Arithmetic errors (7020-7029)
    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 7020,

    #[error("Arithmetic underflow")]
    ArithmeticUnderflow = 7021,

    // Auction errors (7030-7039)
    #[error("Auction never started")]
    AuctionNeverStarted = 7030,

    #[error("Auction not finished")]
    AuctionNotFinished = 7031,

    #[error("Auction or bid already expired")]
    AuctionAlreadyExpired = 7032,

    #[error("Bid improvement below the configured minimum")]
    InsufficientBidImprovement = 7033,

    #[error("A bid has already been placed")]
    BidAlreadyPlaced = 7034,

    #[error("Bid does not match the recorded bid amount")]
    BidNotMatching = 7035,

    #[error("High bidder not set")]
    HighBidderUnset = 7036,

    #[error("Auction house still enabled")]
    HouseStillEnabled = 7037,
}

impl PrintProgramError for CdpEngineError {
    fn print<E>(&self) {
        msg!("CDP Engine Error: {}", self);
    }
}

impl From<CdpEngineError> for ProgramError {
    fn from(e: CdpEngineError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for CdpEngineError {
    fn type_of() -> &'static str {
        "CdpEngineError"
    }
}
