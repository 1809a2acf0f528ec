//! Named-parameter update interface
//!
//! Both the ledger and the auction house accept parameter updates as a
//! (name, value) pair drawn from a fixed per-component set; an unrecognized
//! name or a value at the wrong scale is rejected with
//! `UnrecognizedParameter`.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::math::scales::Rad;

/// A parameter value, tagged with the scale or type the target expects
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamValue {
    /// Fine-scale (1e18) quantity
    Wad(u128),
    /// Accumulator-scale (1e27) quantity
    Ray(u128),
    /// Coarse-scale (1e45) quantity
    Rad(Rad),
    /// Seconds
    Duration(i64),
    /// Account identity
    Address(Pubkey),
}
