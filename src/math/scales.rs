//! Scale-tagged quantities and rescale rules
//!
//! Three decimal fixed-point scales flow through the engine:
//!
//! - `Wad` (1e18, fine): collateral amounts, normalized debt, auction lots
//! - `Ray` (1e27, accumulator): accumulated rates and collateral prices
//! - `Rad` (1e45, coarse): internal coins, debt balances, ceilings, floors
//!
//! Multiplying a fine or accumulator quantity by its complement produces a
//! coarse quantity; the product of two u128 scales always fits in 256 bits,
//! so those rescales are exact and infallible. Signed deltas are i128 at
//! the fine/accumulator scale and sign+magnitude at the coarse scale.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::program_error::ProgramError;

use crate::error::CdpEngineError;
use crate::math::u256::U256;

/// Fine-scale quantity (18 decimals)
pub type Wad = u128;

/// Accumulator-scale quantity (27 decimals)
pub type Ray = u128;

/// One whole unit at the fine scale
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// One whole unit at the accumulator scale
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// One whole unit at the coarse scale (WAD * RAY)
pub const RAD: U256 = U256::mul_u128(WAD, RAY);

/// Coarse-scale quantity (45 decimals), carried in 256 bits
#[derive(
    BorshSerialize,
    BorshDeserialize,
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
)]
pub struct Rad(pub U256);

impl Rad {
    pub const ZERO: Self = Self(U256::ZERO);

    /// One whole coin
    pub const ONE: Self = Self(RAD);

    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Whole coins scaled up to the coarse representation
    pub const fn from_whole(coins: u64) -> Self {
        Self(U256::mul_u128(coins as u128 * WAD, RAY))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    pub fn checked_add(self, other: Self) -> Result<Self, ProgramError> {
        self.0
            .checked_add(&other.0)
            .map(Self)
            .ok_or_else(|| CdpEngineError::ArithmeticOverflow.into())
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, ProgramError> {
        self.0
            .checked_sub(&other.0)
            .map(Self)
            .ok_or_else(|| CdpEngineError::ArithmeticUnderflow.into())
    }

    /// Apply a signed coarse delta
    pub fn add_signed(self, delta: SignedRad) -> Result<Self, ProgramError> {
        if delta.negative {
            self.checked_sub(delta.magnitude)
        } else {
            self.checked_add(delta.magnitude)
        }
    }

    /// Remove a signed coarse delta
    pub fn sub_signed(self, delta: SignedRad) -> Result<Self, ProgramError> {
        if delta.negative {
            self.checked_add(delta.magnitude)
        } else {
            self.checked_sub(delta.magnitude)
        }
    }
}

impl fmt::Display for Rad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Signed coarse-scale value as sign + magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedRad {
    pub negative: bool,
    pub magnitude: Rad,
}

impl SignedRad {
    pub const ZERO: Self = Self {
        negative: false,
        magnitude: Rad::ZERO,
    };
}

/// Checked signed addition on a fine or accumulator quantity
pub fn checked_add_delta(value: u128, delta: i128) -> Result<u128, ProgramError> {
    if delta >= 0 {
        value
            .checked_add(delta as u128)
            .ok_or_else(|| CdpEngineError::ArithmeticOverflow.into())
    } else {
        value
            .checked_sub(delta.unsigned_abs())
            .ok_or_else(|| CdpEngineError::ArithmeticUnderflow.into())
    }
}

/// Checked signed subtraction on a fine or accumulator quantity
pub fn checked_sub_delta(value: u128, delta: i128) -> Result<u128, ProgramError> {
    if delta >= 0 {
        value
            .checked_sub(delta as u128)
            .ok_or_else(|| CdpEngineError::ArithmeticUnderflow.into())
    } else {
        value
            .checked_add(delta.unsigned_abs())
            .ok_or_else(|| CdpEngineError::ArithmeticOverflow.into())
    }
}

/// Rescale-on-multiply: accumulator x fine -> coarse, exact
pub fn ray_mul_wad(rate: Ray, amount: Wad) -> Rad {
    Rad(U256::mul_u128(rate, amount))
}

/// Rescale-on-multiply with a signed factor: the unsigned operand is at one
/// scale, the signed delta at its complement, and the result is a signed
/// coarse value
pub fn mul_signed(factor: u128, delta: i128) -> SignedRad {
    SignedRad {
        negative: delta < 0,
        magnitude: Rad(U256::mul_u128(factor, delta.unsigned_abs())),
    }
}

/// Fine x fine -> fine, rounding down
pub fn wad_mul(a: Wad, b: Wad) -> Result<Wad, ProgramError> {
    let product = U256::mul_u128(a, b);
    let (scaled, _) = product
        .div_rem_u64(WAD as u64)
        .ok_or_else(|| ProgramError::from(CdpEngineError::ArithmeticOverflow))?;
    if scaled.hi != 0 {
        return Err(CdpEngineError::ArithmeticOverflow.into());
    }
    Ok(scaled.lo)
}
