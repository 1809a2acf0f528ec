//! Global constants for the CDP engine
//!
//! Central location for engine-wide defaults; runtime-tunable values are
//! changed through the named-parameter interface on each component.

use crate::math::scales::{Wad, WAD};

/// Default minimum bid improvement ratio: 5% (fine scale)
pub const DEFAULT_BID_DECREASE: Wad = WAD + WAD / 20; // 1.05e18

/// Default lot growth applied when an unbid auction is restarted: 50%
pub const DEFAULT_AMOUNT_SOLD_INCREASE: Wad = WAD + WAD / 2; // 1.50e18

/// Default time a high bid stays unchallenged before the auction can settle
pub const DEFAULT_BID_DURATION: i64 = 3 * 60 * 60; // 3 hours

/// Default total auction length
pub const DEFAULT_TOTAL_AUCTION_LENGTH: i64 = 2 * 24 * 60 * 60; // 2 days
