//! Checked fixed-point arithmetic
//!
//! All quantities in the engine live at one of three decimal scales; the
//! helpers here make every rescale-on-multiply rule explicit and every
//! add/sub checked. Nothing in this module wraps silently.

pub mod scales;
pub mod u256;

pub use scales::*;
pub use u256::U256;
