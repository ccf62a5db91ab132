// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator implementations. Values that cannot be
// computed (insufficient history, zero dispersion) are `None`, never a
// silently substituted zero.

pub mod rolling;

pub use rolling::{RollingStat, RollingStatsEngine};
