//! Motion gesture math utilities.

pub mod math;

pub use math::matrix::*;
pub use math::stable::*;
pub use math::stochastic::*;
