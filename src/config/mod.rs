//! Configuration data structures for simulation setups.

mod distribution;
mod parameters;

pub use distribution::RateDistribution;
pub use parameters::{Parameters, ParametersError};
