//! Application-level configuration.
//!
//! - [`DeliberationParams`]: council membership, stage budgets and ranking policy

pub mod deliberation_params;

pub use deliberation_params::DeliberationParams;
