//! Use cases (application services)

pub mod fan_out;
pub mod run_deliberation;
