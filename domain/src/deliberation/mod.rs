//! Deliberation domain.
//!
//! A deliberation runs one question through three stages:
//!
//! 1. every council model answers independently
//! 2. every model that answered ranks the anonymized answers
//! 3. the chairman synthesizes a final answer from both
//!
//! [`session::DeliberationSession`] owns the data of one run,
//! [`stage::Stage`] guards its progression and [`event::DeliberationEvent`]
//! is what callers observe.

pub mod chairman;
pub mod event;
pub mod session;
pub mod stage;
pub mod title;
pub mod value_objects;
