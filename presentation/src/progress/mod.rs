//! Live rendering of the deliberation event stream

pub mod reporter;
