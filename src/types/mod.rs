//! Type definitions for the fraud scoring service

pub mod record;
pub mod verdict;

pub use record::ScoreRequest;
pub use verdict::{ErrorResponse, Fault, Verdict};
