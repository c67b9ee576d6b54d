//! Output classification
//!
//! Raw strings are split into text and command units before they reach a
//! buffer. Only a closed set of escape sequences is accepted.

mod classifier;
pub mod patterns;
mod unit;

pub use classifier::{classify, classify_command};
pub use patterns::SequenceKind;
pub use unit::{ControlCode, Unit};
