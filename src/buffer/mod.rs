//! Bounded output buffering
//!
//! - `content`: character storage, local or mutex-guarded
//! - `output`: capacity policy, flush and slice-out

mod content;
mod output;

pub use content::{BufferContent, ContentHandle};
pub use output::{Buffered, FlushTrigger, OutputBuffer, TerminalBuffer};
