//! Terminal-facing collaborators
//!
//! - `sink`: where output goes
//! - `sequence`: control strings the window generates itself
//! - `size`: terminal dimensions and cursor reports

mod sequence;
mod sink;
mod size;

pub use sequence::{AnsiRenderer, Operation, SequenceRenderer};
pub use sink::{RecordingSink, TerminalSink, WriterSink};
pub use size::{parse_cursor_report, FixedGeometry, Geometry, TermSize, TtyGeometry};
