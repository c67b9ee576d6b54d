//! Mochi Zones
//!
//! Scroll-backed windows drawing into rectangular zones of a real terminal.
//! Each window keeps its own virtual cursor in step with the physical one
//! while output passes through a size-bounded buffer.
//!
//! - `buffer`: bounded output buffer and its flush policies
//! - `parser`: text/command classification and the escape whitelist
//! - `core`: zone cursor, style tracking, scrollback, zone controller
//! - `event`: before/after notifications for every buffer mutation
//! - `term`: sinks, sequence rendering, terminal geometry
//! - `window`: the window tying it all together

pub mod buffer;
pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod logging;
pub mod parser;
pub mod term;
pub mod window;

pub use buffer::{Buffered, FlushTrigger, OutputBuffer, TerminalBuffer};
pub use config::{BufferConfig, Config, ThreadMode, WindowConfig, Zone};
pub use error::{Error, Result};
pub use event::{Event, EventBus, EventKind, EventMask, SubscriptionId, WindowId};
pub use parser::{classify, ControlCode, Unit};
pub use window::Window;
