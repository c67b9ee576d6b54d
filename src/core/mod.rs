//! Window core
//!
//! Platform-independent window state. This module contains:
//! - Zone cursor and the control-character policy
//! - Style state reconstruction from emitted commands
//! - Scrollback store with atomic command eviction
//! - Zone controller reacting to buffer events
//! - Deterministic snapshot generation
//!
//! Nothing here writes to a terminal; the window executes what the core
//! decides.

pub mod cursor;
mod scrollback;
mod snapshot;
pub mod style;
mod zone;

pub use cursor::{NewLine, ZoneCursor, TAB_WIDTH};
pub use scrollback::{ScrollbackLine, ScrollbackStore};
pub use snapshot::{LineSnapshot, StyleSnapshot, WindowSnapshot};
pub use style::{Color, SgrAttribute, Style, StyleFlag, StyleState, StyleTracker};
pub use zone::{ZoneAction, ZoneController, ZoneState};
