//! Serializable window snapshots
//!
//! A snapshot captures everything observable about a window: zone, virtual
//! cursor, pending buffer content, live style and the retained scrollback.
//! Given the same output, a window must produce identical snapshots.

use serde::{Deserialize, Serialize};

use crate::config::Zone;
use crate::parser::Unit;

use super::cursor::ZoneCursor;
use super::scrollback::{ScrollbackLine, ScrollbackStore};
use super::style::{Color, StyleFlag, StyleState};

/// Snapshot of a style state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleSnapshot {
    pub fg: Color,
    pub bg: Color,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<StyleFlag>,
}

impl From<&StyleState> for StyleSnapshot {
    fn from(state: &StyleState) -> Self {
        Self {
            fg: state.fg,
            bg: state.bg,
            flags: state.style.flags().collect(),
        }
    }
}

/// Snapshot of one scrollback line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSnapshot {
    /// Absolute line index
    pub index: usize,
    pub indent: usize,
    /// Text as displayed
    pub text: String,
    pub units: Vec<Unit>,
    /// Style at line start
    pub start_style: StyleSnapshot,
}

impl LineSnapshot {
    fn from_line(index: usize, line: &ScrollbackLine, start: &StyleState) -> Self {
        Self {
            index,
            indent: line.indent(),
            text: line.text(),
            units: line.units().cloned().collect(),
            start_style: StyleSnapshot::from(start),
        }
    }
}

/// Complete observable state of a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub zone: Zone,
    pub cursor: ZoneCursor,
    /// First logical line shown in the zone
    pub view_top: usize,
    /// Lines scrolled back from the live view
    pub scroll_offset: usize,
    /// Buffer content not yet emitted
    pub pending: String,
    pub style: StyleSnapshot,
    pub halted: bool,
    /// Characters evicted from scrollback so far
    pub evicted: usize,
    pub lines: Vec<LineSnapshot>,
}

impl WindowSnapshot {
    /// Line list from a scrollback store
    pub fn lines_from(store: &ScrollbackStore) -> Vec<LineSnapshot> {
        store
            .lines()
            .map(|(index, line)| {
                let start = store.start_style(index).unwrap_or_default();
                LineSnapshot::from_line(index, line, &start)
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Scrollback as plain text, one line per logical line
    pub fn to_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> ScrollbackStore {
        let mut store = ScrollbackStore::new(10, 100);
        store.record_command("\x1b[1;31m");
        store.record_text("AB", 10).unwrap();
        store.new_line(0);
        store.record_text("C", 10).unwrap();
        store
    }

    fn sample(store: &ScrollbackStore) -> WindowSnapshot {
        WindowSnapshot {
            zone: Zone::new(0, 0, 10, 3),
            cursor: ZoneCursor::new(1, 1),
            view_top: 0,
            scroll_offset: 0,
            pending: String::new(),
            style: StyleSnapshot::from(store.style()),
            halted: false,
            evicted: store.evicted(),
            lines: WindowSnapshot::lines_from(store),
        }
    }

    #[test]
    fn test_lines_carry_start_style() {
        let store = sample_store();
        let snapshot = sample(&store);
        assert_eq!(snapshot.lines.len(), 2);
        assert!(snapshot.lines[0].start_style.flags.is_empty());
        assert_eq!(snapshot.lines[1].start_style.fg, Color::RED);
        assert_eq!(snapshot.lines[1].start_style.flags, vec![StyleFlag::Bold]);
    }

    #[test]
    fn test_snapshot_to_text() {
        let store = sample_store();
        assert_eq!(sample(&store).to_text(), "AB\nC");
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let store = sample_store();
        let snapshot = sample(&store);
        let json = snapshot.to_json().unwrap();
        let restored = WindowSnapshot::from_json(&json).unwrap();
        assert_eq!(snapshot, restored);
    }

    #[test]
    fn test_style_snapshot() {
        let mut state = StyleState::default();
        state.style.underline = true;
        state.bg = Color::BLUE;
        let snapshot = StyleSnapshot::from(&state);
        assert_eq!(snapshot.flags, vec![StyleFlag::Underline]);
        assert_eq!(snapshot.bg, Color::BLUE);
    }
}
