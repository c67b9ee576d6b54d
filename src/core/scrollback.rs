//! Scrollback store
//!
//! Everything a window emits is archived here as typed units, grouped into
//! logical (post-wrap) lines. Retention is bounded in characters; the oldest
//! units are evicted from the front, text a character at a time and
//! commands whole. Each line carries the style state active at its end so a
//! line can be redrawn without replaying the history before it.

use std::collections::VecDeque;

use serde::Serialize;
use unicode_width::UnicodeWidthChar;

use crate::error::{Error, Result};
use crate::parser::{ControlCode, Unit};

use super::cursor::{self, ZoneCursor};
use super::style::{StyleState, StyleTracker};

/// One logical line of history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrollbackLine {
    units: VecDeque<Unit>,
    /// Blank columns before the first unit
    indent: usize,
    /// Style active when the line was closed; `None` for the open line
    end_style: Option<StyleState>,
}

impl ScrollbackLine {
    fn new(indent: usize) -> Self {
        Self {
            indent,
            ..Self::default()
        }
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn end_style(&self) -> Option<&StyleState> {
        self.end_style.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Characters held by this line
    pub fn char_len(&self) -> usize {
        self.units.iter().map(Unit::char_len).sum()
    }

    /// Text as it appears on screen: indentation kept, cursor controls
    /// applied (later text overwrites earlier), trailing blanks trimmed
    pub fn text(&self) -> String {
        let mut cells = vec![" ".to_string(); self.indent];
        let mut x = self.indent;

        for unit in &self.units {
            match unit {
                Unit::Text { content, .. } => {
                    for c in content.chars() {
                        let w = c.width().unwrap_or(0);
                        if w == 0 {
                            if let Some(prev) = x.checked_sub(1).and_then(|i| cells.get_mut(i)) {
                                prev.push(c);
                            }
                            continue;
                        }
                        if cells.len() < x + w {
                            cells.resize(x + w, " ".to_string());
                        }
                        cells[x] = c.to_string();
                        for cell in &mut cells[x + 1..x + w] {
                            cell.clear();
                        }
                        x += w;
                    }
                }
                Unit::Command { .. } => {
                    if let Some(code) = unit.control_code() {
                        x = cursor::apply(ZoneCursor::new(x, 0), code, usize::MAX).0.x;
                    }
                }
            }
        }

        cells.concat().trim_end().to_string()
    }
}

/// Bounded, line-indexed archive of emitted units
#[derive(Debug, Clone)]
pub struct ScrollbackStore {
    width: usize,
    retention: usize,
    lines: VecDeque<ScrollbackLine>,
    /// Absolute index of `lines[0]`
    first_line: usize,
    /// Style at the start of the first retained line
    head: StyleTracker,
    /// Style after the last recorded command
    tracker: StyleTracker,
    len: usize,
    evicted: usize,
}

impl ScrollbackStore {
    /// Store for a zone `width` columns wide keeping at most `retention`
    /// characters
    pub fn new(width: usize, retention: usize) -> Self {
        Self {
            width,
            retention,
            lines: VecDeque::from([ScrollbackLine::new(0)]),
            first_line: 0,
            head: StyleTracker::new(),
            tracker: StyleTracker::new(),
            len: 0,
            evicted: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Characters currently retained
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Characters evicted since creation
    pub fn evicted(&self) -> usize {
        self.evicted
    }

    /// Number of retained lines (never 0)
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Absolute index of the oldest retained line
    pub fn first_line(&self) -> usize {
        self.first_line
    }

    /// Absolute index of the open line
    pub fn last_line(&self) -> usize {
        self.first_line + self.lines.len() - 1
    }

    /// Line by absolute index
    pub fn line(&self, index: usize) -> Option<&ScrollbackLine> {
        index
            .checked_sub(self.first_line)
            .and_then(|i| self.lines.get(i))
    }

    /// Retained lines with their absolute indices
    pub fn lines(&self) -> impl Iterator<Item = (usize, &ScrollbackLine)> {
        self.lines
            .iter()
            .enumerate()
            .map(move |(i, line)| (self.first_line + i, line))
    }

    /// Style active at the start of a line
    pub fn start_style(&self, index: usize) -> Option<StyleState> {
        let i = index.checked_sub(self.first_line)?;
        match i {
            0 => Some(*self.head.state()),
            _ => self.lines.get(i - 1)?.end_style,
        }
    }

    /// Style after everything recorded so far
    pub fn style(&self) -> &StyleState {
        self.tracker.state()
    }

    /// Record printed text. `width` must be the width the store was built for.
    pub fn record_text(&mut self, text: &str, width: usize) -> Result<()> {
        if width != self.width {
            return Err(Error::WidthMismatch {
                expected: self.width,
                actual: width,
            });
        }
        if text.is_empty() {
            return Ok(());
        }
        self.push(Unit::text(text));
        Ok(())
    }

    /// Record a command. Commands are width-exempt and never split.
    pub fn record_command(&mut self, command: &str) {
        if command.is_empty() {
            return;
        }
        self.tracker.observe(command);
        self.push(Unit::command(command));
    }

    /// Close the open line, snapshotting the current style against it, and
    /// open a new one
    pub fn new_line(&mut self, indent: usize) {
        let style = *self.tracker.state();
        if let Some(last) = self.lines.back_mut() {
            last.end_style = Some(style);
        }
        self.lines.push_back(ScrollbackLine::new(indent));
    }

    /// Every retained unit, oldest first
    pub fn archive(&self) -> Vec<Unit> {
        self.lines
            .iter()
            .flat_map(|line| line.units.iter().cloned())
            .collect()
    }

    /// Retained text, one line per logical line
    pub fn archive_text(&self) -> String {
        self.lines
            .iter()
            .map(ScrollbackLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn push(&mut self, unit: Unit) {
        self.len += unit.char_len();
        if let Some(last) = self.lines.back_mut() {
            last.units.push_back(unit);
        }
        if self.len > self.retention {
            self.evict(self.len - self.retention);
        }
    }

    /// Remove at least `excess` characters from the front. A command is
    /// removed whole, so more may go than asked for. The newest unit is
    /// never removed.
    fn evict(&mut self, mut excess: usize) {
        let before = self.len;

        while excess > 0 {
            self.prune_leading_empty();
            let sole_unit = self.lines.len() == 1 && self.lines[0].units.len() == 1;
            let line = &mut self.lines[0];
            let Some(unit) = line.units.front_mut() else {
                break;
            };

            if unit.is_command() {
                if sole_unit {
                    break;
                }
                let removed = unit.char_len();
                if let Some(Unit::Command { content }) = line.units.pop_front() {
                    // A cursor control still moves what follows it
                    match ControlCode::from_command(&content) {
                        Some(code) => {
                            let at = ZoneCursor::new(line.indent, 0);
                            line.indent = cursor::apply(at, code, usize::MAX).0.x;
                        }
                        None => {
                            self.head.observe(&content);
                        }
                    }
                }
                self.len -= removed;
                excess = excess.saturating_sub(removed);
            } else {
                let old_width = unit.visual_width();
                let removed = unit.trim_front(excess);
                line.indent += old_width - unit.visual_width();
                if unit.as_str().is_empty() {
                    line.units.pop_front();
                }
                self.len -= removed;
                excess -= removed;
            }
        }

        self.prune_leading_empty();
        self.evicted += before - self.len;
        tracing::debug!(
            evicted = before - self.len,
            retained = self.len,
            first_line = self.first_line,
            "scrollback eviction"
        );
    }

    fn prune_leading_empty(&mut self) {
        while self.lines.len() > 1 && self.lines[0].is_empty() {
            self.pop_front_line();
        }
    }

    fn pop_front_line(&mut self) {
        if self.lines.len() <= 1 {
            panic!("EmptyLineInvariantViolation: the last scrollback line cannot be removed");
        }
        if let Some(line) = self.lines.pop_front() {
            if let Some(style) = line.end_style {
                self.head = StyleTracker::from_state(style);
            }
            self.first_line += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::style::Color;

    #[test]
    fn test_record_and_lines() {
        let mut store = ScrollbackStore::new(10, 100);
        store.record_text("hello", 10).unwrap();
        store.new_line(0);
        store.record_text("world", 10).unwrap();

        assert_eq!(store.line_count(), 2);
        assert_eq!(store.len(), 10);
        assert_eq!(store.archive_text(), "hello\nworld");
        assert_eq!(store.line(1).unwrap().text(), "world");
        assert!(store.line(2).is_none());
    }

    #[test]
    fn test_width_mismatch() {
        let mut store = ScrollbackStore::new(10, 100);
        let err = store.record_text("x", 8).unwrap_err();
        assert!(matches!(
            err,
            Error::WidthMismatch {
                expected: 10,
                actual: 8
            }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_inputs_are_noops() {
        let mut store = ScrollbackStore::new(10, 100);
        store.record_text("", 10).unwrap();
        store.record_command("");
        assert!(store.archive().is_empty());
    }

    #[test]
    fn test_line_end_style_snapshot() {
        let mut store = ScrollbackStore::new(10, 100);
        store.record_command("\x1b[31m");
        store.record_text("red", 10).unwrap();
        store.new_line(0);
        store.record_command("\x1b[1m");

        assert_eq!(store.line(0).unwrap().end_style().unwrap().fg, Color::RED);
        assert!(store.line(1).unwrap().end_style().is_none());
        assert_eq!(store.start_style(1).unwrap().fg, Color::RED);
        assert!(store.start_style(0).unwrap().is_default());
        assert!(store.style().style.bold);
    }

    #[test]
    fn test_eviction_trims_text() {
        let mut store = ScrollbackStore::new(10, 5);
        store.record_text("abc", 10).unwrap();
        store.record_text("defg", 10).unwrap();
        assert_eq!(store.len(), 5);
        assert_eq!(store.archive_text(), "  cdefg");
        assert_eq!(store.evicted(), 2);
    }

    #[test]
    fn test_evicted_carriage_return_resets_indent() {
        let mut store = ScrollbackStore::new(10, 4);
        store.record_text("abcd", 10).unwrap();
        store.record_command("\r");
        store.record_text("xy", 10).unwrap();
        store.record_text("z", 10).unwrap();
        assert_eq!(store.archive_text(), "xyz");

        // The CR itself goes now; the text must stay at column 0
        store.record_text("w", 10).unwrap();
        assert_eq!(store.archive(), vec![Unit::text("xy"), Unit::text("z"), Unit::text("w")]);
        assert_eq!(store.line(0).unwrap().indent(), 0);
        assert_eq!(store.archive_text(), "xyzw");
    }

    #[test]
    fn test_evicted_backspace_and_tab_move_indent() {
        let mut store = ScrollbackStore::new(10, 3);
        store.record_text("ab", 10).unwrap();
        store.record_command("\x08");
        store.record_text("c", 10).unwrap();
        // "ab" evicted to indent 2, then the backspace leaves indent 1
        store.record_text("d", 10).unwrap();
        store.record_text("e", 10).unwrap();
        assert_eq!(store.archive_text(), " cde");

        let mut store = ScrollbackStore::new(10, 2);
        store.record_text("a", 10).unwrap();
        store.record_command("\t");
        store.record_text("b", 10).unwrap();
        store.record_text("c", 10).unwrap();
        assert_eq!(store.line(0).unwrap().indent(), 4);
        assert_eq!(store.archive_text(), "    bc");
    }

    #[test]
    fn test_eviction_removes_command_whole() {
        let mut store = ScrollbackStore::new(10, 8);
        store.record_command("\x1b[31m");
        store.record_text("ab", 10).unwrap();
        assert_eq!(store.len(), 7);

        store.record_text("cd", 10).unwrap();
        // One char over: the whole 5-char command goes
        assert_eq!(store.archive(), vec![Unit::text("ab"), Unit::text("cd")]);
        assert_eq!(store.len(), 4);
        // Its effect survives in the head style
        assert_eq!(store.start_style(0).unwrap().fg, Color::RED);
    }

    #[test]
    fn test_eviction_prunes_leading_lines() {
        let mut store = ScrollbackStore::new(10, 4);
        store.record_command("\x1b[32m");
        store.new_line(0);
        store.record_text("abcd", 10).unwrap();
        store.new_line(0);
        store.record_text("ef", 10).unwrap();

        assert_eq!(store.first_line(), 1);
        assert_eq!(store.last_line(), 2);
        assert_eq!(store.archive_text(), "  cd\nef");
        assert_eq!(store.start_style(1).unwrap().fg, Color::GREEN);
        assert!(store.line(0).is_none());
    }

    #[test]
    fn test_oversized_text_keeps_tail() {
        let mut store = ScrollbackStore::new(20, 3);
        store.record_text("abcdefgh", 20).unwrap();
        assert_eq!(store.archive(), vec![Unit::text("fgh")]);
        assert_eq!(store.line_count(), 1);
    }

    #[test]
    fn test_oversized_command_kept_whole() {
        let mut store = ScrollbackStore::new(20, 3);
        store.record_text("ab", 20).unwrap();
        store.record_command("\x1b[38;5;200m");
        assert_eq!(store.archive(), vec![Unit::command("\x1b[38;5;200m")]);
    }

    #[test]
    fn test_sole_line_survives_full_eviction() {
        let mut store = ScrollbackStore::new(10, 2);
        store.new_line(0);
        store.new_line(0);
        store.record_text("xyz", 10).unwrap();
        assert_eq!(store.line_count(), 1);
        assert_eq!(store.first_line(), 2);
        assert_eq!(store.archive_text(), " yz");
    }

    #[test]
    fn test_line_text_applies_controls() {
        let mut store = ScrollbackStore::new(10, 100);
        store.record_text("abcd", 10).unwrap();
        store.record_command("\r");
        store.record_text("xy", 10).unwrap();
        store.record_command("\t");
        store.record_text("z", 10).unwrap();
        store.record_command("\x1b[1m");
        assert_eq!(store.archive_text(), "xycdz");
        assert_eq!(store.len(), 13);
    }

    #[test]
    fn test_vertical_tab_indent() {
        let mut store = ScrollbackStore::new(10, 100);
        store.record_text("ab", 10).unwrap();
        store.new_line(2);
        store.record_text("c", 10).unwrap();
        assert_eq!(store.archive_text(), "ab\n  c");
    }

    #[test]
    #[should_panic(expected = "EmptyLineInvariantViolation")]
    fn test_removing_last_line_panics() {
        let mut store = ScrollbackStore::new(10, 10);
        store.pop_front_line();
    }
}
