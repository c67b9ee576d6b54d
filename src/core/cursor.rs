//! Zone cursor and control-character policy
//!
//! The zone cursor is the window's virtual cursor, relative to the zone's
//! top-left corner. `x` is bounded by the zone width (it may sit exactly at
//! the right edge after a full line); `y` counts logical lines and is
//! unbounded.

use serde::{Deserialize, Serialize};

use crate::parser::ControlCode;

/// Tab stops every 4 columns
pub const TAB_WIDTH: usize = 4;

/// Virtual cursor inside a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneCursor {
    /// Column (0-indexed, at most the zone width)
    pub x: usize,
    /// Logical line (0-indexed)
    pub y: usize,
}

impl ZoneCursor {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Move to the start of the next line
    pub fn newline(&mut self) {
        self.x = 0;
        self.y += 1;
    }

    /// Advance by a printed width, clamped to the zone width
    pub fn advance(&mut self, cols: usize, width: usize) {
        self.x = (self.x + cols).min(width);
    }

    /// Columns left on the current line
    pub fn remaining(&self, width: usize) -> usize {
        width.saturating_sub(self.x)
    }
}

/// Side effect of a control character: start a new storage line whose
/// first `indent` columns are blank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewLine {
    pub indent: usize,
}

/// Next tab stop strictly after `x` that still fits in the zone
pub fn next_tab_stop(x: usize, width: usize) -> Option<usize> {
    let stop = (x / TAB_WIDTH + 1) * TAB_WIDTH;
    (stop <= width).then_some(stop)
}

/// Apply a control character to the cursor.
///
/// Pure: returns the new cursor and whether a storage line must be started.
pub fn apply(cursor: ZoneCursor, code: ControlCode, width: usize) -> (ZoneCursor, Option<NewLine>) {
    let mut next = cursor;
    let mut new_line = None;

    match code {
        ControlCode::LineFeed => {
            next.newline();
            new_line = Some(NewLine { indent: 0 });
        }
        ControlCode::Backspace => {
            next.x = cursor.x.saturating_sub(1);
        }
        ControlCode::Tab => {
            if let Some(stop) = next_tab_stop(cursor.x, width) {
                next.x = stop;
            }
        }
        ControlCode::VerticalTab => {
            if cursor.x > 0 && cursor.x < width {
                next.y += 1;
                new_line = Some(NewLine { indent: cursor.x });
            }
        }
        ControlCode::CarriageReturn => {
            next.x = 0;
        }
        ControlCode::Bell => {}
    }

    (next, new_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_feed() {
        let (c, nl) = apply(ZoneCursor::new(3, 2), ControlCode::LineFeed, 10);
        assert_eq!(c, ZoneCursor::new(0, 3));
        assert_eq!(nl, Some(NewLine { indent: 0 }));
    }

    #[test]
    fn test_backspace_saturates() {
        let (c, _) = apply(ZoneCursor::new(1, 0), ControlCode::Backspace, 10);
        assert_eq!(c.x, 0);
        let (c, nl) = apply(c, ControlCode::Backspace, 10);
        assert_eq!(c.x, 0);
        assert_eq!(nl, None);
    }

    #[test]
    fn test_tab_stops() {
        assert_eq!(apply(ZoneCursor::new(0, 0), ControlCode::Tab, 10).0.x, 4);
        assert_eq!(apply(ZoneCursor::new(3, 0), ControlCode::Tab, 10).0.x, 4);
        assert_eq!(apply(ZoneCursor::new(4, 0), ControlCode::Tab, 10).0.x, 8);
        // 12 > width: unchanged
        assert_eq!(apply(ZoneCursor::new(9, 0), ControlCode::Tab, 10).0.x, 9);
        // Stop exactly at the width is allowed
        assert_eq!(apply(ZoneCursor::new(5, 0), ControlCode::Tab, 8).0.x, 8);
    }

    #[test]
    fn test_vertical_tab() {
        let (c, nl) = apply(ZoneCursor::new(3, 1), ControlCode::VerticalTab, 10);
        assert_eq!(c, ZoneCursor::new(3, 2));
        assert_eq!(nl, Some(NewLine { indent: 3 }));

        for x in [0, 10] {
            let start = ZoneCursor::new(x, 1);
            let (c, nl) = apply(start, ControlCode::VerticalTab, 10);
            assert_eq!(c, start);
            assert_eq!(nl, None);
        }
    }

    #[test]
    fn test_carriage_return_and_bell() {
        let (c, nl) = apply(ZoneCursor::new(7, 4), ControlCode::CarriageReturn, 10);
        assert_eq!(c, ZoneCursor::new(0, 4));
        assert_eq!(nl, None);

        let start = ZoneCursor::new(7, 4);
        assert_eq!(apply(start, ControlCode::Bell, 10), (start, None));
    }

    #[test]
    fn test_advance_clamps() {
        let mut c = ZoneCursor::new(3, 0);
        c.advance(4, 5);
        assert_eq!(c.x, 5);
        assert_eq!(c.remaining(5), 0);
    }
}
