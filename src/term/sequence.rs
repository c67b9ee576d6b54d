//! Operations the window itself sends to the terminal
//!
//! Client output is restricted to a whitelisted subset of escape sequences.
//! The window needs a few more (absolute positioning in particular), which
//! it produces through a [`SequenceRenderer`] rather than literal strings.

/// Terminal operation with its parameters (0-indexed coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Move the cursor to an absolute position
    CursorTo { col: usize, row: usize },
    /// Reset all SGR attributes
    ResetStyle,
    /// Audible bell
    Bell,
    ShowCursor,
    HideCursor,
}

/// Renders operations into literal control strings
pub trait SequenceRenderer {
    fn render(&self, op: Operation) -> String;
}

/// ANSI/VT100 rendering
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiRenderer;

impl SequenceRenderer for AnsiRenderer {
    fn render(&self, op: Operation) -> String {
        match op {
            Operation::CursorTo { col, row } => format!("\x1b[{};{}H", row + 1, col + 1),
            Operation::ResetStyle => "\x1b[0m".to_string(),
            Operation::Bell => "\x07".to_string(),
            Operation::ShowCursor => "\x1b[?25h".to_string(),
            Operation::HideCursor => "\x1b[?25l".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_to_is_one_based() {
        assert_eq!(
            AnsiRenderer.render(Operation::CursorTo { col: 0, row: 0 }),
            "\x1b[1;1H"
        );
        assert_eq!(
            AnsiRenderer.render(Operation::CursorTo { col: 9, row: 4 }),
            "\x1b[5;10H"
        );
    }

    #[test]
    fn test_simple_operations() {
        assert_eq!(AnsiRenderer.render(Operation::ResetStyle), "\x1b[0m");
        assert_eq!(AnsiRenderer.render(Operation::Bell), "\x07");
        assert_eq!(AnsiRenderer.render(Operation::HideCursor), "\x1b[?25l");
    }
}
