//! Classified output units
//!
//! A raw string handed to a window is decomposed into units before it
//! touches the buffer. Units are the smallest things the engine ever
//! emits, stores or evicts; a command unit is never split.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

/// C0 control characters the cursor policy understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlCode {
    /// BEL - Bell
    Bell,
    /// BS - Backspace
    Backspace,
    /// HT - Horizontal Tab
    Tab,
    /// LF - Line Feed
    LineFeed,
    /// VT - Vertical Tab
    VerticalTab,
    /// CR - Carriage Return
    CarriageReturn,
}

impl ControlCode {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '\x07' => Some(ControlCode::Bell),
            '\x08' => Some(ControlCode::Backspace),
            '\t' => Some(ControlCode::Tab),
            '\n' => Some(ControlCode::LineFeed),
            '\x0b' => Some(ControlCode::VerticalTab),
            '\r' => Some(ControlCode::CarriageReturn),
            _ => None,
        }
    }

    /// The control code if `command` is exactly one control character
    pub fn from_command(command: &str) -> Option<Self> {
        let mut chars = command.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            ControlCode::Bell => '\x07',
            ControlCode::Backspace => '\x08',
            ControlCode::Tab => '\t',
            ControlCode::LineFeed => '\n',
            ControlCode::VerticalTab => '\x0b',
            ControlCode::CarriageReturn => '\r',
        }
    }
}

/// One classified fragment of output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Unit {
    /// Printable text and the number of columns it occupies
    Text { content: String, width: usize },
    /// A single control character or one complete escape sequence
    Command { content: String },
}

impl Unit {
    pub fn text(content: impl Into<String>) -> Self {
        let content = content.into();
        let width = content.width();
        Unit::Text { content, width }
    }

    pub fn command(content: impl Into<String>) -> Self {
        Unit::Command {
            content: content.into(),
        }
    }

    pub fn control(code: ControlCode) -> Self {
        Unit::command(code.as_char())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Unit::Text { content, .. } | Unit::Command { content } => content,
        }
    }

    /// Columns occupied on screen; always 0 for commands
    pub fn visual_width(&self) -> usize {
        match self {
            Unit::Text { width, .. } => *width,
            Unit::Command { .. } => 0,
        }
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.as_str().chars().count()
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Unit::Command { .. })
    }

    /// The control code if this is a single-character command
    pub fn control_code(&self) -> Option<ControlCode> {
        match self {
            Unit::Command { content } => ControlCode::from_command(content),
            Unit::Text { .. } => None,
        }
    }

    /// Drop the first `count` characters of a text unit, recomputing its
    /// width. Returns the number of characters removed. Commands are
    /// left untouched.
    pub(crate) fn trim_front(&mut self, count: usize) -> usize {
        match self {
            Unit::Text { content, width } => {
                let cut = content
                    .char_indices()
                    .nth(count)
                    .map_or(content.len(), |(i, _)| i);
                let removed = content[..cut].chars().count();
                content.replace_range(..cut, "");
                *width = content.width();
                removed
            }
            Unit::Command { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width() {
        assert_eq!(Unit::text("abc").visual_width(), 3);
        assert_eq!(Unit::text("中文").visual_width(), 4);
        assert_eq!(Unit::text("中文").char_len(), 2);
    }

    #[test]
    fn test_command_has_no_width() {
        let unit = Unit::command("\x1b[31m");
        assert_eq!(unit.visual_width(), 0);
        assert_eq!(unit.char_len(), 5);
        assert!(unit.is_command());
        assert_eq!(unit.control_code(), None);
    }

    #[test]
    fn test_control_code_round_trip() {
        for code in [
            ControlCode::Bell,
            ControlCode::Backspace,
            ControlCode::Tab,
            ControlCode::LineFeed,
            ControlCode::VerticalTab,
            ControlCode::CarriageReturn,
        ] {
            assert_eq!(ControlCode::from_char(code.as_char()), Some(code));
            assert_eq!(Unit::control(code).control_code(), Some(code));
        }
        assert_eq!(ControlCode::from_char('a'), None);
        assert_eq!(ControlCode::from_char('\x0c'), None);
        assert_eq!(ControlCode::from_command("\r"), Some(ControlCode::CarriageReturn));
        assert_eq!(ControlCode::from_command("\r\n"), None);
    }

    #[test]
    fn test_trim_front() {
        let mut unit = Unit::text("héllo");
        assert_eq!(unit.trim_front(2), 2);
        assert_eq!(unit.as_str(), "llo");
        assert_eq!(unit.visual_width(), 3);

        assert_eq!(unit.trim_front(10), 3);
        assert_eq!(unit.as_str(), "");

        let mut cmd = Unit::command("\x1b[1m");
        assert_eq!(cmd.trim_front(1), 0);
        assert_eq!(cmd.as_str(), "\x1b[1m");
    }

    #[test]
    fn test_unit_serializes_tagged() {
        let json = serde_json::to_string(&Unit::text("hi")).unwrap();
        assert_eq!(json, r#"{"kind":"text","content":"hi","width":2}"#);
    }
}
