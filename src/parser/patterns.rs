//! Escape sequence denylist and whitelist
//!
//! All patterns are anchored at the start of the candidate so they can be
//! tried against the remainder of the input at an ESC introducer. The
//! denylist is checked before the whitelist.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::style::parse_sgr;

/// Sequences that would move the real cursor or destroy screen content
/// behind the engine's back
static DENYLIST: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("cursor position", r"^\x1b\[[0-9;]*[Hf]"),
        ("absolute column/row", r"^\x1b\[[0-9]*[Gd`]"),
        ("erase", r"^\x1b\[[0-9;?]*[JKX]"),
        ("cursor position report", r"^\x1b\[\??6n"),
        ("scroll region", r"^\x1b\[[0-9;]*r"),
        ("full reset", r"^\x1bc"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("Invalid denylist regex")))
    .collect()
});

static SGR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\x1b\[([0-9;]*)m").expect("Invalid SGR regex"));

static CURSOR_MODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\x1b\[\?(25|12)([hl])").expect("Invalid cursor mode regex"));

static SAVE_RESTORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\x1b(?:([78])|\[([su]))").expect("Invalid save/restore regex"));

/// Kind of a whitelisted escape sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    /// Color, background, style or reset
    Sgr,
    /// `ESC[?25h` / `ESC[?25l`
    CursorVisibility { visible: bool },
    /// `ESC[?12h` / `ESC[?12l`
    CursorBlink { blinking: bool },
    /// `ESC 7` / `ESC[s`
    SaveCursor,
    /// `ESC 8` / `ESC[u`
    RestoreCursor,
}

impl SequenceKind {
    /// Whether the sequence moves the real terminal cursor
    pub fn moves_cursor(self) -> bool {
        matches!(self, SequenceKind::RestoreCursor)
    }
}

/// Name of the denylist entry matching the start of `input`
pub fn denied(input: &str) -> Option<(&'static str, usize)> {
    DENYLIST
        .iter()
        .find_map(|(name, re)| re.find(input).map(|m| (*name, m.end())))
}

/// Match a whitelisted sequence at the start of `input`, returning its kind
/// and byte length. SGR parameters outside the supported subset do not
/// match.
pub fn whitelisted(input: &str) -> Option<(SequenceKind, usize)> {
    if let Some(caps) = SGR.captures(input) {
        let params = caps.get(1).map_or("", |m| m.as_str());
        return parse_sgr(params).map(|_| (SequenceKind::Sgr, caps[0].len()));
    }

    if let Some(caps) = CURSOR_MODE.captures(input) {
        let on = &caps[2] == "h";
        let kind = if &caps[1] == "25" {
            SequenceKind::CursorVisibility { visible: on }
        } else {
            SequenceKind::CursorBlink { blinking: on }
        };
        return Some((kind, caps[0].len()));
    }

    if let Some(caps) = SAVE_RESTORE.captures(input) {
        let save = matches!(
            caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()),
            Some("7") | Some("s")
        );
        let kind = if save {
            SequenceKind::SaveCursor
        } else {
            SequenceKind::RestoreCursor
        };
        return Some((kind, caps[0].len()));
    }

    None
}

/// Classify a complete command string: `Some` only if the whole string is
/// exactly one whitelisted sequence
pub fn sequence_kind(command: &str) -> Option<SequenceKind> {
    match whitelisted(command) {
        Some((kind, len)) if len == command.len() => Some(kind),
        _ => None,
    }
}
