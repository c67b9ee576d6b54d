//! Style state reconstruction
//!
//! The tracker never stores what the client asked for directly. It watches
//! every SGR command that reaches the terminal and folds it into a
//! [`StyleState`], which can be rendered back into a single escape string
//! to restore the exact visual context when a line is redrawn.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Complete SGR sequence: `ESC [ params m`
static SGR_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\x1b\[([0-9;]*)m$").expect("Invalid SGR regex"));

const RESET: &str = "\x1b[0m";

/// Color as selected by an SGR command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Color {
    /// Terminal default
    #[default]
    Default,
    /// 4-bit palette (0-7 normal, 8-15 bright); higher indices render as
    /// 8-bit palette entries
    Ansi { index: u8 },
    /// 8-bit palette
    Indexed { index: u8 },
    /// 24-bit color
    Rgb { r: u8, g: u8, b: u8 },
}

impl Color {
    pub const RED: Color = Color::Ansi { index: 1 };
    pub const GREEN: Color = Color::Ansi { index: 2 };
    pub const BLUE: Color = Color::Ansi { index: 4 };

    /// SGR command selecting this color as foreground
    pub fn foreground_sequence(&self) -> String {
        match *self {
            Color::Default => "\x1b[39m".to_string(),
            Color::Ansi { index } if index < 8 => format!("\x1b[{}m", 30 + u16::from(index)),
            Color::Ansi { index } if index < 16 => format!("\x1b[{}m", 90 + u16::from(index) - 8),
            Color::Ansi { index } | Color::Indexed { index } => format!("\x1b[38;5;{}m", index),
            Color::Rgb { r, g, b } => format!("\x1b[38;2;{};{};{}m", r, g, b),
        }
    }

    /// SGR command selecting this color as background
    pub fn background_sequence(&self) -> String {
        match *self {
            Color::Default => "\x1b[49m".to_string(),
            Color::Ansi { index } if index < 8 => format!("\x1b[{}m", 40 + u16::from(index)),
            Color::Ansi { index } if index < 16 => format!("\x1b[{}m", 100 + u16::from(index) - 8),
            Color::Ansi { index } | Color::Indexed { index } => format!("\x1b[48;5;{}m", index),
            Color::Rgb { r, g, b } => format!("\x1b[48;2;{};{};{}m", r, g, b),
        }
    }
}

/// Individual text attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleFlag {
    Bold,
    Faint,
    Italic,
    Underline,
    Blink,
    Inverse,
    Hidden,
    Strikethrough,
}

impl StyleFlag {
    /// Render order
    pub const ALL: [StyleFlag; 8] = [
        StyleFlag::Bold,
        StyleFlag::Faint,
        StyleFlag::Italic,
        StyleFlag::Underline,
        StyleFlag::Blink,
        StyleFlag::Inverse,
        StyleFlag::Hidden,
        StyleFlag::Strikethrough,
    ];

    /// SGR code that turns the flag on
    pub fn on_code(self) -> u8 {
        match self {
            StyleFlag::Bold => 1,
            StyleFlag::Faint => 2,
            StyleFlag::Italic => 3,
            StyleFlag::Underline => 4,
            StyleFlag::Blink => 5,
            StyleFlag::Inverse => 7,
            StyleFlag::Hidden => 8,
            StyleFlag::Strikethrough => 9,
        }
    }

    fn from_on_code(code: u16) -> Option<Self> {
        StyleFlag::ALL
            .into_iter()
            .find(|flag| u16::from(flag.on_code()) == code)
    }
}

/// An "off" code and the flags it cancels.
/// 22 (normal intensity) cancels both bold and faint.
fn cancelled_by(code: u16) -> Option<&'static [StyleFlag]> {
    match code {
        22 => Some(&[StyleFlag::Bold, StyleFlag::Faint]),
        23 => Some(&[StyleFlag::Italic]),
        24 => Some(&[StyleFlag::Underline]),
        25 => Some(&[StyleFlag::Blink]),
        27 => Some(&[StyleFlag::Inverse]),
        28 => Some(&[StyleFlag::Hidden]),
        29 => Some(&[StyleFlag::Strikethrough]),
        _ => None,
    }
}

/// Text style attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub bold: bool,
    pub faint: bool,
    pub italic: bool,
    pub underline: bool,
    pub blink: bool,
    pub inverse: bool,
    pub hidden: bool,
    pub strikethrough: bool,
}

impl Style {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn contains(&self, flag: StyleFlag) -> bool {
        *self.slot(flag)
    }

    /// Turn a flag on; no-op if already set
    pub fn insert(&mut self, flag: StyleFlag) {
        *self.slot_mut(flag) = true;
    }

    pub fn remove(&mut self, flag: StyleFlag) {
        *self.slot_mut(flag) = false;
    }

    /// Active flags in render order
    pub fn flags(&self) -> impl Iterator<Item = StyleFlag> + '_ {
        StyleFlag::ALL
            .into_iter()
            .filter(move |flag| self.contains(*flag))
    }

    pub fn is_empty(&self) -> bool {
        self.flags().next().is_none()
    }

    fn slot(&self, flag: StyleFlag) -> &bool {
        match flag {
            StyleFlag::Bold => &self.bold,
            StyleFlag::Faint => &self.faint,
            StyleFlag::Italic => &self.italic,
            StyleFlag::Underline => &self.underline,
            StyleFlag::Blink => &self.blink,
            StyleFlag::Inverse => &self.inverse,
            StyleFlag::Hidden => &self.hidden,
            StyleFlag::Strikethrough => &self.strikethrough,
        }
    }

    fn slot_mut(&mut self, flag: StyleFlag) -> &mut bool {
        match flag {
            StyleFlag::Bold => &mut self.bold,
            StyleFlag::Faint => &mut self.faint,
            StyleFlag::Italic => &mut self.italic,
            StyleFlag::Underline => &mut self.underline,
            StyleFlag::Blink => &mut self.blink,
            StyleFlag::Inverse => &mut self.inverse,
            StyleFlag::Hidden => &mut self.hidden,
            StyleFlag::Strikethrough => &mut self.strikethrough,
        }
    }
}

/// One attribute of a parsed SGR sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SgrAttribute {
    /// SGR 0: clear everything
    Reset,
    /// Foreground (39 selects the default)
    Foreground(Color),
    /// Background (49 selects the default)
    Background(Color),
    /// Style on
    Set(StyleFlag),
    /// Style off: the SGR code and the flags it cancels
    Cancel(u16),
}

/// Parse the parameter list of an SGR sequence.
///
/// Returns `None` if any parameter falls outside the supported subset, so
/// the same function serves as validator for the classifier.
pub fn parse_sgr(params: &str) -> Option<Vec<SgrAttribute>> {
    if params.is_empty() {
        return Some(vec![SgrAttribute::Reset]);
    }

    let values: Vec<u16> = params
        .split(';')
        .map(|p| if p.is_empty() { Some(0) } else { p.parse().ok() })
        .collect::<Option<_>>()?;

    let mut attrs = Vec::with_capacity(values.len());
    let mut iter = values.into_iter();
    while let Some(code) = iter.next() {
        let attr = match code {
            0 => SgrAttribute::Reset,
            1..=5 | 7..=9 => SgrAttribute::Set(StyleFlag::from_on_code(code)?),
            22..=25 | 27..=29 => SgrAttribute::Cancel(code),
            30..=37 => SgrAttribute::Foreground(Color::Ansi {
                index: (code - 30) as u8,
            }),
            38 => SgrAttribute::Foreground(extended_color(&mut iter)?),
            39 => SgrAttribute::Foreground(Color::Default),
            40..=47 => SgrAttribute::Background(Color::Ansi {
                index: (code - 40) as u8,
            }),
            48 => SgrAttribute::Background(extended_color(&mut iter)?),
            49 => SgrAttribute::Background(Color::Default),
            90..=97 => SgrAttribute::Foreground(Color::Ansi {
                index: (code - 90 + 8) as u8,
            }),
            100..=107 => SgrAttribute::Background(Color::Ansi {
                index: (code - 100 + 8) as u8,
            }),
            _ => return None,
        };
        attrs.push(attr);
    }
    Some(attrs)
}

/// `5;n` (8-bit) or `2;r;g;b` (truecolor) following 38/48
fn extended_color(iter: &mut impl Iterator<Item = u16>) -> Option<Color> {
    let component = |v: u16| u8::try_from(v).ok();
    match iter.next()? {
        5 => Some(Color::Indexed {
            index: component(iter.next()?)?,
        }),
        2 => {
            let r = component(iter.next()?)?;
            let g = component(iter.next()?)?;
            let b = component(iter.next()?)?;
            Some(Color::Rgb { r, g, b })
        }
        _ => None,
    }
}

/// Parse a complete SGR command, or `None` if it is not one we support
pub fn parse_sgr_sequence(command: &str) -> Option<Vec<SgrAttribute>> {
    let caps = SGR_SEQUENCE.captures(command)?;
    parse_sgr(caps.get(1).map_or("", |m| m.as_str()))
}

/// Active colors and attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleState {
    pub fg: Color,
    pub bg: Color,
    pub style: Style,
}

impl StyleState {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&mut self, attr: SgrAttribute) {
        match attr {
            SgrAttribute::Reset => *self = Self::default(),
            SgrAttribute::Foreground(color) => self.fg = color,
            SgrAttribute::Background(color) => self.bg = color,
            SgrAttribute::Set(flag) => self.style.insert(flag),
            SgrAttribute::Cancel(code) => {
                for flag in cancelled_by(code).unwrap_or_default() {
                    self.style.remove(*flag);
                }
            }
        }
    }

    /// Escape string that recreates this state from any prior state:
    /// reset, foreground, background, then each active flag
    pub fn render(&self) -> String {
        let mut out = String::from(RESET);
        out.push_str(&self.fg.foreground_sequence());
        out.push_str(&self.bg.background_sequence());
        for flag in self.style.flags() {
            out.push_str(&format!("\x1b[{}m", flag.on_code()));
        }
        out
    }
}

/// Incremental style reconstruction from emitted commands
#[derive(Debug, Clone, Default)]
pub struct StyleTracker {
    state: StyleState,
}

impl StyleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker resuming from a known state
    pub fn from_state(state: StyleState) -> Self {
        Self { state }
    }

    /// Fold a command into the state. Returns false for commands that are
    /// not SGR sequences (they leave the state unchanged).
    pub fn observe(&mut self, command: &str) -> bool {
        let Some(attrs) = parse_sgr_sequence(command) else {
            return false;
        };
        for attr in attrs {
            self.state.apply(attr);
        }
        true
    }

    pub fn state(&self) -> &StyleState {
        &self.state
    }

    pub fn render(&self) -> String {
        self.state.render()
    }

    pub fn reset(&mut self) {
        self.state = StyleState::default();
    }
}
