//! Zone controller
//!
//! Owns a window's virtual cursor and decides, for every buffer event,
//! what the window has to do so the real terminal stays in step: flush
//! pending text before a command, wrap lines that would overrun the zone,
//! reposition the real cursor before output and apply the cursor policy
//! to control characters.
//!
//! The controller never touches the terminal itself. It reacts to events
//! with a list of [`ZoneAction`]s that the owning window carries out.

use unicode_width::UnicodeWidthChar;

use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::parser::{self, ControlCode, Unit};

use super::cursor::{self, NewLine, ZoneCursor};

/// Controller state between events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneState {
    #[default]
    Idle,
    /// A command is being sent
    AwaitingCommand,
    /// Output is being written
    AwaitingChar,
}

/// Work the window must perform in response to an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneAction {
    /// Flush the buffer before continuing
    FlushPending,
    /// Print text at the current cursor; it is known to fit the line
    EmitText(String),
    /// Write a buffered escape sequence
    EmitCommand(String),
    /// Line is full: continue on the next line
    Wrap,
    /// A control character opened a new storage line
    StartLine { indent: usize },
    /// Position the real cursor at this zone position
    MoveCursor(ZoneCursor),
    /// Ring the terminal bell
    Bell,
}

/// Virtual cursor and line policy of one zone
#[derive(Debug, Clone)]
pub struct ZoneController {
    width: usize,
    cursor: ZoneCursor,
    state: ZoneState,
}

impl ZoneController {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            cursor: ZoneCursor::default(),
            state: ZoneState::Idle,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn cursor(&self) -> ZoneCursor {
        self.cursor
    }

    pub fn state(&self) -> ZoneState {
        self.state
    }

    /// Carry out a wrap decided by an earlier flush plan
    pub fn wrap(&mut self) {
        self.cursor.newline();
    }

    /// React to a window event
    pub fn react(&mut self, event: &Event) -> Result<Vec<ZoneAction>> {
        let actions = match event.kind {
            EventKind::BeforeCommandSent => {
                self.state = ZoneState::AwaitingCommand;
                if event.flags > 0 {
                    vec![ZoneAction::FlushPending]
                } else {
                    Vec::new()
                }
            }
            EventKind::AfterCommandSent => {
                self.state = ZoneState::Idle;
                self.after_command(&event.payload)
            }
            EventKind::BeforeFlush | EventKind::BeforeAutoFlush => {
                self.state = ZoneState::AwaitingChar;
                self.plan_flush(&event.payload)?
            }
            EventKind::BeforeCharacterOutput | EventKind::BeforeCommandOutput => {
                self.state = ZoneState::AwaitingChar;
                vec![ZoneAction::MoveCursor(self.cursor)]
            }
            EventKind::AfterCharacterOutput => {
                self.cursor.advance(event.flags as usize, self.width);
                Vec::new()
            }
            EventKind::AfterCommandOutput | EventKind::AfterFlush | EventKind::AfterAutoFlush => {
                self.state = ZoneState::Idle;
                Vec::new()
            }
        };
        Ok(actions)
    }

    /// Control characters move the virtual cursor and are consumed here;
    /// escape sequences stay buffered
    fn after_command(&mut self, command: &str) -> Vec<ZoneAction> {
        let Some(code) = ControlCode::from_command(command) else {
            return Vec::new();
        };

        let (next, new_line) = cursor::apply(self.cursor, code, self.width);
        tracing::trace!(?code, from = ?self.cursor, to = ?next, "control character");
        self.cursor = next;

        let mut actions = Vec::new();
        if code == ControlCode::Bell {
            actions.push(ZoneAction::Bell);
        }
        if let Some(NewLine { indent }) = new_line {
            actions.push(ZoneAction::StartLine { indent });
        }
        actions
    }

    /// Split pending content into printable slices that each fit on the
    /// current line, with wraps between them
    fn plan_flush(&self, pending: &str) -> Result<Vec<ZoneAction>> {
        let mut actions = Vec::new();
        let mut x = self.cursor.x;

        for unit in parser::classify(pending)? {
            let content = match unit {
                Unit::Command { content } => {
                    actions.push(ZoneAction::EmitCommand(content));
                    continue;
                }
                Unit::Text { content, .. } => content,
            };

            let mut segment = String::new();
            let mut segment_width = 0;
            for c in content.chars() {
                let w = c.width().unwrap_or(0);
                if w > self.width {
                    return Err(Error::ZoneOverflow { width: self.width });
                }
                if x + segment_width + w > self.width {
                    if !segment.is_empty() {
                        actions.push(ZoneAction::EmitText(std::mem::take(&mut segment)));
                    }
                    tracing::debug!(width = self.width, "line wrap");
                    actions.push(ZoneAction::Wrap);
                    x = 0;
                    segment_width = 0;
                }
                segment.push(c);
                segment_width += w;
            }
            if !segment.is_empty() {
                actions.push(ZoneAction::EmitText(segment));
                x += segment_width;
            }
        }

        Ok(actions)
    }
}
