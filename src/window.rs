//! Zoned window
//!
//! Ties together the bounded buffer, the zone controller, the scrollback
//! store and the event bus. A window owns one rectangular zone of the
//! terminal: everything written to it is classified, buffered, wrapped to
//! the zone width, printed at the zone's virtual cursor and archived.
//!
//! Every buffer mutation is bracketed by events. The zone controller sees
//! each event first and answers with actions that the window performs;
//! external subscribers see the same event right after.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::buffer::{Buffered, FlushTrigger, OutputBuffer};
use crate::config::{WindowConfig, Zone};
use crate::core::{
    cursor, ScrollbackLine, ScrollbackStore, StyleSnapshot, StyleState, WindowSnapshot,
    ZoneAction, ZoneController, ZoneCursor, ZoneState,
};
use crate::error::{Error, Result};
use crate::event::{Event, EventBus, EventKind, EventMask, Handler, SubscriptionId, WindowId};
use crate::parser::{self, patterns, ControlCode, SequenceKind, Unit};
use crate::term::{AnsiRenderer, Geometry, Operation, SequenceRenderer, TermSize, TerminalSink};

/// A scroll-backed window drawing into one zone of the terminal
pub struct Window<S: TerminalSink> {
    id: WindowId,
    config: WindowConfig,
    output: OutputBuffer,
    sink: S,
    renderer: Box<dyn SequenceRenderer + Send>,
    geometry: Box<dyn Geometry + Send>,
    zone: ZoneController,
    scrollback: ScrollbackStore,
    bus: EventBus,
    /// First logical line shown when not scrolled back
    view_top: usize,
    /// Lines scrolled back from the live view
    scroll_offset: usize,
    /// Real terminal cursor (absolute col, row) when known
    real_cursor: Option<(usize, usize)>,
    /// Terminal size as of the last draw
    term: TermSize,
    halted: bool,
}

impl<S: TerminalSink> std::fmt::Debug for Window<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("zone", &self.config.zone)
            .field("cursor", &self.zone.cursor())
            .field("pending", &self.output.len())
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

impl<S: TerminalSink> Window<S> {
    /// Create a window. The zone must lie inside the terminal as reported by
    /// `geometry` at this moment.
    pub fn new(config: WindowConfig, sink: S, geometry: impl Geometry + Send + 'static) -> Result<Self> {
        config.validate()?;
        let term = geometry.size()?;
        let zone = config.zone;
        if zone.right() > term.cols || zone.bottom() > term.rows {
            return Err(Error::InvalidZone(format!(
                "{}x{} at ({}, {}) exceeds {}x{} terminal",
                zone.width, zone.height, zone.col, zone.row, term.cols, term.rows
            )));
        }

        let id = WindowId::next();
        tracing::debug!(%id, ?zone, "window created");

        Ok(Self {
            id,
            output: OutputBuffer::locked(config.buffer),
            sink,
            renderer: Box::new(AnsiRenderer),
            geometry: Box::new(geometry),
            zone: ZoneController::new(zone.width),
            scrollback: ScrollbackStore::new(zone.width, config.scrollback_chars),
            bus: EventBus::new(),
            view_top: 0,
            scroll_offset: 0,
            real_cursor: None,
            term,
            halted: false,
            config,
        })
    }

    /// Replace the escape-sequence renderer
    pub fn with_renderer(mut self, renderer: impl SequenceRenderer + Send + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn zone(&self) -> Zone {
        self.config.zone
    }

    /// Virtual cursor relative to the zone
    pub fn cursor(&self) -> ZoneCursor {
        self.zone.cursor()
    }

    pub fn zone_state(&self) -> ZoneState {
        self.zone.state()
    }

    /// Style active at the end of everything emitted so far
    pub fn style(&self) -> &StyleState {
        self.scrollback.style()
    }

    pub fn scrollback(&self) -> &ScrollbackStore {
        &self.scrollback
    }

    /// Buffered content not yet emitted
    pub fn pending(&self) -> String {
        self.output.content().snapshot()
    }

    pub fn view_top(&self) -> usize {
        self.view_top
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Window buffers keep the policy they were built with
    pub fn set_auto_flush(&mut self, on: bool) -> Result<()> {
        self.output.set_auto_flush(on)
    }

    pub fn set_strict_size_control(&mut self, on: bool) -> Result<()> {
        self.output.set_strict_size_control(on)
    }

    pub fn subscribe(&mut self, kinds: impl Into<EventMask>, handler: Handler) -> SubscriptionId {
        self.bus.subscribe(kinds, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Write raw output at the virtual cursor.
    ///
    /// The input is classified first; a denied or unsupported escape
    /// sequence rejects the whole input before anything is buffered.
    pub fn write(&mut self, raw: &str) -> Result<()> {
        self.guarded(|w| {
            if raw.is_empty() {
                return Ok(());
            }
            let units = parser::classify(raw)?;
            w.check_capacity(&units)?;
            w.snap_to_live()?;
            for unit in units {
                tracing::trace!(?unit, "unit");
                match unit {
                    Unit::Text { content, .. } => Buffered::add(w, &content)?,
                    Unit::Command { content } => w.send(&content)?,
                }
            }
            Ok(())
        })
    }

    /// Send exactly one control character or whitelisted escape sequence
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        self.guarded(|w| {
            if command.is_empty() {
                return Ok(());
            }
            let unit = parser::classify_command(command)?;
            w.check_capacity(std::slice::from_ref(&unit))?;
            w.snap_to_live()?;
            w.send(unit.as_str())
        })
    }

    /// Emit all pending output
    pub fn flush(&mut self) -> Result<()> {
        self.guarded(|w| {
            w.snap_to_live()?;
            Buffered::flush(w)
        })
    }

    /// Draw text at a position relative to the zone without moving the
    /// virtual cursor or touching scrollback. Output is clipped to the zone
    /// and the terminal; control characters are ignored.
    pub fn write_at(&mut self, col: usize, row: usize, text: &str) -> Result<()> {
        self.guarded(|w| {
            if text.is_empty() {
                return Ok(());
            }
            let units = parser::classify(text)?;
            w.snap_to_live()?;
            Buffered::flush(w)?;
            w.term = w.geometry.size()?;

            let zone = w.config.zone;
            let abs_row = zone.row + row;
            if row >= zone.height || abs_row >= w.term.rows {
                return Ok(());
            }

            let mut x = col;
            let mut styled = false;
            let mut positioned = false;
            for unit in &units {
                match unit {
                    Unit::Text { content, .. } => {
                        let visible = w.visible_prefix(content, x);
                        if visible.is_empty() {
                            break;
                        }
                        if !positioned {
                            w.put_op(Operation::CursorTo {
                                col: zone.col + x,
                                row: abs_row,
                            })?;
                            positioned = true;
                        }
                        w.put(visible)?;
                        x += visible.width();
                        if visible.len() < content.len() {
                            break;
                        }
                    }
                    Unit::Command { content } => {
                        if patterns::sequence_kind(content) == Some(SequenceKind::Sgr) {
                            w.put(content)?;
                            styled = true;
                        }
                    }
                }
            }

            if styled {
                let live = w.scrollback.style().render();
                w.put(&live)?;
            }
            w.real_cursor = None;
            w.sink.flush()?;
            Ok(())
        })
    }

    /// Repaint the visible part of the zone from scrollback
    pub fn redraw(&mut self) -> Result<()> {
        self.guarded(|w| w.redraw_view())
    }

    /// Show older lines. Stops at the oldest retained line.
    pub fn scroll_back(&mut self, lines: usize) -> Result<()> {
        self.guarded(|w| {
            let max = w.view_top.saturating_sub(w.scrollback.first_line());
            let offset = (w.scroll_offset + lines).min(max);
            if offset != w.scroll_offset {
                w.scroll_offset = offset;
                w.redraw_view()?;
            }
            Ok(())
        })
    }

    /// Show newer lines, back towards the live view
    pub fn scroll_forward(&mut self, lines: usize) -> Result<()> {
        self.guarded(|w| {
            let offset = w.scroll_offset.saturating_sub(lines);
            if offset != w.scroll_offset {
                w.scroll_offset = offset;
                w.redraw_view()?;
            }
            Ok(())
        })
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            zone: self.config.zone,
            cursor: self.zone.cursor(),
            view_top: self.view_top,
            scroll_offset: self.scroll_offset,
            pending: self.pending(),
            style: StyleSnapshot::from(self.scrollback.style()),
            halted: self.halted,
            evicted: self.scrollback.evicted(),
            lines: WindowSnapshot::lines_from(&self.scrollback),
        }
    }

    /// Run a mutating operation, halting the window on a fatal error
    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.halted {
            return Err(Error::WindowHalted);
        }
        let result = op(self);
        if let Err(e) = &result {
            if e.is_fatal() {
                tracing::debug!(id = %self.id, error = %e, "window halted");
                self.halted = true;
            }
        }
        result
    }

    /// Reject input the buffer policy cannot take, before anything is
    /// mutated. Commands flush pending text ahead of themselves.
    fn check_capacity(&self, units: &[Unit]) -> Result<()> {
        let config = self.output.config();
        if config.auto_flush {
            // Strict buffers cannot take a command longer than the capacity
            let oversized = units
                .iter()
                .filter(|unit| unit.is_command())
                .map(Unit::char_len)
                .find(|&len| config.strict_size_control && len > config.capacity);
            return match oversized {
                Some(requested) => Err(Error::BufferOverflow {
                    capacity: config.capacity,
                    requested,
                }),
                None => Ok(()),
            };
        }

        let mut len = self.output.len();
        for unit in units {
            match unit {
                Unit::Text { .. } => len += unit.char_len(),
                Unit::Command { .. } if unit.control_code().is_some() => len = 0,
                Unit::Command { .. } => len = unit.char_len(),
            }
            if len > config.capacity {
                return Err(Error::BufferOverflow {
                    capacity: config.capacity,
                    requested: len,
                });
            }
        }
        Ok(())
    }

    /// Command path: pending text goes out first, control characters are
    /// consumed by the zone, escape sequences are buffered whole.
    ///
    /// In-line cursor controls are archived so a redraw reproduces
    /// overwrites; line breaks are archived as line boundaries instead.
    fn send(&mut self, command: &str) -> Result<()> {
        let pending = self.output.len();
        self.dispatch(EventKind::BeforeCommandSent, pending, command)?;
        match ControlCode::from_command(command) {
            Some(ControlCode::CarriageReturn | ControlCode::Backspace | ControlCode::Tab) => {
                self.scrollback.record_command(command);
            }
            Some(_) => {}
            None => Buffered::add_atomic(self, command)?,
        }
        self.dispatch(EventKind::AfterCommandSent, 0, command)
    }

    /// Publish an event: zone controller first, then subscribers, then
    /// the controller's actions
    fn dispatch(&mut self, kind: EventKind, flags: usize, payload: &str) -> Result<()> {
        let flags = u32::try_from(flags).unwrap_or(u32::MAX);
        let event = Event::new(self.id, kind, flags, payload);
        let actions = self.zone.react(&event)?;
        self.bus.publish(&event);
        for action in actions {
            self.perform(action)?;
        }
        Ok(())
    }

    fn perform(&mut self, action: ZoneAction) -> Result<()> {
        match action {
            ZoneAction::FlushPending => Buffered::flush(self),
            ZoneAction::EmitText(text) => self.print(&text),
            ZoneAction::EmitCommand(command) => self.output_command(&command),
            ZoneAction::Wrap => {
                self.zone.wrap();
                self.scrollback.new_line(0);
                self.follow_cursor()
            }
            ZoneAction::StartLine { indent } => {
                self.scrollback.new_line(indent);
                self.follow_cursor()
            }
            ZoneAction::MoveCursor(at) => self.move_real_cursor(at),
            ZoneAction::Bell => {
                self.put_op(Operation::Bell)?;
                self.sink.flush()?;
                Ok(())
            }
        }
    }

    /// Emit pending content as one flush (or auto-flush) pass
    fn emit_pending(&mut self, pending: String, trigger: FlushTrigger) -> Result<()> {
        let (before, after) = match trigger {
            FlushTrigger::Manual => (EventKind::BeforeFlush, EventKind::AfterFlush),
            FlushTrigger::Auto => (EventKind::BeforeAutoFlush, EventKind::AfterAutoFlush),
        };
        let len = pending.chars().count();
        if trigger == FlushTrigger::Auto {
            tracing::debug!(id = %self.id, len, "auto-flush");
        }

        self.term = self.geometry.size()?;
        self.dispatch(before, len, &pending)?;
        self.sink.flush()?;
        self.dispatch(after, len, &pending)
    }

    /// Print text that fits the current line
    fn print(&mut self, text: &str) -> Result<()> {
        let width = text.width();
        self.dispatch(EventKind::BeforeCharacterOutput, width, text)?;

        let zone = self.config.zone;
        let at = self.zone.cursor();
        let abs_row = zone.row + (at.y - self.view_top);
        let mut clipped = true;
        if abs_row < self.term.rows {
            let visible = self.visible_prefix(text, at.x);
            clipped = visible.len() < text.len();
            self.put(visible)?;
        }
        self.scrollback.record_text(text, zone.width)?;
        self.real_cursor = match self.real_cursor {
            Some((col, row)) if !clipped => Some((col + width, row)),
            _ => None,
        };

        self.dispatch(EventKind::AfterCharacterOutput, width, text)
    }

    fn output_command(&mut self, command: &str) -> Result<()> {
        self.dispatch(EventKind::BeforeCommandOutput, 0, command)?;
        self.put(command)?;
        self.scrollback.record_command(command);
        if patterns::sequence_kind(command).is_some_and(SequenceKind::moves_cursor) {
            self.real_cursor = None;
        }
        self.dispatch(EventKind::AfterCommandOutput, 0, command)
    }

    /// Reposition the real cursor unless it is already there
    fn move_real_cursor(&mut self, at: ZoneCursor) -> Result<()> {
        let zone = self.config.zone;
        let target = (zone.col + at.x, zone.row + (at.y - self.view_top));
        if self.real_cursor == Some(target) {
            return Ok(());
        }
        self.put_op(Operation::CursorTo {
            col: target.0,
            row: target.1,
        })?;
        self.real_cursor = Some(target);
        Ok(())
    }

    /// Scroll the live view when the cursor's line passes the bottom row
    fn follow_cursor(&mut self) -> Result<()> {
        let y = self.zone.cursor().y;
        let height = self.config.zone.height;
        if y >= self.view_top + height {
            self.view_top = y + 1 - height;
            tracing::debug!(id = %self.id, view_top = self.view_top, "vertical overflow");
            self.redraw_view()?;
        }
        Ok(())
    }

    fn snap_to_live(&mut self) -> Result<()> {
        if self.scroll_offset > 0 {
            self.scroll_offset = 0;
            self.redraw_view()?;
        }
        Ok(())
    }

    /// Repaint every zone row from scrollback, each line prefixed with its
    /// start style, then restore the live style
    fn redraw_view(&mut self) -> Result<()> {
        self.term = self.geometry.size()?;
        let zone = self.config.zone;
        let top = self.view_top - self.scroll_offset;
        let blank_width = zone.width.min(self.term.cols.saturating_sub(zone.col));
        let blank = " ".repeat(blank_width);
        let reset = self.renderer.render(Operation::ResetStyle);

        for r in 0..zone.height {
            let abs_row = zone.row + r;
            if abs_row >= self.term.rows {
                break;
            }
            self.put_op(Operation::CursorTo {
                col: zone.col,
                row: abs_row,
            })?;
            self.put(&reset)?;
            self.put(&blank)?;

            let index = top + r;
            if let Some(line) = self.scrollback.line(index) {
                let start = self.scrollback.start_style(index).unwrap_or_default();
                let line = line.clone();
                self.put(&start.render())?;
                self.replay(&line, abs_row)?;
            }
        }

        let live = self.scrollback.style().render();
        self.put(&live)?;
        self.real_cursor = None;
        self.sink.flush()?;
        tracing::debug!(id = %self.id, top, "redraw");
        Ok(())
    }

    /// Replay one stored line on a terminal row
    fn replay(&mut self, line: &ScrollbackLine, abs_row: usize) -> Result<()> {
        let zone = self.config.zone;
        let mut x = line.indent();
        let mut positioned = false;

        for unit in line.units() {
            match unit {
                Unit::Text { content, .. } => {
                    let visible = self.visible_prefix(content, x);
                    if visible.is_empty() {
                        continue;
                    }
                    if !positioned {
                        self.put_op(Operation::CursorTo {
                            col: zone.col + x,
                            row: abs_row,
                        })?;
                        positioned = true;
                    }
                    self.put(visible)?;
                    x += content.width();
                    if visible.len() < content.len() {
                        positioned = false;
                    }
                }
                Unit::Command { content } => match unit.control_code() {
                    Some(ControlCode::Bell) => {}
                    Some(code) => {
                        let (next, _) = cursor::apply(ZoneCursor::new(x, 0), code, zone.width);
                        if next.x != x {
                            x = next.x;
                            positioned = false;
                        }
                    }
                    None => {
                        if patterns::sequence_kind(content) == Some(SequenceKind::Sgr) {
                            self.put(content)?;
                        }
                    }
                },
            }
        }
        Ok(())
    }

    /// Longest prefix of `text` that fits in the zone and the terminal when
    /// printed at zone column `x`
    fn visible_prefix<'a>(&self, text: &'a str, x: usize) -> &'a str {
        let zone = self.config.zone;
        let limit = zone
            .width
            .min(self.term.cols.saturating_sub(zone.col));
        let mut used = x;
        for (i, c) in text.char_indices() {
            let w = c.width().unwrap_or(0);
            if used + w > limit {
                return &text[..i];
            }
            used += w;
        }
        text
    }

    fn put(&mut self, s: &str) -> Result<()> {
        self.sink.write_str(s)?;
        Ok(())
    }

    fn put_op(&mut self, op: Operation) -> Result<()> {
        let s = self.renderer.render(op);
        self.put(&s)
    }
}

impl<S: TerminalSink> Buffered for Window<S> {
    fn output(&self) -> &OutputBuffer {
        &self.output
    }

    fn output_mut(&mut self) -> &mut OutputBuffer {
        &mut self.output
    }

    fn emit(&mut self, trigger: FlushTrigger) -> Result<()> {
        let pending = self.output.content_mut().take();
        self.emit_pending(pending, trigger)
    }

    fn emit_slice(&mut self, slice: &str) -> Result<()> {
        self.emit_pending(slice.to_string(), FlushTrigger::Manual)
    }
}
