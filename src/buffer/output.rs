//! Bounded output buffer
//!
//! The buffer accumulates characters up to a configured capacity. What
//! happens when an add would overflow is decided by configuration:
//!
//! - auto-flush off: the add fails with [`Error::BufferOverflow`] and
//!   nothing is appended
//! - auto-flush on, strict size control off: the whole input is appended
//!   and then flushed in one emission (content may exceed capacity for the
//!   duration of that call)
//! - strict size control on: the input is appended in slices that fill the
//!   buffer exactly, flushing after each, and the remainder is kept
//!
//! Emission itself is delegated to the [`Buffered`] implementor so the same
//! policy drives both a plain buffer over a sink and a zone-aware window.

use crate::config::BufferConfig;
use crate::error::{Error, Result};
use crate::term::TerminalSink;

use super::content::{split_chars, BufferContent, ContentHandle};

/// Why content is being emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Explicit `flush()` call
    Manual,
    /// Overflow absorbed by auto-flush
    Auto,
}

/// Capacity-bounded character buffer and its policy flags
#[derive(Debug)]
pub struct OutputBuffer {
    config: BufferConfig,
    content: BufferContent,
    last_added: String,
    flags_locked: bool,
}

impl OutputBuffer {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            content: BufferContent::new(config.thread_mode),
            config,
            last_added: String::new(),
            flags_locked: false,
        }
    }

    /// Buffer whose auto-flush/strict flags can never be toggled
    pub(crate) fn locked(config: BufferConfig) -> Self {
        Self {
            flags_locked: true,
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Pending length in characters
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Characters that can still be added without overflowing
    pub fn remaining(&self) -> usize {
        self.config.capacity.saturating_sub(self.len())
    }

    pub fn content(&self) -> &BufferContent {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut BufferContent {
        &mut self.content
    }

    /// Exact substring appended by the most recent successful add
    pub fn last_added(&self) -> &str {
        &self.last_added
    }

    /// Shared read handle (synchronized buffers only)
    pub fn handle(&self) -> Option<ContentHandle> {
        self.content.handle()
    }

    pub fn flags_locked(&self) -> bool {
        self.flags_locked
    }

    pub fn set_auto_flush(&mut self, on: bool) -> Result<()> {
        if self.flags_locked {
            return Err(Error::FlagsLocked);
        }
        self.config.auto_flush = on;
        Ok(())
    }

    pub fn set_strict_size_control(&mut self, on: bool) -> Result<()> {
        if self.flags_locked {
            return Err(Error::FlagsLocked);
        }
        self.config.strict_size_control = on;
        Ok(())
    }

    fn append(&mut self, s: &str) {
        self.content.push_str(s);
        self.last_added.clear();
        self.last_added.push_str(s);
    }
}

/// Something that owns an [`OutputBuffer`] and knows how to emit it.
///
/// Implementors provide the two emission hooks; the capacity policy lives
/// in the provided methods.
pub trait Buffered {
    fn output(&self) -> &OutputBuffer;

    fn output_mut(&mut self) -> &mut OutputBuffer;

    /// Emit the entire pending content. The content must be empty afterwards.
    fn emit(&mut self, trigger: FlushTrigger) -> Result<()>;

    /// Emit a substring that has already been removed from the content
    fn emit_slice(&mut self, slice: &str) -> Result<()>;

    /// Append text obeying the capacity policy
    fn add(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        let config = *self.output().config();
        let incoming = text.chars().count();
        let pending = self.output().len();

        if pending + incoming <= config.capacity {
            self.output_mut().append(text);
            return Ok(());
        }

        if !config.auto_flush {
            return Err(Error::BufferOverflow {
                capacity: config.capacity,
                requested: pending + incoming,
            });
        }

        if !config.strict_size_control {
            tracing::debug!(
                pending,
                incoming,
                capacity = config.capacity,
                "auto-flushing oversized add"
            );
            self.output_mut().append(text);
            return self.emit(FlushTrigger::Auto);
        }

        let mut rest = text;
        loop {
            let room = self.output().remaining();
            let (head, tail) = split_chars(rest, room);
            if tail.is_empty() {
                self.output_mut().append(head);
                return Ok(());
            }
            if !head.is_empty() {
                self.output_mut().append(head);
            }
            self.emit(FlushTrigger::Auto)?;
            if self.output().remaining() == 0 {
                // emit() broke its contract; stop rather than spin
                return Err(Error::BufferOverflow {
                    capacity: config.capacity,
                    requested: self.output().len() + tail.chars().count(),
                });
            }
            rest = tail;
        }
    }

    /// Append a unit that must never be split across emissions.
    ///
    /// Pending content is flushed first if the unit does not fit beside it.
    /// A unit longer than the capacity is only accepted when auto-flush is
    /// on without strict size control, and is then emitted on its own.
    fn add_atomic(&mut self, unit: &str) -> Result<()> {
        if unit.is_empty() {
            return Ok(());
        }

        let config = *self.output().config();
        let incoming = unit.chars().count();
        let pending = self.output().len();

        if pending + incoming <= config.capacity {
            self.output_mut().append(unit);
            return Ok(());
        }

        let oversized = incoming > config.capacity;
        if !config.auto_flush || (oversized && config.strict_size_control) {
            return Err(Error::BufferOverflow {
                capacity: config.capacity,
                requested: pending + incoming,
            });
        }

        if pending > 0 {
            self.emit(FlushTrigger::Auto)?;
        }
        self.output_mut().append(unit);
        if oversized {
            self.emit(FlushTrigger::Auto)?;
        }
        Ok(())
    }

    /// Emit and clear the whole content; no-op when empty
    fn flush(&mut self) -> Result<()> {
        if self.output().is_empty() {
            return Ok(());
        }
        self.emit(FlushTrigger::Manual)
    }

    /// Emit and remove `size` characters starting at `start`.
    /// A slice covering the whole buffer from offset 0 is a plain flush.
    fn slice_out(&mut self, size: usize, start: usize) -> Result<()> {
        let len = self.output().len();
        if size == 0 || start >= len {
            return Ok(());
        }
        if start == 0 && size >= len {
            return self.flush();
        }
        let slice = self.output_mut().content_mut().remove_range(start, size);
        self.emit_slice(&slice)
    }
}

/// Bounded buffer writing straight to a terminal sink
#[derive(Debug)]
pub struct TerminalBuffer<S: TerminalSink> {
    output: OutputBuffer,
    sink: S,
    auto_flushes: usize,
}

impl<S: TerminalSink> TerminalBuffer<S> {
    pub fn new(config: BufferConfig, sink: S) -> Self {
        Self {
            output: OutputBuffer::new(config),
            sink,
            auto_flushes: 0,
        }
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

    /// Number of emissions triggered by overflow so far
    pub fn auto_flushes(&self) -> usize {
        self.auto_flushes
    }

    pub fn set_auto_flush(&mut self, on: bool) -> Result<()> {
        self.output.set_auto_flush(on)
    }

    pub fn set_strict_size_control(&mut self, on: bool) -> Result<()> {
        self.output.set_strict_size_control(on)
    }
}

impl<S: TerminalSink> Buffered for TerminalBuffer<S> {
    fn output(&self) -> &OutputBuffer {
        &self.output
    }

    fn output_mut(&mut self) -> &mut OutputBuffer {
        &mut self.output
    }

    fn emit(&mut self, trigger: FlushTrigger) -> Result<()> {
        if trigger == FlushTrigger::Auto {
            self.auto_flushes += 1;
        }
        let sink = &mut self.sink;
        self.output.content().with_str(|s| sink.write_str(s))?;
        self.output.content_mut().clear();
        self.sink.flush()?;
        Ok(())
    }

    fn emit_slice(&mut self, slice: &str) -> Result<()> {
        self.sink.write_str(slice)?;
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThreadMode;
    use crate::term::RecordingSink;

    fn buffer(capacity: usize, auto: bool, strict: bool) -> TerminalBuffer<RecordingSink> {
        TerminalBuffer::new(
            BufferConfig::with_capacity(capacity)
                .auto_flush(auto)
                .strict(strict),
            RecordingSink::new(),
        )
    }

    #[test]
    fn test_add_within_capacity() {
        let mut buf = buffer(10, false, false);
        buf.add("hello").unwrap();
        assert_eq!(buf.output().len(), 5);
        assert_eq!(buf.sink().write_count(), 0);
        assert_eq!(buf.output().last_added(), "hello");
    }

    #[test]
    fn test_overflow_without_auto_flush() {
        let mut buf = buffer(10, false, false);
        buf.add("0123456").unwrap();
        let err = buf.add("789AB").unwrap_err();
        assert!(matches!(
            err,
            Error::BufferOverflow {
                capacity: 10,
                requested: 12
            }
        ));
        // No partial mutation
        assert_eq!(buf.output().content().snapshot(), "0123456");
        assert_eq!(buf.output().last_added(), "0123456");
    }

    #[test]
    fn test_auto_flush_emits_whole_input() {
        let mut buf = buffer(10, true, false);
        buf.add("0123456789AB").unwrap();
        assert!(buf.output().is_empty());
        assert_eq!(buf.sink().writes(), &["0123456789AB".to_string()]);
        assert_eq!(buf.auto_flushes(), 1);
    }

    #[test]
    fn test_strict_retains_remainder() {
        let mut buf = buffer(10, true, true);
        buf.add("0123456789AB").unwrap();
        assert_eq!(buf.sink().writes(), &["0123456789".to_string()]);
        assert_eq!(buf.output().content().snapshot(), "AB");
        assert_eq!(buf.output().last_added(), "AB");
    }

    #[test]
    fn test_strict_fills_existing_content_first() {
        let mut buf = buffer(4, true, true);
        buf.add("ab").unwrap();
        buf.add("cdefghij").unwrap();
        assert_eq!(
            buf.sink().writes(),
            &["abcd".to_string(), "efgh".to_string()]
        );
        assert_eq!(buf.output().content().snapshot(), "ij");
    }

    #[test]
    fn test_strict_exact_multiple_keeps_last_slice() {
        let mut buf = buffer(3, true, true);
        buf.add("abcdef").unwrap();
        assert_eq!(buf.sink().writes(), &["abc".to_string()]);
        assert_eq!(buf.output().content().snapshot(), "def");
    }

    #[test]
    fn test_flush_empties_and_skips_empty() {
        let mut buf = buffer(10, false, false);
        buf.flush().unwrap();
        assert_eq!(buf.sink().write_count(), 0);

        buf.add("abc").unwrap();
        buf.flush().unwrap();
        assert!(buf.output().is_empty());
        assert_eq!(buf.sink().output(), "abc");

        buf.flush().unwrap();
        assert_eq!(buf.sink().write_count(), 1);
    }

    #[test]
    fn test_empty_add_is_noop() {
        let mut buf = buffer(1, false, false);
        buf.add("x").unwrap();
        buf.add("").unwrap();
        assert_eq!(buf.output().len(), 1);
    }

    #[test]
    fn test_slice_out_interior() {
        let mut buf = buffer(20, false, false);
        buf.add("0123456789").unwrap();
        buf.slice_out(3, 2).unwrap();
        assert_eq!(buf.sink().output(), "234");
        assert_eq!(buf.output().content().snapshot(), "0156789");
    }

    #[test]
    fn test_slice_out_whole_degrades_to_flush() {
        let mut buf = buffer(20, false, false);
        buf.add("abc").unwrap();
        buf.slice_out(3, 0).unwrap();
        assert!(buf.output().is_empty());
        assert_eq!(buf.sink().output(), "abc");
    }

    #[test]
    fn test_slice_out_out_of_range_is_noop() {
        let mut buf = buffer(20, false, false);
        buf.add("abc").unwrap();
        buf.slice_out(2, 5).unwrap();
        buf.slice_out(0, 1).unwrap();
        assert_eq!(buf.sink().write_count(), 0);
        assert_eq!(buf.output().len(), 3);
    }

    #[test]
    fn test_slice_out_huge_size_clips_to_content() {
        let mut buf = buffer(20, false, false);
        buf.add("abc").unwrap();
        buf.slice_out(usize::MAX, 1).unwrap();
        assert_eq!(buf.sink().output(), "bc");
        assert_eq!(buf.output().content().snapshot(), "a");
        assert_eq!(buf.output().len(), 1);
    }

    #[test]
    fn test_add_atomic_flushes_before_unit() {
        let mut buf = buffer(6, true, true);
        buf.add("abcd").unwrap();
        buf.add_atomic("\x1b[1m").unwrap();
        assert_eq!(buf.sink().writes(), &["abcd".to_string()]);
        assert_eq!(buf.output().content().snapshot(), "\x1b[1m");
    }

    #[test]
    fn test_add_atomic_oversized_strict_rejected() {
        let mut buf = buffer(3, true, true);
        let err = buf.add_atomic("\x1b[31m").unwrap_err();
        assert!(matches!(err, Error::BufferOverflow { .. }));
        assert!(buf.output().is_empty());
    }

    #[test]
    fn test_add_atomic_oversized_lenient_emitted_whole() {
        let mut buf = buffer(3, true, false);
        buf.add("ab").unwrap();
        buf.add_atomic("\x1b[31m").unwrap();
        assert_eq!(
            buf.sink().writes(),
            &["ab".to_string(), "\x1b[31m".to_string()]
        );
        assert!(buf.output().is_empty());
    }

    #[test]
    fn test_toggle_flags() {
        let mut buf = buffer(4, false, false);
        assert!(buf.add("abcdef").is_err());
        buf.set_auto_flush(true).unwrap();
        buf.set_strict_size_control(true).unwrap();
        buf.add("abcdef").unwrap();
        assert_eq!(buf.output().content().snapshot(), "ef");
    }

    #[test]
    fn test_locked_flags() {
        let mut output = OutputBuffer::locked(BufferConfig::default());
        assert!(matches!(output.set_auto_flush(false), Err(Error::FlagsLocked)));
        assert!(matches!(
            output.set_strict_size_control(true),
            Err(Error::FlagsLocked)
        ));
        assert!(output.flags_locked());
    }

    #[test]
    fn test_synchronized_buffer_handle() {
        let mut buf = TerminalBuffer::new(
            BufferConfig::with_capacity(8).thread_mode(ThreadMode::Synchronized),
            RecordingSink::new(),
        );
        let handle = buf.output().handle().unwrap();
        buf.add("abc").unwrap();
        assert_eq!(handle.snapshot(), "abc");
        buf.flush().unwrap();
        assert!(handle.is_empty());
    }

    #[test]
    fn test_capacity_counts_chars_not_bytes() {
        let mut buf = buffer(3, false, false);
        buf.add("äöü").unwrap();
        assert_eq!(buf.output().remaining(), 0);
    }
}
