//! Terminal output sinks
//!
//! Everything the engine emits ends up in a [`TerminalSink`]. Writes are
//! assumed to be synchronous; a sink never buffers on the engine's behalf
//! beyond what `flush` pushes out.

use std::io::{self, Write};

/// Destination for literal terminal output
pub trait TerminalSink {
    /// Write a string exactly as given
    fn write_str(&mut self, s: &str) -> io::Result<()>;

    /// Push any buffered bytes to the device
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: TerminalSink + ?Sized> TerminalSink for &mut T {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        (**self).write_str(s)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Sink over any [`Write`] implementation (usually stdout)
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSink for WriterSink<W> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.writer.write_all(s.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// In-memory sink that keeps every write separately.
/// Used by the headless runner and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    writes: Vec<String>,
    flushes: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes concatenated
    pub fn output(&self) -> String {
        self.writes.concat()
    }

    /// Individual writes in order
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn clear(&mut self) {
        self.writes.clear();
        self.flushes = 0;
    }
}

impl TerminalSink for RecordingSink {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        if !s.is_empty() {
            self.writes.push(s.to_string());
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_writes() {
        let mut sink = RecordingSink::new();
        sink.write_str("ab").unwrap();
        sink.write_str("").unwrap();
        sink.write_str("c").unwrap();
        sink.flush().unwrap();

        assert_eq!(sink.writes(), &["ab".to_string(), "c".to_string()]);
        assert_eq!(sink.output(), "abc");
        assert_eq!(sink.flush_count(), 1);

        sink.clear();
        assert_eq!(sink.write_count(), 0);
    }

    #[test]
    fn test_writer_sink() {
        let mut sink = WriterSink::new(Vec::new());
        sink.write_str("héllo").unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.into_inner(), "héllo".as_bytes());
    }

    #[test]
    fn test_mut_ref_is_a_sink() {
        let mut sink = RecordingSink::new();
        {
            let mut borrowed = &mut sink;
            TerminalSink::write_str(&mut borrowed, "x").unwrap();
        }
        assert_eq!(sink.output(), "x");
    }
}
