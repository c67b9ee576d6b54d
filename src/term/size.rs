//! Terminal geometry
//!
//! The window queries the terminal size at construction (to validate its
//! zone) and before drawing (to clip output).

use std::io;
use std::sync::LazyLock;

use nix::libc;
use regex::Regex;

use crate::error::Result;

static CURSOR_REPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\x1b\[(\d+);(\d+)R$").expect("Invalid cursor report regex")
});

/// Terminal dimensions in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub cols: usize,
    pub rows: usize,
}

impl TermSize {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    pub fn contains(&self, col: usize, row: usize) -> bool {
        col < self.cols && row < self.rows
    }
}

impl Default for TermSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// Source of terminal dimensions
pub trait Geometry {
    fn size(&self) -> Result<TermSize>;
}

/// Fixed size, for tests and headless runs
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedGeometry(pub TermSize);

impl FixedGeometry {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self(TermSize::new(cols, rows))
    }
}

impl Geometry for FixedGeometry {
    fn size(&self) -> Result<TermSize> {
        Ok(self.0)
    }
}

/// Size of the terminal attached to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct TtyGeometry;

impl Geometry for TtyGeometry {
    fn size(&self) -> Result<TermSize> {
        let fd = libc::STDOUT_FILENO;
        if !nix::unistd::isatty(fd).unwrap_or(false) {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "stdout is not a terminal").into());
        }

        let mut winsize = libc::winsize {
            ws_row: 0,
            ws_col: 0,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };

        // SAFETY: TIOCGWINSZ is a valid ioctl for getting window size
        let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut winsize) };
        if result < 0 {
            return Err(io::Error::last_os_error().into());
        }

        Ok(TermSize::new(winsize.ws_col as usize, winsize.ws_row as usize))
    }
}

/// Parse a cursor position report (`ESC [ row ; col R`) into a 0-indexed
/// `(col, row)`
pub fn parse_cursor_report(report: &str) -> Option<(usize, usize)> {
    let caps = CURSOR_REPORT.captures(report)?;
    let row: usize = caps[1].parse().ok()?;
    let col: usize = caps[2].parse().ok()?;
    Some((col.checked_sub(1)?, row.checked_sub(1)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_geometry() {
        let size = FixedGeometry::new(100, 30).size().unwrap();
        assert_eq!(size, TermSize::new(100, 30));
        assert!(size.contains(99, 29));
        assert!(!size.contains(100, 0));
    }

    #[test]
    fn test_parse_cursor_report() {
        assert_eq!(parse_cursor_report("\x1b[1;1R"), Some((0, 0)));
        assert_eq!(parse_cursor_report("\x1b[24;80R"), Some((79, 23)));
        assert_eq!(parse_cursor_report("\x1b[0;5R"), None);
        assert_eq!(parse_cursor_report("\x1b[5R"), None);
        assert_eq!(parse_cursor_report("garbage"), None);
    }
}
