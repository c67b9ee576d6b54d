//! Text/command classification
//!
//! Splits raw output into [`Unit`]s. Classification is all-or-nothing: if
//! any escape sequence in the input is denied or unsupported, the whole
//! input is rejected and no units are produced.

use crate::error::{Error, Result};

use super::patterns;
use super::unit::{ControlCode, Unit};

const ESC: char = '\x1b';

/// Characters of an offending sequence kept for error messages
const PREVIEW_CHARS: usize = 8;

/// Decompose raw output into units.
///
/// - the six recognized control characters become one-character commands
/// - an ESC introducer must start a whitelisted sequence, which becomes one
///   command
/// - other C0/C1 controls and DEL are dropped
/// - everything else accumulates into text units
pub fn classify(raw: &str) -> Result<Vec<Unit>> {
    let mut units = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while let Some(c) = raw[pos..].chars().next() {
        if c == ESC {
            let rest = &raw[pos..];
            let len = escape_length(rest)?;
            flush_text(&mut text, &mut units);
            units.push(Unit::command(&rest[..len]));
            pos += len;
            continue;
        }

        pos += c.len_utf8();

        if let Some(code) = ControlCode::from_char(c) {
            flush_text(&mut text, &mut units);
            units.push(Unit::control(code));
        } else if c.is_control() {
            tracing::trace!(char = ?c, "dropping unrecognized control character");
        } else {
            text.push(c);
        }
    }

    flush_text(&mut text, &mut units);
    Ok(units)
}

/// Validate a string meant to be sent as exactly one command
pub fn classify_command(command: &str) -> Result<Unit> {
    if let Some(code) = ControlCode::from_command(command) {
        return Ok(Unit::control(code));
    }

    if command.starts_with(ESC) {
        let len = escape_length(command)?;
        if len == command.len() {
            return Ok(Unit::command(command));
        }
    }

    Err(Error::UnsupportedSequence {
        sequence: preview(command),
    })
}

/// Byte length of the whitelisted sequence at the start of `input`
fn escape_length(input: &str) -> Result<usize> {
    if let Some((name, len)) = patterns::denied(input) {
        let sequence = input[..len].to_string();
        tracing::warn!(kind = name, sequence = ?sequence, "denied escape sequence");
        return Err(Error::DeniedCommand { sequence });
    }

    match patterns::whitelisted(input) {
        Some((_, len)) => Ok(len),
        None => Err(Error::UnsupportedSequence {
            sequence: preview(input),
        }),
    }
}

fn preview(input: &str) -> String {
    input.chars().take(PREVIEW_CHARS).collect()
}

fn flush_text(text: &mut String, units: &mut Vec<Unit>) {
    if !text.is_empty() {
        units.push(Unit::text(std::mem::take(text)));
    }
}
