//! Scanner utilities: position tracking, BOM handling, newline detection,
//! and incremental UTF-8 validation.
//!
//! These helpers own every position update the parser makes, so offsets,
//! lines, and columns advance in exactly one place per construct.

use crate::dialect::{Dialect, Newline};
use crate::error::{Error, ErrorCode};

/// Position in the input: byte offset plus 1-based line and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Advance over `n` content bytes on the current line.
    pub fn advance(&mut self, n: usize) -> Result<(), Error> {
        self.offset = self
            .offset
            .checked_add(n)
            .ok_or_else(|| overflow("input offset overflows"))?;
        self.column = self
            .column
            .checked_add(n)
            .ok_or_else(|| overflow("input column overflows"))?;
        Ok(())
    }

    /// Advance over a newline sequence, starting the next line.
    pub fn advance_newline(&mut self, kind: Newline) -> Result<(), Error> {
        self.offset = self
            .offset
            .checked_add(kind.as_bytes().len())
            .ok_or_else(|| overflow("input offset overflows"))?;
        self.line = self
            .line
            .checked_add(1)
            .ok_or_else(|| overflow("input line count overflows"))?;
        self.column = 1;
        Ok(())
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

fn overflow(message: &str) -> Error {
    Error::new(ErrorCode::Limit, message)
}

/// UTF-8 byte-order mark.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Result of probing the start of the input for a BOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomCheck {
    Absent,
    Present,
    /// Fewer than three bytes available and all of them match the BOM
    /// prefix; more input is needed to decide.
    Incomplete,
}

pub fn check_bom(prefix: &[u8]) -> BomCheck {
    if prefix.len() >= UTF8_BOM.len() {
        if prefix[..3] == UTF8_BOM {
            BomCheck::Present
        } else {
            BomCheck::Absent
        }
    } else if UTF8_BOM.starts_with(prefix) && !prefix.is_empty() {
        BomCheck::Incomplete
    } else {
        BomCheck::Absent
    }
}

/// Result of probing for a record terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewlineCheck {
    /// Not an accepted newline at this position.
    None,
    Match(Newline),
    /// A `\r` at the end of the available bytes while CRLF is accepted;
    /// the next byte decides between CRLF and a lone CR.
    Incomplete,
}

/// Probe `bytes` for a terminator accepted by the dialect. CRLF is tried
/// first so a lone-CR dialect never splits it in two.
pub fn detect_newline(bytes: &[u8], dialect: &Dialect, at_eof: bool) -> NewlineCheck {
    match bytes.first() {
        Some(b'\r') => {
            if dialect.accept_crlf {
                match bytes.get(1) {
                    Some(b'\n') => return NewlineCheck::Match(Newline::CrLf),
                    None if !at_eof => return NewlineCheck::Incomplete,
                    _ => {}
                }
            }
            if dialect.accept_cr {
                NewlineCheck::Match(Newline::Cr)
            } else {
                NewlineCheck::None
            }
        }
        Some(b'\n') => {
            if dialect.accept_lf {
                NewlineCheck::Match(Newline::Lf)
            } else {
                NewlineCheck::None
            }
        }
        _ => NewlineCheck::None,
    }
}

/// Result of validating one UTF-8 sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Check {
    /// A complete sequence of the given byte length.
    Valid(usize),
    /// A well-formed prefix cut off by the end of the available bytes.
    Incomplete,
    Invalid,
}

/// Validate the UTF-8 sequence starting at `bytes[0]`.
///
/// Classifies the lead byte as a 1-4 byte sequence, checks that every
/// continuation byte matches `10xxxxxx`, and rejects overlong encodings,
/// surrogates, and code points above U+10FFFF. `Incomplete` lets a
/// streaming caller buffer the partial sequence at a chunk boundary.
pub fn check_utf8(bytes: &[u8]) -> Utf8Check {
    let lead = match bytes.first() {
        Some(&b) => b,
        None => return Utf8Check::Incomplete,
    };

    let len = if lead & 0b1000_0000 == 0 {
        return Utf8Check::Valid(1);
    } else if lead & 0b1110_0000 == 0b1100_0000 {
        // Overlong two-byte forms encode U+0000..U+007F.
        if lead < 0xC2 {
            return Utf8Check::Invalid;
        }
        2
    } else if lead & 0b1111_0000 == 0b1110_0000 {
        3
    } else if lead & 0b1111_1000 == 0b1111_0000 {
        if lead > 0xF4 {
            return Utf8Check::Invalid;
        }
        4
    } else {
        // Continuation byte or 0xF8..0xFF lead.
        return Utf8Check::Invalid;
    };

    for i in 1..len {
        let b = match bytes.get(i) {
            Some(&b) => b,
            None => return Utf8Check::Incomplete,
        };
        if b & 0b1100_0000 != 0b1000_0000 {
            return Utf8Check::Invalid;
        }
        if i == 1 {
            let ok = match lead {
                0xE0 => (0xA0..=0xBF).contains(&b), // overlong three-byte
                0xED => (0x80..=0x9F).contains(&b), // surrogates
                0xF0 => (0x90..=0xBF).contains(&b), // overlong four-byte
                0xF4 => (0x80..=0x8F).contains(&b), // above U+10FFFF
                _ => true,
            };
            if !ok {
                return Utf8Check::Invalid;
            }
        }
    }
    Utf8Check::Valid(len)
}
