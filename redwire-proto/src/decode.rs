//! # Incremental Reply Parser
//!
//! Purpose: Turn bytes read off a TCP stream into complete [`Value`]s,
//! tolerating arbitrary chunk boundaries.
//!
//! ## Design Principles
//! 1. **Resumable Parsing**: `parse` returns `Ok(None)` when the buffer holds
//!    only a partial reply and leaves the buffer untouched; the caller reads
//!    more bytes and retries.
//! 2. **Exact Consumption**: On success exactly one complete value is removed
//!    from the front of the buffer; trailing bytes (pipelined replies, pushes)
//!    stay in place for the next call.
//! 3. **Fail Fast**: Malformed framing is a [`DecodeError`]; the stream can no
//!    longer be trusted and the owning connection must be closed.
//! 4. **Top-Down Dispatch**: Each value is parsed by its one-byte prefix, with
//!    aggregate shapes recursing over their elements.

use bytes::{Buf, BytesMut};

use crate::error::DecodeError;
use crate::value::{ServerError, Value};

/// Aggregate replies deeper than this are rejected to keep recursion bounded.
const MAX_DEPTH: usize = 64;

/// Incremental parser over a connection's read buffer.
#[derive(Debug, Default)]
pub struct Parser {
    _private: (),
}

impl Parser {
    /// Creates a parser. All parse state lives in the caller's buffer, so a
    /// parser is reusable across replies on the same stream.
    pub fn new() -> Self {
        Parser { _private: () }
    }

    /// Attempts to parse one complete value from the front of `buf`.
    ///
    /// Returns `Ok(Some(value))` and consumes the value's bytes, `Ok(None)`
    /// when more bytes are needed, or `Err` when the input is malformed.
    pub fn parse(&mut self, buf: &mut BytesMut) -> Result<Option<Value>, DecodeError> {
        let mut cursor = Cursor::new(&buf[..]);
        match parse_value(&mut cursor, 0) {
            Ok(value) => {
                let consumed = cursor.pos;
                buf.advance(consumed);
                Ok(Some(value))
            }
            Err(Interrupt::Incomplete) => Ok(None),
            Err(Interrupt::Malformed(err)) => Err(err),
        }
    }
}

/// Why a parse attempt stopped early.
enum Interrupt {
    /// The buffer ends before the value does.
    Incomplete,
    /// The bytes cannot be valid framing no matter what follows.
    Malformed(DecodeError),
}

impl From<DecodeError> for Interrupt {
    fn from(err: DecodeError) -> Self {
        Interrupt::Malformed(err)
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    fn next_byte(&mut self) -> Result<u8, Interrupt> {
        let byte = *self.buf.get(self.pos).ok_or(Interrupt::Incomplete)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Returns the next CRLF-terminated line without the terminator.
    fn read_line(&mut self) -> Result<&'a [u8], Interrupt> {
        let rest = &self.buf[self.pos..];
        for idx in 0..rest.len().saturating_sub(1) {
            if rest[idx] == b'\r' && rest[idx + 1] == b'\n' {
                self.pos += idx + 2;
                return Ok(&rest[..idx]);
            }
        }
        Err(Interrupt::Incomplete)
    }

    /// Returns exactly `len` payload bytes followed by CRLF.
    fn read_exact(&mut self, len: usize) -> Result<&'a [u8], Interrupt> {
        let rest = &self.buf[self.pos..];
        if rest.len() < len + 2 {
            return Err(Interrupt::Incomplete);
        }
        if &rest[len..len + 2] != b"\r\n" {
            return Err(DecodeError::MissingCrlf.into());
        }
        let payload = &rest[..len];
        self.pos += len + 2;
        Ok(payload)
    }
}

fn parse_value(cursor: &mut Cursor<'_>, depth: usize) -> Result<Value, Interrupt> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::NestingTooDeep.into());
    }

    let prefix = cursor.next_byte()?;
    match prefix {
        b'+' => {
            let line = cursor.read_line()?;
            Ok(Value::Simple(parse_text(line)?))
        }
        b'-' => {
            let line = cursor.read_line()?;
            Ok(Value::Error(ServerError::from_line(&parse_text(line)?)))
        }
        b':' => {
            let line = cursor.read_line()?;
            Ok(Value::Int(parse_i64(line)?))
        }
        b'$' => {
            let line = cursor.read_line()?;
            match parse_len(line)? {
                None => Ok(Value::Null),
                Some(len) => Ok(Value::Bulk(cursor.read_exact(len)?.to_vec())),
            }
        }
        b'*' => {
            let line = cursor.read_line()?;
            match parse_len(line)? {
                None => Ok(Value::Null),
                Some(len) => Ok(Value::Array(parse_elements(cursor, len, depth)?)),
            }
        }
        b'_' => {
            let line = cursor.read_line()?;
            if !line.is_empty() {
                return Err(DecodeError::UnknownPrefix(b'_').into());
            }
            Ok(Value::Null)
        }
        b',' => {
            let line = cursor.read_line()?;
            Ok(Value::Double(parse_double(line)?))
        }
        b'#' => {
            let line = cursor.read_line()?;
            match line {
                b"t" => Ok(Value::Boolean(true)),
                b"f" => Ok(Value::Boolean(false)),
                _ => Err(DecodeError::InvalidBoolean.into()),
            }
        }
        b'(' => {
            let line = cursor.read_line()?;
            Ok(Value::BigNumber(parse_big_number(line)?))
        }
        b'%' => {
            let line = cursor.read_line()?;
            let pairs = parse_len(line)?.ok_or(DecodeError::InvalidLength)?;
            let mut entries = Vec::with_capacity(pairs.min(1024));
            for _ in 0..pairs {
                let key = parse_value(cursor, depth + 1)?;
                let value = parse_value(cursor, depth + 1)?;
                entries.push((key, value));
            }
            Ok(Value::Map(entries))
        }
        b'~' => {
            let line = cursor.read_line()?;
            let len = parse_len(line)?.ok_or(DecodeError::InvalidLength)?;
            Ok(Value::Set(parse_elements(cursor, len, depth)?))
        }
        b'>' => {
            let line = cursor.read_line()?;
            let len = parse_len(line)?.ok_or(DecodeError::InvalidLength)?;
            Ok(Value::Push(parse_elements(cursor, len, depth)?))
        }
        b'=' => {
            let line = cursor.read_line()?;
            let len = parse_len(line)?.ok_or(DecodeError::InvalidLength)?;
            let payload = cursor.read_exact(len)?;
            // Layout is a 3-char format tag, a colon, then the text.
            if payload.len() < 4 || payload[3] != b':' {
                return Err(DecodeError::InvalidVerbatim.into());
            }
            Ok(Value::Verbatim {
                format: parse_text(&payload[..3])?,
                text: parse_text(&payload[4..])?,
            })
        }
        other => Err(DecodeError::UnknownPrefix(other).into()),
    }
}

fn parse_elements(
    cursor: &mut Cursor<'_>,
    len: usize,
    depth: usize,
) -> Result<Vec<Value>, Interrupt> {
    let mut items = Vec::with_capacity(len.min(1024));
    for _ in 0..len {
        items.push(parse_value(cursor, depth + 1)?);
    }
    Ok(items)
}

fn parse_text(line: &[u8]) -> Result<String, DecodeError> {
    String::from_utf8(line.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
}

fn parse_i64(line: &[u8]) -> Result<i64, DecodeError> {
    let (negative, digits) = match line.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, line),
    };
    if digits.is_empty() {
        return Err(DecodeError::InvalidInteger);
    }

    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(DecodeError::InvalidInteger);
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as i64))
            .ok_or(DecodeError::InvalidInteger)?;
    }

    Ok(if negative { -value } else { value })
}

/// Parses a size header; `-1` is the null marker, other negatives are invalid.
fn parse_len(line: &[u8]) -> Result<Option<usize>, DecodeError> {
    let value = parse_i64(line).map_err(|_| DecodeError::InvalidLength)?;
    match value {
        -1 => Ok(None),
        v if v < 0 => Err(DecodeError::InvalidLength),
        v => Ok(Some(v as usize)),
    }
}

fn parse_double(line: &[u8]) -> Result<f64, DecodeError> {
    let text = std::str::from_utf8(line).map_err(|_| DecodeError::InvalidDouble)?;
    // Rust's float parser accepts the protocol's "inf", "-inf", and "nan"
    // spellings directly.
    text.parse::<f64>().map_err(|_| DecodeError::InvalidDouble)
}

fn parse_big_number(line: &[u8]) -> Result<String, DecodeError> {
    let digits = match line.split_first() {
        Some((b'-', rest)) | Some((b'+', rest)) => rest,
        _ => line,
    };
    if digits.is_empty() || !digits.iter().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::InvalidBigNumber);
    }
    parse_text(line)
}
