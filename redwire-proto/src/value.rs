//! # Wire Value Model
//!
//! Purpose: Represent every reply shape a Redis-compatible server can send,
//! for both the legacy (RESP2) and extended (RESP3) protocol revisions.
//!
//! ## Design Principles
//! 1. **Closed Union**: One tagged enum covers all reply shapes; no dynamic
//!    type inspection anywhere downstream.
//! 2. **Binary-Safe**: Bulk payloads are raw bytes, never assumed UTF-8.
//! 3. **No Silent Errors**: Server errors are a distinct variant carrying the
//!    error code, so they cannot be mistaken for data.
//! 4. **Ordered Storage**: Map and Set entries keep wire order so callers can
//!    rely on deterministic iteration.

use std::fmt;

/// A fully-parsed reply from the server.
///
/// `Double`, `Boolean`, `BigNumber`, `Map`, `Set`, `Push`, and `Verbatim`
/// appear on the wire only after negotiating the extended protocol; RESP2
/// servers degrade them to `Bulk`/`Int`/`Array` forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `+OK` style in-line status.
    Simple(String),
    /// `-ERR ...` server-reported failure.
    Error(ServerError),
    /// `:123` signed 64-bit integer.
    Int(i64),
    /// `$...` bulk string; may hold arbitrary binary data.
    Bulk(Vec<u8>),
    /// `*...` array; elements may nest arbitrarily deep.
    Array(Vec<Value>),
    /// Absence of a value (`$-1`, `*-1`, or RESP3 `_`). Distinct from an
    /// empty string or empty array.
    Null,
    /// `,3.14` IEEE-754 double (RESP3).
    Double(f64),
    /// `#t` / `#f` boolean (RESP3).
    Boolean(bool),
    /// `(...` arbitrary-precision integer, kept as validated text.
    BigNumber(String),
    /// `%...` key/value pairs in wire order (RESP3).
    Map(Vec<(Value, Value)>),
    /// `~...` set; stored in wire order, semantically unordered (RESP3).
    Set(Vec<Value>),
    /// `>...` unsolicited push message (RESP3, subscribe mode).
    Push(Vec<Value>),
    /// `=...` human-readable blob with a three-character format tag (RESP3).
    Verbatim {
        /// Format tag, e.g. "txt" or "mkd".
        format: String,
        /// The text payload.
        text: String,
    },
}

impl Value {
    /// Short name of the reply shape, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Simple(_) => "simple status",
            Value::Error(_) => "server error",
            Value::Int(_) => "integer",
            Value::Bulk(_) => "bulk string",
            Value::Array(_) => "array",
            Value::Null => "null",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::BigNumber(_) => "big number",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Push(_) => "push",
            Value::Verbatim { .. } => "verbatim string",
        }
    }

    /// Returns true for the `Error` variant.
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Returns true for the `Null` variant.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A well-formed error reply from the server.
///
/// The first word of the error line is the machine-readable code ("ERR",
/// "WRONGTYPE", "MOVED", ...); the remainder is the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// Leading code word of the error line.
    pub code: String,
    /// Remainder of the error line.
    pub message: String,
}

impl ServerError {
    /// Splits a raw error line (without the `-` prefix) into code and message.
    pub fn from_line(line: &str) -> Self {
        match line.split_once(' ') {
            Some((code, message)) => ServerError {
                code: code.to_string(),
                message: message.to_string(),
            },
            None => ServerError {
                code: line.to_string(),
                message: String::new(),
            },
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ServerError {}
