//! # Request Framing
//!
//! Purpose: Render an ordered token list into the wire form of one request
//! without intermediate allocations.
//!
//! ## Design Principles
//! 1. **Single Shape**: Requests are always an array of bulk strings, for
//!    every command and protocol revision.
//! 2. **Binary-Safe**: Tokens are written as length-prefixed bytes, so keys
//!    and values may contain any byte sequence.
//! 3. **Pure Output**: Encoding only appends to the caller's buffer; it is
//!    repeatable and cannot fail.

use bytes::{BufMut, BytesMut};

/// Appends one framed request to `out`: `*N\r\n` followed by
/// `$len\r\n<token>\r\n` per token.
pub fn write_command<T: AsRef<[u8]>>(tokens: &[T], out: &mut BytesMut) {
    out.put_u8(b'*');
    write_decimal(tokens.len() as u64, out);
    out.put_slice(b"\r\n");
    for token in tokens {
        let token = token.as_ref();
        out.put_u8(b'$');
        write_decimal(token.len() as u64, out);
        out.put_slice(b"\r\n");
        out.put_slice(token);
        out.put_slice(b"\r\n");
    }
}

// Digits go through a stack buffer to keep the hot path allocation-free.
fn write_decimal(mut value: u64, out: &mut BytesMut) {
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    } else {
        while value > 0 {
            buf[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
    }
    buf[..len].reverse();
    out.put_slice(&buf[..len]);
}
