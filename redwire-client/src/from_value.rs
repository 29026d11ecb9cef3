//! # Reply Decoder
//!
//! Purpose: Convert a parsed [`Value`] into the caller's requested type. This
//! is the single point where stringly-typed replies become statically typed
//! results, so every conversion is explicit and every mismatch is an error.
//!
//! ## Design Principles
//! 1. **Error Short-Circuit**: [`from_wire`] maps `Value::Error` to
//!    [`Error::Server`] before any conversion runs, for every target type.
//! 2. **No Silent Truncation**: Integer conversions are range-checked;
//!    overflow is a type mismatch, not a wrap.
//! 3. **Legacy Degradation**: RESP2 servers deliver doubles, booleans, and
//!    maps as bulk text, 0/1 integers, and flat arrays; the impls accept both
//!    spellings so callers never branch on protocol revision.
//! 4. **Null Is Not A Value**: Only `Option` targets absorb `Null`; everything
//!    else rejects it.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use redwire_proto::Value;

use crate::error::{Error, Result};

/// Capability to build a typed result from one reply value.
///
/// Implementations convert shapes, never server errors: conversion is always
/// entered through [`from_wire`], which has already rejected `Value::Error`.
pub trait FromValue: Sized {
    /// Converts `value` or fails with [`Error::TypeMismatch`].
    fn from_value(value: Value) -> Result<Self>;
}

/// Entry point for all reply conversion.
///
/// Rejects `Value::Error` regardless of the requested target type, then
/// delegates to the target's [`FromValue`] impl.
pub fn from_wire<T: FromValue>(value: Value) -> Result<T> {
    match value {
        Value::Error(err) => Err(Error::Server(err)),
        other => T::from_value(other),
    }
}

fn mismatch<T>(expected: &'static str, actual: &Value) -> Result<T> {
    Err(Error::TypeMismatch {
        expected,
        actual: actual.type_name().to_string(),
    })
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self> {
        let _ = value;
        Ok(())
    }
}

macro_rules! from_value_for_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    let expected = concat!("integer (", stringify!($ty), ")");
                    match &value {
                        Value::Int(n) => <$ty>::try_from(*n)
                            .map_err(|_| Error::TypeMismatch {
                                expected,
                                actual: format!("integer {} out of range", n),
                            }),
                        // Many commands return numbers as bulk text.
                        Value::Bulk(data) => parse_int_text(data, expected),
                        Value::Simple(text) => parse_int_text(text.as_bytes(), expected),
                        _ => mismatch(expected, &value),
                    }
                }
            }
        )*
    };
}

// u8 is intentionally absent so that `Vec<u8>` stays the byte-string target.
from_value_for_int!(i8, i16, i32, i64, isize, u16, u32, u64, usize);

fn parse_int_text<T: std::str::FromStr>(data: &[u8], expected: &'static str) -> Result<T> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse::<T>().ok())
        .ok_or_else(|| Error::TypeMismatch {
            expected,
            actual: format!("bulk string {:?}", String::from_utf8_lossy(data)),
        })
}

macro_rules! from_value_for_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    let expected = concat!("double (", stringify!($ty), ")");
                    match &value {
                        Value::Double(d) => Ok(*d as $ty),
                        Value::Int(n) => Ok(*n as $ty),
                        // RESP2 degrades doubles to bulk text.
                        Value::Bulk(data) => std::str::from_utf8(data)
                            .ok()
                            .and_then(|text| text.parse::<$ty>().ok())
                            .ok_or_else(|| Error::TypeMismatch {
                                expected,
                                actual: format!(
                                    "bulk string {:?}",
                                    String::from_utf8_lossy(data)
                                ),
                            }),
                        _ => mismatch(expected, &value),
                    }
                }
            }
        )*
    };
}

from_value_for_float!(f32, f64);

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Boolean(b) => Ok(*b),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            Value::Simple(text) if text == "OK" => Ok(true),
            Value::Bulk(data) if data.as_slice() == b"0" => Ok(false),
            Value::Bulk(data) if data.as_slice() == b"1" => Ok(true),
            _ => mismatch("boolean", &value),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Simple(text) => Ok(text),
            Value::Verbatim { text, .. } => Ok(text),
            Value::BigNumber(digits) => Ok(digits),
            Value::Bulk(data) => String::from_utf8(data).map_err(|err| Error::TypeMismatch {
                expected: "UTF-8 string",
                actual: format!("bulk string with invalid UTF-8 at byte {}", err.utf8_error().valid_up_to()),
            }),
            other => mismatch("string", &other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bulk(data) => Ok(data),
            Value::Simple(text) => Ok(text.into_bytes()),
            Value::Verbatim { text, .. } => Ok(text.into_bytes()),
            other => mismatch("byte string", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => from_wire(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) | Value::Set(items) | Value::Push(items) => {
                items.into_iter().map(from_wire).collect()
            }
            other => mismatch("array", &other),
        }
    }
}

fn map_entries(value: Value) -> Result<Vec<(Value, Value)>> {
    match value {
        Value::Map(entries) => Ok(entries),
        // RESP2 delivers maps as a flat key-value array.
        Value::Array(items) => {
            if items.len() % 2 != 0 {
                return Err(Error::TypeMismatch {
                    expected: "map",
                    actual: format!("array of odd length {}", items.len()),
                });
            }
            let mut entries = Vec::with_capacity(items.len() / 2);
            let mut iter = items.into_iter();
            while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                entries.push((key, value));
            }
            Ok(entries)
        }
        other => mismatch("map", &other),
    }
}

impl<K: FromValue + Eq + Hash, V: FromValue> FromValue for HashMap<K, V> {
    fn from_value(value: Value) -> Result<Self> {
        map_entries(value)?
            .into_iter()
            .map(|(k, v)| Ok((from_wire(k)?, from_wire(v)?)))
            .collect()
    }
}

impl<K: FromValue + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(value: Value) -> Result<Self> {
        map_entries(value)?
            .into_iter()
            .map(|(k, v)| Ok((from_wire(k)?, from_wire(v)?)))
            .collect()
    }
}

macro_rules! from_value_for_tuple {
    ($len:expr, $($name:ident),+) => {
        impl<$($name: FromValue),+> FromValue for ($($name,)+) {
            #[allow(non_snake_case)]
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Array(items) => {
                        if items.len() != $len {
                            return Err(Error::TypeMismatch {
                                expected: concat!("array of length ", $len),
                                actual: format!("array of length {}", items.len()),
                            });
                        }
                        let mut iter = items.into_iter();
                        $(let $name = from_wire(iter.next().expect("length checked"))?;)+
                        Ok(($($name,)+))
                    }
                    other => mismatch(concat!("array of length ", $len), &other),
                }
            }
        }
    };
}

from_value_for_tuple!(1, A);
from_value_for_tuple!(2, A, B);
from_value_for_tuple!(3, A, B, C);
from_value_for_tuple!(4, A, B, C, D);
