//! # Argument Encoder
//!
//! Purpose: Turn typed values into the ordered wire tokens of one request.
//!
//! ## Design Principles
//! 1. **Token Streams**: A value contributes zero or more whole tokens;
//!    composite types concatenate their parts in order.
//! 2. **Infallible**: Type constraints are enforced at the call boundary, so
//!    encoding itself cannot fail.
//! 3. **Deterministic Output**: Collections and option-sets emit tokens in a
//!    fixed order so the same call always produces the same request bytes.
//!
//! Keyword enums and option-sets for concrete commands live next to the
//! commands that use them (see `client`); this module provides the trait and
//! the impls for primitives and composites.

use std::collections::{BTreeMap, HashMap};

/// Capability to append wire tokens for a request.
///
/// `None` options append nothing; sequences append each element's tokens in
/// order; numeric types append their canonical decimal text.
pub trait ToArgs {
    /// Appends this value's tokens to `out`.
    fn write_args(&self, out: &mut Vec<Vec<u8>>);

    /// Collects this value's tokens into a fresh vector.
    fn to_args(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        self.write_args(&mut out);
        out
    }
}

impl ToArgs for () {
    fn write_args(&self, _out: &mut Vec<Vec<u8>>) {}
}

impl<T: ToArgs + ?Sized> ToArgs for &T {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        (**self).write_args(out);
    }
}

impl ToArgs for [u8] {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(self.to_vec());
    }
}

impl ToArgs for Vec<u8> {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(self.clone());
    }
}

impl<const N: usize> ToArgs for [u8; N] {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(self.to_vec());
    }
}

impl ToArgs for str {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(self.as_bytes().to_vec());
    }
}

impl ToArgs for String {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(self.as_bytes().to_vec());
    }
}

impl ToArgs for bool {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(if *self { b"1".to_vec() } else { b"0".to_vec() });
    }
}

macro_rules! to_args_via_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToArgs for $ty {
                fn write_args(&self, out: &mut Vec<Vec<u8>>) {
                    out.push(self.to_string().into_bytes());
                }
            }
        )*
    };
}

// u8 is intentionally absent: it would make `Vec<u8>` ambiguous between a
// byte-string token and a sequence of numeric tokens.
to_args_via_display!(i8, i16, i32, i64, isize, u16, u32, u64, usize, f32, f64);

impl<T: ToArgs> ToArgs for Option<T> {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        if let Some(value) = self {
            value.write_args(out);
        }
    }
}

impl<T: ToArgs> ToArgs for Vec<T> {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        for item in self {
            item.write_args(out);
        }
    }
}

impl<T: ToArgs> ToArgs for [T] {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        for item in self {
            item.write_args(out);
        }
    }
}

impl<K: ToArgs, V: ToArgs> ToArgs for BTreeMap<K, V> {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        for (key, value) in self {
            key.write_args(out);
            value.write_args(out);
        }
    }
}

// HashMap iteration order is unspecified; acceptable for commands whose
// key/value pairs are order-independent (MSET, HSET).
impl<K: ToArgs, V: ToArgs> ToArgs for HashMap<K, V> {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        for (key, value) in self {
            key.write_args(out);
            value.write_args(out);
        }
    }
}

macro_rules! to_args_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: ToArgs),+> ToArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn write_args(&self, out: &mut Vec<Vec<u8>>) {
                let ($($name,)+) = self;
                $($name.write_args(out);)+
            }
        }
    };
}

to_args_for_tuple!(A);
to_args_for_tuple!(A, B);
to_args_for_tuple!(A, B, C);
to_args_for_tuple!(A, B, C, D);

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens<T: ToArgs>(value: T) -> Vec<Vec<u8>> {
        value.to_args()
    }

    #[test]
    fn test_primitives() {
        assert_eq!(tokens("key"), vec![b"key".to_vec()]);
        assert_eq!(tokens(42i64), vec![b"42".to_vec()]);
        assert_eq!(tokens(-7i32), vec![b"-7".to_vec()]);
        assert_eq!(tokens(2.5f64), vec![b"2.5".to_vec()]);
        assert_eq!(tokens(true), vec![b"1".to_vec()]);
        assert_eq!(tokens(false), vec![b"0".to_vec()]);
    }

    #[test]
    fn test_bytes() {
        assert_eq!(tokens(b"\x00\xff".to_vec()), vec![vec![0x00, 0xff]]);
        assert_eq!(tokens(&b"raw"[..]), vec![b"raw".to_vec()]);
    }

    #[test]
    fn test_option_none_appends_nothing() {
        assert_eq!(tokens(None::<String>), Vec::<Vec<u8>>::new());
        assert_eq!(tokens(Some("v")), vec![b"v".to_vec()]);
    }

    #[test]
    fn test_sequence_concatenates_in_order() {
        assert_eq!(
            tokens(vec!["a", "b", "c"]),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
    }

    #[test]
    fn test_tuple_pairs() {
        // The MSET shape: pairs flatten to key value key value.
        assert_eq!(
            tokens(vec![("a", "1"), ("b", "2")]),
            vec![b"a".to_vec(), b"1".to_vec(), b"b".to_vec(), b"2".to_vec()]
        );
    }

    #[test]
    fn test_btree_map_pairs() {
        let mut map = BTreeMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        assert_eq!(
            tokens(map),
            vec![b"a".to_vec(), b"1".to_vec(), b"b".to_vec(), b"2".to_vec()]
        );
    }
}
