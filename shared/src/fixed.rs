//! Fixed-capacity, NUL-terminated string fields for the wire record

use crate::error::WireError;
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A string stored in exactly `N` bytes, always leaving room for the terminator.
///
/// Serialises as `N` raw bytes with no length prefix so the packet layout never
/// depends on content. Values of `N` bytes or more are rejected at construction
/// instead of being truncated.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedStr<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> FixedStr<N> {
    pub const CAPACITY: usize = N;

    pub fn new(field: &'static str, value: &str) -> Result<Self, WireError> {
        if value.len() >= N {
            return Err(WireError::FieldTooLong {
                field,
                len: value.len(),
                capacity: N,
            });
        }
        if value.as_bytes().contains(&0) {
            return Err(WireError::EmbeddedNul { field });
        }

        let mut bytes = [0u8; N];
        bytes[..value.len()].copy_from_slice(value.as_bytes());
        Ok(Self { bytes })
    }

    /// Wraps bytes exactly as they arrived; nothing is checked until [`FixedStr::read`]
    pub fn from_bytes(bytes: [u8; N]) -> Self {
        Self { bytes }
    }

    /// Reads the string up to its terminator.
    ///
    /// Untrusted input without a terminator is an error, see [`FixedStr::terminated`].
    pub fn read(&self, field: &'static str) -> Result<&str, WireError> {
        let end = self
            .bytes
            .iter()
            .position(|b| *b == 0)
            .ok_or(WireError::Unterminated { field, capacity: N })?;
        std::str::from_utf8(&self.bytes[..end]).map_err(|_| WireError::InvalidUtf8 { field })
    }

    /// Forces a terminator into the last byte so a read is bounded by the buffer.
    pub fn terminated(mut self) -> Self {
        if let Some(last) = self.bytes.last_mut() {
            *last = 0;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.first().map_or(true, |b| *b == 0)
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self { bytes: [0u8; N] }
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.bytes.iter().position(|b| *b == 0).unwrap_or(N);
        write!(f, "{:?}", String::from_utf8_lossy(&self.bytes[..end]))
    }
}

impl<const N: usize> Serialize for FixedStr<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(N)?;
        for byte in &self.bytes {
            tuple.serialize_element(byte)?;
        }
        tuple.end()
    }
}

impl<'de, const N: usize> Deserialize<'de> for FixedStr<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawBytes<const N: usize>;

        impl<'de, const N: usize> Visitor<'de> for RawBytes<N> {
            type Value = FixedStr<N>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} raw bytes", N)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut bytes = [0u8; N];
                for (index, slot) in bytes.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(index, &self))?;
                }
                Ok(FixedStr { bytes })
            }
        }

        deserializer.deserialize_tuple(N, RawBytes::<N>)
    }
}
