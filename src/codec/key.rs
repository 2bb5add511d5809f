//! Order-preserving binary key encoding (spec §4.1, component C1).
//!
//! A composite key is built from two kinds of fields:
//!
//! - a **fixed-length byte field**, stored verbatim;
//! - a **variable-length byte field with a fixed prefix**: the leading `P`
//!   bytes are copied verbatim (so a store can split/prefix-range on them
//!   without being affected by the variable encoder's escape bytes), and the
//!   remainder is appended through a terminated, order-preserving encoding
//!   ([`memcomparable`]'s escaped 8-byte-group scheme) so the field stays
//!   self-delimiting inside a larger composite key.
//!
//! `prefix = 2` is used for record-id fields throughout this crate: byte 0
//! of a [`crate::record::RecordId`]'s bytes is a type discriminator and byte
//! 1 is the first byte of the user-chosen identifier (see
//! [`crate::record`]); keeping both in the verbatim leading zone means a
//! backend can range-split on them without touching escaped bytes.

use serde::{Deserialize, Serialize};
use serde_bytes::{ByteBuf, Bytes};

use crate::error::{CodecError, CodecResult};

/// Accumulates the bytes of a composite key field by field.
#[derive(Default)]
pub struct KeyBuilder(Vec<u8>);

impl KeyBuilder {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a fixed-length field verbatim. `bytes.len()` must equal `len`.
    pub fn push_fixed(mut self, bytes: &[u8], len: usize) -> CodecResult<Self> {
        if bytes.len() != len {
            return Err(CodecError::InvalidLength {
                expected: len,
                got: bytes.len(),
            });
        }
        self.0.extend_from_slice(bytes);
        Ok(self)
    }

    /// Appends a variable-length field: `prefix_len` leading bytes of `full`
    /// verbatim, then the remainder through the terminated encoder.
    pub fn push_variable_with_prefix(mut self, full: &[u8], prefix_len: usize) -> CodecResult<Self> {
        if full.len() < prefix_len {
            return Err(CodecError::InvalidLength {
                expected: prefix_len,
                got: full.len(),
            });
        }
        self.0.extend_from_slice(&full[..prefix_len]);
        let mut ser = memcomparable::Serializer::new(self.0);
        Bytes::new(&full[prefix_len..]).serialize(&mut ser)?;
        self.0 = ser.into_inner();
        Ok(self)
    }

    pub fn finish(self) -> Vec<u8> {
        self.0
    }
}

/// Reads the fields of a composite key back out, in the order they were
/// written by [`KeyBuilder`].
pub struct KeyReader<'a> {
    data: &'a [u8],
}

impl<'a> KeyReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Reads a fixed-length field. Fails if fewer than `len` bytes remain.
    pub fn read_fixed(&mut self, len: usize, what: &'static str) -> CodecResult<&'a [u8]> {
        if self.data.len() < len {
            return Err(CodecError::Truncated { what });
        }
        let (field, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(field)
    }

    /// Reads a variable-length field written with `prefix_len`, returning
    /// the reconstructed full bytes (prefix ++ decoded remainder).
    pub fn read_variable_with_prefix(
        &mut self,
        prefix_len: usize,
        what: &'static str,
    ) -> CodecResult<Vec<u8>> {
        let prefix = self.read_fixed(prefix_len, what)?.to_vec();
        let mut de = memcomparable::Deserializer::new(self.data);
        let suffix = ByteBuf::deserialize(&mut de)?;
        let consumed = de.position();
        self.data = &self.data[consumed..];
        let mut full = prefix;
        full.extend_from_slice(&suffix);
        Ok(full)
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.data
    }

    /// Confirms the whole key was consumed exactly, with no trailing bytes.
    pub fn finish(self, what: &'static str) -> CodecResult<()> {
        if !self.data.is_empty() {
            return Err(CodecError::TrailingBytes { what });
        }
        Ok(())
    }
}
