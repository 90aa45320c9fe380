//! Forward-only binary channel used by `save` / `restore`
//!
//! Values are appended with bincode in call order; sequences carry a length
//! prefix. The reader consumes the same values in the same order and never
//! seeks.

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Append-only byte buffer.
#[derive(Debug, Default, Clone)]
pub struct Serializer {
    buffer: Vec<u8>,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single value.
    pub fn insert_compact_obj<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        bincode::serialize_into(&mut self.buffer, value)?;
        Ok(())
    }

    /// Append a length-prefixed sequence of records.
    pub fn insert_compact_vec<T: Serialize>(&mut self, values: &[T]) -> Result<()> {
        self.insert_compact_obj(values)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Cursor over bytes produced by a [`Serializer`].
#[derive(Debug, Clone)]
pub struct Deserializer<'a> {
    remaining: &'a [u8],
}

impl<'a> Deserializer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { remaining: data }
    }

    /// Read the next value. A truncated buffer is a serialization error.
    pub fn get_compact_obj<T: DeserializeOwned>(&mut self) -> Result<T> {
        Ok(bincode::deserialize_from(&mut self.remaining)?)
    }

    /// Read the next length-prefixed sequence.
    pub fn get_compact_vec<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
        self.get_compact_obj()
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}
