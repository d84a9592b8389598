use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::runtime::codec;
use crate::runtime::error::Error;

/// An encoded value that can be handed to a worker and opened there.
///
/// Used once per worker to carry the description of the environment it
/// has to build. The bytes are JSON. Anything that cannot be encoded (or
/// decoded back into `T`) fails here, before the worker is of any use.
pub struct Envelope<T> {
    bytes: Vec<u8>,
    _phantom: PhantomData<fn() -> T>,
}

// Manual Debug implementation - works regardless of whether T implements Debug
impl<T> fmt::Debug for Envelope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("len", &self.bytes.len())
            .field("content_type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Clone for Envelope<T> {
    fn clone(&self) -> Self {
        Self::from_bytes(self.bytes.clone())
    }
}

impl<T> Envelope<T> {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            _phantom: PhantomData,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn wrap(value: &T) -> Result<Self, Error> {
        codec::encode_json(value).map(Self::from_bytes)
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    pub fn open(&self) -> Result<T, Error> {
        codec::decode_json(&self.bytes)
    }
}
