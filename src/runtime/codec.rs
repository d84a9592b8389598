//! Byte encodings for everything that crosses a worker channel.
//!
//! Command and reply frames use `bincode`, which keeps `f32`/`f64` bit for
//! bit (NaN and infinities included). It is not self-describing: payload
//! types must not rely on `deserialize_any` (`serde_json::Value`, untagged
//! or internally tagged enums, `#[serde(flatten)]`).
//!
//! Environment descriptors travel once per worker as JSON so their free-form
//! kwargs can be read back as `serde_json::Value`.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::runtime::error::Error;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    bincode::serialize(value).map_err(|e| Error::Serialize(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    bincode::deserialize(bytes).map_err(|e| Error::Deserialize(e.to_string()))
}

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(value).map_err(|e| Error::Serialize(e.to_string()))
}

pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(bytes).map_err(|e| Error::Deserialize(e.to_string()))
}
