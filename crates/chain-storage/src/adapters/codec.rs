//! Bincode encoding of stored records.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::errors::StorageError;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StorageError> {
    bincode::serialize(value).map_err(|e| StorageError::Serialization {
        message: e.to_string(),
    })
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    bincode::deserialize(bytes).map_err(|e| StorageError::Serialization {
        message: e.to_string(),
    })
}
