//! Stored value container

use bytes::Bytes;

/// The payload kinds an entity can hold.
///
/// Only byte strings are populated today; richer kinds (list, set, hash)
/// are added here without touching the dict interface.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Str(Bytes),
}

/// An opaque value container stored under a key.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub data: Data,
}

impl Entity {
    /// Create a byte-string entity
    pub fn str(bytes: impl Into<Bytes>) -> Self {
        Entity {
            data: Data::Str(bytes.into()),
        }
    }

    /// The TYPE name of this entity's payload
    pub fn type_name(&self) -> &'static str {
        match self.data {
            Data::Str(_) => "string",
        }
    }

    /// Borrow the byte-string payload, if that is what this entity holds
    pub fn as_str(&self) -> Option<&Bytes> {
        match &self.data {
            Data::Str(bytes) => Some(bytes),
        }
    }
}
