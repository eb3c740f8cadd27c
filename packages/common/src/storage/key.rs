use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

const MAX_KEY_LEN: usize = 1024;

/// A validated object key.
///
/// Keys are `/`-separated relative paths. Every segment is non-empty and is
/// neither `.` nor `..`; backslashes, control characters and a leading `/`
/// are rejected. A valid key can therefore be joined onto a filesystem root
/// or embedded in a URL path without escaping its namespace.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn parse(key: &str) -> Result<Self, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key is empty"));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(StorageError::InvalidKey("key is too long"));
        }
        if key.chars().any(|c| c.is_control()) {
            return Err(StorageError::InvalidKey("key contains control characters"));
        }
        if key.contains('\\') {
            return Err(StorageError::InvalidKey("key contains a backslash"));
        }
        for segment in key.split('/') {
            match segment {
                "" => return Err(StorageError::InvalidKey("key contains an empty segment")),
                "." | ".." => return Err(StorageError::InvalidKey("key contains a relative segment")),
                _ => {}
            }
        }
        Ok(Self(key.to_string()))
    }

    /// Build a fresh, collision-free key `<prefix>/<uuid>-<file_name>`.
    ///
    /// `file_name` must already be a flat filename.
    pub fn for_upload(prefix: &str, file_name: &str) -> Result<Self, StorageError> {
        Self::parse(&format!("{prefix}/{}-{file_name}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The last path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Extension of the last segment, if it has one.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) if idx + 1 < name.len() => Some(&name[idx + 1..]),
            Some(_) => None,
        }
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectKey({})", self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ObjectKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
