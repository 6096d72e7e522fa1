// space.rs — The Space record and its on-disk metadata codec.
//
// A space is a directory holding a `metadata.yaml` file directly inside
// it. The record is the only thing that makes a directory a space: a
// directory without a parseable, complete record is just a directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known name of the metadata record inside every space directory.
pub const METADATA_FILE_NAME: &str = "metadata.yaml";

/// Fields a record must carry to be considered a valid space.
pub const REQUIRED_FIELDS: [&str; 4] = ["name", "label", "path", "created_at"];

/// A named node in the namespace, backed by one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    /// Human-chosen identifier. Unique within the index by convention only.
    pub name: String,

    /// Free-form classification string (may be empty).
    pub label: String,

    /// Absolute location of the space directory.
    pub path: PathBuf,

    /// Set once at creation.
    pub created_at: DateTime<Utc>,

    /// Names of directly nested spaces. Informational: filled in by the
    /// index scan, written empty at creation.
    #[serde(default)]
    pub subspaces: Vec<String>,
}

/// Why a metadata record could not be turned into a [`Space`].
#[derive(Debug, Error)]
pub enum RecordError {
    /// The bytes are not YAML, or a field has the wrong type.
    #[error("malformed metadata record: {0}")]
    Malformed(#[from] serde_yaml::Error),

    /// The document parsed but is not a key/value mapping.
    #[error("metadata record is not a mapping")]
    NotAMapping,

    /// One or more required fields are absent or null.
    #[error("metadata record missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

impl Space {
    /// Build a fresh record stamped with the current UTC time.
    pub fn new(name: impl Into<String>, label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            path: path.into(),
            created_at: Utc::now(),
            subspaces: Vec::new(),
        }
    }

    /// Location of this space's metadata record.
    pub fn metadata_path(&self) -> PathBuf {
        metadata_path(&self.path)
    }

    /// Serialize the record as YAML.
    pub fn encode(&self) -> Result<Vec<u8>, RecordError> {
        Ok(serde_yaml::to_string(self)?.into_bytes())
    }

    /// Parse a record, checking required fields before typed decoding so
    /// incomplete records are reported as such rather than as type errors.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        let value: serde_yaml::Value = serde_yaml::from_slice(bytes)?;
        let mapping = value.as_mapping().ok_or(RecordError::NotAMapping)?;

        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| mapping.get(*field).map_or(true, serde_yaml::Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(RecordError::MissingFields(missing));
        }

        Ok(serde_yaml::from_value(value)?)
    }
}

/// Location of the metadata record for a space directory.
pub fn metadata_path(space_dir: &Path) -> PathBuf {
    space_dir.join(METADATA_FILE_NAME)
}
