//! Snapshot payload encoding.

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::error::CodecError;
use crate::version::Attributes;

/// On-disk representation of a snapshot payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Json,
    Yaml,
}

/// Serializes attribute maps to snapshot payloads and back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotCodec {
    format: SnapshotFormat,
}

impl SnapshotCodec {
    pub fn new(format: SnapshotFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> SnapshotFormat {
        self.format
    }

    pub fn encode(&self, attributes: &Attributes) -> Result<String, CodecError> {
        match self.format {
            SnapshotFormat::Json => Ok(serde_json::to_string(attributes)?),
            SnapshotFormat::Yaml => Ok(serde_yaml::to_string(attributes)?),
        }
    }

    /// Decodes a payload into an attribute map.
    ///
    /// Absent, empty and malformed payloads all decode to an empty map so
    /// that CREATE versions and damaged history reconstruct to "no state"
    /// instead of failing the caller.
    pub fn decode(&self, payload: Option<&str>) -> Attributes {
        let Some(payload) = payload else {
            return Attributes::new();
        };
        if payload.trim().is_empty() {
            return Attributes::new();
        }

        let decoded = match self.format {
            SnapshotFormat::Json => {
                serde_json::from_str::<Attributes>(payload).map_err(|e| e.to_string())
            }
            SnapshotFormat::Yaml => {
                serde_yaml::from_str::<Attributes>(payload).map_err(|e| e.to_string())
            }
        };

        match decoded {
            Ok(attributes) => attributes,
            Err(err) => {
                warn!(format = ?self.format, "discarding malformed snapshot: {err}");
                Attributes::new()
            }
        }
    }
}
