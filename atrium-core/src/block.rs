//! Stored page-builder blocks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::SemVer;

/// Field map of a block, everything except `blockType` and `version`.
pub type BlockFields = Map<String, Value>;

/// A content block as persisted inside a page document.
///
/// Wire shape: `{ "blockType": "hero", "version": "1.0.0", ...fields }`.
/// `version` keeps whatever JSON the document held, so a number or other
/// malformed value round-trips untouched and reads as "no valid version".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInstance {
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(flatten)]
    pub fields: BlockFields,
}

impl BlockInstance {
    pub fn new(block_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            version: Some(Value::String(version.into())),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter, mostly for fixtures.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The version text, when the stored value is a string.
    pub fn version_str(&self) -> Option<&str> {
        self.version.as_ref().and_then(Value::as_str)
    }

    /// The version, when present and valid.
    pub fn parsed_version(&self) -> Option<SemVer> {
        self.version_str().and_then(|v| v.parse().ok())
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}
