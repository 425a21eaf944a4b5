//! Error types for Atrium operations

use thiserror::Error;

/// Tenant store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Tenant store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Tenant query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Domain {domain} is already claimed by tenant {existing_id}")]
    DomainConflict { domain: String, existing_id: String },

    #[error("Slug {slug} is already used by tenant {existing_id}")]
    SlugConflict { slug: String, existing_id: String },

    #[error("Tenant store lock poisoned")]
    LockPoisoned,
}

/// Semantic version parse errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("Version string is empty")]
    Empty,

    #[error("Malformed version {input:?}: {reason}")]
    Malformed { input: String, reason: String },
}

/// Block registry and migration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MigrationError {
    #[error("Invalid migration key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Migration {key} registered twice for block type {block_type}")]
    DuplicateMigration { block_type: String, key: String },

    #[error("Transform failed: {reason}")]
    Transform { reason: String },

    #[error("Migration step {key} failed: {reason}")]
    StepFailed { key: String, reason: String },

    #[error("Migration step {key} panicked")]
    StepPanicked { key: String },

    #[error("No migration registered for link {key}")]
    MissingLink { key: String },

    #[error("Block type registered twice: {block_type}")]
    DuplicateBlockType { block_type: String },

    #[error("Block type {block_type} declares version {version} beyond current {current}")]
    BeyondCurrent {
        block_type: String,
        version: String,
        current: String,
    },
}

impl MigrationError {
    /// Error a migration function returns when it cannot reshape the fields.
    pub fn transform(reason: impl Into<String>) -> Self {
        Self::Transform {
            reason: reason.into(),
        }
    }

    pub fn step_failed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StepFailed {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Atrium errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AtriumError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Atrium operations.
pub type AtriumResult<T> = Result<T, AtriumError>;

// =============================================================================
// TESTS
// =============================================================================
