//! Atrium Core - Shared Types
//!
//! Pure data structures used by every other Atrium crate: semantic versions,
//! tenant records, stored blocks and the error hierarchy. No I/O lives here.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod block;
pub mod error;
pub mod hostname;
pub mod tenant;
pub mod version;

pub use block::{BlockFields, BlockInstance};
pub use error::{AtriumError, AtriumResult, ConfigError, MigrationError, StoreError, VersionError};
pub use tenant::{ContactInfo, FeatureFlags, TenantRecord, TenantRef, ThemeSettings};
pub use version::{Prerelease, SemVer};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new tenant id (UUIDv7 text, timestamp-sortable).
pub fn new_tenant_id() -> String {
    Uuid::now_v7().to_string()
}
