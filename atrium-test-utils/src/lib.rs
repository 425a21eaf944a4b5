//! Atrium Test Utilities
//!
//! Shared test infrastructure for the Atrium workspace:
//! - Proptest generators for versions, hostnames, tenants and blocks
//! - Fixtures for the common tenant and block registry scenarios
//! - Log capture for asserting on emitted `tracing` events

pub use atrium_core::{BlockFields, BlockInstance, SemVer, TenantRecord, TenantRef};
pub use atrium_storage::{InMemoryTenantStore, TenantCacheConfig, TenantResolutionCache};

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    /// Release versions (no pre-release or build metadata).
    pub fn arb_semver() -> impl Strategy<Value = SemVer> {
        (0u64..5, 0u64..10, 0u64..10).prop_map(|(major, minor, patch)| {
            SemVer::new(major, minor, patch)
        })
    }

    /// The `version` value as stored on a block: usually a valid string,
    /// sometimes absent, garbage text or not a string at all.
    pub fn arb_version_value() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            6 => arb_semver().prop_map(|v| Some(Value::String(v.to_string()))),
            1 => Just(None),
            1 => "[a-z]{1,6}".prop_map(|s| Some(Value::String(s))),
            1 => (0u32..5).prop_map(|n| Some(Value::from(n))),
        ]
    }

    /// A single DNS label.
    pub fn arb_domain_label() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,10}[a-z0-9]".prop_filter("www is a prefix, not a label", |l| l != "www")
    }

    /// A bare domain such as `clinic-3.test`.
    pub fn arb_bare_domain() -> impl Strategy<Value = String> {
        (arb_domain_label(), prop::sample::select(vec!["test", "com", "org", "dev"]))
            .prop_map(|(label, tld)| format!("{}.{}", label, tld))
    }

    /// A domain as an operator might type it: maybe `www.`, maybe mixed case.
    pub fn arb_typed_domain() -> impl Strategy<Value = String> {
        (arb_bare_domain(), any::<bool>(), any::<bool>()).prop_map(|(bare, www, upper)| {
            let domain = if www { format!("www.{}", bare) } else { bare };
            if upper {
                domain.to_ascii_uppercase()
            } else {
                domain
            }
        })
    }

    pub fn arb_port() -> impl Strategy<Value = Option<u16>> {
        prop::option::of(1u16..=65535)
    }

    pub fn arb_tenant_record() -> impl Strategy<Value = TenantRecord> {
        (arb_domain_label(), arb_bare_domain(), "[a-z0-9]{8}").prop_map(|(slug, domain, id)| {
            TenantRecord::new(slug.clone(), slug)
                .with_id(id)
                .with_domain(domain)
        })
    }

    fn arb_field_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(Value::from),
            "[a-zA-Z ]{0,16}".prop_map(Value::String),
        ]
    }

    pub fn arb_block_fields() -> impl Strategy<Value = BlockFields> {
        prop::collection::btree_map("[a-z]{1,8}", arb_field_value(), 0..5)
            .prop_map(|fields| fields.into_iter().collect())
    }

    /// A stored block of `block_type` with arbitrary fields and version.
    pub fn arb_block_instance(block_type: &'static str) -> impl Strategy<Value = BlockInstance> {
        (arb_version_value(), arb_block_fields()).prop_map(move |(version, fields)| {
            BlockInstance {
                block_type: block_type.to_string(),
                version,
                fields,
            }
        })
    }
}

// ============================================================================
// LOG CAPTURE
// ============================================================================

pub mod logs {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    /// In-memory sink for formatted log lines.
    ///
    /// ```ignore
    /// let capture = LogCapture::new();
    /// tracing::subscriber::with_default(capture.subscriber(), || work());
    /// assert!(capture.contains("WARN"));
    /// ```
    #[derive(Clone, Default)]
    pub struct LogCapture {
        buf: Arc<Mutex<Vec<u8>>>,
    }

    impl LogCapture {
        pub fn new() -> Self {
            Self::default()
        }

        /// Plain-text fmt subscriber writing every level into this capture.
        pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
            tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .with_max_level(Level::TRACE)
                .finish()
        }

        pub fn contents(&self) -> String {
            let buf = self.buf.lock().unwrap_or_else(|e| e.into_inner());
            String::from_utf8_lossy(&buf).into_owned()
        }

        pub fn contains(&self, needle: &str) -> bool {
            self.contents().contains(needle)
        }

        /// Lines holding every one of `needles`.
        pub fn lines_with(&self, needles: &[&str]) -> Vec<String> {
            self.contents()
                .lines()
                .filter(|line| needles.iter().all(|n| line.contains(n)))
                .map(str::to_string)
                .collect()
        }
    }

    impl io::Write for LogCapture {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            let mut buf = self.buf.lock().unwrap_or_else(|e| e.into_inner());
            buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use std::sync::Arc;

    use super::*;
    use atrium_blocks::{BlockDescriptor, BlockRegistry};
    use serde_json::Value;

    pub const CLINIC_ID: &str = "t1";
    pub const CLINIC_SLUG: &str = "clinic";
    pub const CLINIC_DOMAIN: &str = "clinic.test";

    /// `{domain: "clinic.test", slug: "clinic", id: "t1"}`
    pub fn clinic_tenant() -> TenantRecord {
        TenantRecord::new(CLINIC_SLUG, "Riverside Clinic")
            .with_id(CLINIC_ID)
            .with_domain(CLINIC_DOMAIN)
    }

    /// Second tenant, registered under its `www.` form.
    pub fn dental_tenant() -> TenantRecord {
        TenantRecord::new("dental", "Bright Dental")
            .with_id("t2")
            .with_domain("www.bright-dental.test")
    }

    /// A tenant without a custom domain; never appears in the host map.
    pub fn subpath_tenant() -> TenantRecord {
        TenantRecord::new("bakery", "Corner Bakery").with_id("t3")
    }

    pub fn tenant_store() -> Arc<InMemoryTenantStore> {
        match InMemoryTenantStore::from_records([clinic_tenant(), dental_tenant(), subpath_tenant()]) {
            Ok(store) => Arc::new(store),
            Err(err) => panic!("tenant fixtures do not conflict: {}", err),
        }
    }

    pub fn tenant_cache(store: Arc<InMemoryTenantStore>) -> TenantResolutionCache {
        TenantResolutionCache::new(store, TenantCacheConfig::new())
    }

    /// Appends `step` to the `trail` array.
    pub fn record_step(fields: &mut BlockFields, step: &str) {
        let trail = fields
            .entry("trail".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(steps) = trail {
            steps.push(Value::String(step.to_string()));
        }
    }

    /// `hero` at 2.0.0 with steps A (1.0.0->1.5.0) and B (1.5.0->2.0.0),
    /// each recording itself in `trail`.
    pub fn hero_descriptor() -> BlockDescriptor {
        let built = BlockDescriptor::builder("hero", "Hero", "2.0.0")
            .migration("1.0.0->1.5.0", |fields| {
                record_step(fields, "A");
                Ok(())
            })
            .migration("1.5.0->2.0.0", |fields| {
                record_step(fields, "B");
                Ok(())
            })
            .build();
        match built {
            Ok(descriptor) => descriptor,
            Err(err) => panic!("hero fixture is valid: {}", err),
        }
    }

    pub fn hero_registry() -> Arc<BlockRegistry> {
        match BlockRegistry::builder().register(hero_descriptor()).build() {
            Ok(registry) => Arc::new(registry),
            Err(err) => panic!("hero registry fixture is valid: {}", err),
        }
    }

    pub fn hero_block(version: &str) -> BlockInstance {
        BlockInstance::new("hero", version).with_field("heading", "Hi")
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::generators::*;
    use super::logs::LogCapture;
    use proptest::prelude::*;

    #[test]
    fn test_tenant_store_fixture() {
        let store = tenant_store();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_hero_registry_fixture() {
        let registry = hero_registry();
        assert!(registry.contains("hero"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_log_capture_records_level_and_message() {
        let capture = LogCapture::new();
        tracing::subscriber::with_default(capture.subscriber(), || {
            tracing::warn!(host = "clinic.test", "Something odd");
            tracing::debug!("Quiet detail");
        });
        assert_eq!(capture.lines_with(&["WARN", "Something odd", "clinic.test"]).len(), 1);
        assert!(capture.contains("Quiet detail"));
    }

    proptest! {
        #[test]
        fn prop_bare_domain_has_tld(domain in arb_bare_domain()) {
            prop_assert!(domain.contains('.'));
            prop_assert!(!domain.starts_with("www."));
        }
    }
}
