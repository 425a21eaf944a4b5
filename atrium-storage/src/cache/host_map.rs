//! Immutable hostname to tenant mapping.

use std::collections::HashMap;

use atrium_core::hostname::{domain_keys, normalize_host};
use atrium_core::{TenantRecord, TenantRef};
use tracing::warn;

/// One full snapshot of the hostname table.
///
/// Built from scratch on every refresh and never patched afterwards; the
/// cache swaps whole snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostMap {
    hosts: HashMap<String, TenantRef>,
}

impl HostMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from tenant records.
    ///
    /// Every record with a domain contributes two keys, the bare domain and
    /// its `www.` form. When two records claim the same key the first one in
    /// input order keeps it.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a TenantRecord>) -> Self {
        let mut hosts: HashMap<String, TenantRef> = HashMap::new();
        for record in records {
            let Some(keys) = record.domain.as_deref().and_then(domain_keys) else {
                continue;
            };
            let tenant = record.to_ref();
            for key in keys {
                match hosts.get(&key) {
                    Some(existing) if existing.id != tenant.id => {
                        warn!(
                            host = %key,
                            kept = %existing.slug,
                            dropped = %tenant.slug,
                            "Two tenants claim the same host; keeping the first"
                        );
                    }
                    Some(_) => {}
                    None => {
                        hosts.insert(key, tenant.clone());
                    }
                }
            }
        }
        Self { hosts }
    }

    /// Exact lookup after normalization.
    pub fn get(&self, host: &str) -> Option<&TenantRef> {
        self.hosts.get(&normalize_host(host))
    }

    pub fn contains(&self, host: &str) -> bool {
        self.get(host).is_some()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn hosts(&self) -> impl Iterator<Item = (&str, &TenantRef)> {
        self.hosts.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_keys_per_domain() {
        let record = TenantRecord::new("clinic", "Clinic")
            .with_id("t1")
            .with_domain("clinic.test");
        let map = HostMap::from_records([&record]);

        assert_eq!(map.len(), 2);
        let expected = TenantRef::new("clinic", "t1");
        assert_eq!(map.get("clinic.test"), Some(&expected));
        assert_eq!(map.get("www.clinic.test"), Some(&expected));
    }

    #[test]
    fn test_www_entered_domain_registers_bare_form() {
        let record = TenantRecord::new("studio", "Studio")
            .with_id("t2")
            .with_domain("www.studio.test");
        let map = HostMap::from_records([&record]);
        assert!(map.contains("studio.test"));
        assert!(map.contains("www.studio.test"));
        assert!(!map.contains("www.www.studio.test"));
    }

    #[test]
    fn test_first_claim_wins() {
        let first = TenantRecord::new("a", "A").with_id("t1").with_domain("shared.test");
        let second = TenantRecord::new("b", "B").with_id("t2").with_domain("www.shared.test");
        let map = HostMap::from_records([&first, &second]);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("www.shared.test").map(|t| t.slug.as_str()), Some("a"));
    }

    #[test]
    fn test_domainless_records_ignored() {
        let record = TenantRecord::new("plain", "Plain").with_id("t3");
        assert!(HostMap::from_records([&record]).is_empty());
    }
}
