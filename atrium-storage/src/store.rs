//! Tenant store abstraction.
//!
//! The document database that owns tenant records sits behind
//! [`TenantStore`]. The resolution cache only ever calls
//! [`TenantStore::list_domain_tenants`]; the other operations serve
//! provisioning and the edge API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use atrium_core::{AtriumResult, StoreError, TenantRecord};
use chrono::Utc;

/// Async access to tenant records.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// All tenants that declare a non-empty domain.
    async fn list_domain_tenants(&self) -> AtriumResult<Vec<TenantRecord>>;

    /// Look a tenant up by slug.
    async fn get_by_slug(&self, slug: &str) -> AtriumResult<Option<TenantRecord>>;

    /// Create or update a tenant.
    ///
    /// Fails with [`StoreError::DomainConflict`] if another tenant already
    /// claims the same bare domain, and with [`StoreError::SlugConflict`] if
    /// another tenant uses the slug.
    async fn upsert(&self, record: TenantRecord) -> AtriumResult<TenantRecord>;
}

/// In-memory tenant store for tests and single-node development.
///
/// Carries a failure switch and a query counter so callers can simulate an
/// unreachable backend and observe refresh traffic.
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    tenants: RwLock<HashMap<String, TenantRecord>>,
    unavailable: AtomicBool,
    list_queries: AtomicUsize,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records, enforcing the same invariants
    /// as [`TenantStore::upsert`].
    pub fn from_records(records: impl IntoIterator<Item = TenantRecord>) -> AtriumResult<Self> {
        let store = Self::new();
        for record in records {
            store.upsert_sync(record)?;
        }
        Ok(store)
    }

    /// Make every subsequent query fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `list_domain_tenants` calls seen so far, failed ones included.
    pub fn list_query_count(&self) -> usize {
        self.list_queries.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.tenants.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> AtriumResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "in-memory store switched off".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn upsert_sync(&self, mut record: TenantRecord) -> AtriumResult<TenantRecord> {
        let mut tenants = self.tenants.write().map_err(|_| StoreError::LockPoisoned)?;

        if let Some(existing) = tenants
            .values()
            .find(|t| t.id != record.id && t.slug == record.slug)
        {
            return Err(StoreError::SlugConflict {
                slug: record.slug.clone(),
                existing_id: existing.id.clone(),
            }
            .into());
        }

        if let Some(domain) = record.bare_domain() {
            if let Some(existing) = tenants
                .values()
                .find(|t| t.id != record.id && t.bare_domain().as_deref() == Some(domain.as_str()))
            {
                return Err(StoreError::DomainConflict {
                    domain,
                    existing_id: existing.id.clone(),
                }
                .into());
            }
        }

        if let Some(existing) = tenants.get(&record.id) {
            record.created_at = existing.created_at;
            record.updated_at = Utc::now();
        }
        tenants.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn list_domain_tenants(&self) -> AtriumResult<Vec<TenantRecord>> {
        self.list_queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let tenants = self.tenants.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut records: Vec<TenantRecord> =
            tenants.values().filter(|t| t.has_domain()).cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn get_by_slug(&self, slug: &str) -> AtriumResult<Option<TenantRecord>> {
        self.check_available()?;
        let tenants = self.tenants.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tenants.values().find(|t| t.slug == slug).cloned())
    }

    async fn upsert(&self, record: TenantRecord) -> AtriumResult<TenantRecord> {
        self.check_available()?;
        self.upsert_sync(record)
    }
}
