//! Behavioral tests for the tenant resolution cache.
//!
//! Covers the staleness bound, domain-pair symmetry and stale-but-available
//! behavior against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use atrium_core::{TenantRecord, TenantRef};
use atrium_storage::{InMemoryTenantStore, TenantCacheConfig, TenantResolutionCache, TenantStore};
use atrium_test_utils::fixtures::{clinic_tenant as clinic, tenant_cache, tenant_store};
use atrium_test_utils::generators::{
    arb_bare_domain, arb_port, arb_tenant_record, arb_typed_domain,
};
use atrium_test_utils::logs::LogCapture;
use proptest::prelude::*;

const TTL: Duration = Duration::from_secs(300);
const EPSILON: Duration = Duration::from_millis(10);

fn store_with(records: Vec<TenantRecord>) -> Arc<InMemoryTenantStore> {
    Arc::new(InMemoryTenantStore::from_records(records).expect("fixture tenants are consistent"))
}

#[tokio::test(start_paused = true)]
async fn no_query_before_ttl_expires() {
    let store = store_with(vec![clinic()]);
    let cache = TenantResolutionCache::new(store.clone(), TenantCacheConfig::new().with_ttl(TTL));

    assert!(cache.resolve_fresh("clinic.test").await.is_some());
    assert_eq!(store.list_query_count(), 1);

    tokio::time::advance(TTL - EPSILON).await;
    assert!(cache.resolve_fresh("clinic.test").await.is_some());
    assert_eq!(store.list_query_count(), 1, "fresh mapping must not hit the store");
}

#[tokio::test(start_paused = true)]
async fn query_after_ttl_expires() {
    let store = store_with(vec![clinic()]);
    let cache = TenantResolutionCache::new(store.clone(), TenantCacheConfig::new().with_ttl(TTL));

    cache.resolve_fresh("clinic.test").await;
    tokio::time::advance(TTL + EPSILON).await;
    cache.resolve_fresh("clinic.test").await;

    assert_eq!(store.list_query_count(), 2);
    assert!(!cache.is_refresh_due());
}

#[tokio::test(start_paused = true)]
async fn refresh_picks_up_new_domains() {
    let store = store_with(vec![clinic()]);
    let cache = TenantResolutionCache::new(store.clone(), TenantCacheConfig::new().with_ttl(TTL));

    cache.resolve_fresh("clinic.test").await;
    store
        .upsert(
            TenantRecord::new("studio", "Studio")
                .with_id("t2")
                .with_domain("www.studio.test"),
        )
        .await
        .expect("no conflict");

    assert_eq!(cache.resolve_fresh("studio.test").await, None);

    tokio::time::advance(TTL + EPSILON).await;
    assert_eq!(
        cache.resolve_fresh("studio.test").await,
        Some(TenantRef::new("studio", "t2"))
    );
}

#[tokio::test]
async fn domain_pair_symmetry_with_port() {
    let cache = TenantResolutionCache::with_defaults(store_with(vec![clinic()]));
    cache.refresh().await.expect("refresh");

    let bare = cache.resolve("example.test");
    assert_eq!(bare, None);

    let expected = Some(TenantRef::new("clinic", "t1"));
    assert_eq!(cache.resolve("clinic.test"), expected);
    assert_eq!(cache.resolve("www.clinic.test"), expected);
    assert_eq!(cache.resolve("clinic.test:3000"), expected);
}

#[tokio::test]
async fn cold_start_with_unavailable_store_resolves_nothing() {
    let store = store_with(vec![clinic()]);
    store.set_unavailable(true);
    let cache = TenantResolutionCache::with_defaults(store.clone());

    assert_eq!(cache.resolve_fresh("clinic.test").await, None);
    assert!(cache.is_empty());

    store.set_unavailable(false);
    assert!(cache.resolve_fresh("clinic.test").await.is_some());
}

#[tokio::test]
async fn failed_refresh_logs_a_warning_and_keeps_mapping() {
    let store = tenant_store();
    let cache = tenant_cache(store.clone());
    cache.refresh().await.expect("initial refresh");

    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(capture.subscriber());
    store.set_unavailable(true);
    assert!(cache.refresh().await.is_none());

    let lines = capture.lines_with(&["WARN", "Tenant cache refresh failed"]);
    assert_eq!(lines.len(), 1, "captured: {}", capture.contents());
    assert_eq!(cache.resolve("clinic.test"), Some(TenantRef::new("clinic", "t1")));
}

#[tokio::test]
async fn overlapping_refreshes_are_benign() {
    let store = store_with(vec![clinic()]);
    let cache = Arc::new(TenantResolutionCache::with_defaults(store.clone()));

    let (a, b) = tokio::join!(cache.refresh(), cache.refresh());
    assert_eq!(a, b);
    assert_eq!(cache.len(), 2);
    assert_eq!(store.list_query_count(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: Every domain-bearing tenant resolves through both forms of
    /// its domain, with or without a port.
    #[test]
    fn prop_domain_pair_symmetry(
        records in proptest::collection::vec(arb_tenant_record(), 1..8),
        www in any::<bool>(),
        port in arb_port(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| TestCaseError::fail(format!("runtime: {}", e)))?;

        // One tenant per bare domain, slugs and ids kept distinct.
        let mut seen = std::collections::BTreeSet::new();
        let records: Vec<TenantRecord> = records
            .into_iter()
            .filter(|r| r.domain.as_deref().is_some_and(|d| seen.insert(d.to_string())))
            .enumerate()
            .map(|(i, r)| {
                let bare = r.domain.clone().unwrap_or_default();
                let domain = if www { format!("www.{}", bare) } else { bare };
                TenantRecord::new(format!("s{}", i), r.name)
                    .with_id(format!("t{}", i))
                    .with_domain(domain)
            })
            .collect();
        let bare_domains: Vec<String> = seen.into_iter().collect();
        let cache = TenantResolutionCache::with_defaults(store_with(records.clone()));
        runtime.block_on(cache.refresh());

        prop_assert_eq!(cache.len(), records.len() * 2);
        for record in &records {
            let domain = record.domain.clone().unwrap_or_default();
            let bare = domain.strip_prefix("www.").unwrap_or(&domain).to_string();
            prop_assert!(bare_domains.contains(&bare));
            let expected = Some(record.to_ref());
            prop_assert_eq!(cache.resolve(&bare), expected.clone());
            prop_assert_eq!(cache.resolve(&format!("www.{}", bare)), expected.clone());
            let with_port = match port {
                Some(port) => format!("{}:{}", bare, port),
                None => bare.clone(),
            };
            prop_assert_eq!(cache.resolve(&with_port), expected);
        }
    }

    /// Property: Host lookups ignore case and the `www.` prefix the operator
    /// typed when registering the domain.
    #[test]
    fn prop_typed_domain_resolves_lowercase(
        typed in arb_typed_domain(),
        other_domain in arb_bare_domain(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| TestCaseError::fail(format!("runtime: {}", e)))?;

        let lower = typed.to_ascii_lowercase();
        let bare = lower.strip_prefix("www.").unwrap_or(&lower).to_string();
        let record = TenantRecord::new("typed", "Typed").with_id("t9").with_domain(typed);
        let cache = TenantResolutionCache::with_defaults(store_with(vec![record.clone()]));
        runtime.block_on(cache.refresh());

        prop_assert_eq!(cache.resolve(&bare), Some(record.to_ref()));
        prop_assert_eq!(cache.resolve(&format!("www.{}", bare)), Some(record.to_ref()));
        if other_domain != bare {
            prop_assert_eq!(cache.resolve(&other_domain), None);
        }
    }
}
