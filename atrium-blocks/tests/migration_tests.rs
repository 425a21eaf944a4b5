//! Migration engine behavior against a small hero registry and the built-in
//! catalog.

use std::sync::Arc;

use atrium_blocks::{
    default_registry, BlockDescriptor, BlockMigrator, BlockRegistry, MigrationOutcome,
};
use atrium_core::{BlockInstance, MigrationError, SemVer};
use atrium_test_utils::fixtures::{hero_block as hero, hero_registry, record_step};
use atrium_test_utils::generators::{arb_block_fields, arb_block_instance, arb_semver};
use atrium_test_utils::logs::LogCapture;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn hero_from_1_0_0_applies_a_then_b() {
    let out = BlockMigrator::new(hero_registry()).migrate(&hero("1.0.0"));

    assert_eq!(out.version_str(), Some("2.0.0"));
    assert_eq!(out.field("trail"), Some(&json!(["A", "B"])));
    assert_eq!(out.field("heading"), Some(&json!("Hi")));
}

#[test]
fn hero_from_1_5_0_applies_only_b() {
    let out = BlockMigrator::new(hero_registry()).migrate(&hero("1.5.0"));

    assert_eq!(out.version_str(), Some("2.0.0"));
    assert_eq!(out.field("trail"), Some(&json!(["B"])));
}

#[test]
fn hero_at_or_beyond_current_is_unchanged() {
    let migrator = BlockMigrator::new(hero_registry());
    for version in ["2.0.0", "2.1.0"] {
        let input = hero(version);
        let (out, outcome) = migrator.migrate_with_outcome(&input);
        assert_eq!(out, input);
        assert_eq!(outcome, MigrationOutcome::UpToDate);
    }
}

#[test]
fn unknown_type_passes_through() {
    let input = BlockInstance::new("video-embed", "3.0.0").with_field("url", "https://v.test/1");
    let out = BlockMigrator::new(hero_registry()).migrate(&input);
    assert_eq!(out, input);
}

#[test]
fn unknown_type_logs_a_warning() {
    let capture = LogCapture::new();
    let migrator = BlockMigrator::new(hero_registry());
    let input = BlockInstance::new("video-embed", "3.0.0");

    let out = tracing::subscriber::with_default(capture.subscriber(), || migrator.migrate(&input));

    assert_eq!(out, input);
    let lines = capture.lines_with(&["WARN", "Unknown block type", "video-embed"]);
    assert_eq!(lines.len(), 1, "captured: {}", capture.contents());
}

#[test]
fn missing_or_malformed_version_logs_a_warning() {
    let capture = LogCapture::new();
    let migrator = BlockMigrator::new(hero_registry());
    let mut unversioned = hero("1.0.0");
    unversioned.version = None;
    let mut numeric = hero("1.0.0");
    numeric.version = Some(json!(1));

    tracing::subscriber::with_default(capture.subscriber(), || {
        migrator.migrate(&unversioned);
        migrator.migrate(&numeric);
        migrator.migrate(&hero("1.0.0"));
    });

    let lines = capture.lines_with(&["WARN", "Missing or malformed block version"]);
    assert_eq!(lines.len(), 2, "captured: {}", capture.contents());
}

fn registry_with_failing_step(panics: bool) -> Arc<BlockRegistry> {
    let hero = BlockDescriptor::builder("hero", "Hero", "2.0.0")
        .migration("1.0.0->1.5.0", |fields| {
            fields.insert("heading".to_string(), json!("mutated"));
            record_step(fields, "A");
            Ok(())
        })
        .migration("1.5.0->2.0.0", move |fields| {
            fields.clear();
            if panics {
                panic!("step B blew up");
            }
            Err(MigrationError::transform("step B cannot reshape"))
        })
        .build()
        .expect("hero descriptor");
    Arc::new(BlockRegistry::builder().register(hero).build().expect("registry"))
}

#[test]
fn failing_step_returns_original() {
    let input = hero("1.0.0");
    let (out, outcome) = BlockMigrator::new(registry_with_failing_step(false))
        .migrate_with_outcome(&input);

    assert_eq!(out, input);
    assert_eq!(
        serde_json::to_vec(&out).unwrap(),
        serde_json::to_vec(&input).unwrap()
    );
    match outcome {
        MigrationOutcome::Failed { error } => {
            assert!(error.contains("1.5.0->2.0.0"));
            assert!(error.contains("cannot reshape"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn panicking_step_returns_original() {
    let input = hero("1.0.0");
    let (out, outcome) = BlockMigrator::new(registry_with_failing_step(true))
        .migrate_with_outcome(&input);

    assert_eq!(out, input);
    assert!(outcome.is_failed());
}

#[test]
fn catalog_page_migrates_blockwise() {
    let migrator = BlockMigrator::new(Arc::new(default_registry().expect("catalog")));
    let page = vec![
        BlockInstance::new("hero", "1.0.0").with_field("title", "Riverside Clinic"),
        BlockInstance::new("faq", "1.0.0").with_field("questions", "broken"),
        BlockInstance::new("newsletter", "1.0.0"),
    ];

    let out = migrator.migrate_all(&page);
    assert_eq!(out[0].field("heading"), Some(&json!("Riverside Clinic")));
    assert_eq!(out[1], page[1]);
    assert_eq!(out[2], page[2]);
}

fn block_instance() -> impl Strategy<Value = BlockInstance> {
    prop::sample::select(vec![
        "hero",
        "faq",
        "testimonials",
        "services-grid",
        "team-grid",
        "call-to-action",
        "unknown",
    ])
    .prop_flat_map(arb_block_instance)
}

proptest! {
    /// Property: Migrating twice gives the same result as migrating once.
    #[test]
    fn prop_migrate_is_idempotent(instance in block_instance()) {
        let migrator = BlockMigrator::new(Arc::new(default_registry().unwrap()));
        let once = migrator.migrate(&instance);
        let twice = migrator.migrate(&once);
        prop_assert_eq!(twice, once);
    }

    /// Property: A failing chain never alters the input.
    #[test]
    fn prop_failure_never_corrupts(
        fields in arb_block_fields(),
        panics in any::<bool>(),
    ) {
        let mut input = BlockInstance::new("hero", "1.0.0");
        input.fields = fields;
        let out = BlockMigrator::new(registry_with_failing_step(panics)).migrate(&input);
        prop_assert_eq!(out, input);
    }

    /// Property: Below the current version a hero always lands on 2.0.0;
    /// at or above it the instance is returned as is.
    #[test]
    fn prop_hero_lands_on_current(version in arb_semver()) {
        let input = hero(&version.to_string());
        let (out, outcome) = BlockMigrator::new(hero_registry()).migrate_with_outcome(&input);
        if version >= SemVer::new(2, 0, 0) {
            prop_assert_eq!(outcome, MigrationOutcome::UpToDate);
            prop_assert_eq!(out, input);
        } else {
            prop_assert!(matches!(outcome, MigrationOutcome::Migrated { .. }), "expected Migrated, got {:?}", outcome);
            prop_assert_eq!(out.version_str(), Some("2.0.0"));
            prop_assert_eq!(out.field("heading"), Some(&json!("Hi")));
        }
    }
}
