//! Lazy, read-time block migration.
//!
//! Stored blocks are never rewritten in place. Every read runs the instance
//! through [`BlockMigrator::migrate`], which brings it up to the current
//! schema of its block type or hands back the original untouched.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use atrium_core::{BlockInstance, MigrationError, SemVer};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::graph::{MigrationKey, MigrationPlan, MissingLinkPolicy};
use crate::registry::BlockRegistry;

/// What happened to one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// Block type not registered; passed through.
    UnknownType,
    /// Already at or beyond the current version.
    UpToDate,
    Migrated {
        from: String,
        to: String,
        applied: Vec<String>,
        skipped: Vec<String>,
    },
    /// A step failed; the original instance was returned.
    Failed { error: String },
}

impl MigrationOutcome {
    /// Short label, used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationOutcome::UnknownType => "unknown_type",
            MigrationOutcome::UpToDate => "up_to_date",
            MigrationOutcome::Migrated { .. } => "migrated",
            MigrationOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MigrationOutcome::Failed { .. })
    }
}

fn key_strings(keys: &[MigrationKey]) -> Vec<String> {
    keys.iter().map(ToString::to_string).collect()
}

/// Applies registered migrations to stored block instances.
#[derive(Debug, Clone)]
pub struct BlockMigrator {
    registry: Arc<BlockRegistry>,
    policy: MissingLinkPolicy,
}

impl BlockMigrator {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self {
            registry,
            policy: MissingLinkPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MissingLinkPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> MissingLinkPolicy {
        self.policy
    }

    /// Bring an instance up to the current version of its block type.
    ///
    /// Never fails: on any error the input is returned unchanged.
    pub fn migrate(&self, instance: &BlockInstance) -> BlockInstance {
        self.migrate_with_outcome(instance).0
    }

    /// Like [`migrate`](Self::migrate), also reporting what happened.
    pub fn migrate_with_outcome(
        &self,
        instance: &BlockInstance,
    ) -> (BlockInstance, MigrationOutcome) {
        let Some(descriptor) = self.registry.get(&instance.block_type) else {
            warn!(block_type = %instance.block_type, "Unknown block type, passing through");
            return (instance.clone(), MigrationOutcome::UnknownType);
        };

        let from = match instance.parsed_version() {
            Some(version) => version,
            None => {
                warn!(
                    block_type = %instance.block_type,
                    version = ?instance.version,
                    "Missing or malformed block version, migrating from 0.0.0"
                );
                SemVer::ZERO
            }
        };
        let current = &descriptor.current_version;
        if from >= *current {
            return (instance.clone(), MigrationOutcome::UpToDate);
        }

        let plan = match descriptor.migrations.plan(&from, current, self.policy) {
            Ok(plan) => plan,
            Err(err) => return self.fail(instance, err),
        };
        for key in &plan.skipped {
            warn!(
                block_type = %instance.block_type,
                link = %key,
                "No migration registered for link, skipping"
            );
        }

        match apply(instance, &plan) {
            Ok(mut migrated) => {
                migrated.version = Some(Value::String(current.to_string()));
                debug!(
                    block_type = %instance.block_type,
                    from = %from,
                    to = %current,
                    steps = plan.steps.len(),
                    "Block migrated"
                );
                let outcome = MigrationOutcome::Migrated {
                    from: from.to_string(),
                    to: current.to_string(),
                    applied: key_strings(&plan.step_keys()),
                    skipped: key_strings(&plan.skipped),
                };
                (migrated, outcome)
            }
            Err(err) => self.fail(instance, err),
        }
    }

    fn fail(
        &self,
        instance: &BlockInstance,
        err: MigrationError,
    ) -> (BlockInstance, MigrationOutcome) {
        error!(
            block_type = %instance.block_type,
            version = ?instance.version,
            error = %err,
            "Block migration failed, serving stored instance"
        );
        (
            instance.clone(),
            MigrationOutcome::Failed {
                error: err.to_string(),
            },
        )
    }

    /// Migrate every block of a page, preserving order.
    pub fn migrate_all(&self, instances: &[BlockInstance]) -> Vec<BlockInstance> {
        instances.iter().map(|i| self.migrate(i)).collect()
    }

    pub fn validate_block(&self, instance: &BlockInstance) -> bool {
        self.registry.validate_block(instance)
    }
}

/// Run the plan against a copy of the fields. The original is never touched.
fn apply(instance: &BlockInstance, plan: &MigrationPlan) -> Result<BlockInstance, MigrationError> {
    let mut working = instance.clone();
    for step in &plan.steps {
        let key = step.key.to_string();
        let fields = &mut working.fields;
        match catch_unwind(AssertUnwindSafe(|| (step.migrate)(fields))) {
            Ok(Ok(())) => {}
            Ok(Err(MigrationError::Transform { reason })) => {
                return Err(MigrationError::step_failed(key, reason))
            }
            Ok(Err(other)) => return Err(MigrationError::step_failed(key, other.to_string())),
            Err(_) => return Err(MigrationError::StepPanicked { key }),
        }
    }
    Ok(working)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BlockDescriptor;
    use serde_json::json;

    fn hero_registry() -> Arc<BlockRegistry> {
        let hero = BlockDescriptor::builder("hero", "Hero", "2.0.0")
            .migration("1.0.0->1.5.0", |fields| {
                fields.insert("a".to_string(), Value::Bool(true));
                Ok(())
            })
            .migration("1.5.0->2.0.0", |fields| {
                fields.insert("b".to_string(), Value::Bool(true));
                Ok(())
            })
            .build()
            .unwrap();
        Arc::new(BlockRegistry::builder().register(hero).build().unwrap())
    }

    #[test]
    fn test_migrates_full_chain() {
        let migrator = BlockMigrator::new(hero_registry());
        let (out, outcome) = migrator.migrate_with_outcome(&BlockInstance::new("hero", "1.0.0"));

        assert_eq!(out.version_str(), Some("2.0.0"));
        assert_eq!(out.field("a"), Some(&json!(true)));
        assert_eq!(out.field("b"), Some(&json!(true)));
        assert_eq!(
            outcome,
            MigrationOutcome::Migrated {
                from: "1.0.0".to_string(),
                to: "2.0.0".to_string(),
                applied: vec!["1.0.0->1.5.0".to_string(), "1.5.0->2.0.0".to_string()],
                skipped: vec![],
            }
        );
    }

    #[test]
    fn test_missing_version_migrates_from_zero() {
        let migrator = BlockMigrator::new(hero_registry());
        let mut instance = BlockInstance::new("hero", "x");
        instance.version = None;

        let (out, outcome) = migrator.migrate_with_outcome(&instance);
        assert_eq!(out.version_str(), Some("2.0.0"));
        // 0.0.0 -> 1.0.0 has no edge and is skipped.
        match outcome {
            MigrationOutcome::Migrated { skipped, .. } => {
                assert_eq!(skipped, vec!["0.0.0->1.0.0".to_string()])
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_numeric_version_migrates_from_zero() {
        let migrator = BlockMigrator::new(hero_registry());
        let mut instance = BlockInstance::new("hero", "x");
        instance.version = Some(json!(2));

        let (out, outcome) = migrator.migrate_with_outcome(&instance);
        assert_eq!(out.version, Some(json!("2.0.0")));
        assert!(matches!(outcome, MigrationOutcome::Migrated { ref from, .. } if from == "0.0.0"));
    }

    #[test]
    fn test_fail_policy_keeps_original() {
        let migrator = BlockMigrator::new(hero_registry()).with_policy(MissingLinkPolicy::Fail);
        let instance = BlockInstance::new("hero", "1.2.0").with_field("heading", "Hi");

        let (out, outcome) = migrator.migrate_with_outcome(&instance);
        assert_eq!(out, instance);
        assert!(outcome.is_failed());
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let migrator = BlockMigrator::new(hero_registry());
        let instance = BlockInstance::new("carousel", "0.1.0").with_field("slides", json!([]));

        let (out, outcome) = migrator.migrate_with_outcome(&instance);
        assert_eq!(out, instance);
        assert_eq!(outcome, MigrationOutcome::UnknownType);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let value = serde_json::to_value(MigrationOutcome::UpToDate).unwrap();
        assert_eq!(value, json!({ "status": "up_to_date" }));
        assert_eq!(MigrationOutcome::UpToDate.as_str(), "up_to_date");
    }

    #[test]
    fn test_migrate_all_preserves_order() {
        let migrator = BlockMigrator::new(hero_registry());
        let page = vec![
            BlockInstance::new("hero", "1.0.0"),
            BlockInstance::new("faq", "1.0.0"),
            BlockInstance::new("hero", "2.0.0"),
        ];
        let out = migrator.migrate_all(&page);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].version_str(), Some("2.0.0"));
        assert_eq!(out[1], page[1]);
        assert_eq!(out[2], page[2]);
    }
}
