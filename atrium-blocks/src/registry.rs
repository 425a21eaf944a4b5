//! Block registry: one descriptor per block type, built once at startup.
//!
//! The registry is immutable after [`BlockRegistryBuilder::build`] and is
//! shared by `Arc` with whatever renders or migrates blocks.

use std::collections::BTreeMap;

use atrium_core::{BlockFields, BlockInstance, MigrationError, SemVer};

use crate::graph::{migration_fn, MigrationGraph, MigrationKey};

/// Static description of one block type.
#[derive(Debug, Clone)]
pub struct BlockDescriptor {
    pub block_type: String,
    pub label: String,
    pub current_version: SemVer,
    /// Every schema version this block type has had, ascending, ending at
    /// `current_version`.
    pub version_history: Vec<SemVer>,
    pub migrations: MigrationGraph,
}

impl BlockDescriptor {
    pub fn builder(
        block_type: impl Into<String>,
        label: impl Into<String>,
        current_version: &str,
    ) -> BlockDescriptorBuilder {
        let block_type = block_type.into();
        let mut builder = BlockDescriptorBuilder {
            migrations: MigrationGraph::for_block_type(block_type.clone()),
            block_type,
            label: label.into(),
            current_version: SemVer::ZERO,
            history: Vec::new(),
            error: None,
        };
        match current_version.parse() {
            Ok(version) => builder.current_version = version,
            Err(err) => builder.error = Some(invalid_version(current_version, err)),
        }
        builder
    }
}

fn invalid_version(input: &str, err: impl std::fmt::Display) -> MigrationError {
    MigrationError::InvalidKey {
        key: input.to_string(),
        reason: err.to_string(),
    }
}

/// Builder for [`BlockDescriptor`]. The first error encountered is kept and
/// reported by [`build`](Self::build).
pub struct BlockDescriptorBuilder {
    block_type: String,
    label: String,
    current_version: SemVer,
    history: Vec<SemVer>,
    migrations: MigrationGraph,
    error: Option<MigrationError>,
}

impl BlockDescriptorBuilder {
    /// Declare past versions.
    pub fn history(mut self, versions: &[&str]) -> Self {
        for raw in versions {
            match raw.parse() {
                Ok(version) => self.history.push(version),
                Err(err) => {
                    self.error.get_or_insert_with(|| invalid_version(raw, err));
                }
            }
        }
        self
    }

    /// Register a migration under a `"<from>-><to>"` key.
    pub fn migration<F>(mut self, key: &str, migrate: F) -> Self
    where
        F: Fn(&mut BlockFields) -> Result<(), MigrationError> + Send + Sync + 'static,
    {
        if self.error.is_some() {
            return self;
        }
        let result = key
            .parse::<MigrationKey>()
            .and_then(|key| self.migrations.add(key, migration_fn(migrate)));
        if let Err(err) = result {
            self.error = Some(err);
        }
        self
    }

    pub fn build(self) -> Result<BlockDescriptor, MigrationError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let beyond_current = |version: &SemVer| MigrationError::BeyondCurrent {
            block_type: self.block_type.clone(),
            version: version.to_string(),
            current: self.current_version.to_string(),
        };

        if let Some(target) = self.migrations.max_target() {
            if *target > self.current_version {
                return Err(beyond_current(target));
            }
        }

        let mut history = self.history.clone();
        history.extend(self.migrations.keys().into_iter().flat_map(|k| [k.from, k.to]));
        history.push(self.current_version.clone());
        history.sort();
        history.dedup();
        if let Some(newest) = history.last() {
            if *newest > self.current_version {
                return Err(beyond_current(newest));
            }
        }

        Ok(BlockDescriptor {
            block_type: self.block_type,
            label: self.label,
            current_version: self.current_version,
            version_history: history,
            migrations: self.migrations,
        })
    }
}

/// Catalog of all known block types.
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    blocks: BTreeMap<String, BlockDescriptor>,
}

impl BlockRegistry {
    pub fn builder() -> BlockRegistryBuilder {
        BlockRegistryBuilder::default()
    }

    pub fn get(&self, block_type: &str) -> Option<&BlockDescriptor> {
        self.blocks.get(block_type)
    }

    pub fn contains(&self, block_type: &str) -> bool {
        self.blocks.contains_key(block_type)
    }

    /// Registered block types, sorted.
    pub fn block_types(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &BlockDescriptor> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Cheap structural check: the block type is registered and the version
    /// is present and valid semver. Field shapes are not checked.
    pub fn validate_block(&self, instance: &BlockInstance) -> bool {
        self.contains(&instance.block_type) && instance.parsed_version().is_some()
    }
}

/// Collects descriptors; duplicates are reported by [`build`](Self::build).
#[derive(Default)]
pub struct BlockRegistryBuilder {
    descriptors: Vec<BlockDescriptor>,
}

impl BlockRegistryBuilder {
    pub fn register(mut self, descriptor: BlockDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn build(self) -> Result<BlockRegistry, MigrationError> {
        let mut blocks = BTreeMap::new();
        for descriptor in self.descriptors {
            if blocks.contains_key(&descriptor.block_type) {
                return Err(MigrationError::DuplicateBlockType {
                    block_type: descriptor.block_type,
                });
            }
            blocks.insert(descriptor.block_type.clone(), descriptor);
        }
        Ok(BlockRegistry { blocks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemVer {
        s.parse().unwrap()
    }

    #[test]
    fn test_descriptor_history_includes_migration_endpoints() {
        let descriptor = BlockDescriptor::builder("hero", "Hero", "2.0.0")
            .migration("1.0.0->1.5.0", |_| Ok(()))
            .migration("1.5.0->2.0.0", |_| Ok(()))
            .build()
            .unwrap();

        assert_eq!(
            descriptor.version_history,
            vec![v("1.0.0"), v("1.5.0"), v("2.0.0")]
        );
        assert_eq!(descriptor.migrations.len(), 2);
    }

    #[test]
    fn test_descriptor_rejects_migration_past_current() {
        let err = BlockDescriptor::builder("hero", "Hero", "1.5.0")
            .migration("1.5.0->2.0.0", |_| Ok(()))
            .build()
            .unwrap_err();
        assert!(matches!(err, MigrationError::BeyondCurrent { .. }));
    }

    #[test]
    fn test_descriptor_rejects_history_past_current() {
        let err = BlockDescriptor::builder("faq", "FAQ", "1.0.0")
            .history(&["0.9.0", "1.1.0"])
            .build()
            .unwrap_err();
        assert!(matches!(err, MigrationError::BeyondCurrent { .. }));
    }

    #[test]
    fn test_descriptor_reports_bad_key_and_current() {
        let err = BlockDescriptor::builder("faq", "FAQ", "1.0.0")
            .migration("1.0.0=>1.1.0", |_| Ok(()))
            .build()
            .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidKey { .. }));

        let err = BlockDescriptor::builder("faq", "FAQ", "latest")
            .build()
            .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidKey { .. }));
    }

    #[test]
    fn test_descriptor_duplicate_migration_names_block_type() {
        let err = BlockDescriptor::builder("faq", "FAQ", "2.0.0")
            .migration("1.0.0->2.0.0", |_| Ok(()))
            .migration("1.0.0->2.0.0", |_| Ok(()))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            MigrationError::DuplicateMigration {
                block_type: "faq".to_string(),
                key: "1.0.0->2.0.0".to_string(),
            }
        );
    }

    #[test]
    fn test_registry_rejects_duplicate_block_type() {
        let faq = || BlockDescriptor::builder("faq", "FAQ", "1.0.0").build().unwrap();
        let err = BlockRegistry::builder()
            .register(faq())
            .register(faq())
            .build()
            .unwrap_err();
        assert!(matches!(err, MigrationError::DuplicateBlockType { .. }));
    }

    #[test]
    fn test_validate_block() {
        let registry = BlockRegistry::builder()
            .register(BlockDescriptor::builder("faq", "FAQ", "1.0.0").build().unwrap())
            .build()
            .unwrap();

        assert!(registry.validate_block(&BlockInstance::new("faq", "1.0.0")));
        assert!(registry.validate_block(&BlockInstance::new("faq", "0.1.0-beta")));
        assert!(!registry.validate_block(&BlockInstance::new("faq", "1.0")));
        assert!(!registry.validate_block(&BlockInstance::new("hero", "1.0.0")));

        let mut unversioned = BlockInstance::new("faq", "1.0.0");
        unversioned.version = None;
        assert!(!registry.validate_block(&unversioned));
    }
}
