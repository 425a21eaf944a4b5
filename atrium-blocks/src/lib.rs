//! Atrium Blocks - Versioned Block Registry and Migration
//!
//! Each block type declares its current schema version and the migrations
//! between past versions. Stored instances are upgraded lazily on read by
//! [`BlockMigrator`]; nothing is rewritten in storage.

pub mod catalog;
pub mod engine;
pub mod graph;
pub mod registry;

pub use catalog::default_registry;
pub use engine::{BlockMigrator, MigrationOutcome};
pub use graph::{
    migration_fn, MigrationFn, MigrationGraph, MigrationKey, MigrationPlan, MissingLinkPolicy,
    PlannedStep, KEY_SEPARATOR,
};
pub use registry::{BlockDescriptor, BlockDescriptorBuilder, BlockRegistry, BlockRegistryBuilder};
