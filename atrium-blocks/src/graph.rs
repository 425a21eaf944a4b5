//! Migration graph for one block type.
//!
//! Nodes are schema versions, edges are migration functions. Planning walks
//! forward from the stored version to the current one, always stepping to the
//! nearest registered `from` version (or the target) above the current
//! position. A step whose edge is not registered is a missing link, handled
//! according to [`MissingLinkPolicy`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use atrium_core::{BlockFields, MigrationError, SemVer};

/// Separator between the two versions of a migration key.
pub const KEY_SEPARATOR: &str = "->";

/// A pure transform from one schema version's field shape to the next.
pub type MigrationFn =
    Arc<dyn Fn(&mut BlockFields) -> Result<(), MigrationError> + Send + Sync>;

/// Wrap a closure as a [`MigrationFn`].
pub fn migration_fn<F>(migrate: F) -> MigrationFn
where
    F: Fn(&mut BlockFields) -> Result<(), MigrationError> + Send + Sync + 'static,
{
    Arc::new(migrate)
}

/// An edge of the graph, written `"<from>-><to>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MigrationKey {
    pub from: SemVer,
    pub to: SemVer,
}

impl MigrationKey {
    /// Build a key; `from` must be strictly lower than `to`.
    pub fn new(from: SemVer, to: SemVer) -> Result<Self, MigrationError> {
        if from >= to {
            return Err(MigrationError::InvalidKey {
                key: format!("{}{}{}", from, KEY_SEPARATOR, to),
                reason: "migrations must move forward".to_string(),
            });
        }
        Ok(Self { from, to })
    }
}

impl fmt::Display for MigrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.from, KEY_SEPARATOR, self.to)
    }
}

impl FromStr for MigrationKey {
    type Err = MigrationError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| MigrationError::InvalidKey {
            key: key.to_string(),
            reason,
        };
        let (from, to) = key
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| invalid(format!("expected \"<from>{}<to>\"", KEY_SEPARATOR)))?;
        let from: SemVer = from.parse().map_err(|e| invalid(format!("from: {}", e)))?;
        let to: SemVer = to.parse().map_err(|e| invalid(format!("to: {}", e)))?;
        Self::new(from, to)
    }
}

/// What to do when a planned step has no registered migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingLinkPolicy {
    /// Record the gap, advance past it and keep going.
    #[default]
    Skip,
    /// Refuse to plan; the block stays at its stored version.
    Fail,
}

impl MissingLinkPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingLinkPolicy::Skip => "skip",
            MissingLinkPolicy::Fail => "fail",
        }
    }
}

impl FromStr for MissingLinkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(MissingLinkPolicy::Skip),
            "fail" => Ok(MissingLinkPolicy::Fail),
            other => Err(format!("unknown missing-link policy: {}", other)),
        }
    }
}

/// One step of a plan.
#[derive(Clone)]
pub struct PlannedStep {
    pub key: MigrationKey,
    pub migrate: MigrationFn,
}

impl fmt::Debug for PlannedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannedStep").field("key", &self.key).finish()
    }
}

/// Ordered steps from a stored version up to the target.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    pub steps: Vec<PlannedStep>,
    /// Links the walk passed over without a registered migration.
    pub skipped: Vec<MigrationKey>,
}

impl MigrationPlan {
    pub fn step_keys(&self) -> Vec<MigrationKey> {
        self.steps.iter().map(|s| s.key.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Directed graph of migrations for a single block type.
#[derive(Clone, Default)]
pub struct MigrationGraph {
    block_type: String,
    edges: BTreeMap<SemVer, BTreeMap<SemVer, MigrationFn>>,
}

impl MigrationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty graph owned by `block_type`, named in registration errors.
    pub fn for_block_type(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            edges: BTreeMap::new(),
        }
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    /// Register an edge. Registering the same key twice is an error.
    pub fn add(&mut self, key: MigrationKey, migrate: MigrationFn) -> Result<(), MigrationError> {
        let targets = self.edges.entry(key.from.clone()).or_default();
        if targets.contains_key(&key.to) {
            return Err(MigrationError::DuplicateMigration {
                block_type: self.block_type.clone(),
                key: key.to_string(),
            });
        }
        targets.insert(key.to, migrate);
        Ok(())
    }

    pub fn contains(&self, key: &MigrationKey) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &MigrationKey) -> Option<&MigrationFn> {
        self.edges.get(&key.from).and_then(|targets| targets.get(&key.to))
    }

    /// Distinct `from` endpoints, ascending.
    pub fn from_versions(&self) -> impl Iterator<Item = &SemVer> {
        self.edges.keys()
    }

    /// All registered keys, ascending.
    pub fn keys(&self) -> Vec<MigrationKey> {
        self.edges
            .iter()
            .flat_map(|(from, targets)| {
                targets.keys().map(move |to| MigrationKey {
                    from: from.clone(),
                    to: to.clone(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest version any edge points at.
    pub fn max_target(&self) -> Option<&SemVer> {
        self.edges.values().filter_map(|targets| targets.keys().next_back()).max()
    }

    /// Plan the walk from `from` to `target`.
    ///
    /// Waypoints are the registered `from` versions plus the target, limited
    /// to `(from, target]`. The walk visits them in ascending order and looks
    /// up the edge from its current position to each waypoint. The position
    /// always advances, so a missing edge under [`MissingLinkPolicy::Skip`]
    /// drops that step without stopping the chain.
    pub fn plan(
        &self,
        from: &SemVer,
        target: &SemVer,
        policy: MissingLinkPolicy,
    ) -> Result<MigrationPlan, MigrationError> {
        let mut plan = MigrationPlan::default();
        if from >= target {
            return Ok(plan);
        }

        let mut waypoints: BTreeSet<&SemVer> = self
            .from_versions()
            .filter(|v| *v > from && *v <= target)
            .collect();
        waypoints.insert(target);

        let mut current = from.clone();
        for next in waypoints {
            let key = MigrationKey {
                from: current,
                to: next.clone(),
            };
            match self.get(&key) {
                Some(migrate) => plan.steps.push(PlannedStep {
                    key,
                    migrate: Arc::clone(migrate),
                }),
                None => match policy {
                    MissingLinkPolicy::Skip => plan.skipped.push(key),
                    MissingLinkPolicy::Fail => {
                        return Err(MigrationError::MissingLink {
                            key: key.to_string(),
                        })
                    }
                },
            }
            current = next.clone();
        }

        Ok(plan)
    }
}

impl fmt::Debug for MigrationGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.keys().iter().map(ToString::to_string).collect();
        f.debug_struct("MigrationGraph")
            .field("block_type", &self.block_type)
            .field("edges", &keys)
            .finish()
    }
}
