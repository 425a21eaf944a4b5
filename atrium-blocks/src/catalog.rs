//! Built-in block types shipped with the page builder.

use atrium_core::{BlockFields, MigrationError};
use serde_json::{json, Map, Value};

use crate::registry::{BlockDescriptor, BlockRegistry};

pub const HERO: &str = "hero";
pub const FAQ: &str = "faq";
pub const TESTIMONIALS: &str = "testimonials";
pub const SERVICES_GRID: &str = "services-grid";
pub const TEAM_GRID: &str = "team-grid";
pub const CALL_TO_ACTION: &str = "call-to-action";

/// Registry with every built-in block type.
pub fn default_registry() -> Result<BlockRegistry, MigrationError> {
    BlockRegistry::builder()
        .register(hero()?)
        .register(faq()?)
        .register(testimonials()?)
        .register(services_grid()?)
        .register(team_grid()?)
        .register(call_to_action()?)
        .build()
}

fn rename(fields: &mut BlockFields, from: &str, to: &str) {
    if let Some(value) = fields.remove(from) {
        fields.entry(to.to_string()).or_insert(value);
    }
}

fn hero() -> Result<BlockDescriptor, MigrationError> {
    BlockDescriptor::builder(HERO, "Hero", "2.0.0")
        .migration("1.0.0->1.1.0", |fields| {
            rename(fields, "title", "heading");
            Ok(())
        })
        .migration("1.1.0->2.0.0", |fields| {
            let label = fields.remove("buttonText");
            let href = fields.remove("buttonUrl");
            if label.is_some() || href.is_some() {
                fields.insert(
                    "cta".to_string(),
                    json!({
                        "label": label.unwrap_or(Value::Null),
                        "href": href.unwrap_or(Value::Null),
                    }),
                );
            }
            fields
                .entry("alignment".to_string())
                .or_insert_with(|| Value::String("center".to_string()));
            Ok(())
        })
        .build()
}

fn faq() -> Result<BlockDescriptor, MigrationError> {
    BlockDescriptor::builder(FAQ, "FAQ", "1.1.0")
        .migration("1.0.0->1.1.0", |fields| {
            let items = match fields.remove("questions") {
                None => Vec::new(),
                Some(Value::Array(questions)) => questions
                    .into_iter()
                    .map(|entry| {
                        let mut entry = match entry {
                            Value::Object(map) => map,
                            _ => return Err(MigrationError::transform("faq entry is not an object")),
                        };
                        let mut item = Map::new();
                        item.insert("question".to_string(), entry.remove("q").unwrap_or(Value::Null));
                        item.insert("answer".to_string(), entry.remove("a").unwrap_or(Value::Null));
                        Ok(Value::Object(item))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => return Err(MigrationError::transform("questions is not a list")),
            };
            fields.insert("items".to_string(), Value::Array(items));
            Ok(())
        })
        .build()
}

fn testimonials() -> Result<BlockDescriptor, MigrationError> {
    BlockDescriptor::builder(TESTIMONIALS, "Testimonials", "2.0.0")
        .migration("1.0.0->2.0.0", |fields| {
            let quotes = match fields.remove("quotes") {
                None => Vec::new(),
                Some(Value::Array(quotes)) => quotes,
                Some(_) => return Err(MigrationError::transform("quotes is not a list")),
            };
            let testimonials = quotes
                .into_iter()
                .map(|quote| json!({ "quote": quote, "author": null }))
                .collect();
            fields.insert("testimonials".to_string(), Value::Array(testimonials));
            fields
                .entry("layout".to_string())
                .or_insert_with(|| Value::String("grid".to_string()));
            Ok(())
        })
        .build()
}

fn services_grid() -> Result<BlockDescriptor, MigrationError> {
    BlockDescriptor::builder(SERVICES_GRID, "Services grid", "1.1.0")
        .migration("1.0.0->1.1.0", |fields| {
            let columns = fields
                .get("columns")
                .and_then(Value::as_u64)
                .unwrap_or(3)
                .clamp(1, 4);
            fields.insert("columns".to_string(), Value::from(columns));
            Ok(())
        })
        .build()
}

fn team_grid() -> Result<BlockDescriptor, MigrationError> {
    BlockDescriptor::builder(TEAM_GRID, "Team grid", "1.0.0").build()
}

fn call_to_action() -> Result<BlockDescriptor, MigrationError> {
    BlockDescriptor::builder(CALL_TO_ACTION, "Call to action", "1.0.1")
        .migration("1.0.0->1.0.1", |fields| {
            rename(fields, "text", "body");
            Ok(())
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BlockMigrator, MigrationOutcome};
    use atrium_core::BlockInstance;
    use std::sync::Arc;

    fn migrator() -> BlockMigrator {
        BlockMigrator::new(Arc::new(default_registry().unwrap()))
    }

    #[test]
    fn test_default_registry_types() {
        let registry = default_registry().unwrap();
        let types: Vec<&str> = registry.block_types().collect();
        assert_eq!(
            types,
            vec![CALL_TO_ACTION, FAQ, HERO, SERVICES_GRID, TEAM_GRID, TESTIMONIALS]
        );
    }

    #[test]
    fn test_hero_v1_to_v2() {
        let instance = BlockInstance::new(HERO, "1.0.0")
            .with_field("title", "Welcome")
            .with_field("buttonText", "Book")
            .with_field("buttonUrl", "/book");

        let out = migrator().migrate(&instance);
        assert_eq!(out.version_str(), Some("2.0.0"));
        assert_eq!(out.field("heading"), Some(&json!("Welcome")));
        assert_eq!(out.field("cta"), Some(&json!({ "label": "Book", "href": "/book" })));
        assert_eq!(out.field("alignment"), Some(&json!("center")));
        assert!(out.field("title").is_none());
        assert!(out.field("buttonText").is_none());
    }

    #[test]
    fn test_hero_keeps_existing_alignment() {
        let instance = BlockInstance::new(HERO, "1.1.0")
            .with_field("heading", "Hi")
            .with_field("alignment", "left");
        let out = migrator().migrate(&instance);
        assert_eq!(out.field("alignment"), Some(&json!("left")));
        assert!(out.field("cta").is_none());
    }

    #[test]
    fn test_faq_restructures_questions() {
        let instance = BlockInstance::new(FAQ, "1.0.0")
            .with_field("questions", json!([{ "q": "Open Sundays?", "a": "No" }]));
        let out = migrator().migrate(&instance);
        assert_eq!(
            out.field("items"),
            Some(&json!([{ "question": "Open Sundays?", "answer": "No" }]))
        );
    }

    #[test]
    fn test_faq_bad_shape_is_served_unchanged() {
        let instance = BlockInstance::new(FAQ, "1.0.0").with_field("questions", "oops");
        let (out, outcome) = migrator().migrate_with_outcome(&instance);
        assert_eq!(out, instance);
        assert!(outcome.is_failed());
    }

    #[test]
    fn test_testimonials_and_services_grid() {
        let m = migrator();
        let out = m.migrate(
            &BlockInstance::new(TESTIMONIALS, "1.0.0").with_field("quotes", json!(["Great care"])),
        );
        assert_eq!(
            out.field("testimonials"),
            Some(&json!([{ "quote": "Great care", "author": null }]))
        );
        assert_eq!(out.field("layout"), Some(&json!("grid")));

        let out = m.migrate(&BlockInstance::new(SERVICES_GRID, "1.0.0").with_field("columns", 9));
        assert_eq!(out.field("columns"), Some(&json!(4)));
        let out = m.migrate(&BlockInstance::new(SERVICES_GRID, "1.0.0"));
        assert_eq!(out.field("columns"), Some(&json!(3)));
    }

    #[test]
    fn test_call_to_action_and_team_grid() {
        let m = migrator();
        let out = m.migrate(&BlockInstance::new(CALL_TO_ACTION, "1.0.0").with_field("text", "Call us"));
        assert_eq!(out.field("body"), Some(&json!("Call us")));
        assert_eq!(out.version_str(), Some("1.0.1"));

        let team = BlockInstance::new(TEAM_GRID, "1.0.0");
        let (_, outcome) = m.migrate_with_outcome(&team);
        assert_eq!(outcome, MigrationOutcome::UpToDate);
    }
}
