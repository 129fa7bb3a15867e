//! Seed-managed catalogs: targets, rulesets and generators.

use super::{read_only, refs, with_field, Resource};
use crate::server::AppState;
use axum::Router;
use hub_core::database::record;
use hub_core::model::{Generator, Rule, RuleSet, Target};
use hub_core::schema;
use hub_core::{Assert, Query, Resolvers};
use serde_json::Value;
use std::sync::Arc;

pub(super) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(read_only::<Target>("/targets"))
        .merge(read_only::<RuleSet>("/rulesets"))
        .merge(read_only::<Generator>("/generators"))
}

impl Resource for Target {
    fn asserts() -> Vec<Assert> {
        vec![
            Assert::literal("id"),
            Assert::string("name"),
            Assert::string("provider"),
        ]
    }
}

impl Resource for RuleSet {
    fn asserts() -> Vec<Assert> {
        vec![
            Assert::literal("id"),
            Assert::string("name"),
            Assert::string("kind"),
        ]
    }

    fn render(resolvers: &Resolvers<'_>, record: Self) -> hub_core::Result<Value> {
        let conn = resolvers.conn();
        let query = Query::select(schema::RULE.name)
            .filter("rule_set_id = ?", vec![record.id.into()])
            .order_by("id");
        let rules: Vec<Rule> = record::list(conn, &query)?;
        let depends = refs(conn, &schema::RULE_SET, "dependsOn", record.id)?;
        let value = with_field(serde_json::to_value(record)?, "rules", serde_json::to_value(rules)?);
        Ok(with_field(value, "dependsOn", depends))
    }
}

impl Resource for Generator {
    fn asserts() -> Vec<Assert> {
        vec![
            Assert::literal("id"),
            Assert::string("name"),
            Assert::string("kind"),
        ]
    }
}
