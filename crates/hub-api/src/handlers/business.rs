//! Stakeholders, groups, business services, job functions, platforms and
//! migration waves.

use super::{crud, members, refs, with_field, Resource};
use crate::server::AppState;
use axum::Router;
use hub_core::model::{BusinessService, JobFunction, MigrationWave, Platform, Stakeholder, StakeholderGroup};
use hub_core::schema;
use hub_core::{Assert, Filter, Query, Resolvers};
use rusqlite::Connection;
use serde_json::Value;
use std::sync::Arc;

pub(super) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crud::<Stakeholder>("/stakeholders"))
        .merge(crud::<StakeholderGroup>("/stakeholdergroups"))
        .merge(crud::<BusinessService>("/businessservices"))
        .merge(crud::<JobFunction>("/jobfunctions"))
        .merge(crud::<Platform>("/platforms"))
        .merge(crud::<MigrationWave>("/migrationwaves"))
}

impl Resource for Stakeholder {
    fn asserts() -> Vec<Assert> {
        vec![
            Assert::literal("id"),
            Assert::string("name"),
            Assert::string("email"),
            Assert::literal("jobFunction.id"),
        ]
    }

    fn query(filter: &Filter) -> hub_core::Result<Query> {
        let filter = filter.renamed("jobFunction.id", "job_function_id");
        Ok(filter.apply(Query::select(schema::STAKEHOLDER.name), &[]))
    }
}

impl Resource for StakeholderGroup {
    fn asserts() -> Vec<Assert> {
        vec![Assert::literal("id"), Assert::string("name")]
    }

    fn relations(conn: &Connection, id: u64, body: &Value) -> hub_core::Result<()> {
        members(conn, &schema::STAKEHOLDER_GROUP, "stakeholders", id, body, "stakeholders")
    }

    fn render(resolvers: &Resolvers<'_>, record: Self) -> hub_core::Result<Value> {
        let stakeholders = refs(resolvers.conn(), &schema::STAKEHOLDER_GROUP, "stakeholders", record.id)?;
        Ok(with_field(serde_json::to_value(record)?, "stakeholders", stakeholders))
    }
}

/// Has-many `applications` (the applications point at the owner).
fn applications(conn: &Connection, table: &'static schema::Table, id: u64) -> hub_core::Result<Value> {
    refs(conn, table, "applications", id)
}

impl Resource for BusinessService {
    fn asserts() -> Vec<Assert> {
        vec![Assert::literal("id"), Assert::string("name")]
    }

    fn relations(conn: &Connection, id: u64, body: &Value) -> hub_core::Result<()> {
        members(conn, &schema::BUSINESS_SERVICE, "applications", id, body, "applications")
    }

    fn render(resolvers: &Resolvers<'_>, record: Self) -> hub_core::Result<Value> {
        let apps = applications(resolvers.conn(), &schema::BUSINESS_SERVICE, record.id)?;
        Ok(with_field(serde_json::to_value(record)?, "applications", apps))
    }
}

impl Resource for JobFunction {
    fn asserts() -> Vec<Assert> {
        vec![Assert::literal("id"), Assert::string("name")]
    }
}

impl Resource for Platform {
    fn asserts() -> Vec<Assert> {
        vec![Assert::literal("id"), Assert::string("name"), Assert::string("kind")]
    }

    fn relations(conn: &Connection, id: u64, body: &Value) -> hub_core::Result<()> {
        members(conn, &schema::PLATFORM, "applications", id, body, "applications")
    }

    fn render(resolvers: &Resolvers<'_>, record: Self) -> hub_core::Result<Value> {
        let apps = applications(resolvers.conn(), &schema::PLATFORM, record.id)?;
        Ok(with_field(serde_json::to_value(record)?, "applications", apps))
    }
}

impl Resource for MigrationWave {
    fn asserts() -> Vec<Assert> {
        vec![Assert::literal("id"), Assert::string("name")]
    }

    fn relations(conn: &Connection, id: u64, body: &Value) -> hub_core::Result<()> {
        members(conn, &schema::MIGRATION_WAVE, "applications", id, body, "applications")
    }

    fn render(resolvers: &Resolvers<'_>, record: Self) -> hub_core::Result<Value> {
        let apps = applications(resolvers.conn(), &schema::MIGRATION_WAVE, record.id)?;
        Ok(with_field(serde_json::to_value(record)?, "applications", apps))
    }
}
