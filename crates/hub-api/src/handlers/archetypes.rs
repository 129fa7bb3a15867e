//! Archetype handlers.

use super::assessments::{create_for, list_for, Owner};
use super::{crud, id_refs, members, read, refs, write, Body, Resource};
use crate::error::ApiResult;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use hub_core::database::record;
use hub_core::model::{Archetype, Ref, TargetProfile};
use hub_core::{association, schema, ArchetypeResolver, Assert, Query, Resolvers};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::sync::Arc;

pub(super) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crud::<Archetype>("/archetypes"))
        .route(
            "/archetypes/:id/assessments",
            get(assessment_list).post(assessment_create),
        )
}

fn profiles(conn: &Connection, id: u64) -> hub_core::Result<Vec<TargetProfile>> {
    let query = Query::select(schema::TARGET_PROFILE.name)
        .filter("archetype_id = ?", vec![id.into()])
        .order_by("id");
    record::list(conn, &query)
}

impl Resource for Archetype {
    fn asserts() -> Vec<Assert> {
        vec![Assert::literal("id"), Assert::string("name")]
    }

    fn relations(conn: &Connection, id: u64, body: &Value) -> hub_core::Result<()> {
        for name in ["criteriaTags", "tags", "stakeholders", "stakeholderGroups"] {
            members(conn, &schema::ARCHETYPE, name, id, body, name)?;
        }
        if let Some(value) = body.get("profiles") {
            let mut profiles: Vec<TargetProfile> = match value {
                Value::Null => Vec::new(),
                value => serde_json::from_value(value.clone())?,
            };
            let owner = Archetype {
                id,
                ..Default::default()
            };
            association::replace(conn, &owner, "profiles", &mut profiles)?;
        }
        Ok(())
    }

    fn render(resolvers: &Resolvers<'_>, record: Self) -> hub_core::Result<Value> {
        let conn = resolvers.conn();
        let resolver = ArchetypeResolver::new(resolvers, record.id)?;
        let entry = resolver.entry();
        let criteria: Vec<u64> = entry.criteria.iter().copied().collect();
        let assessment_tags: Vec<Ref> = resolver
            .assessment_tags()?
            .into_iter()
            .map(|t| Ref::new(t.id, t.name.clone()))
            .collect();
        let assessments: Vec<u64> = entry.assessments.iter().map(|a| a.id).collect();
        let derived = json!({
            "criteriaTags": id_refs(&criteria),
            "tags": id_refs(&entry.tags),
            "stakeholders": refs(conn, &schema::ARCHETYPE, "stakeholders", record.id)?,
            "stakeholderGroups": refs(conn, &schema::ARCHETYPE, "stakeholderGroups", record.id)?,
            "profiles": profiles(conn, record.id)?,
            "applications": id_refs(&resolver.applications()?),
            "assessments": id_refs(&assessments),
            "assessmentTags": assessment_tags,
            "risk": resolver.risk()?,
            "confidence": resolver.confidence()?,
            "assessed": resolver.assessed()?,
        });
        let mut value = serde_json::to_value(record)?;
        if let (Value::Object(map), Value::Object(derived)) = (&mut value, derived) {
            map.extend(derived);
        }
        Ok(value)
    }
}

async fn assessment_list(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<Value>>> {
    let assessments = read(&state, move |conn| list_for(conn, Owner::Archetype(id))).await?;
    Ok(Json(assessments))
}

async fn assessment_create(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Body(body): Body,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let created = write(&state, move |tx| create_for(tx, Owner::Archetype(id), &body)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
