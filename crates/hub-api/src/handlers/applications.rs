//! Application handlers.
//!
//! Application rows are rendered with derived fields: the archetypes they
//! belong to, risk, confidence, assessed state and the effective tag list
//! (stored tags plus tags inherited from archetypes and assessments).

use super::assessments::{create_for, list_for, Owner};
use super::{crud, id_refs, members, read, refs, write, Body, Params, Resource};
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use hub_core::database::record;
use hub_core::model::{Application, Ref, TagSource};
use hub_core::{association, schema, ApplicationResolver, Assert, Filter, Query, Resolvers, SqlValue};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub(super) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crud::<Application>("/applications"))
        .route(
            "/applications/:id/tags",
            get(tag_list).put(tag_replace).post(tag_add),
        )
        .route(
            "/applications/:id/assessments",
            get(assessment_list).post(assessment_create),
        )
}

/// Tag reference carried by application bodies and the tags sub-resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TagRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source: String,
    /// Inherited (archetype or assessment) tags are virtual and never stored.
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
}

/// Stored tags, then archetype tags, then assessment tags; narrowed to
/// one source when `source` is given.
fn effective_tags(
    resolver: &ApplicationResolver<'_, '_>,
    resolvers: &Resolvers<'_>,
    source: Option<&str>,
) -> hub_core::Result<Vec<TagRef>> {
    let names = resolvers.tags()?;
    let name = |id: u64| names.get(id).map(|t| t.name.clone()).unwrap_or_default();
    let mut tags: Vec<TagRef> = Application::tags(resolvers.conn(), resolver.application().id)?
        .into_iter()
        .filter(|t| source.map_or(true, |s| s == t.source))
        .map(|t| TagRef {
            id: t.tag_id,
            name: name(t.tag_id),
            source: t.source,
            is_virtual: false,
        })
        .collect();
    let inherited = [
        (TagSource::Archetype, resolver.archetype_tags()?),
        (TagSource::Assessment, resolver.assessment_tags()?),
    ];
    for (kind, found) in inherited {
        if source.is_some_and(|s| s != kind.as_str()) {
            continue;
        }
        tags.extend(found.into_iter().map(|t| TagRef {
            id: t.id,
            name: t.name.clone(),
            source: kind.as_str().to_string(),
            is_virtual: true,
        }));
    }
    Ok(tags)
}

/// Ids of the stored (non-virtual) refs listed by a tags body.
fn stored_ids(value: &Value) -> hub_core::Result<Vec<u64>> {
    let refs: Vec<TagRef> = serde_json::from_value(value.clone())?;
    Ok(refs.into_iter().filter(|r| !r.is_virtual).map(|r| r.id).collect())
}

fn replace_tags(conn: &Connection, id: u64, source: &str, ids: &[u64]) -> hub_core::Result<()> {
    association::replace_scoped(
        conn,
        &schema::APPLICATION,
        "tags",
        id,
        ids,
        &[("source", SqlValue::from(source))],
    )
}

impl Resource for Application {
    fn asserts() -> Vec<Assert> {
        vec![
            Assert::literal("id"),
            Assert::string("name"),
            Assert::literal("platform.id"),
            Assert::string("repository.url"),
            Assert::string("repository.path"),
            Assert::literal("tag.id").with_and(),
        ]
    }

    fn query(filter: &Filter) -> hub_core::Result<Query> {
        let mut query = filter
            .renamed("platform.id", "platform_id")
            .apply(Query::select(schema::APPLICATION.name), &[]);
        let repository = filter.resource("repository");
        for name in ["url", "path"] {
            for field in repository.fields(name) {
                let values = field.value().strings().into_iter().map(SqlValue::from).collect();
                query = query.filter(
                    format!("json_extract(repository, '$.{}') IN ?", name),
                    vec![SqlValue::List(values)],
                );
            }
        }
        for field in filter.resource("tag").fields("id") {
            let field = field.renamed("tag_id");
            // (a,b): the application must carry every listed tag.
            let clauses = if field.is_and_list() {
                field.expand()
            } else {
                vec![field]
            };
            for clause in clauses {
                if let Some((sql, binds)) = clause.sql() {
                    query = query.filter(
                        format!("id IN (SELECT application_id FROM application_tags WHERE {})", sql),
                        binds,
                    );
                }
            }
        }
        Ok(query)
    }

    fn relations(conn: &Connection, id: u64, body: &Value) -> hub_core::Result<()> {
        if let Some(tags) = body.get("tags") {
            let refs: Vec<TagRef> = serde_json::from_value(tags.clone())?;
            let ids: Vec<u64> = refs
                .into_iter()
                .filter(|r| !r.is_virtual && r.source.is_empty())
                .map(|r| r.id)
                .collect();
            replace_tags(conn, id, TagSource::User.as_str(), &ids)?;
        }
        members(conn, &schema::APPLICATION, "contributors", id, body, "contributors")
    }

    fn render(resolvers: &Resolvers<'_>, record: Self) -> hub_core::Result<Value> {
        let conn = resolvers.conn();
        let resolver = ApplicationResolver::load(resolvers, record)?;
        let application = resolver.application();
        let archetypes: Vec<Ref> = resolver
            .archetypes()?
            .iter()
            .map(|a| Ref::new(a.id(), a.archetype.name.clone()))
            .collect();
        let assessments: Vec<u64> = resolver.assessments().iter().map(|a| a.id).collect();
        let derived = json!({
            "tags": effective_tags(&resolver, resolvers, None)?,
            "contributors": refs(conn, &schema::APPLICATION, "contributors", application.id)?,
            "archetypes": archetypes,
            "assessments": id_refs(&assessments),
            "risk": resolver.risk()?,
            "confidence": resolver.confidence()?,
            "assessed": resolver.assessed()?,
        });
        let mut value = serde_json::to_value(application)?;
        if let (Value::Object(map), Value::Object(derived)) = (&mut value, derived) {
            map.extend(derived);
        }
        Ok(value)
    }
}

async fn tag_list(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<Vec<TagRef>>> {
    let source = Params::parse(query.as_deref()).get("source").map(str::to_string);
    let tags = read(&state, move |conn| {
        let application: Application = record::get(conn, id)?;
        let resolvers = Resolvers::new(conn);
        let resolver = ApplicationResolver::load(&resolvers, application)?;
        effective_tags(&resolver, &resolvers, source.as_deref())
    })
    .await?;
    Ok(Json(tags))
}

/// Replace the stored tags of one source (`?source=`, default user tags).
async fn tag_replace(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    RawQuery(query): RawQuery,
    Body(body): Body,
) -> ApiResult<StatusCode> {
    let source = Params::parse(query.as_deref())
        .get("source")
        .unwrap_or(TagSource::User.as_str())
        .to_string();
    write(&state, move |tx| {
        record::get::<Application>(tx, id)?;
        let ids = stored_ids(&body)?;
        replace_tags(tx, id, &source, &ids)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn tag_add(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Body(body): Body,
) -> ApiResult<(StatusCode, Json<TagRef>)> {
    let tag: TagRef = serde_json::from_value(body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if tag.is_virtual {
        return Err(ApiError::bad_request("cannot add virtual tags."));
    }
    let added = tag.clone();
    write(&state, move |tx| {
        record::get::<Application>(tx, id)?;
        let scope = [("source", SqlValue::from(added.source.as_str()))];
        let mut ids = association::related_ids_scoped(tx, &schema::APPLICATION, "tags", id, &scope)?;
        ids.push(added.id);
        replace_tags(tx, id, &added.source, &ids)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn assessment_list(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<Value>>> {
    let assessments = read(&state, move |conn| list_for(conn, Owner::Application(id))).await?;
    Ok(Json(assessments))
}

async fn assessment_create(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Body(body): Body,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let created = write(&state, move |tx| create_for(tx, Owner::Application(id), &body)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
