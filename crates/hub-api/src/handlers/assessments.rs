//! Assessment handlers.
//!
//! Assessments are created through their owner
//! (`/applications/:id/assessments`, `/archetypes/:id/assessments`) and
//! rendered with their derived status, risk and confidence.

use super::{fetch, list, members, refs, update, with_field, Resource, API_USER};
use crate::server::AppState;
use axum::{routing::get, Router};
use hub_core::database::record;
use hub_core::model::{Application, Archetype, Assessment, Questionnaire, Ref, Section};
use hub_core::schema;
use hub_core::{association, Assert, Filter, HubError, Query, Resolvers};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

pub(super) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/assessments", get(list::<Assessment>))
        .route(
            "/assessments/:id",
            get(fetch::<Assessment>)
                .put(update::<Assessment>)
                .delete(super::delete::<Assessment>),
        )
}

impl Resource for Assessment {
    fn asserts() -> Vec<Assert> {
        vec![
            Assert::literal("id"),
            Assert::literal("questionnaire.id"),
            Assert::literal("application.id"),
            Assert::literal("archetype.id"),
        ]
    }

    fn query(filter: &Filter) -> hub_core::Result<Query> {
        let filter = filter
            .renamed("questionnaire.id", "questionnaire_id")
            .renamed("application.id", "application_id")
            .renamed("archetype.id", "archetype_id");
        Ok(filter.apply(Query::select(schema::ASSESSMENT.name), &[]))
    }

    /// The owner and questionnaire of an assessment never change.
    fn check(_conn: &Connection, record: &mut Self, stored: Option<&Self>) -> hub_core::Result<()> {
        if let Some(stored) = stored {
            record.questionnaire_id = stored.questionnaire_id;
            record.application_id = stored.application_id;
            record.archetype_id = stored.archetype_id;
        }
        Ok(())
    }

    fn relations(conn: &Connection, id: u64, body: &Value) -> hub_core::Result<()> {
        members(conn, &schema::ASSESSMENT, "stakeholders", id, body, "stakeholders")?;
        members(conn, &schema::ASSESSMENT, "stakeholderGroups", id, body, "stakeholderGroups")
    }

    fn render(resolvers: &Resolvers<'_>, record: Self) -> hub_core::Result<Value> {
        let conn = resolvers.conn();
        let stakeholders = refs(conn, &schema::ASSESSMENT, "stakeholders", record.id)?;
        let groups = refs(conn, &schema::ASSESSMENT, "stakeholderGroups", record.id)?;
        let derived = json!({
            "status": record.status().as_str(),
            "risk": record.risk(),
            "confidence": record.confidence(),
            "required": resolvers.questionnaires()?.required(record.questionnaire_id),
        });
        let mut value = serde_json::to_value(record)?;
        if let (Value::Object(map), Value::Object(derived)) = (&mut value, derived) {
            map.extend(derived);
        }
        value = with_field(value, "stakeholders", stakeholders);
        Ok(with_field(value, "stakeholderGroups", groups))
    }
}

/// Subject an assessment is created for.
#[derive(Debug, Clone, Copy)]
pub(super) enum Owner {
    Application(u64),
    Archetype(u64),
}

impl Owner {
    fn column(&self) -> (&'static str, u64) {
        match *self {
            Owner::Application(id) => ("application_id", id),
            Owner::Archetype(id) => ("archetype_id", id),
        }
    }

    /// Fail with `NotFound` when the owner row does not exist; otherwise
    /// the tag ids assessments are prepared with.
    fn tags(&self, conn: &Connection) -> hub_core::Result<HashSet<u64>> {
        match *self {
            Owner::Application(id) => {
                record::get::<Application>(conn, id)?;
                Ok(Application::tag_ids(conn, id)?.into_iter().collect())
            }
            Owner::Archetype(id) => {
                record::get::<Archetype>(conn, id)?;
                let mut tags: HashSet<u64> =
                    association::related_ids(conn, &schema::ARCHETYPE, "criteriaTags", id)?
                        .into_iter()
                        .collect();
                tags.extend(association::related_ids(conn, &schema::ARCHETYPE, "tags", id)?);
                Ok(tags)
            }
        }
    }
}

/// Body of an assessment create request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewAssessment {
    #[serde(default)]
    questionnaire: Option<Ref>,
    #[serde(default)]
    questionnaire_id: Option<u64>,
    /// Sections supplied by the caller are stored as-is.
    #[serde(default)]
    sections: Vec<Section>,
}

/// Rendered assessments of `owner`.
pub(super) fn list_for(conn: &Connection, owner: Owner) -> hub_core::Result<Vec<Value>> {
    owner.tags(conn)?;
    let (column, id) = owner.column();
    let query = Query::select(schema::ASSESSMENT.name)
        .filter(format!("{} = ?", column), vec![id.into()])
        .order_by("id");
    let assessments: Vec<Assessment> = record::list(conn, &query)?;
    let resolvers = Resolvers::new(conn);
    assessments
        .into_iter()
        .map(|a| Assessment::render(&resolvers, a))
        .collect()
}

/// Create an assessment of `owner` from the questionnaire named by `body`.
///
/// Without caller sections the questionnaire's sections are copied and
/// prepared (auto-answered and filtered) with the owner's tags.
pub(super) fn create_for(conn: &Connection, owner: Owner, body: &Value) -> hub_core::Result<Value> {
    let request: NewAssessment = serde_json::from_value(body.clone())?;
    let questionnaire_id = request
        .questionnaire
        .map(|q| q.id)
        .or(request.questionnaire_id)
        .ok_or_else(|| HubError::bad_request("questionnaire is required."))?;
    let tags = owner.tags(conn)?;
    let questionnaire: Questionnaire = record::get(conn, questionnaire_id)?;

    let mut assessment = Assessment::from_questionnaire(&questionnaire);
    assessment.create_user = API_USER.to_string();
    match owner {
        Owner::Application(id) => assessment.application_id = Some(id),
        Owner::Archetype(id) => assessment.archetype_id = Some(id),
    }
    let resolvers = Resolvers::new(conn);
    if request.sections.is_empty() {
        assessment.prepare(resolvers.tags()?, &tags);
    } else {
        assessment.sections = request.sections;
    }
    record::create(conn, &mut assessment)?;
    Assessment::relations(conn, assessment.id, body)?;
    info!(
        "Assessment created: id={} questionnaire={} owner={:?}",
        assessment.id, questionnaire_id, owner
    );
    Assessment::render(&resolvers, assessment)
}
