//! Tag and tag category handlers.

use super::{crud, read, Resource};
use crate::error::ApiResult;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use hub_core::database::record;
use hub_core::model::{tags_in_category, Ref, Tag, TagCategory};
use hub_core::{Assert, Filter, Query, Resolvers};
use serde_json::Value;
use std::sync::Arc;

pub(super) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crud::<TagCategory>("/tagcategories"))
        .route("/tagcategories/:id/tags", get(category_tags))
        .merge(crud::<Tag>("/tags"))
}

impl Resource for TagCategory {
    fn asserts() -> Vec<Assert> {
        vec![
            Assert::string("name"),
            Assert::string("color"),
            Assert::literal("id"),
        ]
    }

    fn render(resolvers: &Resolvers<'_>, record: Self) -> hub_core::Result<Value> {
        let tags: Vec<Ref> = tags_in_category(resolvers.conn(), record.id)?
            .into_iter()
            .map(|t| Ref::new(t.id, t.name))
            .collect();
        Ok(super::with_field(
            serde_json::to_value(record)?,
            "tags",
            serde_json::to_value(tags)?,
        ))
    }
}

impl Resource for Tag {
    fn asserts() -> Vec<Assert> {
        vec![
            Assert::string("name"),
            Assert::literal("id"),
            Assert::literal("category.id"),
        ]
    }

    fn query(filter: &Filter) -> hub_core::Result<Query> {
        let filter = filter.renamed("category.id", "category_id");
        Ok(filter.apply(Query::select("tag"), &[]))
    }
}

async fn category_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<Tag>>> {
    let tags = read(&state, move |conn| {
        record::get::<TagCategory>(conn, id)?;
        tags_in_category(conn, id)
    })
    .await?;
    Ok(Json(tags))
}
