//! REST handlers, split by domain.
//!
//! Plain catalog resources share the generic handlers in this module through
//! the [`Resource`] trait; endpoints with derived fields or sub-resources
//! live in their domain module.

mod applications;
mod archetypes;
mod assessments;
mod business;
mod catalog;
mod questionnaires;
mod settings;
mod tags;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use axum::{
    async_trait,
    extract::{FromRequest, Path, RawQuery, Request, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use hub_core::association;
use hub_core::database::record::{self, Record};
use hub_core::schema::Table;
use hub_core::{Assert, Filter, Query, Resolvers, Sort};
use rusqlite::{Connection, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Every REST route except `/health`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(tags::routes())
        .merge(applications::routes())
        .merge(archetypes::routes())
        .merge(questionnaires::routes())
        .merge(assessments::routes())
        .merge(business::routes())
        .merge(catalog::routes())
        .merge(settings::routes())
}

pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Routes for a resource served entirely by the generic handlers.
pub(crate) fn crud<R: Resource>(collection: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(collection, get(list::<R>).post(create::<R>))
        .route(
            &format!("{}/:id", collection),
            get(fetch::<R>).put(update::<R>).delete(delete::<R>),
        )
}

/// Read-only routes for a seed-managed catalog.
pub(crate) fn read_only<R: Resource>(collection: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(collection, get(list::<R>))
        .route(&format!("{}/:id", collection), get(fetch::<R>))
}

// ============================================================================
// Request helpers
// ============================================================================

/// Decoded query string.
#[derive(Debug, Default, Clone)]
pub(crate) struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn parse(query: Option<&str>) -> Self {
        let pairs = url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// Every value of `key`, in order.
    pub fn all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Validated `filter` parameters.
    pub fn filter(&self, asserts: &[Assert]) -> hub_core::Result<Filter> {
        Filter::with_asserts(&self.all("filter"), asserts)
    }

    /// `sort` parameters applied to `sort`.
    pub fn sort(&self, sort: Sort) -> hub_core::Result<Sort> {
        sort.with(&self.all("sort").join(","))
    }
}

/// JSON request body; malformed bodies render as API errors.
pub(crate) struct Body(pub Value);

#[async_trait]
impl<S> FromRequest<S> for Body
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Run `f` against the database on the blocking pool.
pub(crate) async fn read<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> hub_core::Result<T> + Send + 'static,
{
    let db = state.hub.db().clone();
    Ok(tokio::task::spawn_blocking(move || db.read(f)).await??)
}

/// Run `f` in a write transaction on the blocking pool.
pub(crate) async fn write<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> hub_core::Result<T> + Send + 'static,
{
    let db = state.hub.db().clone();
    Ok(tokio::task::spawn_blocking(move || db.write(f)).await??)
}

/// Principal recorded as `createUser` on rows created through the API.
pub(crate) const API_USER: &str = "admin";

/// Keys owned by the hub: the seed identity and the creation stamp.
const STAMPED: [&str; 3] = ["uuid", "createUser", "createTime"];

/// Decode a POST body. Caller-supplied seed identity and creation stamps
/// are dropped; the row is created by [`API_USER`].
pub(crate) fn creation<R: DeserializeOwned>(body: &Value) -> hub_core::Result<R> {
    let mut body = body.clone();
    if let Value::Object(map) = &mut body {
        for key in STAMPED {
            map.remove(key);
        }
        map.insert("createUser".to_string(), json!(API_USER));
    }
    Ok(serde_json::from_value(body)?)
}

/// Decode a PUT body for row `id`, keeping the stored seed identity and
/// creation stamp.
pub(crate) fn replacement<R: Serialize + DeserializeOwned>(
    stored: &R,
    body: &Value,
    id: u64,
) -> hub_core::Result<R> {
    let stored = serde_json::to_value(stored)?;
    let mut body = body.clone();
    if let Value::Object(map) = &mut body {
        for key in STAMPED {
            match stored.get(key) {
                Some(value) => map.insert(key.to_string(), value.clone()),
                None => map.remove(key),
            };
        }
        map.insert("id".to_string(), json!(id));
    }
    Ok(serde_json::from_value(body)?)
}

/// Replace the members of relation `name` when `body` carries `key`.
pub(crate) fn members(
    conn: &Connection,
    table: &Table,
    name: &str,
    owner: u64,
    body: &Value,
    key: &str,
) -> hub_core::Result<()> {
    match body.get(key) {
        Some(Value::Null) => association::replace_ids(conn, table, name, owner, &[]),
        Some(value) => association::replace_value(conn, table, name, owner, value),
        None => Ok(()),
    }
}

/// `[{"id": n}, ...]` for the members of relation `name`.
pub(crate) fn refs(conn: &Connection, table: &Table, name: &str, owner: u64) -> hub_core::Result<Value> {
    let ids = association::related_ids(conn, table, name, owner)?;
    Ok(id_refs(&ids))
}

pub(crate) fn id_refs(ids: &[u64]) -> Value {
    Value::Array(ids.iter().map(|id| json!({ "id": id })).collect())
}

/// Insert `value` under `key` of a rendered object.
pub(crate) fn with_field(mut object: Value, key: &str, value: Value) -> Value {
    if let Value::Object(map) = &mut object {
        map.insert(key.to_string(), value);
    }
    object
}

// ============================================================================
// Generic resource handlers
// ============================================================================

/// A model served through the generic list/get/create/update/delete
/// handlers.
pub(crate) trait Resource: Record + Serialize + DeserializeOwned + Send + 'static {
    /// Filter whitelist of the list endpoint.
    fn asserts() -> Vec<Assert>;

    fn sort() -> Sort {
        Sort::new(Self::table())
    }

    /// List query for a validated filter.
    fn query(filter: &Filter) -> hub_core::Result<Query> {
        Ok(filter.apply(Query::select(Self::table().name), &[]))
    }

    /// Vet (and possibly amend) a body before it is written. `stored` is
    /// the current row on update.
    fn check(_conn: &Connection, _record: &mut Self, _stored: Option<&Self>) -> hub_core::Result<()> {
        Ok(())
    }

    /// Vet a delete of an existing row.
    fn check_delete(&self) -> hub_core::Result<()> {
        Ok(())
    }

    /// Write the relation members carried by the body.
    fn relations(_conn: &Connection, _id: u64, _body: &Value) -> hub_core::Result<()> {
        Ok(())
    }

    /// Rendered form, with relation members and derived fields.
    fn render(_resolvers: &Resolvers<'_>, record: Self) -> hub_core::Result<Value> {
        Ok(serde_json::to_value(record)?)
    }
}

/// Rows selected by the request's filter and sort, rendered.
pub(crate) fn select<R: Resource>(
    conn: &Connection,
    filter: &Filter,
    sort: &Sort,
) -> hub_core::Result<Vec<Value>> {
    let mut query = sort.sorted(R::query(filter)?);
    if !query.is_ordered() {
        query = query.order_by("id");
    }
    let records: Vec<R> = record::list(conn, &query)?;
    let resolvers = Resolvers::new(conn);
    records.into_iter().map(|r| R::render(&resolvers, r)).collect()
}

pub(crate) async fn list<R: Resource>(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<Vec<Value>>> {
    let params = Params::parse(query.as_deref());
    let filter = params.filter(&R::asserts())?;
    let sort = params.sort(R::sort())?;
    let rows = read(&state, move |conn| select::<R>(conn, &filter, &sort)).await?;
    Ok(Json(rows))
}

pub(crate) async fn fetch<R: Resource>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    let body = read(&state, move |conn| {
        let record: R = record::get(conn, id)?;
        R::render(&Resolvers::new(conn), record)
    })
    .await?;
    Ok(Json(body))
}

pub(crate) async fn create<R: Resource>(
    State(state): State<Arc<AppState>>,
    Body(body): Body,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let created = write(&state, move |tx| {
        let mut record: R = creation(&body)?;
        R::check(tx, &mut record, None)?;
        record::create(tx, &mut record)?;
        let id = record.id();
        R::relations(tx, id, &body)?;
        R::render(&Resolvers::new(tx), record::get(tx, id)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn update<R: Resource>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Body(body): Body,
) -> ApiResult<StatusCode> {
    write(&state, move |tx| {
        let stored: R = record::get(tx, id)?;
        let mut record: R = replacement(&stored, &body, id)?;
        R::check(tx, &mut record, Some(&stored))?;
        record::update(tx, &record)?;
        R::relations(tx, id, &body)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn delete<R: Resource>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    write(&state, move |tx| {
        match record::find::<R>(tx, id)? {
            Some(stored) => {
                stored.check_delete()?;
                record::delete::<R>(tx, id)?;
            }
            None => debug!("Delete of missing {} id={}", R::table().name, id),
        }
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::model::{JobFunction, TagCategory};
    use hub_core::{Database, Outcome, Seeder};
    use tempfile::TempDir;

    #[test]
    fn test_params_repeated_filter_and_sort() {
        let params = Params::parse(Some("filter=name:a&filter=id%3E2&sort=d:name&source="));
        assert_eq!(params.all("filter"), vec!["name:a", "id>2"]);
        assert_eq!(params.get("sort"), Some("d:name"));
        assert_eq!(params.get("source"), Some(""));
        assert_eq!(params.get("missing"), None);
        assert!(Params::parse(None).all("filter").is_empty());
    }

    #[test]
    fn test_replacement_keeps_creation_stamp() {
        let stored = TagCategory {
            id: 4,
            name: "Language".into(),
            create_user: "seed".into(),
            create_time: "2024-01-01T00:00:00Z".into(),
            ..Default::default()
        };
        let body = json!({"id": 99, "name": "Languages", "createTime": ""});
        let updated: TagCategory = replacement(&stored, &body, 4).unwrap();
        assert_eq!(updated.id, 4);
        assert_eq!(updated.name, "Languages");
        assert_eq!(updated.create_user, "seed");
        assert_eq!(updated.create_time, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_creation_drops_caller_stamps() {
        let body = json!({
            "name": "Developer",
            "uuid": "job-dev",
            "createUser": "seed",
            "createTime": "2020-01-01T00:00:00Z"
        });
        let created: JobFunction = creation(&body).unwrap();
        assert_eq!(created.name, "Developer");
        assert_eq!(created.uuid, None);
        assert_eq!(created.create_user, API_USER);
        assert!(created.create_time.is_empty());
    }

    #[test]
    fn test_replacement_keeps_seed_identity() {
        let stored = JobFunction {
            id: 2,
            name: "Developer".into(),
            ..Default::default()
        };
        let body = json!({"name": "Dev", "uuid": "job-dev"});
        let updated: JobFunction = replacement(&stored, &body, 2).unwrap();
        assert_eq!(updated.uuid, None);
        assert_eq!(updated.name, "Dev");
    }

    /// A row created through the API is user-owned: seeding a row of the
    /// same name renames it instead of adopting it.
    #[test]
    fn test_api_rows_survive_seeding() {
        let tmp = TempDir::new().unwrap();
        let seed = tmp.path().join("seed");
        std::fs::create_dir_all(&seed).unwrap();
        std::fs::write(
            seed.join("jobs.yaml"),
            "kind: JobFunction\nversion: 1\nitems:\n- uuid: job-dev\n  name: Developer\n",
        )
        .unwrap();

        let db = Database::open_in_memory().unwrap();
        let user_id = db
            .write(|tx| {
                let mut job: JobFunction = creation(&json!({"name": "Developer"}))?;
                record::create(tx, &mut job)?;
                Ok(job.id)
            })
            .unwrap();

        let outcome = Seeder::with_paths(&seed, tmp.path().join("files"), "")
            .seed(&db)
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);

        db.read(|conn| {
            let user: JobFunction = record::get(conn, user_id)?;
            assert_eq!(user.name, "Developer (1)");
            assert_eq!(user.uuid, None);
            assert_eq!(user.create_user, API_USER);
            let seeded: JobFunction = record::first(conn, "uuid = ?", vec!["job-dev".into()])?
                .unwrap();
            assert_eq!(seeded.name, "Developer");
            assert_ne!(seeded.id, user_id);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_with_field() {
        let value = with_field(json!({"id": 1}), "tags", id_refs(&[2, 3]));
        assert_eq!(value, json!({"id": 1, "tags": [{"id": 2}, {"id": 3}]}));
    }
}
