//! Settings handlers.
//!
//! Keys beginning with `.` are written by the hub itself (seed checksum,
//! build) and are read-only here.

use super::{read, write, Body};
use crate::error::ApiResult;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use hub_core::model::{setting, Setting};
use hub_core::HubError;
use serde_json::{json, Value};
use std::sync::Arc;

pub(super) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/settings", get(setting_list))
        .route(
            "/settings/:key",
            get(setting_get).put(setting_put).delete(setting_delete),
        )
}

fn writable(key: &str) -> hub_core::Result<()> {
    if Setting::reserved(key) {
        return Err(HubError::forbidden(format!("setting '{}' is read-only.", key)));
    }
    Ok(())
}

async fn setting_list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Value>>> {
    let settings = read(&state, setting::list).await?;
    Ok(Json(
        settings
            .into_iter()
            .map(|s| json!({"key": s.key, "value": s.value}))
            .collect(),
    ))
}

async fn setting_get(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    let value = read(&state, move |conn| {
        setting::find(conn, &key)?
            .map(|s| s.value)
            .ok_or_else(|| HubError::not_found("setting", &key))
    })
    .await?;
    Ok(Json(value))
}

async fn setting_put(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Body(value): Body,
) -> ApiResult<StatusCode> {
    writable(&key)?;
    write(&state, move |tx| setting::set(tx, &key, &value)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn setting_delete(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    writable(&key)?;
    write(&state, move |tx| setting::delete(tx, &key)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_keys_are_read_only() {
        assert_eq!(writable(".hub.db.seed").unwrap_err().status_code(), 403);
        assert!(writable("ui.target.order").is_ok());
    }
}
