//! Applications.

use super::keyed;
use crate::database::record::{get_id, get_json, get_pk, get_text, id_value, json, text, Record};
use crate::error::Result;
use crate::schema;
use rusqlite::types::Value as SqliteValue;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

/// Source coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// A software system being assessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub binary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Repository>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<serde_json::Value>,
    #[serde(default)]
    pub business_service_id: Option<u64>,
    #[serde(default)]
    pub owner_id: Option<u64>,
    #[serde(default)]
    pub migration_wave_id: Option<u64>,
    #[serde(default)]
    pub platform_id: Option<u64>,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for Application {
    keyed!(schema::APPLICATION);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            name: row.get("name")?,
            description: get_text(row, "description")?,
            comments: get_text(row, "comments")?,
            binary: get_text(row, "binary")?,
            repository: get_json(row, "repository")?,
            assets: get_json(row, "assets")?,
            coordinates: get_json(row, "coordinates")?,
            business_service_id: get_id(row, "business_service_id")?,
            owner_id: get_id(row, "owner_id")?,
            migration_wave_id: get_id(row, "migration_wave_id")?,
            platform_id: get_id(row, "platform_id")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("comments", text(&self.comments)),
            ("binary", text(&self.binary)),
            ("repository", json(&self.repository)?),
            ("assets", json(&self.assets)?),
            ("coordinates", json(&self.coordinates)?),
            ("business_service_id", id_value(self.business_service_id)),
            ("owner_id", id_value(self.owner_id)),
            ("migration_wave_id", id_value(self.migration_wave_id)),
            ("platform_id", id_value(self.platform_id)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

/// Origin of an effective application tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    /// Attached directly (stored with an empty source).
    #[serde(rename = "")]
    User,
    Archetype,
    Assessment,
}

impl TagSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagSource::User => "",
            TagSource::Archetype => "archetype",
            TagSource::Assessment => "assessment",
        }
    }
}

/// Stored application tag row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationTag {
    pub tag_id: u64,
    #[serde(default)]
    pub source: String,
}

impl Application {
    /// Stored tags of an application, every source, ordered by tag id.
    pub fn tags(conn: &Connection, id: u64) -> Result<Vec<ApplicationTag>> {
        let mut stmt = conn.prepare(
            "SELECT tag_id, source FROM application_tags WHERE application_id = ?1 ORDER BY tag_id, source",
        )?;
        let rows = stmt.query_map(params![id as i64], |row| {
            let tag_id: i64 = row.get(0)?;
            Ok(ApplicationTag {
                tag_id: tag_id.max(0) as u64,
                source: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Distinct tag ids of an application across all sources.
    pub fn tag_ids(conn: &Connection, id: u64) -> Result<Vec<u64>> {
        let mut ids: Vec<u64> = Self::tags(conn, id)?.into_iter().map(|t| t.tag_id).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}
