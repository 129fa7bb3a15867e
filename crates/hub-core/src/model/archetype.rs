//! Archetypes and their target profiles.

use super::keyed;
use crate::database::record::{get_id, get_pk, get_text, id_value, text, Record};
use crate::error::Result;
use crate::schema;
use rusqlite::types::Value as SqliteValue;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Named cluster of applications defined by a criteria tag set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Archetype {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for Archetype {
    keyed!(schema::ARCHETYPE);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            name: row.get("name")?,
            description: get_text(row, "description")?,
            comments: get_text(row, "comments")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("comments", text(&self.comments)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

/// Migration target profile owned by an archetype.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetProfile {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing)]
    pub archetype_id: Option<u64>,
    #[serde(default, skip_serializing)]
    pub create_user: String,
    #[serde(default, skip_serializing)]
    pub create_time: String,
}

impl Record for TargetProfile {
    keyed!(schema::TARGET_PROFILE);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            name: row.get("name")?,
            archetype_id: get_id(row, "archetype_id")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("name", text(&self.name)),
            ("archetype_id", id_value(self.archetype_id)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}
