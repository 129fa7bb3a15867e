//! Tags and tag categories.

use super::keyed;
use crate::database::record::{self, get_pk, get_text, opt_text, text, Record};
use crate::database::Query;
use crate::error::Result;
use crate::schema;
use rusqlite::types::Value as SqliteValue;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

/// Namespace for tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCategory {
    #[serde(default)]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for TagCategory {
    keyed!(schema::TAG_CATEGORY);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            uuid: row.get("uuid")?,
            name: row.get("name")?,
            color: get_text(row, "color")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("uuid", opt_text(&self.uuid)),
            ("name", text(&self.name)),
            ("color", text(&self.color)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

/// Labeled attribute within a category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(default)]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub category_id: u64,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Tag {
    pub fn new(name: &str, category_id: u64) -> Self {
        Self {
            name: name.to_string(),
            category_id,
            ..Default::default()
        }
    }
}

impl Record for Tag {
    keyed!(schema::TAG);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let category_id: i64 = row.get("category_id")?;
        Ok(Self {
            id: get_pk(row)?,
            uuid: row.get("uuid")?,
            name: row.get("name")?,
            category_id: category_id.max(0) as u64,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("uuid", opt_text(&self.uuid)),
            ("name", text(&self.name)),
            ("category_id", SqliteValue::Integer(self.category_id as i64)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

/// Tags of a category ordered by id.
pub fn tags_in_category(conn: &Connection, category_id: u64) -> Result<Vec<Tag>> {
    let query = Query::select("tag")
        .filter("category_id = ?", vec![category_id.into()])
        .order_by("id");
    record::list(conn, &query)
}
