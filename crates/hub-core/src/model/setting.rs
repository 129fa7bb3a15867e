//! Key/value settings.
//!
//! Values are JSON documents. Keys beginning with `.` are reserved for the
//! hub itself (seed checksum, build marker).

use super::keyed;
use crate::database::record::{self, get_pk, get_text, text, Record};
use crate::error::Result;
use crate::schema;
use rusqlite::types::Value as SqliteValue;
use rusqlite::{params, Connection, Row};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    #[serde(skip)]
    pub id: u64,
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(skip)]
    pub create_user: String,
    #[serde(skip)]
    pub create_time: String,
}

impl Setting {
    /// Reserved keys are not writable through the API.
    pub fn reserved(key: &str) -> bool {
        key.starts_with('.')
    }
}

impl Record for Setting {
    keyed!(schema::SETTING);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            key: row.get("key")?,
            value: record::get_json(row, "value")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("key", text(&self.key)),
            ("value", record::json(&self.value)?),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

/// Setting row by key.
pub fn find(conn: &Connection, key: &str) -> Result<Option<Setting>> {
    record::first(conn, "key = ?", vec![key.into()])
}

/// Decoded value of `key`; `None` when unset or null.
pub fn get<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    match find(conn, key)? {
        Some(setting) if !setting.value.is_null() => Ok(Some(serde_json::from_value(setting.value)?)),
        _ => Ok(None),
    }
}

/// Create or replace the value of `key`.
pub fn set<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let value = serde_json::to_value(value)?;
    match find(conn, key)? {
        Some(mut setting) => {
            setting.value = value;
            record::update(conn, &setting)
        }
        None => {
            let mut setting = Setting {
                key: key.to_string(),
                value,
                ..Default::default()
            };
            record::create(conn, &mut setting)
        }
    }
}

/// Delete `key`; returns false when it was not set.
pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
    Ok(conn.execute("DELETE FROM setting WHERE key = ?1", params![key])? > 0)
}

/// All settings ordered by key.
pub fn list(conn: &Connection) -> Result<Vec<Setting>> {
    let query = crate::database::Query::select("setting").order_by("key");
    record::list(conn, &query)
}
