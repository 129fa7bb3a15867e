//! Seed-managed catalogs: rule sets, targets, generators and stored files.

use super::keyed;
use super::Repository;
use crate::database::record::{
    boolean, get_id, get_json, get_pk, get_text, id_value, json, opt_text, text, Record,
};
use crate::error::Result;
use crate::schema;
use rusqlite::types::Value as SqliteValue;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stored file; content lives under the bucket `files` directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for File {
    keyed!(schema::FILE);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            name: row.get("name")?,
            path: get_text(row, "path")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("name", text(&self.name)),
            ("path", text(&self.path)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

/// Named collection of analysis rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default)]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for RuleSet {
    keyed!(schema::RULE_SET);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            uuid: row.get("uuid")?,
            kind: get_text(row, "kind")?,
            name: row.get("name")?,
            description: get_text(row, "description")?,
            repository: get_json(row, "repository")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("uuid", opt_text(&self.uuid)),
            ("kind", text(&self.kind)),
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("repository", json(&self.repository)?),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

/// Analysis rule backed by a stored file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub rule_set_id: Option<u64>,
    #[serde(default)]
    pub file_id: Option<u64>,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for Rule {
    keyed!(schema::RULE);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            name: get_text(row, "name")?,
            description: get_text(row, "description")?,
            labels: get_json(row, "labels")?,
            rule_set_id: get_id(row, "rule_set_id")?,
            file_id: get_id(row, "file_id")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("labels", json(&self.labels)?),
            ("rule_set_id", id_value(self.rule_set_id)),
            ("file_id", id_value(self.file_id)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

/// Target label choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub name: String,
    pub label: String,
}

/// Migration target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default)]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub choice: bool,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub image_id: Option<u64>,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for Target {
    keyed!(schema::TARGET);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let choice: i64 = row.get("choice")?;
        Ok(Self {
            id: get_pk(row)?,
            uuid: row.get("uuid")?,
            name: row.get("name")?,
            description: get_text(row, "description")?,
            provider: get_text(row, "provider")?,
            choice: choice != 0,
            labels: get_json(row, "labels")?,
            image_id: get_id(row, "image_id")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("uuid", opt_text(&self.uuid)),
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("provider", text(&self.provider)),
            ("choice", boolean(self.choice)),
            ("labels", json(&self.labels)?),
            ("image_id", id_value(self.image_id)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

/// Asset generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generator {
    #[serde(default)]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for Generator {
    keyed!(schema::GENERATOR);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            uuid: row.get("uuid")?,
            kind: get_text(row, "kind")?,
            name: row.get("name")?,
            description: get_text(row, "description")?,
            repository: get_json(row, "repository")?,
            params: get_json(row, "params")?,
            values: get_json(row, "template_values")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("uuid", opt_text(&self.uuid)),
            ("kind", text(&self.kind)),
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("repository", json(&self.repository)?),
            ("params", json(&self.params)?),
            ("template_values", json(&self.values)?),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}
