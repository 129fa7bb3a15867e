//! Business context: job functions, stakeholders, services, waves and
//! platforms.

use super::keyed;
use crate::database::record::{get_id, get_pk, get_text, id_value, opt_text, text, Record};
use crate::error::Result;
use crate::schema;
use rusqlite::types::Value as SqliteValue;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFunction {
    #[serde(default)]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for JobFunction {
    keyed!(schema::JOB_FUNCTION);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            uuid: row.get("uuid")?,
            name: row.get("name")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("uuid", opt_text(&self.uuid)),
            ("name", text(&self.name)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stakeholder {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub job_function_id: Option<u64>,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for Stakeholder {
    keyed!(schema::STAKEHOLDER);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            name: row.get("name")?,
            email: row.get("email")?,
            job_function_id: get_id(row, "job_function_id")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("name", text(&self.name)),
            ("email", text(&self.email)),
            ("job_function_id", id_value(self.job_function_id)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeholderGroup {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for StakeholderGroup {
    keyed!(schema::STAKEHOLDER_GROUP);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            name: row.get("name")?,
            description: get_text(row, "description")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessService {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stakeholder_id: Option<u64>,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for BusinessService {
    keyed!(schema::BUSINESS_SERVICE);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            name: row.get("name")?,
            description: get_text(row, "description")?,
            stakeholder_id: get_id(row, "stakeholder_id")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("stakeholder_id", id_value(self.stakeholder_id)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationWave {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for MigrationWave {
    keyed!(schema::MIGRATION_WAVE);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            name: get_text(row, "name")?,
            start_date: get_text(row, "start_date")?,
            end_date: get_text(row, "end_date")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("name", text(&self.name)),
            ("start_date", text(&self.start_date)),
            ("end_date", text(&self.end_date)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Record for Platform {
    keyed!(schema::PLATFORM);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: get_pk(row)?,
            name: row.get("name")?,
            kind: get_text(row, "kind")?,
            url: get_text(row, "url")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("name", text(&self.name)),
            ("kind", text(&self.kind)),
            ("url", text(&self.url)),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}
