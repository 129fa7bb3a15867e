//! Questionnaires and assessments.
//!
//! Sections, questions and answers are stored as JSON documents on the
//! owning row. An assessment copies the sections of its questionnaire when it
//! is created and records answer selections in its own copy.

use super::keyed;
use crate::database::record::{
    boolean, get_id, get_json, get_pk, get_text, id_value, json, opt_text, text, Record,
};
use crate::error::Result;
use crate::schema;
use rusqlite::types::Value as SqliteValue;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub const RISK_RED: &str = "red";
pub const RISK_YELLOW: &str = "yellow";
pub const RISK_GREEN: &str = "green";
pub const RISK_UNKNOWN: &str = "unknown";

/// Symbolic tag reference resolved by category and tag name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategorizedTag {
    pub category: String,
    pub tag: String,
}

impl CategorizedTag {
    pub fn new(category: &str, tag: &str) -> Self {
        Self {
            category: category.to_string(),
            tag: tag.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default = "unknown_risk")]
    pub risk: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub mitigation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apply_tags: Vec<CategorizedTag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_answer_for: Vec<CategorizedTag>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_answered: bool,
}

fn unknown_risk() -> String {
    RISK_UNKNOWN.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_for: Vec<CategorizedTag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_for: Vec<CategorizedTag>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl Question {
    /// The selected answer, if any.
    pub fn selected(&self) -> Option<&Answer> {
        self.answers.iter().find(|a| a.selected)
    }

    pub fn answered(&self) -> bool {
        self.selected().is_some()
    }

    /// Risk of the selected answer; unknown when unanswered.
    pub fn risk(&self) -> &str {
        self.selected().map_or(RISK_UNKNOWN, |a| a.risk.as_str())
    }

    /// Tags applied by the selected answer.
    pub fn tags(&self) -> &[CategorizedTag] {
        self.selected().map_or(&[], |a| a.apply_tags.as_slice())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Risk thresholds as percentages of questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default)]
    pub red: u32,
    #[serde(default)]
    pub yellow: u32,
    #[serde(default)]
    pub unknown: u32,
}

/// Message shown for each risk level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMessages {
    #[serde(default)]
    pub red: String,
    #[serde(default)]
    pub yellow: String,
    #[serde(default)]
    pub green: String,
    #[serde(default)]
    pub unknown: String,
}

fn required_default() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    #[serde(default)]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "required_default")]
    pub required: bool,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub risk_messages: RiskMessages,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Questionnaire {
    /// Seeded questionnaires carry a uuid and are read-only apart from
    /// `required`.
    pub fn builtin(&self) -> bool {
        self.uuid.is_some()
    }
}

impl Record for Questionnaire {
    keyed!(schema::QUESTIONNAIRE);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let required: i64 = row.get("required")?;
        Ok(Self {
            id: get_pk(row)?,
            uuid: row.get("uuid")?,
            name: row.get("name")?,
            description: get_text(row, "description")?,
            required: required != 0,
            sections: get_json(row, "sections")?,
            thresholds: get_json(row, "thresholds")?,
            risk_messages: get_json(row, "risk_messages")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("uuid", opt_text(&self.uuid)),
            ("name", text(&self.name)),
            ("description", text(&self.description)),
            ("required", boolean(self.required)),
            ("sections", json(&self.sections)?),
            ("thresholds", json(&self.thresholds)?),
            ("risk_messages", json(&self.risk_messages)?),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}

/// Filled-in questionnaire owned by an application or an archetype.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[serde(default)]
    pub id: u64,
    pub questionnaire_id: u64,
    #[serde(default)]
    pub application_id: Option<u64>,
    #[serde(default)]
    pub archetype_id: Option<u64>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub risk_messages: RiskMessages,
    #[serde(default)]
    pub create_user: String,
    #[serde(default)]
    pub create_time: String,
}

impl Assessment {
    /// New assessment copying the questionnaire's sections and thresholds.
    pub fn from_questionnaire(questionnaire: &Questionnaire) -> Self {
        Self {
            questionnaire_id: questionnaire.id,
            sections: questionnaire.sections.clone(),
            thresholds: questionnaire.thresholds,
            risk_messages: questionnaire.risk_messages.clone(),
            ..Default::default()
        }
    }
}

impl Record for Assessment {
    keyed!(schema::ASSESSMENT);

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let questionnaire_id: i64 = row.get("questionnaire_id")?;
        Ok(Self {
            id: get_pk(row)?,
            questionnaire_id: questionnaire_id.max(0) as u64,
            application_id: get_id(row, "application_id")?,
            archetype_id: get_id(row, "archetype_id")?,
            sections: get_json(row, "sections")?,
            thresholds: get_json(row, "thresholds")?,
            risk_messages: get_json(row, "risk_messages")?,
            create_user: get_text(row, "create_user")?,
            create_time: get_text(row, "create_time")?,
        })
    }

    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>> {
        Ok(vec![
            ("questionnaire_id", SqliteValue::Integer(self.questionnaire_id as i64)),
            ("application_id", id_value(self.application_id)),
            ("archetype_id", id_value(self.archetype_id)),
            ("sections", json(&self.sections)?),
            ("thresholds", json(&self.thresholds)?),
            ("risk_messages", json(&self.risk_messages)?),
            ("create_user", text(&self.create_user)),
            ("create_time", text(&self.create_time)),
        ])
    }
}
