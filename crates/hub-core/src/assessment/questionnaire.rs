//! Questionnaire resolver.

use crate::error::Result;
use crate::model::Assessment;
use rusqlite::Connection;
use std::collections::HashSet;

/// Ids of the questionnaires marked required.
#[derive(Debug, Default)]
pub struct QuestionnaireResolver {
    required: HashSet<u64>,
}

impl QuestionnaireResolver {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare("SELECT id FROM questionnaire WHERE required = 1")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        let ids = rows.collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(Self::with(ids.into_iter().map(|id| id.max(0) as u64)))
    }

    pub fn with(required: impl IntoIterator<Item = u64>) -> Self {
        Self {
            required: required.into_iter().collect(),
        }
    }

    pub fn required(&self, id: u64) -> bool {
        self.required.contains(&id)
    }

    /// True when every required questionnaire has a complete assessment
    /// among `assessments`. False when nothing is required.
    pub fn assessed<'a>(&self, assessments: impl IntoIterator<Item = &'a Assessment>) -> bool {
        if self.required.is_empty() {
            return false;
        }
        let answered: HashSet<u64> = assessments
            .into_iter()
            .filter(|a| self.required(a.questionnaire_id) && a.complete())
            .map(|a| a.questionnaire_id)
            .collect();
        self.required.is_subset(&answered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, Question, Section};

    fn assessment(questionnaire_id: u64, complete: bool) -> Assessment {
        Assessment {
            questionnaire_id,
            sections: vec![Section {
                questions: vec![Question {
                    answers: vec![Answer {
                        selected: complete,
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_assessed() {
        let r = QuestionnaireResolver::with([1, 2]);
        assert!(r.required(1));
        assert!(!r.required(3));
        assert!(r.assessed(&[assessment(1, true), assessment(2, true)]));
        assert!(!r.assessed(&[assessment(1, true), assessment(2, false)]));
        assert!(!r.assessed(&[assessment(1, true), assessment(3, true)]));
        assert!(!r.assessed(&[]));
    }

    #[test]
    fn test_nothing_required() {
        let r = QuestionnaireResolver::with([]);
        assert!(!r.assessed(&[assessment(1, true)]));
    }
}
