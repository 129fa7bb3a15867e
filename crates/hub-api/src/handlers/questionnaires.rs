//! Questionnaire handlers.
//!
//! Seeded (builtin) questionnaires are owned by the seed bundle: only their
//! `required` flag may change and they cannot be deleted.

use super::{crud, Resource};
use crate::server::AppState;
use axum::Router;
use hub_core::model::Questionnaire;
use hub_core::{Assert, HubError};
use rusqlite::Connection;
use std::sync::Arc;

pub(super) fn routes() -> Router<Arc<AppState>> {
    crud::<Questionnaire>("/questionnaires")
}

impl Resource for Questionnaire {
    fn asserts() -> Vec<Assert> {
        vec![
            Assert::literal("id"),
            Assert::string("name"),
            Assert::literal("required"),
        ]
    }

    fn check(_conn: &Connection, record: &mut Self, stored: Option<&Self>) -> hub_core::Result<()> {
        match stored {
            Some(stored) if stored.builtin() => {
                *record = Questionnaire {
                    required: record.required,
                    ..stored.clone()
                };
            }
            Some(stored) => record.uuid = stored.uuid.clone(),
            None => record.uuid = None,
        }
        Ok(())
    }

    fn check_delete(&self) -> hub_core::Result<()> {
        if self.builtin() {
            return Err(HubError::forbidden(format!(
                "questionnaire id={} is builtin.",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::Database;

    fn builtin() -> Questionnaire {
        Questionnaire {
            id: 3,
            uuid: Some("q-legacy".into()),
            name: "Legacy".into(),
            required: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_builtin_only_toggles_required() {
        let db = Database::open_in_memory().unwrap();
        let stored = builtin();
        let mut body = Questionnaire {
            id: 3,
            name: "Renamed".into(),
            required: false,
            ..Default::default()
        };
        db.read(|conn| Questionnaire::check(conn, &mut body, Some(&stored)))
            .unwrap();
        assert_eq!(body.name, "Legacy");
        assert_eq!(body.uuid.as_deref(), Some("q-legacy"));
        assert!(!body.required);
    }

    #[test]
    fn test_created_questionnaires_are_not_builtin() {
        let db = Database::open_in_memory().unwrap();
        let mut body = builtin();
        db.read(|conn| Questionnaire::check(conn, &mut body, None)).unwrap();
        assert!(!body.builtin());
    }

    #[test]
    fn test_builtin_cannot_be_deleted() {
        assert_eq!(builtin().check_delete().unwrap_err().status_code(), 403);
        let mut user = builtin();
        user.uuid = None;
        assert!(user.check_delete().is_ok());
    }
}
