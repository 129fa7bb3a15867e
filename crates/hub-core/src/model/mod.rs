//! Persisted models.
//!
//! Each model maps to one keyed table through [`Record`](crate::database::Record).
//! Relation members (join tables) are not part of the row; they are read with
//! [`association::related_ids`](crate::association::related_ids) and written
//! with the association writer.

/// Expands to the `table`, `id`, `set_id` and `stamp` items of a
/// [`Record`](crate::database::Record) impl for a model with `id` and
/// `create_time` fields.
macro_rules! keyed {
    ($table:path) => {
        fn table() -> &'static crate::schema::Table {
            &$table
        }

        fn id(&self) -> u64 {
            self.id
        }

        fn set_id(&mut self, id: u64) {
            self.id = id;
        }

        fn stamp(&mut self, now: &str) {
            if self.create_time.is_empty() {
                self.create_time = now.to_string();
            }
        }
    };
}

pub(crate) use keyed;

mod application;
mod archetype;
mod business;
mod catalog;
mod questionnaire;
pub mod setting;
mod tag;

pub use application::{Application, ApplicationTag, Repository, TagSource};
pub use archetype::{Archetype, TargetProfile};
pub use business::{BusinessService, JobFunction, MigrationWave, Platform, Stakeholder, StakeholderGroup};
pub use catalog::{File, Generator, Label, Rule, RuleSet, Target};
pub use questionnaire::{
    Answer, Assessment, CategorizedTag, Question, Questionnaire, RiskMessages, Section, Thresholds,
    RISK_GREEN, RISK_RED, RISK_UNKNOWN, RISK_YELLOW,
};
pub use setting::Setting;
pub use tag::{tags_in_category, Tag, TagCategory};

use serde::{Deserialize, Serialize};

/// Reference to another row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    pub id: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl Ref {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Ids of a reference list.
pub fn ref_ids(refs: &[Ref]) -> Vec<u64> {
    refs.iter().map(|r| r.id).collect()
}
