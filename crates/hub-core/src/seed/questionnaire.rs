use super::{reconcile, Context, Document, KindSeeder};
use crate::database::record;
use crate::error::Result;
use crate::model::{Questionnaire, RiskMessages, Section, Thresholds};
use serde::Deserialize;
use tracing::info;

fn required_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionnaireSeed {
    pub uuid: String,
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
}

#[derive(Debug, Default)]
pub(crate) struct Questionnaires {
    items: Vec<QuestionnaireSeed>,
}

impl KindSeeder for Questionnaires {
    fn with(&mut self, document: &Document) -> Result<()> {
        self.items.extend(document.decode::<QuestionnaireSeed>()?);
        Ok(())
    }

    fn apply(&self, ctx: &Context<'_>) -> Result<()> {
        info!("Applying Questionnaires: count={}", self.items.len());
        for seed in &self.items {
            let mut questionnaire: Questionnaire = reconcile(ctx.conn, &seed.uuid, &seed.name)?;
            // Users own `required` once the questionnaire exists.
            if questionnaire.id == 0 {
                questionnaire.required = seed.required;
            }
            questionnaire.uuid = Some(seed.uuid.clone());
            questionnaire.name = seed.name.clone();
            questionnaire.description = seed.description.clone();
            questionnaire.sections = seed.sections.clone();
            questionnaire.thresholds = seed.thresholds;
            questionnaire.risk_messages = seed.risk_messages.clone();
            record::save(ctx.conn, &mut questionnaire)?;
        }
        Ok(())
    }
}
