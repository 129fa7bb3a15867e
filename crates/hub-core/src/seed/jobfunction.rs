use super::{reconcile, Context, Document, KindSeeder};
use crate::database::record;
use crate::error::Result;
use crate::model::JobFunction;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JobFunctionSeed {
    pub uuid: String,
    pub name: String,
}

#[derive(Debug, Default)]
pub(crate) struct JobFunctions {
    items: Vec<JobFunctionSeed>,
}

impl KindSeeder for JobFunctions {
    fn with(&mut self, document: &Document) -> Result<()> {
        self.items.extend(document.decode::<JobFunctionSeed>()?);
        Ok(())
    }

    fn apply(&self, ctx: &Context<'_>) -> Result<()> {
        info!("Applying JobFunctions: count={}", self.items.len());
        for seed in &self.items {
            let mut model: JobFunction = reconcile(ctx.conn, &seed.uuid, &seed.name)?;
            model.uuid = Some(seed.uuid.clone());
            model.name = seed.name.clone();
            record::save(ctx.conn, &mut model)?;
        }
        Ok(())
    }
}
