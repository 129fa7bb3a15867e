use super::{reconcile, Context, Document, KindSeeder};
use crate::database::record;
use crate::error::Result;
use crate::model::{Generator, Repository};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeneratorSeed {
    pub uuid: String,
    #[serde(default)]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default)]
pub(crate) struct Generators {
    items: Vec<GeneratorSeed>,
}

impl KindSeeder for Generators {
    fn with(&mut self, document: &Document) -> Result<()> {
        self.items.extend(document.decode::<GeneratorSeed>()?);
        Ok(())
    }

    fn apply(&self, ctx: &Context<'_>) -> Result<()> {
        info!("Applying Generators: count={}", self.items.len());
        for seed in &self.items {
            let mut generator: Generator = reconcile(ctx.conn, &seed.uuid, &seed.name)?;
            generator.uuid = Some(seed.uuid.clone());
            generator.kind = seed.kind.clone();
            generator.name = seed.name.clone();
            generator.description = seed.description.clone();
            generator.repository = seed.repository.clone();
            generator.params = seed.params.clone();
            generator.values = seed.values.clone();
            record::save(ctx.conn, &mut generator)?;
        }
        Ok(())
    }
}
