use super::order::reorder;
use super::{reconcile, Context, Document, KindSeeder};
use crate::config::SeedConfig;
use crate::database::record;
use crate::error::Result;
use crate::model::{Label, Target};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TargetSeed {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub choice: bool,
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Image file, relative to the seed document.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(skip)]
    pub base: PathBuf,
}

#[derive(Debug, Default)]
pub(crate) struct Targets {
    items: Vec<TargetSeed>,
}

impl KindSeeder for Targets {
    fn with(&mut self, document: &Document) -> Result<()> {
        for mut item in document.decode::<TargetSeed>()? {
            item.base = document.base().to_path_buf();
            self.items.push(item);
        }
        Ok(())
    }

    fn apply(&self, ctx: &Context<'_>) -> Result<()> {
        info!("Applying Targets: count={}", self.items.len());
        let mut seed_ids = Vec::with_capacity(self.items.len());
        for seed in &self.items {
            let mut target: Target = reconcile(ctx.conn, &seed.uuid, &seed.name)?;
            match &seed.image {
                Some(image) => {
                    let file = ctx.store_file(&seed.base.join(image), target.image_id)?;
                    target.image_id = Some(file.id);
                }
                None => {
                    if let Some(id) = target.image_id.take() {
                        ctx.drop_file(id)?;
                    }
                }
            }
            target.uuid = Some(seed.uuid.clone());
            target.name = seed.name.clone();
            target.description = seed.description.clone();
            target.provider = seed.provider.clone();
            target.choice = seed.choice;
            target.labels = seed.labels.clone();
            record::save(ctx.conn, &mut target)?;
            seed_ids.push(target.id);
        }

        self.delete_unwanted(ctx)?;

        let present: Vec<u64> = record::list_all::<Target>(ctx.conn)?
            .into_iter()
            .map(|t| t.id)
            .collect();
        reorder(ctx.conn, SeedConfig::TARGET_ORDER_KEY, &seed_ids, &present)
    }
}

impl Targets {
    /// Seeded targets are authoritative: any target carrying a uuid that is
    /// no longer seeded is deleted. User targets (no uuid) are kept.
    fn delete_unwanted(&self, ctx: &Context<'_>) -> Result<()> {
        let wanted: HashSet<&str> = self.items.iter().map(|t| t.uuid.as_str()).collect();
        for target in record::list_all::<Target>(ctx.conn)? {
            let Some(uuid) = target.uuid.as_deref() else {
                continue;
            };
            if !wanted.contains(uuid) {
                info!("Deleting unseeded target '{}' ({})", target.name, uuid);
                record::delete::<Target>(ctx.conn, target.id)?;
                if let Some(id) = target.image_id {
                    ctx.drop_file(id)?;
                }
            }
        }
        Ok(())
    }
}
