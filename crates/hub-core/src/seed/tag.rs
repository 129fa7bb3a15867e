use super::{reconcile, Context, Document, KindSeeder};
use crate::database::record;
use crate::error::Result;
use crate::model::{Tag, TagCategory};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TagSeed {
    pub uuid: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TagCategorySeed {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub tags: Vec<TagSeed>,
}

#[derive(Debug, Default)]
pub(crate) struct TagCategories {
    items: Vec<TagCategorySeed>,
}

impl KindSeeder for TagCategories {
    fn with(&mut self, document: &Document) -> Result<()> {
        self.items.extend(document.decode::<TagCategorySeed>()?);
        Ok(())
    }

    fn apply(&self, ctx: &Context<'_>) -> Result<()> {
        info!("Applying TagCategories: count={}", self.items.len());
        for seed in &self.items {
            let mut category: TagCategory = reconcile(ctx.conn, &seed.uuid, &seed.name)?;
            category.uuid = Some(seed.uuid.clone());
            category.name = seed.name.clone();
            category.color = seed.color.clone();
            record::save(ctx.conn, &mut category)?;
            apply_tags(ctx, &category, &seed.tags)?;
        }
        Ok(())
    }
}

/// Tags are matched by uuid, then by name within the category.
fn apply_tags(ctx: &Context<'_>, category: &TagCategory, tags: &[TagSeed]) -> Result<()> {
    for seed in tags {
        let by_uuid: Option<Tag> = record::first(ctx.conn, "uuid = ?", vec![seed.uuid.as_str().into()])?;
        let found = match by_uuid {
            Some(tag) => Some(tag),
            None => record::first(
                ctx.conn,
                "name = ? AND category_id = ?",
                vec![seed.name.as_str().into(), category.id.into()],
            )?,
        };
        let mut tag = found.unwrap_or_default();
        tag.uuid = Some(seed.uuid.clone());
        tag.name = seed.name.clone();
        tag.category_id = category.id;
        record::save(ctx.conn, &mut tag)?;
    }
    Ok(())
}
