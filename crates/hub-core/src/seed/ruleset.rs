use super::order::reorder;
use super::{reconcile, Context, Document, KindSeeder};
use crate::association;
use crate::config::SeedConfig;
use crate::database::{record, Query};
use crate::error::Result;
use crate::model::{Repository, Rule, RuleSet};
use crate::schema;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RuleSeed {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Rule file, relative to the seed document.
    pub path: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RuleSetSeed {
    pub uuid: String,
    #[serde(default)]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub rules: Vec<RuleSeed>,
    /// Uuids of rule sets this one depends on.
    #[serde(default, alias = "dependsOn")]
    pub dependencies: Vec<String>,
    #[serde(skip)]
    pub base: PathBuf,
}

#[derive(Debug, Default)]
pub(crate) struct RuleSets {
    items: Vec<RuleSetSeed>,
}

impl KindSeeder for RuleSets {
    fn with(&mut self, document: &Document) -> Result<()> {
        for mut item in document.decode::<RuleSetSeed>()? {
            item.base = document.base().to_path_buf();
            self.items.push(item);
        }
        Ok(())
    }

    fn apply(&self, ctx: &Context<'_>) -> Result<()> {
        info!("Applying RuleSets: count={}", self.items.len());
        let mut by_uuid: HashMap<&str, u64> = HashMap::new();
        let mut seed_ids = Vec::with_capacity(self.items.len());

        for seed in &self.items {
            let mut rule_set: RuleSet = reconcile(ctx.conn, &seed.uuid, &seed.name)?;
            rule_set.uuid = Some(seed.uuid.clone());
            rule_set.kind = seed.kind.clone();
            rule_set.name = seed.name.clone();
            rule_set.description = seed.description.clone();
            rule_set.repository = seed.repository.clone();
            record::save(ctx.conn, &mut rule_set)?;
            apply_rules(ctx, &rule_set, seed)?;
            by_uuid.insert(seed.uuid.as_str(), rule_set.id);
            seed_ids.push(rule_set.id);
        }

        // Dependencies may point forward, so they resolve once all sets exist.
        for seed in &self.items {
            let Some(&id) = by_uuid.get(seed.uuid.as_str()) else {
                continue;
            };
            let mut depends = Vec::with_capacity(seed.dependencies.len());
            for uuid in &seed.dependencies {
                match by_uuid.get(uuid.as_str()) {
                    Some(&dep) => depends.push(dep),
                    None => warn!("RuleSet '{}' depends on unknown uuid {}", seed.name, uuid),
                }
            }
            association::replace_ids(ctx.conn, &schema::RULE_SET, "dependsOn", id, &depends)?;
        }

        let present: Vec<u64> = record::list_all::<RuleSet>(ctx.conn)?
            .into_iter()
            .map(|r| r.id)
            .collect();
        reorder(ctx.conn, SeedConfig::RULESET_ORDER_KEY, &seed_ids, &present)
    }
}

/// Replace the rules of `rule_set`, copying each rule file into the store.
///
/// File rows of the previous rules are reused in order; any left over are
/// dropped.
fn apply_rules(ctx: &Context<'_>, rule_set: &RuleSet, seed: &RuleSetSeed) -> Result<()> {
    let previous: Vec<u64> = previous_rules(ctx, rule_set.id)?
        .into_iter()
        .filter_map(|r| r.file_id)
        .collect();
    let mut reusable = previous.iter().copied();

    let mut rules = Vec::with_capacity(seed.rules.len());
    for rule in &seed.rules {
        let file = ctx.store_file(&seed.base.join(&rule.path), reusable.next())?;
        rules.push(Rule {
            name: rule.name.clone(),
            description: rule.description.clone(),
            labels: rule.labels.clone(),
            file_id: Some(file.id),
            ..Default::default()
        });
    }
    association::replace(ctx.conn, rule_set, "rules", &mut rules)?;

    for id in reusable {
        ctx.drop_file(id)?;
    }
    Ok(())
}

fn previous_rules(ctx: &Context<'_>, rule_set: u64) -> Result<Vec<Rule>> {
    if rule_set == 0 {
        return Ok(Vec::new());
    }
    let query = Query::select(schema::RULE.name)
        .filter("rule_set_id = ?", vec![rule_set.into()])
        .order_by("id");
    record::list(ctx.conn, &query)
}
