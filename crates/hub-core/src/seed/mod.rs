//! Database seeding.
//!
//! Seed-managed rows (tag categories, job functions, rule sets, targets,
//! questionnaires and generators) carry a stable uuid. On startup the bundle
//! under the seed directory is applied in one transaction unless both its
//! checksum and the build string match what the last run recorded.
//!
//! Rows created by users (non-empty `create_user`) are never overwritten: a
//! user row holding a seeded name is renamed to `"<name> (k)"` first.

mod bundle;
mod generator;
mod jobfunction;
mod order;
mod questionnaire;
mod ruleset;
mod tag;
mod target;

pub use bundle::{Bundle, Document};
pub use order::merge_order;

use crate::config::{HubSettings, SeedConfig};
use crate::database::record::{self, Record};
use crate::database::Database;
use crate::error::{HubError, Result};
use crate::model::{setting, File, Generator, JobFunction, Questionnaire, RuleSet, Target, TagCategory};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of a seeding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The seed directory does not exist.
    Missing,
    /// The directory holds no seed documents.
    Empty,
    /// Checksum and build match the last applied run.
    Skipped,
    Applied,
}

/// Applies the seed bundle to a database.
#[derive(Debug, Clone)]
pub struct Seeder {
    path: PathBuf,
    files_dir: PathBuf,
    build: String,
}

impl Seeder {
    pub fn new(settings: &HubSettings) -> Self {
        Self::with_paths(&settings.seed_path, settings.files_dir(), &settings.build)
    }

    pub fn with_paths(path: impl Into<PathBuf>, files_dir: impl Into<PathBuf>, build: &str) -> Self {
        Self {
            path: path.into(),
            files_dir: files_dir.into(),
            build: build.to_string(),
        }
    }

    /// Apply the bundle unless it was already applied by this build.
    pub fn seed(&self, db: &Database) -> Result<Outcome> {
        let bundle = match Bundle::load(&self.path)? {
            Some(bundle) => bundle,
            None => {
                info!("Seed directory not found: {}", self.path.display());
                return Ok(Outcome::Missing);
            }
        };
        if bundle.is_empty() {
            info!("No seed files found in {}", self.path.display());
            return Ok(Outcome::Empty);
        }

        if db.read(|conn| self.applied(conn, &bundle.checksum))? {
            info!("Seeding skipped: checksum {} already applied", short(&bundle.checksum));
            return Ok(Outcome::Skipped);
        }

        let mut seeds = Seeds::default();
        for document in &bundle.documents {
            seeds.with(document)?;
        }

        db.write(|tx| {
            let ctx = Context {
                conn: tx,
                files_dir: &self.files_dir,
            };
            seeds.apply(&ctx)?;
            setting::set(tx, SeedConfig::SEED_KEY, &bundle.checksum)?;
            setting::set(tx, SeedConfig::BUILD_KEY, &self.build)?;
            Ok(())
        })?;

        info!(
            "Seeding applied: {} documents, checksum {}, build '{}'",
            bundle.documents.len(),
            short(&bundle.checksum),
            self.build
        );
        Ok(Outcome::Applied)
    }

    fn applied(&self, conn: &Connection, checksum: &str) -> Result<bool> {
        let stored: Option<String> = setting::get(conn, SeedConfig::SEED_KEY)?;
        if stored.as_deref() != Some(checksum) {
            return Ok(false);
        }
        let build: Option<String> = setting::get(conn, SeedConfig::BUILD_KEY)?;
        Ok(build.as_deref() == Some(self.build.as_str()))
    }
}

fn short(checksum: &str) -> &str {
    checksum.get(..12).unwrap_or(checksum)
}

/// Connection and file store shared by the kind seeders.
pub(crate) struct Context<'a> {
    pub conn: &'a Connection,
    pub files_dir: &'a Path,
}

impl Context<'_> {
    /// Copy `src` into the file store and record it.
    ///
    /// When `reuse` names an existing file row, that row and its stored
    /// copy are overwritten instead of allocating a new one.
    pub fn store_file(&self, src: &Path, reuse: Option<u64>) -> Result<File> {
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut file = match reuse {
            Some(id) => record::find::<File>(self.conn, id)?.unwrap_or_default(),
            None => File::default(),
        };
        file.name = name;
        if file.id == 0 {
            record::create(self.conn, &mut file)?;
        }

        std::fs::create_dir_all(self.files_dir)
            .map_err(|e| HubError::io_with_path(e, self.files_dir))?;
        let dst = self.files_dir.join(file.id.to_string());
        std::fs::copy(src, &dst).map_err(|e| HubError::io_with_path(e, src))?;

        file.path = dst.to_string_lossy().into_owned();
        record::update(self.conn, &file)?;
        debug!("Seed file stored: {} -> {}", src.display(), file.path);
        Ok(file)
    }

    /// Delete a stored file row and its content.
    pub fn drop_file(&self, id: u64) -> Result<()> {
        let Some(file) = record::find::<File>(self.conn, id)? else {
            return Ok(());
        };
        record::delete::<File>(self.conn, id)?;
        if !file.path.is_empty() {
            if let Err(e) = std::fs::remove_file(&file.path) {
                debug!("Stored file not removed: {}: {}", file.path, e);
            }
        }
        debug!("Seed file dropped: id={}", id);
        Ok(())
    }
}

/// Collects the items of one kind, then applies them.
pub(crate) trait KindSeeder {
    fn with(&mut self, document: &Document) -> Result<()>;

    fn apply(&self, ctx: &Context<'_>) -> Result<()>;
}

#[derive(Default)]
struct Seeds {
    categories: tag::TagCategories,
    job_functions: jobfunction::JobFunctions,
    rule_sets: ruleset::RuleSets,
    targets: target::Targets,
    questionnaires: questionnaire::Questionnaires,
    generators: generator::Generators,
}

impl Seeds {
    fn with(&mut self, document: &Document) -> Result<()> {
        match document.kind.as_str() {
            "tagcategory" => self.categories.with(document),
            "jobfunction" => self.job_functions.with(document),
            "ruleset" => self.rule_sets.with(document),
            "target" => self.targets.with(document),
            "questionnaire" => self.questionnaires.with(document),
            "generator" => self.generators.with(document),
            other => {
                warn!("Unknown seed kind '{}' in {}", other, document.path.display());
                Ok(())
            }
        }
    }

    fn apply(&self, ctx: &Context<'_>) -> Result<()> {
        let kinds: [&dyn KindSeeder; 6] = [
            &self.categories,
            &self.job_functions,
            &self.rule_sets,
            &self.targets,
            &self.questionnaires,
            &self.generators,
        ];
        for kind in kinds {
            kind.apply(ctx)?;
        }
        Ok(())
    }
}

// ========================================
// Identity reconciliation
// ========================================

/// Seed-managed model with a unique name.
pub(crate) trait Named: Record + Default {
    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    fn create_user(&self) -> &str;
}

macro_rules! named {
    ($($model:ty),+ $(,)?) => {
        $(
            impl Named for $model {
                fn name(&self) -> &str {
                    &self.name
                }

                fn set_name(&mut self, name: String) {
                    self.name = name;
                }

                fn create_user(&self) -> &str {
                    &self.create_user
                }
            }
        )+
    };
}

named!(TagCategory, JobFunction, RuleSet, Target, Questionnaire, Generator);

/// Row a seed item with `uuid` and `name` should be written to.
///
/// The row holding `uuid` wins; a different row already using `name` is
/// renamed out of the way. Without a uuid match, a seed-created row holding
/// `name` is adopted while a user row holding it is renamed. Otherwise a new
/// (unsaved, id 0) model is returned.
pub(crate) fn reconcile<M: Named>(conn: &Connection, uuid: &str, name: &str) -> Result<M> {
    if let Some(model) = record::first::<M>(conn, "uuid = ?", vec![uuid.into()])? {
        if model.name() != name {
            let collider: Option<M> = record::first(
                conn,
                "name = ? AND id != ?",
                vec![name.into(), model.id().into()],
            )?;
            if let Some(mut collider) = collider {
                rename(conn, &mut collider)?;
            }
        }
        return Ok(model);
    }

    if let Some(mut model) = record::first::<M>(conn, "name = ?", vec![name.into()])? {
        if model.create_user().is_empty() {
            return Ok(model);
        }
        rename(conn, &mut model)?;
    }
    Ok(M::default())
}

/// Rename to `"<name> (k)"` with the lowest unused `k`.
pub(crate) fn rename<M: Named>(conn: &Connection, model: &mut M) -> Result<()> {
    let base = model.name().to_string();
    let mut k = 1u32;
    loop {
        let candidate = format!("{} ({})", base, k);
        if record::first::<M>(conn, "name = ?", vec![candidate.clone().into()])?.is_none() {
            info!("Renamed {} '{}' to '{}'", M::table().name, base, candidate);
            model.set_name(candidate);
            return record::update(conn, model);
        }
        k += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str, uuid: Option<&str>, user: &str) -> JobFunction {
        JobFunction {
            name: name.to_string(),
            uuid: uuid.map(str::to_string),
            create_user: user.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_reconcile_new() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| {
            let model: JobFunction = reconcile(tx, "u1", "Dev")?;
            assert_eq!(model.id, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_reconcile_renames_user_row() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| {
            let mut user = job("Dev", None, "alice");
            record::create(tx, &mut user)?;
            let mut taken = job("Dev (1)", None, "bob");
            record::create(tx, &mut taken)?;

            let model: JobFunction = reconcile(tx, "u1", "Dev")?;
            assert_eq!(model.id, 0);
            assert_eq!(record::get::<JobFunction>(tx, user.id)?.name, "Dev (2)");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_reconcile_adopts_seed_row_by_name() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| {
            let mut seeded = job("Dev", None, "");
            record::create(tx, &mut seeded)?;
            let model: JobFunction = reconcile(tx, "u1", "Dev")?;
            assert_eq!(model.id, seeded.id);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_reconcile_uuid_rename_clears_collider() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| {
            let mut seeded = job("Developer", Some("u1"), "");
            record::create(tx, &mut seeded)?;
            let mut user = job("Dev", None, "alice");
            record::create(tx, &mut user)?;

            let model: JobFunction = reconcile(tx, "u1", "Dev")?;
            assert_eq!(model.id, seeded.id);
            assert_eq!(record::get::<JobFunction>(tx, user.id)?.name, "Dev (1)");
            Ok(())
        })
        .unwrap();
    }
}
