//! Hub Core - persistence and assessment engine for the application
//! inventory hub.
//!
//! This crate owns everything below the REST layer:
//!
//! - the filter and sort sublanguages that list endpoints compile to SQL
//! - the SQLite record layer with its persistent primary key allocator
//! - association replacement for join tables and owned children
//! - the assessment engine (status, risk, confidence, prepare) and the
//!   application and archetype resolvers built on it
//! - the seeder that loads seed-managed catalogs at startup
//!
//! # Example
//!
//! ```rust,ignore
//! use hub_core::{Hub, HubSettings};
//!
//! fn main() -> hub_core::Result<()> {
//!     let hub = Hub::open(HubSettings::from_env()?)?;
//!     let count = hub.db().read(|conn| {
//!         hub_core::database::record::count(conn, &hub_core::database::Query::select("application"))
//!     })?;
//!     println!("{} applications", count);
//!     Ok(())
//! }
//! ```

pub mod assessment;
pub mod association;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod model;
pub mod schema;
pub mod seed;
pub mod sort;

pub use assessment::{ApplicationResolver, ArchetypeResolver, Resolvers, Status};
pub use config::HubSettings;
pub use database::{Database, Query, Record, SqlValue};
pub use error::{HubError, Result};
pub use filter::{Assert, Filter};
pub use seed::{Outcome, Seeder};
pub use sort::Sort;

use tracing::info;

/// Opened hub: a seeded database plus the settings it was opened with.
#[derive(Debug, Clone)]
pub struct Hub {
    db: Database,
    settings: HubSettings,
}

impl Hub {
    /// Open the database and apply the seed bundle.
    pub fn open(settings: HubSettings) -> Result<Self> {
        let db = Database::open_at(&settings.db_path)?;
        let outcome = Seeder::new(&settings).seed(&db)?;
        info!("Hub ready: db={} seed={:?}", settings.db_path.display(), outcome);
        Ok(Self { db, settings })
    }

    /// Wrap an already opened database; no seeding.
    pub fn with_database(db: Database, settings: HubSettings) -> Self {
        Self { db, settings }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &HubSettings {
        &self.settings
    }
}
