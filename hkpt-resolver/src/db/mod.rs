//! Database access for hkpt-resolver
//!
//! Schema creation and geo seeding live in `hkpt_common::db`; this module
//! holds the resolver's own accessors over that schema.

pub mod settings;
pub mod store;

pub use store::SqliteLookupStore;

use hkpt_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the translation database and prepare the schema
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!(path = %db_path.display(), "Connecting to database");
    hkpt_common::db::init_database(db_path).await
}
