use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

/// Loads `.env.test`, initializes logging, and stands up a fresh database at `url` with all
/// migrations applied. Call once at the top of each test.
pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Test logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

/// A unique sqlite url under the system temp dir, so concurrently running tests never share a
/// database file.
pub fn random_db_path() -> String {
    let stamp: u64 = rand::random();
    format!("sqlite://{}/qpg_test_{stamp}.sqlite3", std::env::temp_dir().display())
}

/// Creates an empty database at `url`, dropping any leftover from a previous run first.
pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("🚀️ Could not drop old test database. {e}");
        }
    }
    Sqlite::create_database(url).await.expect("Error creating test database");
    info!("🚀️ Created test database at {url}");
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error connecting to the test database");
    migrate!("./src/sqlite/db/migrations").run(db.pool()).await.expect("Error running migrations");
    info!("🚀️ Migrations complete");
}
