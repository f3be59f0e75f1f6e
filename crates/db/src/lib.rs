use std::time::Duration;

use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;

pub use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};

pub mod entities;
pub mod models;
pub mod types;

pub type DbPool = DatabaseConnection;

const DEFAULT_DATABASE_URL: &str = "sqlite://binflow.sqlite?mode=rwc";

#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
}

impl DBService {
    pub async fn new() -> Result<DBService, DbErr> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        Self::connect(&database_url).await
    }

    pub async fn connect(database_url: &str) -> Result<DBService, DbErr> {
        // Pooled connections to an in-memory SQLite each get their own
        // database, so those stay on a single connection.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 10 };

        let mut options = ConnectOptions::new(database_url.to_owned());
        options
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .sqlx_logging(false);

        let pool = Database::connect(options).await?;
        db_migration::Migrator::up(&pool, None).await?;
        Ok(DBService { pool })
    }
}
