use db::{DBService, DbErr};

pub mod error;
pub mod http;
pub mod jobs;
pub mod middleware;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    db: DBService,
}

impl AppState {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// Connect using `DATABASE_URL` (or the on-disk default) and run
    /// pending migrations.
    pub async fn from_env() -> Result<Self, DbErr> {
        Ok(Self::new(DBService::new().await?))
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }
}
