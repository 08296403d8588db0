use std::sync::Arc;

use sqlx::SqlitePool;

use super::{config::Config, database::init_pool};

pub struct AppState {
    pub config: Config,
    pub pool: SqlitePool,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let pool = init_pool(&config.database_url)
            .await
            .expect("Database misconfigured!");

        Arc::new(Self { config, pool })
    }
}
