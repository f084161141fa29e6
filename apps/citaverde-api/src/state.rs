//! Estado compartido del servicio

use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;

use common_db::{init_db_pool, DbConfig};

use crate::config::ApiConfig;

/// Estado inyectado en todos los handlers
pub struct AppState {
    pub pool: SqlitePool,
    pub config: ApiConfig,
}

impl AppState {
    /// Abre el pool de la base y deja el estado listo para el router
    pub async fn new(config: ApiConfig) -> Result<Arc<Self>> {
        let pool = init_db_pool(&DbConfig {
            db_path: config.db_ruta.clone(),
            max_connections: config.db_conexiones_max,
        })
        .await?;

        Ok(Arc::new(Self { pool, config }))
    }
}
