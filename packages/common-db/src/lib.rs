//! Common DB - Biblioteca compartida de acceso al almacén de CitaVerde
//!
//! Esta biblioteca proporciona:
//! - Modelos de datos compartidos (catálogo, colas, turnos, citas, auditoría QR)
//! - Migraciones automáticas del esquema
//! - Generación de tokens de confirmación y códigos QR
//! - Pool de conexión y utilidades para SQLite

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

pub mod error;
pub mod migrations;
pub mod models;
pub mod tokens;

/// Configuración de la conexión con la base de datos
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Ruta del archivo SQLite
    pub db_path: String,
    /// Número máximo de conexiones en el pool
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_path: "data/citaverde.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Inicializa el pool de conexiones SQLite y aplica las migraciones
pub async fn init_db_pool(config: &DbConfig) -> Result<SqlitePool> {
    let db_path = Path::new(&config.db_path);

    // Verificar que el directorio padre exista
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .context("Fallo al crear el directorio de la base de datos")?;
        }
    }

    // Opciones de conexión SQLite
    let connection_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .foreign_keys(true)
        .pragma("synchronous", "NORMAL");

    // Crear el pool de conexiones
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connection_options)
        .await
        .context("Fallo al conectar con la base de datos SQLite")?;

    // Aplicar migraciones automáticas
    migrations::run_migrations(&pool)
        .await
        .context("Fallo al aplicar las migraciones")?;

    info!("Base de datos inicializada con éxito: {}", config.db_path);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_conexion_db() -> Result<()> {
        // Usar un directorio temporal para la prueba
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test.db");

        let config = DbConfig {
            db_path: db_path.to_str().unwrap().to_string(),
            max_connections: 2,
        };

        // Inicializar la base
        let pool = init_db_pool(&config).await?;

        // Verificar que se puede ejecutar una consulta simple
        let result: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await?;

        assert_eq!(result.0, 1);

        Ok(())
    }
}
