//! Definiciones de error para la biblioteca common-db
//!
//! Este módulo define los tipos de error usados por la biblioteca

use thiserror::Error;

/// Errores específicos de las operaciones de base de datos
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Error de conexión con la base de datos: {0}")]
    ConnectionError(String),

    #[error("Error de migración: {0}")]
    MigrationError(String),

    #[error("Error de consulta: {0}")]
    QueryError(String),

    #[error("Entidad no encontrada: {0}")]
    NotFound(String),

    #[error("Violación de restricción: {0}")]
    ConstraintViolation(String),

    #[error("Error interno: {0}")]
    InternalError(String),
}

/// Conversión de los errores de SQLx a nuestros tipos de error
impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DbError::NotFound("Registro no encontrado".to_string()),
            sqlx::Error::Database(dbe) => {
                if let Some(code) = dbe.code() {
                    // 2067 = SQLITE_CONSTRAINT_UNIQUE, 23000 = violación genérica
                    if code.as_ref() == "23000" || code.as_ref() == "2067" {
                        return DbError::ConstraintViolation(dbe.message().to_string());
                    }
                }
                DbError::QueryError(dbe.message().to_string())
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::QueryError(format!("Columna no encontrada: {}", col))
            }
            sqlx::Error::TypeNotFound { type_name } => {
                DbError::QueryError(format!("Tipo no encontrado: {}", type_name))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::QueryError(format!("Error al decodificar la columna {}: {}", index, source))
            }
            sqlx::Error::Io(io_err) => DbError::ConnectionError(io_err.to_string()),
            sqlx::Error::Configuration(conf_err) => {
                DbError::ConnectionError(conf_err.to_string())
            }
            sqlx::Error::PoolClosed => {
                DbError::ConnectionError("Pool de conexiones cerrado".to_string())
            }
            sqlx::Error::PoolTimedOut => {
                DbError::ConnectionError("Timeout en el pool de conexiones".to_string())
            }
            sqlx::Error::WorkerCrashed => {
                DbError::InternalError("El worker de la base de datos falló".to_string())
            }
            _ => DbError::InternalError(format!("Error inesperado: {:?}", error)),
        }
    }
}
