//! Taxonomía de errores del servicio
//!
//! Toda falla se devuelve como resultado estructurado al llamador dentro
//! del sobre JSON; ningún error cruza el límite de una operación como
//! pánico.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use common_db::error::DbError;

use crate::routes::ApiResponse;

/// Errores de las operaciones expuestas por el servicio
#[derive(Error, Debug)]
pub enum ApiError {
    /// Campos faltantes o malformados en la petición
    #[error("Entrada inválida: {0}")]
    EntradaInvalida(String),

    /// Cola, servicio, código o registro ausente
    #[error("No encontrado: {0}")]
    NoEncontrado(String),

    /// Ninguna cola activa y abierta para el servicio pedido
    #[error("No hay colas disponibles para el servicio solicitado")]
    SinColaDisponible,

    /// El código escaneado ya fue consumido
    #[error("El código ya fue utilizado")]
    CodigoUsado,

    /// Regla de ventana de check-in violada
    #[error("Fuera de la ventana de check-in: {0}")]
    FueraDeVentana(String),

    /// Transición de estado no permitida
    #[error("Transición de estado no permitida: {0}")]
    EstadoInvalido(String),

    /// Fallo del almacén; el servicio no reintenta
    #[error("Error de persistencia: {0}")]
    Persistencia(#[from] DbError),
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::Persistencia(DbError::from(error))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::EntradaInvalida(_) => StatusCode::BAD_REQUEST,
            ApiError::NoEncontrado(_) => StatusCode::NOT_FOUND,
            ApiError::SinColaDisponible => StatusCode::NOT_FOUND,
            ApiError::CodigoUsado => StatusCode::BAD_REQUEST,
            ApiError::FueraDeVentana(_) => StatusCode::BAD_REQUEST,
            ApiError::EstadoInvalido(_) => StatusCode::BAD_REQUEST,
            ApiError::Persistencia(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let cuerpo = Json(ApiResponse::<()>::error(self.to_string()));
        (status, cuerpo).into_response()
    }
}
