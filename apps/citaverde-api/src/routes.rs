//! Superficie HTTP del servicio
//!
//! Todos los handlers devuelven el mismo sobre JSON
//! `{ "success": bool, "data"?, "error"? }`; los errores salen por
//! `ApiError` con su código HTTP correspondiente.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::header::{self, CONTENT_TYPE};
use axum::http::{HeaderMap, Method};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use common_db::models::{Cita, Cola, EstadoCita, EstadoTurno, Profesional, Sede, Servicio, Turno};

use crate::catalogo::{self, CrearColaRequest, CrearProfesionalRequest, CrearSedeRequest, CrearServicioRequest};
use crate::checkin::{self, PeticionCheckin, ResultadoCheckin};
use crate::citas::{self, CrearCitaRequest};
use crate::error::ApiError;
use crate::state::AppState;
use crate::turnos::{self, CrearTurnoRequest};

/// Sobre JSON común de todas las respuestas
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(mensaje: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(mensaje),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerificarCodigoRequest {
    pub codigo: String,
}

#[derive(Debug, Deserialize)]
pub struct CambioEstadoTurnoRequest {
    pub estado: EstadoTurno,
}

#[derive(Debug, Deserialize)]
pub struct CambioEstadoCitaRequest {
    pub estado: EstadoCita,
}

/// Construye el router completo del servicio
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/api/salud", get(salud))
        .route("/api/turnos", post(crear_turno))
        .route("/api/turnos/:id/estado", put(cambiar_estado_turno))
        .route("/api/checkin/verificar", post(verificar_checkin))
        .route("/api/citas", post(crear_cita))
        .route("/api/citas/confirmar/:token", post(confirmar_cita))
        .route("/api/citas/cancelar/:token", post(cancelar_cita))
        .route("/api/citas/:id/estado", put(cambiar_estado_cita))
        .route("/api/sedes", get(listar_sedes).post(crear_sede))
        .route("/api/servicios", get(listar_servicios).post(crear_servicio))
        .route("/api/profesionales", get(listar_profesionales).post(crear_profesional))
        .route("/api/colas", get(listar_colas).post(crear_cola))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(GlobalConcurrencyLimitLayer::new(state.config.concurrencia_max))
        .with_state(state)
}

async fn salud() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("ok"))
}

async fn crear_turno(
    State(state): State<Arc<AppState>>,
    Json(peticion): Json<CrearTurnoRequest>,
) -> Result<Json<ApiResponse<Turno>>, ApiError> {
    let turno = turnos::asignar_turno(&state.pool, peticion).await?;
    Ok(Json(ApiResponse::ok(turno)))
}

async fn cambiar_estado_turno(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(peticion): Json<CambioEstadoTurnoRequest>,
) -> Result<Json<ApiResponse<Turno>>, ApiError> {
    let turno = turnos::cambiar_estado_turno(&state.pool, id, peticion.estado).await?;
    Ok(Json(ApiResponse::ok(turno)))
}

async fn verificar_checkin(
    State(state): State<Arc<AppState>>,
    conexion: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(peticion): Json<VerificarCodigoRequest>,
) -> Result<Json<ApiResponse<ResultadoCheckin>>, ApiError> {
    let ip = ip_del_cliente(&headers, conexion.map(|ConnectInfo(direccion)| direccion));
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let resultado = checkin::verificar_codigo(
        &state.pool,
        PeticionCheckin {
            codigo: peticion.codigo,
            ip,
            user_agent,
        },
    )
    .await?;

    Ok(Json(ApiResponse::ok(resultado)))
}

async fn crear_cita(
    State(state): State<Arc<AppState>>,
    Json(peticion): Json<CrearCitaRequest>,
) -> Result<Json<ApiResponse<Cita>>, ApiError> {
    let cita = citas::crear_cita(&state.pool, peticion).await?;
    Ok(Json(ApiResponse::ok(cita)))
}

async fn confirmar_cita(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<Cita>>, ApiError> {
    let cita = citas::confirmar_cita(&state.pool, &token).await?;
    Ok(Json(ApiResponse::ok(cita)))
}

async fn cancelar_cita(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<Cita>>, ApiError> {
    let cita = citas::cancelar_cita(&state.pool, &token).await?;
    Ok(Json(ApiResponse::ok(cita)))
}

async fn cambiar_estado_cita(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(peticion): Json<CambioEstadoCitaRequest>,
) -> Result<Json<ApiResponse<Cita>>, ApiError> {
    let cita = citas::cambiar_estado_cita(&state.pool, id, peticion.estado).await?;
    Ok(Json(ApiResponse::ok(cita)))
}

async fn listar_sedes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Sede>>>, ApiError> {
    Ok(Json(ApiResponse::ok(catalogo::listar_sedes(&state.pool).await?)))
}

async fn crear_sede(
    State(state): State<Arc<AppState>>,
    Json(peticion): Json<CrearSedeRequest>,
) -> Result<Json<ApiResponse<Sede>>, ApiError> {
    Ok(Json(ApiResponse::ok(catalogo::crear_sede(&state.pool, peticion).await?)))
}

async fn listar_servicios(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Servicio>>>, ApiError> {
    Ok(Json(ApiResponse::ok(catalogo::listar_servicios(&state.pool).await?)))
}

async fn crear_servicio(
    State(state): State<Arc<AppState>>,
    Json(peticion): Json<CrearServicioRequest>,
) -> Result<Json<ApiResponse<Servicio>>, ApiError> {
    Ok(Json(ApiResponse::ok(catalogo::crear_servicio(&state.pool, peticion).await?)))
}

async fn listar_profesionales(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Profesional>>>, ApiError> {
    Ok(Json(ApiResponse::ok(catalogo::listar_profesionales(&state.pool).await?)))
}

async fn crear_profesional(
    State(state): State<Arc<AppState>>,
    Json(peticion): Json<CrearProfesionalRequest>,
) -> Result<Json<ApiResponse<Profesional>>, ApiError> {
    Ok(Json(ApiResponse::ok(catalogo::crear_profesional(&state.pool, peticion).await?)))
}

async fn listar_colas(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Cola>>>, ApiError> {
    Ok(Json(ApiResponse::ok(catalogo::listar_colas(&state.pool).await?)))
}

async fn crear_cola(
    State(state): State<Arc<AppState>>,
    Json(peticion): Json<CrearColaRequest>,
) -> Result<Json<ApiResponse<Cola>>, ApiError> {
    Ok(Json(ApiResponse::ok(catalogo::crear_cola(&state.pool, peticion).await?)))
}

/// IP del cliente: detrás del proxy llega en X-Forwarded-For
fn ip_del_cliente(headers: &HeaderMap, par: Option<SocketAddr>) -> Option<String> {
    if let Some(valor) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(primera) = valor.split(',').next() {
            let primera = primera.trim();
            if !primera.is_empty() {
                return Some(primera.to_string());
            }
        }
    }

    par.map(|direccion| direccion.ip().to_string())
}
