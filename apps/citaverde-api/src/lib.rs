//! CitaVerde API - Micro-servicio de turnos, citas y check-in QR
//!
//! Expone la superficie HTTP de la aplicación de agendamiento:
//! emisión de turnos de cola, agendamiento y confirmación de citas,
//! verificación de códigos QR con auditoría de cada intento y la
//! gestión del catálogo de sedes, servicios y profesionales.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

pub mod catalogo;
pub mod checkin;
pub mod citas;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod turnos;
pub mod validation;

#[cfg(test)]
pub(crate) mod pruebas;

use config::ApiConfig;
use state::AppState;

/// Arranca el servicio: pool, router y servidor HTTP con apagado ordenado
pub async fn iniciar_servidor() -> Result<()> {
    let config = ApiConfig::cargar();
    let puerto = config.puerto;

    info!("Inicializando estado...");
    let state = AppState::new(config).await?;

    let app = routes::build_router(state);

    let direccion = SocketAddr::from(([0, 0, 0, 0], puerto));
    info!("Escuchando en {direccion}");

    axum::Server::bind(&direccion)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(senal_de_apagado())
        .await
        .context("El servidor HTTP terminó con error")?;

    info!("Servidor detenido");
    Ok(())
}

async fn senal_de_apagado() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("No se pudo instalar el manejador de Ctrl+C");

        info!("Ctrl+C recibido, apagando");
    };

    let terminate = async {
        signal(SignalKind::terminate())
            .expect("No se pudo instalar el manejador de SIGTERM")
            .recv()
            .await;

        info!("SIGTERM recibido, apagando");
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
