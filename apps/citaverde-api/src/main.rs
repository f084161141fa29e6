//! Punto de entrada del micro-servicio citaverde-api

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!(
        "CitaVerde API v{} ({})",
        built_info::PKG_VERSION,
        built_info::TARGET
    );

    citaverde_api::iniciar_servidor().await
}
