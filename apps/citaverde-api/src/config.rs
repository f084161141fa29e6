//! Configuración del servicio leída del entorno
//!
//! Todos los parámetros tienen un valor por defecto razonable; un valor
//! ausente o malformado se registra y se reemplaza por el defecto. El
//! único parámetro de dominio (la ventana de check-in) no vive aquí sino
//! en la tabla `configuracion` del almacén.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::{info, warn};

/// Configuración del proceso citaverde-api
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Puerto HTTP de escucha
    pub puerto: u16,
    /// Ruta del archivo SQLite
    pub db_ruta: String,
    /// Tamaño máximo del pool de conexiones
    pub db_conexiones_max: u32,
    /// Límite global de peticiones concurrentes
    pub concurrencia_max: usize,
}

impl ApiConfig {
    pub fn cargar() -> Self {
        Self {
            puerto: cargar_o("CITAVERDE_PUERTO", 8080),
            db_ruta: cargar_o("CITAVERDE_DB_RUTA", "data/citaverde.db".to_string()),
            db_conexiones_max: cargar_o("CITAVERDE_DB_CONEXIONES", 5),
            concurrencia_max: cargar_o("CITAVERDE_CONCURRENCIA_MAX", 256),
        }
    }
}

fn cargar_o<T>(clave: &str, por_defecto: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(clave) {
        Ok(valor) => match valor.parse() {
            Ok(parseado) => parseado,
            Err(e) => {
                warn!("Valor inválido en {clave} ({e}), usando {por_defecto}");
                por_defecto
            }
        },
        Err(_) => {
            info!("{clave} no definida, usando {por_defecto}");
            por_defecto
        }
    }
}
