//! Asignación de turnos de cola
//!
//! Dado un sede y un servicio elegidos por el usuario, selecciona una
//! cola elegible y emite el siguiente número secuencial. La numeración
//! se calcula leyendo los turnos en espera y no hay reserva
//! transaccional entre la lectura y la inserción; dos peticiones
//! simultáneas sobre la misma cola pueden calcular el mismo número.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use common_db::models::{Cola, EstadoTurno, Servicio, Turno};
use common_db::tokens;

use crate::error::ApiError;
use crate::validation::{transicion_turno_valida, DURACION_SERVICIO_POR_DEFECTO_MIN};

/// Petición de emisión de un turno
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CrearTurnoRequest {
    pub usuario_id: Uuid,
    #[validate(length(min = 1, message = "el nombre del usuario es obligatorio"))]
    pub usuario_nombre: String,
    pub sede_id: Uuid,
    pub servicio_id: Uuid,
}

/// Emite un turno para el servicio pedido en la sede pedida
///
/// La cola elegida es la que tiene menos turnos activos entre las
/// activas y no cerradas; los empates se resuelven por orden de
/// creación. Es una heurística simple, no un balanceador.
pub async fn asignar_turno(pool: &SqlitePool, peticion: CrearTurnoRequest) -> Result<Turno, ApiError> {
    peticion
        .validate()
        .map_err(|e| ApiError::EntradaInvalida(e.to_string()))?;

    // Resolver el servicio; si no existe se usa la duración por defecto
    let servicio: Option<Servicio> = sqlx::query_as("SELECT * FROM servicios WHERE id = ?")
        .bind(peticion.servicio_id)
        .fetch_optional(pool)
        .await?;

    let duracion_min = servicio
        .map(|s| s.duracion_min)
        .unwrap_or(DURACION_SERVICIO_POR_DEFECTO_MIN);

    // Colas del servicio en la sede, en orden de creación
    let colas: Vec<Cola> = sqlx::query_as(
        "SELECT * FROM colas WHERE servicio_id = ? AND sede_id = ? ORDER BY created_at, rowid",
    )
    .bind(peticion.servicio_id)
    .bind(peticion.sede_id)
    .fetch_all(pool)
    .await?;

    // Solo cuentan las activas y no cerradas; el primer mínimo gana
    let cola = colas
        .iter()
        .filter(|c| c.admite_turnos())
        .min_by_key(|c| c.turnos_actuales)
        .ok_or(ApiError::SinColaDisponible)?;

    // Números de los turnos en espera de la cola elegida
    let numeros: Vec<i64> =
        sqlx::query_scalar("SELECT numero FROM turnos WHERE cola_id = ? AND estado = ?")
            .bind(cola.id)
            .bind(EstadoTurno::EnEspera.to_string())
            .fetch_all(pool)
            .await?;

    let numero = numeros.into_iter().max().map_or(1, |max| max + 1);

    let turno = Turno {
        id: Uuid::new_v4(),
        cola_id: cola.id,
        sede_id: peticion.sede_id,
        servicio_id: peticion.servicio_id,
        usuario_id: peticion.usuario_id,
        usuario_nombre: peticion.usuario_nombre,
        numero,
        estado: EstadoTurno::EnEspera,
        duracion_estimada_min: duracion_min,
        codigo_qr: tokens::generar_codigo_qr(),
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO turnos (id, cola_id, sede_id, servicio_id, usuario_id, usuario_nombre, \
         numero, estado, duracion_estimada_min, codigo_qr, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(turno.id)
    .bind(turno.cola_id)
    .bind(turno.sede_id)
    .bind(turno.servicio_id)
    .bind(turno.usuario_id)
    .bind(&turno.usuario_nombre)
    .bind(turno.numero)
    .bind(turno.estado.to_string())
    .bind(turno.duracion_estimada_min)
    .bind(&turno.codigo_qr)
    .bind(turno.created_at)
    .execute(pool)
    .await?;

    sqlx::query("UPDATE colas SET turnos_actuales = turnos_actuales + 1 WHERE id = ?")
        .bind(cola.id)
        .execute(pool)
        .await?;

    info!(
        "Turno {} emitido en la cola {} ({})",
        turno.numero, cola.nombre, cola.id
    );

    Ok(turno)
}

/// Avanza el estado de un turno por acción del personal
///
/// Al dejar la espera se libera el contador de la cola.
pub async fn cambiar_estado_turno(
    pool: &SqlitePool,
    id: Uuid,
    nuevo: EstadoTurno,
) -> Result<Turno, ApiError> {
    let turno: Option<Turno> = sqlx::query_as("SELECT * FROM turnos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let mut turno = turno.ok_or_else(|| ApiError::NoEncontrado(format!("Turno {}", id)))?;

    if !transicion_turno_valida(turno.estado, nuevo) {
        return Err(ApiError::EstadoInvalido(format!(
            "{} -> {}",
            turno.estado, nuevo
        )));
    }

    sqlx::query("UPDATE turnos SET estado = ? WHERE id = ?")
        .bind(nuevo.to_string())
        .bind(id)
        .execute(pool)
        .await?;

    if turno.estado == EstadoTurno::EnEspera {
        sqlx::query("UPDATE colas SET turnos_actuales = MAX(turnos_actuales - 1, 0) WHERE id = ?")
            .bind(turno.cola_id)
            .execute(pool)
            .await?;
    }

    info!("Turno {} pasó de {} a {}", id, turno.estado, nuevo);
    turno.estado = nuevo;

    Ok(turno)
}
