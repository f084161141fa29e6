//! Verificación de check-in por código QR
//!
//! Valida un código escaneado y registra la llegada una sola vez,
//! dejando una fila de auditoría por cada intento que llegó a
//! resolverse. La detección de códigos ya usados lee la auditoría antes
//! de insertar; no hay restricción de unicidad, así que dos escaneos
//! simultáneos del mismo código pueden pasar ambos la verificación.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info};
use uuid::Uuid;

use common_db::models::{Cita, EstadoCita, ResultadoQr, Turno};

use crate::error::ApiError;
use crate::validation::{dentro_de_ventana, ventana_checkin_minutos};

/// Entrada del flujo de verificación: código crudo más metadatos del cliente
#[derive(Debug, Clone)]
pub struct PeticionCheckin {
    pub codigo: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Cita o turno al que resolvió el código
#[derive(Debug, Serialize)]
#[serde(tag = "tipo", rename_all = "snake_case")]
pub enum ObjetivoCheckin {
    Cita { cita: Cita },
    Turno { turno: Turno },
}

/// Resultado de una verificación exitosa
#[derive(Debug, Serialize)]
pub struct ResultadoCheckin {
    pub resultado: ResultadoQr,
    pub objetivo: ObjetivoCheckin,
}

/// Atribución de una fila de auditoría
struct ContextoLog<'a> {
    codigo: &'a str,
    cita_id: Option<Uuid>,
    turno_id: Option<Uuid>,
    usuario_id: Option<Uuid>,
    ip: Option<&'a str>,
    user_agent: Option<&'a str>,
}

/// Verifica un código escaneado y registra el check-in
///
/// Orden de evaluación: resolución (citas primero, turnos después),
/// código ya usado, ventana de tiempo (solo citas), marca de llegada.
/// Todo camino posterior a la resolución escribe su fila de auditoría
/// antes de devolver.
pub async fn verificar_codigo(
    pool: &SqlitePool,
    peticion: PeticionCheckin,
) -> Result<ResultadoCheckin, ApiError> {
    let codigo = peticion.codigo.trim();
    if codigo.is_empty() {
        return Err(ApiError::EntradaInvalida(
            "El código escaneado está vacío".to_string(),
        ));
    }

    // Resolver el código: una cita tiene prioridad sobre un turno
    let cita: Option<Cita> = sqlx::query_as("SELECT * FROM citas WHERE codigo_qr = ?")
        .bind(codigo)
        .fetch_optional(pool)
        .await?;

    let turno: Option<Turno> = if cita.is_none() {
        sqlx::query_as("SELECT * FROM turnos WHERE codigo_qr = ?")
            .bind(codigo)
            .fetch_optional(pool)
            .await?
    } else {
        None
    };

    // Sin resolución no hay a quién atribuir la auditoría
    let mut objetivo = match (cita, turno) {
        (Some(cita), _) => ObjetivoCheckin::Cita { cita },
        (None, Some(turno)) => ObjetivoCheckin::Turno { turno },
        (None, None) => {
            return Err(ApiError::NoEncontrado("Código no registrado".to_string()));
        }
    };

    let (cita_id, turno_id, usuario_id) = match &objetivo {
        ObjetivoCheckin::Cita { cita } => (Some(cita.id), None, Some(cita.usuario_id)),
        ObjetivoCheckin::Turno { turno } => (None, Some(turno.id), Some(turno.usuario_id)),
    };

    let contexto = ContextoLog {
        codigo,
        cita_id,
        turno_id,
        usuario_id,
        ip: peticion.ip.as_deref(),
        user_agent: peticion.user_agent.as_deref(),
    };

    // ¿Existe ya un escaneo exitoso de este código?
    let consulta_usado: Result<Option<i64>, sqlx::Error> =
        sqlx::query_scalar("SELECT 1 FROM logs_qr WHERE codigo = ? AND resultado = ? LIMIT 1")
            .bind(codigo)
            .bind(ResultadoQr::Exitoso.to_string())
            .fetch_optional(pool)
            .await;

    let ya_usado = match consulta_usado {
        Ok(fila) => fila,
        Err(e) => {
            registrar_log_mejor_esfuerzo(pool, &contexto, ResultadoQr::Error).await;
            return Err(e.into());
        }
    };

    if ya_usado.is_some() {
        registrar_log(pool, &contexto, ResultadoQr::Usado).await?;
        return Err(ApiError::CodigoUsado);
    }

    if let ObjetivoCheckin::Cita { cita } = &mut objetivo {
        // Solo una cita confirmada admite check-in
        if cita.estado != EstadoCita::Confirmada {
            registrar_log(pool, &contexto, ResultadoQr::Error).await?;
            return Err(ApiError::EstadoInvalido(format!(
                "La cita está {} y no admite check-in",
                cita.estado
            )));
        }

        // La ventana solo aplica a citas; los turnos no tienen hora agendada
        let ventana = ventana_checkin_minutos(pool).await;
        if let Err(motivo) = dentro_de_ventana(Utc::now(), cita.fecha_hora(), ventana) {
            registrar_log(pool, &contexto, ResultadoQr::Vencido).await?;
            return Err(ApiError::FueraDeVentana(motivo));
        }

        // Marcar la llegada; el estado no cambia aquí, lo avanza recepción
        let ahora = Utc::now();
        let marcado = sqlx::query("UPDATE citas SET checkin_at = ? WHERE id = ?")
            .bind(ahora)
            .bind(cita.id)
            .execute(pool)
            .await;

        if let Err(e) = marcado {
            registrar_log_mejor_esfuerzo(pool, &contexto, ResultadoQr::Error).await;
            return Err(e.into());
        }

        cita.checkin_at = Some(ahora);
    }

    registrar_log(pool, &contexto, ResultadoQr::Exitoso).await?;

    info!("Check-in registrado para el código {}", codigo);

    Ok(ResultadoCheckin {
        resultado: ResultadoQr::Exitoso,
        objetivo,
    })
}

/// Inserta una fila de auditoría; la tabla nunca se actualiza ni se borra
async fn registrar_log(
    pool: &SqlitePool,
    contexto: &ContextoLog<'_>,
    resultado: ResultadoQr,
) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT INTO logs_qr (id, codigo, cita_id, turno_id, usuario_id, ip, user_agent, resultado, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(contexto.codigo)
    .bind(contexto.cita_id)
    .bind(contexto.turno_id)
    .bind(contexto.usuario_id)
    .bind(contexto.ip)
    .bind(contexto.user_agent)
    .bind(resultado.to_string())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Variante para caminos que ya van a devolver un error de persistencia
async fn registrar_log_mejor_esfuerzo(
    pool: &SqlitePool,
    contexto: &ContextoLog<'_>,
    resultado: ResultadoQr,
) {
    if let Err(e) = registrar_log(pool, contexto, resultado).await {
        error!(
            "No se pudo escribir la auditoría del código {}: {}",
            contexto.codigo, e
        );
    }
}
