//! Agendamiento de citas y acciones por token
//!
//! Las citas nacen pendientes con un token de confirmación y un código
//! QR propios. El token autoriza las acciones de los enlaces de correo
//! (confirmar y cancelar); el resto de transiciones las hace el personal
//! por id.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use common_db::models::{Cita, EstadoCita, Profesional, Sede, Servicio};
use common_db::tokens;

use crate::error::ApiError;
use crate::validation::transicion_cita_valida;

/// Petición de agendamiento de una cita
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CrearCitaRequest {
    pub usuario_id: Uuid,
    #[validate(length(min = 1, message = "el nombre del usuario es obligatorio"))]
    pub usuario_nombre: String,
    pub sede_id: Uuid,
    pub servicio_id: Uuid,
    pub profesional_id: Uuid,
    pub fecha: NaiveDate,
    pub hora: NaiveTime,
}

/// Agenda una cita nueva en estado pendiente
pub async fn crear_cita(pool: &SqlitePool, peticion: CrearCitaRequest) -> Result<Cita, ApiError> {
    peticion
        .validate()
        .map_err(|e| ApiError::EntradaInvalida(e.to_string()))?;

    // Resolver los nombres del catálogo; todos deben existir
    let sede: Sede = sqlx::query_as("SELECT * FROM sedes WHERE id = ?")
        .bind(peticion.sede_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NoEncontrado(format!("Sede {}", peticion.sede_id)))?;

    let servicio: Servicio = sqlx::query_as("SELECT * FROM servicios WHERE id = ?")
        .bind(peticion.servicio_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NoEncontrado(format!("Servicio {}", peticion.servicio_id)))?;

    let profesional: Profesional = sqlx::query_as("SELECT * FROM profesionales WHERE id = ?")
        .bind(peticion.profesional_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            ApiError::NoEncontrado(format!("Profesional {}", peticion.profesional_id))
        })?;

    let cita = Cita {
        id: Uuid::new_v4(),
        usuario_id: peticion.usuario_id,
        usuario_nombre: peticion.usuario_nombre,
        sede_id: sede.id,
        sede_nombre: sede.nombre,
        servicio_id: servicio.id,
        servicio_nombre: servicio.nombre,
        profesional_id: profesional.id,
        profesional_nombre: profesional.nombre,
        fecha: peticion.fecha,
        hora: peticion.hora,
        estado: EstadoCita::Pendiente,
        token_confirmacion: tokens::generar_token_confirmacion(),
        codigo_qr: Some(tokens::generar_codigo_qr()),
        checkin_at: None,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO citas (id, usuario_id, usuario_nombre, sede_id, sede_nombre, servicio_id, \
         servicio_nombre, profesional_id, profesional_nombre, fecha, hora, estado, \
         token_confirmacion, codigo_qr, checkin_at, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(cita.id)
    .bind(cita.usuario_id)
    .bind(&cita.usuario_nombre)
    .bind(cita.sede_id)
    .bind(&cita.sede_nombre)
    .bind(cita.servicio_id)
    .bind(&cita.servicio_nombre)
    .bind(cita.profesional_id)
    .bind(&cita.profesional_nombre)
    .bind(cita.fecha)
    .bind(cita.hora)
    .bind(cita.estado.to_string())
    .bind(&cita.token_confirmacion)
    .bind(&cita.codigo_qr)
    .bind(cita.checkin_at)
    .bind(cita.created_at)
    .execute(pool)
    .await?;

    info!(
        "Cita {} agendada para {} el {} a las {}",
        cita.id, cita.usuario_nombre, cita.fecha, cita.hora
    );

    Ok(cita)
}

/// Confirma una cita pendiente mediante su token de correo
pub async fn confirmar_cita(pool: &SqlitePool, token: &str) -> Result<Cita, ApiError> {
    transicionar_por_token(pool, token, EstadoCita::Confirmada).await
}

/// Cancela una cita mediante su token de correo
pub async fn cancelar_cita(pool: &SqlitePool, token: &str) -> Result<Cita, ApiError> {
    transicionar_por_token(pool, token, EstadoCita::Cancelada).await
}

/// Transición de estado hecha por el personal, por id de cita
pub async fn cambiar_estado_cita(
    pool: &SqlitePool,
    id: Uuid,
    nuevo: EstadoCita,
) -> Result<Cita, ApiError> {
    let cita: Option<Cita> = sqlx::query_as("SELECT * FROM citas WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let cita = cita.ok_or_else(|| ApiError::NoEncontrado(format!("Cita {}", id)))?;
    aplicar_transicion(pool, cita, nuevo).await
}

async fn transicionar_por_token(
    pool: &SqlitePool,
    token: &str,
    nuevo: EstadoCita,
) -> Result<Cita, ApiError> {
    if token.trim().is_empty() {
        return Err(ApiError::EntradaInvalida(
            "El token de confirmación está vacío".to_string(),
        ));
    }

    let cita: Option<Cita> = sqlx::query_as("SELECT * FROM citas WHERE token_confirmacion = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;

    let cita = cita.ok_or_else(|| ApiError::NoEncontrado("Token no reconocido".to_string()))?;
    aplicar_transicion(pool, cita, nuevo).await
}

async fn aplicar_transicion(
    pool: &SqlitePool,
    mut cita: Cita,
    nuevo: EstadoCita,
) -> Result<Cita, ApiError> {
    if !transicion_cita_valida(cita.estado, nuevo) {
        return Err(ApiError::EstadoInvalido(format!(
            "{} -> {}",
            cita.estado, nuevo
        )));
    }

    sqlx::query("UPDATE citas SET estado = ? WHERE id = ?")
        .bind(nuevo.to_string())
        .bind(cita.id)
        .execute(pool)
        .await?;

    info!("Cita {} pasó de {} a {}", cita.id, cita.estado, nuevo);
    cita.estado = nuevo;

    Ok(cita)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pruebas::{pool_de_prueba, sembrar_catalogo};
    use anyhow::Result;
    use chrono::NaiveDate;

    fn peticion(cat: &crate::pruebas::CatalogoPrueba) -> CrearCitaRequest {
        CrearCitaRequest {
            usuario_id: Uuid::new_v4(),
            usuario_nombre: "Marta Vidal".to_string(),
            sede_id: cat.sede_id,
            servicio_id: cat.servicio_id,
            profesional_id: cat.profesional_id,
            fecha: NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
            hora: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_cita_nace_pendiente_con_token_y_qr() -> Result<()> {
        let (_dir, pool) = pool_de_prueba().await?;
        let cat = sembrar_catalogo(&pool).await?;

        let cita = crear_cita(&pool, peticion(&cat)).await.unwrap();

        assert_eq!(cita.estado, EstadoCita::Pendiente);
        assert_eq!(cita.token_confirmacion.len(), 32);
        assert!(cita.codigo_qr.as_deref().unwrap().starts_with(tokens::PREFIJO_QR));
        assert!(cita.checkin_at.is_none());
        // Los nombres del catálogo quedan copiados para mostrar
        assert_eq!(cita.sede_nombre, "Sede Centro");
        assert_eq!(cita.servicio_nombre, "Medicina General");
        Ok(())
    }

    #[tokio::test]
    async fn test_catalogo_desconocido_rechazado() -> Result<()> {
        let (_dir, pool) = pool_de_prueba().await?;
        let cat = sembrar_catalogo(&pool).await?;

        let mut p = peticion(&cat);
        p.profesional_id = Uuid::new_v4();
        let resultado = crear_cita(&pool, p).await;
        assert!(matches!(resultado, Err(ApiError::NoEncontrado(_))));

        let mut p = peticion(&cat);
        p.usuario_nombre = String::new();
        let resultado = crear_cita(&pool, p).await;
        assert!(matches!(resultado, Err(ApiError::EntradaInvalida(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_confirmar_por_token() -> Result<()> {
        let (_dir, pool) = pool_de_prueba().await?;
        let cat = sembrar_catalogo(&pool).await?;
        let cita = crear_cita(&pool, peticion(&cat)).await.unwrap();

        let confirmada = confirmar_cita(&pool, &cita.token_confirmacion).await.unwrap();
        assert_eq!(confirmada.estado, EstadoCita::Confirmada);

        // Confirmar dos veces no es válido
        let resultado = confirmar_cita(&pool, &cita.token_confirmacion).await;
        assert!(matches!(resultado, Err(ApiError::EstadoInvalido(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelar_por_token() -> Result<()> {
        let (_dir, pool) = pool_de_prueba().await?;
        let cat = sembrar_catalogo(&pool).await?;

        // Pendiente se puede cancelar
        let cita = crear_cita(&pool, peticion(&cat)).await.unwrap();
        let cancelada = cancelar_cita(&pool, &cita.token_confirmacion).await.unwrap();
        assert_eq!(cancelada.estado, EstadoCita::Cancelada);

        // Confirmada también
        let cita = crear_cita(&pool, peticion(&cat)).await.unwrap();
        confirmar_cita(&pool, &cita.token_confirmacion).await.unwrap();
        let cancelada = cancelar_cita(&pool, &cita.token_confirmacion).await.unwrap();
        assert_eq!(cancelada.estado, EstadoCita::Cancelada);

        // Una cancelada es terminal
        let resultado = cancelar_cita(&pool, &cita.token_confirmacion).await;
        assert!(matches!(resultado, Err(ApiError::EstadoInvalido(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_token_desconocido_o_vacio() -> Result<()> {
        let (_dir, pool) = pool_de_prueba().await?;

        let resultado = confirmar_cita(&pool, "token-inexistente").await;
        assert!(matches!(resultado, Err(ApiError::NoEncontrado(_))));

        let resultado = cancelar_cita(&pool, "  ").await;
        assert!(matches!(resultado, Err(ApiError::EntradaInvalida(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_transiciones_del_personal() -> Result<()> {
        let (_dir, pool) = pool_de_prueba().await?;
        let cat = sembrar_catalogo(&pool).await?;
        let cita = crear_cita(&pool, peticion(&cat)).await.unwrap();
        confirmar_cita(&pool, &cita.token_confirmacion).await.unwrap();

        let en_curso = cambiar_estado_cita(&pool, cita.id, EstadoCita::EnCurso).await.unwrap();
        assert_eq!(en_curso.estado, EstadoCita::EnCurso);

        let completada = cambiar_estado_cita(&pool, cita.id, EstadoCita::Completada).await.unwrap();
        assert_eq!(completada.estado, EstadoCita::Completada);

        // Un terminal no admite más cambios
        let resultado = cambiar_estado_cita(&pool, cita.id, EstadoCita::EnCurso).await;
        assert!(matches!(resultado, Err(ApiError::EstadoInvalido(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_no_show_desde_confirmada() -> Result<()> {
        let (_dir, pool) = pool_de_prueba().await?;
        let cat = sembrar_catalogo(&pool).await?;
        let cita = crear_cita(&pool, peticion(&cat)).await.unwrap();
        confirmar_cita(&pool, &cita.token_confirmacion).await.unwrap();

        let perdida = cambiar_estado_cita(&pool, cita.id, EstadoCita::NoShow).await.unwrap();
        assert_eq!(perdida.estado, EstadoCita::NoShow);

        // Pero no desde pendiente
        let otra = crear_cita(&pool, peticion(&cat)).await.unwrap();
        let resultado = cambiar_estado_cita(&pool, otra.id, EstadoCita::NoShow).await;
        assert!(matches!(resultado, Err(ApiError::EstadoInvalido(_))));
        Ok(())
    }
}
