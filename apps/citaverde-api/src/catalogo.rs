//! Gestión del catálogo: sedes, servicios, profesionales y colas
//!
//! Operaciones de administración usadas por recepción y administración.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use common_db::models::{Cola, Profesional, Sede, Servicio};

use crate::error::ApiError;
use crate::validation::DURACION_SERVICIO_POR_DEFECTO_MIN;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CrearSedeRequest {
    #[validate(length(min = 1, message = "el nombre es obligatorio"))]
    pub nombre: String,
    #[validate(length(min = 1, message = "la dirección es obligatoria"))]
    pub direccion: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CrearServicioRequest {
    pub sede_id: Uuid,
    #[validate(length(min = 1, message = "el nombre es obligatorio"))]
    pub nombre: String,
    /// Minutos estimados de atención; sin valor se usa el defecto
    pub duracion_min: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CrearProfesionalRequest {
    pub sede_id: Uuid,
    #[validate(length(min = 1, message = "el nombre es obligatorio"))]
    pub nombre: String,
    #[validate(length(min = 1, message = "la especialidad es obligatoria"))]
    pub especialidad: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CrearColaRequest {
    pub sede_id: Uuid,
    pub servicio_id: Uuid,
    #[validate(length(min = 1, message = "el nombre es obligatorio"))]
    pub nombre: String,
}

async fn exigir_sede(pool: &SqlitePool, id: Uuid) -> Result<Sede, ApiError> {
    sqlx::query_as("SELECT * FROM sedes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NoEncontrado(format!("Sede {}", id)))
}

pub async fn listar_sedes(pool: &SqlitePool) -> Result<Vec<Sede>, ApiError> {
    let sedes = sqlx::query_as("SELECT * FROM sedes ORDER BY nombre")
        .fetch_all(pool)
        .await?;
    Ok(sedes)
}

pub async fn crear_sede(pool: &SqlitePool, peticion: CrearSedeRequest) -> Result<Sede, ApiError> {
    peticion
        .validate()
        .map_err(|e| ApiError::EntradaInvalida(e.to_string()))?;

    let sede = Sede {
        id: Uuid::new_v4(),
        nombre: peticion.nombre,
        direccion: peticion.direccion,
        activa: true,
        created_at: Utc::now(),
    };

    sqlx::query("INSERT INTO sedes (id, nombre, direccion, activa, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(sede.id)
        .bind(&sede.nombre)
        .bind(&sede.direccion)
        .bind(sede.activa)
        .bind(sede.created_at)
        .execute(pool)
        .await?;

    Ok(sede)
}

pub async fn listar_servicios(pool: &SqlitePool) -> Result<Vec<Servicio>, ApiError> {
    let servicios = sqlx::query_as("SELECT * FROM servicios ORDER BY nombre")
        .fetch_all(pool)
        .await?;
    Ok(servicios)
}

pub async fn crear_servicio(
    pool: &SqlitePool,
    peticion: CrearServicioRequest,
) -> Result<Servicio, ApiError> {
    peticion
        .validate()
        .map_err(|e| ApiError::EntradaInvalida(e.to_string()))?;
    exigir_sede(pool, peticion.sede_id).await?;

    let servicio = Servicio {
        id: Uuid::new_v4(),
        sede_id: peticion.sede_id,
        nombre: peticion.nombre,
        duracion_min: peticion.duracion_min.unwrap_or(DURACION_SERVICIO_POR_DEFECTO_MIN),
        activo: true,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO servicios (id, sede_id, nombre, duracion_min, activo, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(servicio.id)
    .bind(servicio.sede_id)
    .bind(&servicio.nombre)
    .bind(servicio.duracion_min)
    .bind(servicio.activo)
    .bind(servicio.created_at)
    .execute(pool)
    .await?;

    Ok(servicio)
}

pub async fn listar_profesionales(pool: &SqlitePool) -> Result<Vec<Profesional>, ApiError> {
    let profesionales = sqlx::query_as("SELECT * FROM profesionales ORDER BY nombre")
        .fetch_all(pool)
        .await?;
    Ok(profesionales)
}

pub async fn crear_profesional(
    pool: &SqlitePool,
    peticion: CrearProfesionalRequest,
) -> Result<Profesional, ApiError> {
    peticion
        .validate()
        .map_err(|e| ApiError::EntradaInvalida(e.to_string()))?;
    exigir_sede(pool, peticion.sede_id).await?;

    let profesional = Profesional {
        id: Uuid::new_v4(),
        sede_id: peticion.sede_id,
        nombre: peticion.nombre,
        especialidad: peticion.especialidad,
        activo: true,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO profesionales (id, sede_id, nombre, especialidad, activo, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(profesional.id)
    .bind(profesional.sede_id)
    .bind(&profesional.nombre)
    .bind(&profesional.especialidad)
    .bind(profesional.activo)
    .bind(profesional.created_at)
    .execute(pool)
    .await?;

    Ok(profesional)
}

pub async fn listar_colas(pool: &SqlitePool) -> Result<Vec<Cola>, ApiError> {
    let colas = sqlx::query_as("SELECT * FROM colas ORDER BY created_at, rowid")
        .fetch_all(pool)
        .await?;
    Ok(colas)
}

pub async fn crear_cola(pool: &SqlitePool, peticion: CrearColaRequest) -> Result<Cola, ApiError> {
    peticion
        .validate()
        .map_err(|e| ApiError::EntradaInvalida(e.to_string()))?;
    exigir_sede(pool, peticion.sede_id).await?;

    let servicio: Option<Servicio> = sqlx::query_as("SELECT * FROM servicios WHERE id = ?")
        .bind(peticion.servicio_id)
        .fetch_optional(pool)
        .await?;
    if servicio.is_none() {
        return Err(ApiError::NoEncontrado(format!(
            "Servicio {}",
            peticion.servicio_id
        )));
    }

    let cola = Cola {
        id: Uuid::new_v4(),
        sede_id: peticion.sede_id,
        servicio_id: peticion.servicio_id,
        nombre: peticion.nombre,
        activa: true,
        cerrada: false,
        turnos_actuales: 0,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO colas (id, sede_id, servicio_id, nombre, activa, cerrada, turnos_actuales, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(cola.id)
    .bind(cola.sede_id)
    .bind(cola.servicio_id)
    .bind(&cola.nombre)
    .bind(cola.activa)
    .bind(cola.cerrada)
    .bind(cola.turnos_actuales)
    .bind(cola.created_at)
    .execute(pool)
    .await?;

    Ok(cola)
}
