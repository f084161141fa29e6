//! Utilidades compartidas por las pruebas del servicio
//!
//! Cada prueba abre su propia base SQLite en un directorio temporal y
//! siembra el catálogo mínimo que necesitan los flujos.

use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

use common_db::models::{Cita, EstadoCita};
use common_db::tokens;
use common_db::{init_db_pool, DbConfig};

/// Identificadores del catálogo sembrado por [`sembrar_catalogo`]
pub struct CatalogoPrueba {
    pub sede_id: Uuid,
    pub servicio_id: Uuid,
    pub profesional_id: Uuid,
}

/// Base de datos nueva en un directorio temporal, con migraciones aplicadas
pub async fn pool_de_prueba() -> Result<(TempDir, SqlitePool)> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("citaverde_test.db");

    let pool = init_db_pool(&DbConfig {
        db_path: db_path.to_str().unwrap().to_string(),
        max_connections: 2,
    })
    .await?;

    Ok((dir, pool))
}

/// Siembra una sede, un servicio y un profesional
pub async fn sembrar_catalogo(pool: &SqlitePool) -> Result<CatalogoPrueba> {
    let sede_id = Uuid::new_v4();
    let servicio_id = Uuid::new_v4();
    let profesional_id = Uuid::new_v4();

    sqlx::query("INSERT INTO sedes (id, nombre, direccion, activa, created_at) VALUES (?, ?, ?, 1, ?)")
        .bind(sede_id)
        .bind("Sede Centro")
        .bind("Av. Mayo 742")
        .bind(Utc::now())
        .execute(pool)
        .await?;

    sqlx::query(
        "INSERT INTO servicios (id, sede_id, nombre, duracion_min, activo, created_at) \
         VALUES (?, ?, ?, 20, 1, ?)",
    )
    .bind(servicio_id)
    .bind(sede_id)
    .bind("Medicina General")
    .bind(Utc::now())
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO profesionales (id, sede_id, nombre, especialidad, activo, created_at) \
         VALUES (?, ?, ?, ?, 1, ?)",
    )
    .bind(profesional_id)
    .bind(sede_id)
    .bind("Dra. Carmen Ruiz")
    .bind("Medicina General")
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(CatalogoPrueba {
        sede_id,
        servicio_id,
        profesional_id,
    })
}

/// Siembra una cola del servicio del catálogo con el estado pedido
pub async fn sembrar_cola(
    pool: &SqlitePool,
    cat: &CatalogoPrueba,
    nombre: &str,
    activa: bool,
    cerrada: bool,
    turnos_actuales: i64,
) -> Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO colas (id, sede_id, servicio_id, nombre, activa, cerrada, turnos_actuales, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(cat.sede_id)
    .bind(cat.servicio_id)
    .bind(nombre)
    .bind(activa)
    .bind(cerrada)
    .bind(turnos_actuales)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(id)
}

/// Siembra una cita agendada a `desplazamiento_min` minutos de ahora
pub async fn sembrar_cita(
    pool: &SqlitePool,
    cat: &CatalogoPrueba,
    desplazamiento_min: i64,
    estado: EstadoCita,
) -> Result<Cita> {
    let agendada = Utc::now() + Duration::minutes(desplazamiento_min);

    let cita = Cita {
        id: Uuid::new_v4(),
        usuario_id: Uuid::new_v4(),
        usuario_nombre: "Luis Pardo".to_string(),
        sede_id: cat.sede_id,
        sede_nombre: "Sede Centro".to_string(),
        servicio_id: cat.servicio_id,
        servicio_nombre: "Medicina General".to_string(),
        profesional_id: cat.profesional_id,
        profesional_nombre: "Dra. Carmen Ruiz".to_string(),
        fecha: agendada.date_naive(),
        hora: agendada.time(),
        estado,
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

    Ok(cita)
}

/// Filas de auditoría registradas para un código
pub async fn contar_logs(pool: &SqlitePool, codigo: &str) -> Result<i64> {
    let total = sqlx::query_scalar("SELECT COUNT(*) FROM logs_qr WHERE codigo = ?")
        .bind(codigo)
        .fetch_one(pool)
        .await?;
    Ok(total)
}
