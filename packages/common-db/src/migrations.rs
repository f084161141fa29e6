//! Sistema de migraciones para la base de datos
//!
//! Este módulo gestiona las migraciones del esquema SQLite de CitaVerde

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{error, info};

/// Lista de migraciones SQL a aplicar
const MIGRATIONS: &[&str] = &[
    // 001_catalogo_y_colas.sql
    r#"
    -- Catálogo de sedes físicas
    CREATE TABLE IF NOT EXISTS sedes (
        id TEXT PRIMARY KEY NOT NULL,
        nombre TEXT NOT NULL,
        direccion TEXT NOT NULL,
        activa BOOLEAN NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    -- Servicios ofrecidos por sede
    CREATE TABLE IF NOT EXISTS servicios (
        id TEXT PRIMARY KEY NOT NULL,
        sede_id TEXT NOT NULL,
        nombre TEXT NOT NULL,
        duracion_min INTEGER NOT NULL DEFAULT 15,
        activo BOOLEAN NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (sede_id) REFERENCES sedes (id) ON DELETE CASCADE
    );

    -- Profesionales por sede
    CREATE TABLE IF NOT EXISTS profesionales (
        id TEXT PRIMARY KEY NOT NULL,
        sede_id TEXT NOT NULL,
        nombre TEXT NOT NULL,
        especialidad TEXT NOT NULL,
        activo BOOLEAN NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (sede_id) REFERENCES sedes (id) ON DELETE CASCADE
    );

    -- Filas de espera, una por servicio y sede.
    -- servicio_id sin clave foránea: una cola puede sobrevivir a la
    -- recreación del servicio en el catálogo.
    CREATE TABLE IF NOT EXISTS colas (
        id TEXT PRIMARY KEY NOT NULL,
        sede_id TEXT NOT NULL,
        servicio_id TEXT NOT NULL,
        nombre TEXT NOT NULL,
        activa BOOLEAN NOT NULL DEFAULT 1,
        cerrada BOOLEAN NOT NULL DEFAULT 0,
        turnos_actuales INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (sede_id) REFERENCES sedes (id) ON DELETE CASCADE
    );

    -- Turnos emitidos; la relación con la cola es por id
    CREATE TABLE IF NOT EXISTS turnos (
        id TEXT PRIMARY KEY NOT NULL,
        cola_id TEXT NOT NULL,
        sede_id TEXT NOT NULL,
        servicio_id TEXT NOT NULL,
        usuario_id TEXT NOT NULL,
        usuario_nombre TEXT NOT NULL,
        numero INTEGER NOT NULL,
        estado TEXT NOT NULL CHECK (estado IN ('en_espera', 'en_atencion', 'atendido', 'cancelado')),
        duracion_estimada_min INTEGER NOT NULL,
        codigo_qr TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (cola_id) REFERENCES colas (id) ON DELETE CASCADE
    );

    -- Índices para las consultas de asignación
    CREATE INDEX IF NOT EXISTS idx_colas_servicio_sede ON colas (servicio_id, sede_id);
    CREATE INDEX IF NOT EXISTS idx_turnos_cola_estado ON turnos (cola_id, estado);
    CREATE INDEX IF NOT EXISTS idx_turnos_codigo_qr ON turnos (codigo_qr);
    "#,
    // 002_citas_y_auditoria.sql
    r#"
    -- Citas agendadas con fecha y hora
    CREATE TABLE IF NOT EXISTS citas (
        id TEXT PRIMARY KEY NOT NULL,
        usuario_id TEXT NOT NULL,
        usuario_nombre TEXT NOT NULL,
        sede_id TEXT NOT NULL,
        sede_nombre TEXT NOT NULL,
        servicio_id TEXT NOT NULL,
        servicio_nombre TEXT NOT NULL,
        profesional_id TEXT NOT NULL,
        profesional_nombre TEXT NOT NULL,
        fecha DATE NOT NULL,
        hora TIME NOT NULL,
        estado TEXT NOT NULL CHECK (estado IN ('pendiente', 'confirmada', 'en_curso', 'completada', 'cancelada', 'no_show')),
        token_confirmacion TEXT NOT NULL UNIQUE,
        codigo_qr TEXT,
        checkin_at TIMESTAMP,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (sede_id) REFERENCES sedes (id),
        FOREIGN KEY (servicio_id) REFERENCES servicios (id),
        FOREIGN KEY (profesional_id) REFERENCES profesionales (id)
    );

    -- Auditoría de escaneos QR, solo inserciones.
    -- Sin restricción de unicidad sobre (codigo, resultado): la detección
    -- de códigos ya usados se hace leyendo esta tabla antes de insertar.
    CREATE TABLE IF NOT EXISTS logs_qr (
        id TEXT PRIMARY KEY NOT NULL,
        codigo TEXT NOT NULL,
        cita_id TEXT,
        turno_id TEXT,
        usuario_id TEXT,
        ip TEXT,
        user_agent TEXT,
        resultado TEXT NOT NULL CHECK (resultado IN ('exitoso', 'usado', 'vencido', 'error')),
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    -- Parámetros ajustables leídos en tiempo de ejecución
    CREATE TABLE IF NOT EXISTS configuracion (
        clave TEXT PRIMARY KEY NOT NULL,
        valor TEXT NOT NULL,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    INSERT OR IGNORE INTO configuracion (clave, valor) VALUES ('checkin_ventana_minutos', '15');

    -- Índices para la verificación de escaneos
    CREATE INDEX IF NOT EXISTS idx_citas_codigo_qr ON citas (codigo_qr);
    CREATE INDEX IF NOT EXISTS idx_citas_token ON citas (token_confirmacion);
    CREATE INDEX IF NOT EXISTS idx_citas_fecha ON citas (fecha);
    CREATE INDEX IF NOT EXISTS idx_logs_qr_codigo ON logs_qr (codigo);
    CREATE INDEX IF NOT EXISTS idx_logs_qr_codigo_resultado ON logs_qr (codigo, resultado);
    "#,
];

/// Ejecuta todas las migraciones pendientes en la base de datos
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Aplicando migraciones de base de datos...");

    // Obtener la versión actual de la base
    let mut version: i64 = 0;
    match sqlx::query_scalar("PRAGMA user_version").fetch_one(pool).await {
        Ok(v) => version = v,
        Err(e) => {
            error!("Error al obtener la versión de la base: {}", e);
            // Continuar de todos modos, puede ser la primera ejecución
        }
    }

    info!("Versión actual de la base: {}", version);

    // Aplicar cada migración pendiente de forma secuencial
    for (i, migration_sql) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as i64;

        // Saltar migraciones ya aplicadas
        if migration_version <= version {
            info!("Migración {} ya aplicada", migration_version);
            continue;
        }

        info!("Aplicando migración {}...", migration_version);

        // Ejecutar en una transacción para garantizar atomicidad
        let mut transaction = pool.begin().await.context(format!(
            "Fallo al iniciar la transacción de la migración {}",
            migration_version
        ))?;

        sqlx::query(migration_sql)
            .execute(&mut *transaction)
            .await
            .context(format!("Fallo al ejecutar la migración {}", migration_version))?;

        sqlx::query(&format!("PRAGMA user_version = {}", migration_version))
            .execute(&mut *transaction)
            .await
            .context(format!(
                "Fallo al actualizar la versión a {}",
                migration_version
            ))?;

        transaction.commit().await.context(format!(
            "Fallo al confirmar la transacción de la migración {}",
            migration_version
        ))?;

        info!("Migración {} aplicada con éxito", migration_version);
    }

    info!("Migraciones completadas. Versión actual: {}", MIGRATIONS.len());
    Ok(())
}
