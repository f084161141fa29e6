//! Modelos de datos compartidos entre aplicaciones
//!
//! Este módulo define las estructuras principales usadas por el ecosistema
//! CitaVerde: catálogo (sedes, servicios, profesionales), colas de turnos,
//! citas agendadas y el registro de auditoría de escaneos QR.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::str::FromStr;
use uuid::Uuid;

fn decode_error(columna: &str, valor: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: columna.to_string(),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Valor inválido para {}: {}", columna, valor),
        )),
    }
}

/// Estados posibles de un turno de cola
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoTurno {
    /// Esperando a ser llamado
    EnEspera,
    /// Siendo atendido en ventanilla
    EnAtencion,
    /// Atención finalizada
    Atendido,
    /// Cancelado por el usuario o por recepción
    Cancelado,
}

impl std::fmt::Display for EstadoTurno {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstadoTurno::EnEspera => write!(f, "en_espera"),
            EstadoTurno::EnAtencion => write!(f, "en_atencion"),
            EstadoTurno::Atendido => write!(f, "atendido"),
            EstadoTurno::Cancelado => write!(f, "cancelado"),
        }
    }
}

impl FromStr for EstadoTurno {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en_espera" => Ok(EstadoTurno::EnEspera),
            "en_atencion" => Ok(EstadoTurno::EnAtencion),
            "atendido" => Ok(EstadoTurno::Atendido),
            "cancelado" => Ok(EstadoTurno::Cancelado),
            otro => Err(format!("Estado de turno desconocido: {}", otro)),
        }
    }
}

/// Estados posibles de una cita agendada
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoCita {
    /// Creada, pendiente de confirmación por enlace
    Pendiente,
    /// Confirmada por el paciente
    Confirmada,
    /// Consulta en curso
    EnCurso,
    /// Consulta concluida
    Completada,
    /// Cancelada
    Cancelada,
    /// El paciente no se presentó
    NoShow,
}

impl EstadoCita {
    /// Indica si el estado es terminal (no admite más transiciones)
    pub fn es_terminal(&self) -> bool {
        matches!(
            self,
            EstadoCita::Completada | EstadoCita::Cancelada | EstadoCita::NoShow
        )
    }
}

impl std::fmt::Display for EstadoCita {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstadoCita::Pendiente => write!(f, "pendiente"),
            EstadoCita::Confirmada => write!(f, "confirmada"),
            EstadoCita::EnCurso => write!(f, "en_curso"),
            EstadoCita::Completada => write!(f, "completada"),
            EstadoCita::Cancelada => write!(f, "cancelada"),
            EstadoCita::NoShow => write!(f, "no_show"),
        }
    }
}

impl FromStr for EstadoCita {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(EstadoCita::Pendiente),
            "confirmada" => Ok(EstadoCita::Confirmada),
            "en_curso" => Ok(EstadoCita::EnCurso),
            "completada" => Ok(EstadoCita::Completada),
            "cancelada" => Ok(EstadoCita::Cancelada),
            "no_show" => Ok(EstadoCita::NoShow),
            otro => Err(format!("Estado de cita desconocido: {}", otro)),
        }
    }
}

/// Resultado de un intento de escaneo QR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultadoQr {
    /// Check-in registrado
    Exitoso,
    /// El código ya había sido consumido
    Usado,
    /// Fuera de la ventana de check-in
    Vencido,
    /// Rechazado por otra causa (estado inválido, fallo de persistencia)
    Error,
}

impl std::fmt::Display for ResultadoQr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultadoQr::Exitoso => write!(f, "exitoso"),
            ResultadoQr::Usado => write!(f, "usado"),
            ResultadoQr::Vencido => write!(f, "vencido"),
            ResultadoQr::Error => write!(f, "error"),
        }
    }
}

impl FromStr for ResultadoQr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exitoso" => Ok(ResultadoQr::Exitoso),
            "usado" => Ok(ResultadoQr::Usado),
            "vencido" => Ok(ResultadoQr::Vencido),
            "error" => Ok(ResultadoQr::Error),
            otro => Err(format!("Resultado de escaneo desconocido: {}", otro)),
        }
    }
}

/// Una sede física de la clínica
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sede {
    pub id: Uuid,
    pub nombre: String,
    pub direccion: String,
    pub activa: bool,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Sede {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            nombre: row.try_get("nombre")?,
            direccion: row.try_get("direccion")?,
            activa: row.try_get("activa")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Un servicio ofrecido en una sede
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Servicio {
    pub id: Uuid,
    pub sede_id: Uuid,
    pub nombre: String,
    /// Duración estimada de la atención en minutos
    pub duracion_min: i64,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Servicio {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            sede_id: row.try_get("sede_id")?,
            nombre: row.try_get("nombre")?,
            duracion_min: row.try_get("duracion_min")?,
            activo: row.try_get("activo")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Un profesional asignado a una sede
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profesional {
    pub id: Uuid,
    pub sede_id: Uuid,
    pub nombre: String,
    pub especialidad: String,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Profesional {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            sede_id: row.try_get("sede_id")?,
            nombre: row.try_get("nombre")?,
            especialidad: row.try_get("especialidad")?,
            activo: row.try_get("activo")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Una fila de espera para un servicio en una sede
///
/// La relación cola-turno se lleva siempre por `id`; `nombre` es solo
/// para mostrar en pantalla.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cola {
    pub id: Uuid,
    pub sede_id: Uuid,
    pub servicio_id: Uuid,
    pub nombre: String,
    /// Solo una cola activa y no cerrada acepta turnos nuevos
    pub activa: bool,
    pub cerrada: bool,
    /// Cantidad de turnos en espera, mantenida al crear y cerrar turnos
    pub turnos_actuales: i64,
    pub created_at: DateTime<Utc>,
}

impl Cola {
    /// Indica si la cola puede recibir turnos nuevos
    pub fn admite_turnos(&self) -> bool {
        self.activa && !self.cerrada
    }
}

impl FromRow<'_, SqliteRow> for Cola {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            sede_id: row.try_get("sede_id")?,
            servicio_id: row.try_get("servicio_id")?,
            nombre: row.try_get("nombre")?,
            activa: row.try_get("activa")?,
            cerrada: row.try_get("cerrada")?,
            turnos_actuales: row.try_get("turnos_actuales")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Un turno numerado emitido a un usuario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turno {
    pub id: Uuid,
    pub cola_id: Uuid,
    pub sede_id: Uuid,
    pub servicio_id: Uuid,
    pub usuario_id: Uuid,
    pub usuario_nombre: String,
    /// Número secuencial dentro de la cola, empieza en 1
    pub numero: i64,
    pub estado: EstadoTurno,
    pub duracion_estimada_min: i64,
    /// Código opaco para check-in por escaneo
    pub codigo_qr: String,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Turno {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let estado: String = row.try_get("estado")?;
        Ok(Self {
            id: row.try_get("id")?,
            cola_id: row.try_get("cola_id")?,
            sede_id: row.try_get("sede_id")?,
            servicio_id: row.try_get("servicio_id")?,
            usuario_id: row.try_get("usuario_id")?,
            usuario_nombre: row.try_get("usuario_nombre")?,
            numero: row.try_get("numero")?,
            estado: estado.parse().map_err(|_| decode_error("estado", &estado))?,
            duracion_estimada_min: row.try_get("duracion_estimada_min")?,
            codigo_qr: row.try_get("codigo_qr")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Una visita agendada con fecha y hora
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cita {
    pub id: Uuid,
    pub usuario_id: Uuid,
    pub usuario_nombre: String,
    pub sede_id: Uuid,
    pub sede_nombre: String,
    pub servicio_id: Uuid,
    pub servicio_nombre: String,
    pub profesional_id: Uuid,
    pub profesional_nombre: String,
    pub fecha: NaiveDate,
    pub hora: NaiveTime,
    pub estado: EstadoCita,
    /// Token opaco que autoriza confirmar o cancelar por enlace de correo
    pub token_confirmacion: String,
    /// Código opaco para check-in por escaneo
    pub codigo_qr: Option<String>,
    /// Momento en que se registró la llegada, si ocurrió
    pub checkin_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Cita {
    /// Fecha y hora agendadas combinadas, en UTC
    pub fn fecha_hora(&self) -> DateTime<Utc> {
        self.fecha.and_time(self.hora).and_utc()
    }
}

impl FromRow<'_, SqliteRow> for Cita {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let estado: String = row.try_get("estado")?;
        Ok(Self {
            id: row.try_get("id")?,
            usuario_id: row.try_get("usuario_id")?,
            usuario_nombre: row.try_get("usuario_nombre")?,
            sede_id: row.try_get("sede_id")?,
            sede_nombre: row.try_get("sede_nombre")?,
            servicio_id: row.try_get("servicio_id")?,
            servicio_nombre: row.try_get("servicio_nombre")?,
            profesional_id: row.try_get("profesional_id")?,
            profesional_nombre: row.try_get("profesional_nombre")?,
            fecha: row.try_get("fecha")?,
            hora: row.try_get("hora")?,
            estado: estado.parse().map_err(|_| decode_error("estado", &estado))?,
            token_confirmacion: row.try_get("token_confirmacion")?,
            codigo_qr: row.try_get("codigo_qr")?,
            checkin_at: row.try_get("checkin_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Registro inmutable de un intento de escaneo QR
///
/// Se escribe exactamente una fila por intento que llegó a resolverse y
/// nunca se actualiza ni se borra.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogQr {
    pub id: Uuid,
    pub codigo: String,
    pub cita_id: Option<Uuid>,
    pub turno_id: Option<Uuid>,
    /// Usuario dueño de la cita o turno resuelto
    pub usuario_id: Option<Uuid>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub resultado: ResultadoQr,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for LogQr {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let resultado: String = row.try_get("resultado")?;
        Ok(Self {
            id: row.try_get("id")?,
            codigo: row.try_get("codigo")?,
            cita_id: row.try_get("cita_id")?,
            turno_id: row.try_get("turno_id")?,
            usuario_id: row.try_get("usuario_id")?,
            ip: row.try_get("ip")?,
            user_agent: row.try_get("user_agent")?,
            resultado: resultado
                .parse()
                .map_err(|_| decode_error("resultado", &resultado))?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Entrada clave/valor de la tabla de configuración
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Configuracion {
    pub clave: String,
    pub valor: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estados_parsean_y_muestran() {
        assert_eq!(
            "en_espera".parse::<EstadoTurno>().unwrap(),
            EstadoTurno::EnEspera
        );
        assert_eq!(EstadoTurno::EnAtencion.to_string(), "en_atencion");
        assert_eq!(
            "no_show".parse::<EstadoCita>().unwrap(),
            EstadoCita::NoShow
        );
        assert_eq!(EstadoCita::Confirmada.to_string(), "confirmada");
        assert_eq!(
            "vencido".parse::<ResultadoQr>().unwrap(),
            ResultadoQr::Vencido
        );
    }

    #[test]
    fn test_estado_desconocido_rechazado() {
        assert!("esperando".parse::<EstadoTurno>().is_err());
        assert!("".parse::<EstadoCita>().is_err());
        assert!("ok".parse::<ResultadoQr>().is_err());
    }

    #[test]
    fn test_estados_terminales_de_cita() {
        assert!(EstadoCita::Completada.es_terminal());
        assert!(EstadoCita::Cancelada.es_terminal());
        assert!(EstadoCita::NoShow.es_terminal());
        assert!(!EstadoCita::Pendiente.es_terminal());
        assert!(!EstadoCita::Confirmada.es_terminal());
        assert!(!EstadoCita::EnCurso.es_terminal());
    }
}
