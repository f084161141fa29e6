//! Reglas compartidas de validación
//!
//! Este módulo concentra la regla de ventana de check-in y los grafos de
//! transición de estado de turnos y citas. Las funciones reciben el
//! instante actual como parámetro.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::warn;

use common_db::models::{EstadoCita, EstadoTurno};

/// Clave de la tabla `configuracion` con la ventana de check-in
pub const CLAVE_VENTANA_CHECKIN: &str = "checkin_ventana_minutos";

/// Ventana de check-in usada cuando la configuración no está disponible
pub const VENTANA_CHECKIN_POR_DEFECTO_MIN: i64 = 15;

/// Duración de servicio usada cuando el servicio no se resuelve
pub const DURACION_SERVICIO_POR_DEFECTO_MIN: i64 = 15;

/// Lee la ventana de check-in en minutos desde la configuración
///
/// Un valor ausente o malformado cae en el defecto; un fallo del almacén
/// también, dejando constancia en el log.
pub async fn ventana_checkin_minutos(pool: &SqlitePool) -> i64 {
    let consulta = sqlx::query_scalar::<_, String>("SELECT valor FROM configuracion WHERE clave = ?")
        .bind(CLAVE_VENTANA_CHECKIN)
        .fetch_optional(pool)
        .await;

    match consulta {
        Ok(Some(valor)) => valor.parse().unwrap_or_else(|_| {
            warn!("Valor malformado en {}: {}", CLAVE_VENTANA_CHECKIN, valor);
            VENTANA_CHECKIN_POR_DEFECTO_MIN
        }),
        Ok(None) => VENTANA_CHECKIN_POR_DEFECTO_MIN,
        Err(e) => {
            warn!("No se pudo leer {}: {}", CLAVE_VENTANA_CHECKIN, e);
            VENTANA_CHECKIN_POR_DEFECTO_MIN
        }
    }
}

/// Evalúa la regla de ventana de check-in de una cita
///
/// El check-in es válido desde `ventana_min` minutos antes de la hora
/// agendada hasta la hora agendada, ambos extremos incluidos. Devuelve
/// un motivo legible cuando el instante queda fuera.
pub fn dentro_de_ventana(
    ahora: DateTime<Utc>,
    cita: DateTime<Utc>,
    ventana_min: i64,
) -> Result<(), String> {
    let apertura = cita - Duration::minutes(ventana_min);

    if ahora < apertura {
        return Err(format!(
            "El check-in abre {} minutos antes de la cita ({})",
            ventana_min,
            cita.format("%d/%m/%Y %H:%M")
        ));
    }

    if ahora > cita {
        return Err(format!(
            "La hora de la cita ({}) ya pasó",
            cita.format("%d/%m/%Y %H:%M")
        ));
    }

    Ok(())
}

/// Grafo de transiciones de un turno
///
/// en_espera -> en_atencion -> atendido; en_espera y en_atencion admiten
/// cancelación. Los estados atendido y cancelado son terminales.
pub fn transicion_turno_valida(actual: EstadoTurno, nuevo: EstadoTurno) -> bool {
    matches!(
        (actual, nuevo),
        (EstadoTurno::EnEspera, EstadoTurno::EnAtencion)
            | (EstadoTurno::EnEspera, EstadoTurno::Cancelado)
            | (EstadoTurno::EnAtencion, EstadoTurno::Atendido)
            | (EstadoTurno::EnAtencion, EstadoTurno::Cancelado)
    )
}

/// Grafo de transiciones de una cita, unidireccional hacia un terminal
pub fn transicion_cita_valida(actual: EstadoCita, nuevo: EstadoCita) -> bool {
    matches!(
        (actual, nuevo),
        (EstadoCita::Pendiente, EstadoCita::Confirmada)
            | (EstadoCita::Pendiente, EstadoCita::Cancelada)
            | (EstadoCita::Confirmada, EstadoCita::EnCurso)
            | (EstadoCita::Confirmada, EstadoCita::Cancelada)
            | (EstadoCita::Confirmada, EstadoCita::NoShow)
            | (EstadoCita::EnCurso, EstadoCita::Completada)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instante(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_ventana_acepta_dentro_del_rango() {
        let cita = instante(10, 0);
        // 10 minutos antes con ventana de 15
        assert!(dentro_de_ventana(instante(9, 50), cita, 15).is_ok());
    }

    #[test]
    fn test_ventana_extremos_inclusivos() {
        let cita = instante(10, 0);
        // Exactamente en la apertura
        assert!(dentro_de_ventana(instante(9, 45), cita, 15).is_ok());
        // Exactamente a la hora agendada
        assert!(dentro_de_ventana(instante(10, 0), cita, 15).is_ok());
    }

    #[test]
    fn test_ventana_rechaza_antes_de_abrir() {
        let cita = instante(12, 0);
        // Dos horas antes con ventana de 15 minutos
        let motivo = dentro_de_ventana(instante(10, 0), cita, 15).unwrap_err();
        assert!(motivo.contains("15 minutos"));
    }

    #[test]
    fn test_ventana_rechaza_despues_de_la_hora() {
        let cita = instante(10, 0);
        let motivo = dentro_de_ventana(instante(10, 1), cita, 15).unwrap_err();
        assert!(motivo.contains("ya pasó"));
    }

    #[test]
    fn test_transiciones_de_turno() {
        use EstadoTurno::*;
        assert!(transicion_turno_valida(EnEspera, EnAtencion));
        assert!(transicion_turno_valida(EnEspera, Cancelado));
        assert!(transicion_turno_valida(EnAtencion, Atendido));
        assert!(transicion_turno_valida(EnAtencion, Cancelado));
        // Sin retrocesos ni saltos
        assert!(!transicion_turno_valida(EnEspera, Atendido));
        assert!(!transicion_turno_valida(EnAtencion, EnEspera));
        assert!(!transicion_turno_valida(Atendido, EnAtencion));
        assert!(!transicion_turno_valida(Cancelado, EnEspera));
    }

    #[test]
    fn test_transiciones_de_cita() {
        use EstadoCita::*;
        assert!(transicion_cita_valida(Pendiente, Confirmada));
        assert!(transicion_cita_valida(Pendiente, Cancelada));
        assert!(transicion_cita_valida(Confirmada, EnCurso));
        assert!(transicion_cita_valida(Confirmada, NoShow));
        assert!(transicion_cita_valida(EnCurso, Completada));
        // Los terminales no admiten salidas
        assert!(!transicion_cita_valida(Completada, EnCurso));
        assert!(!transicion_cita_valida(Cancelada, Confirmada));
        assert!(!transicion_cita_valida(NoShow, Confirmada));
        // Sin saltos hacia atrás
        assert!(!transicion_cita_valida(Confirmada, Pendiente));
        assert!(!transicion_cita_valida(EnCurso, Confirmada));
        // El check-in no transiciona: en_curso requiere acción de personal
        assert!(!transicion_cita_valida(Pendiente, EnCurso));
    }
}
