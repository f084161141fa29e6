//! Generación de identificadores opacos
//!
//! Este módulo produce los tokens de confirmación de citas y los códigos
//! QR de check-in. Ambos son cadenas aleatorias sin significado propio;
//! el almacén es quien las asocia a una cita o turno.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Longitud de los tokens de confirmación
const LONGITUD_TOKEN: usize = 32;

/// Longitud de la parte aleatoria de los códigos QR
const LONGITUD_CODIGO_QR: usize = 22;

/// Prefijo de los códigos QR emitidos por CitaVerde
pub const PREFIJO_QR: &str = "CV-";

fn cadena_aleatoria(longitud: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(longitud)
        .map(char::from)
        .collect()
}

/// Genera un token opaco para autorizar acciones por enlace de correo
pub fn generar_token_confirmacion() -> String {
    cadena_aleatoria(LONGITUD_TOKEN)
}

/// Genera el contenido de un código QR de check-in
pub fn generar_codigo_qr() -> String {
    format!("{}{}", PREFIJO_QR, cadena_aleatoria(LONGITUD_CODIGO_QR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_distintos() {
        let a = generar_token_confirmacion();
        let b = generar_token_confirmacion();
        assert_ne!(a, b);
        assert_eq!(a.len(), LONGITUD_TOKEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_codigo_qr_con_prefijo() {
        let codigo = generar_codigo_qr();
        assert!(codigo.starts_with(PREFIJO_QR));
        assert_eq!(codigo.len(), PREFIJO_QR.len() + LONGITUD_CODIGO_QR);
        assert_ne!(codigo, generar_codigo_qr());
    }
}
