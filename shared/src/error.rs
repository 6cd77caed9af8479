use crate::time_format::format_date;

pub type ApiResult<T> = Result<T, ApiError>;

/// Details of an existing request that blocks a new onboarding submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDetails {
    pub nro_sol: Option<i64>,
    pub approved: bool,
    pub fch_sol: Option<String>,
}

impl ConflictDetails {
    pub fn status_label(&self) -> &'static str {
        if self.approved { "APROBADA" } else { "EN TRÁMITE" }
    }
}

/// Failures surfaced by backend interactions.
///
/// `Parse` is recovered locally and never shown to users; `NotFound` and
/// `Validation` become inline form messages; `Conflict` names the blocking
/// record; `Network` and `Http` prompt a manual retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflicting request {0:?}")]
    Conflict(ConflictDetails),
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
}

impl ApiError {
    /// Message shown inline next to the form that triggered the request.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(msg) | Self::Validation(msg) => msg.clone(),
            Self::Conflict(details) => format!(
                "Existe una solicitud activa (#{}) para esta notaría con estado: {}. Registrada el {}.",
                details.nro_sol.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
                details.status_label(),
                format_date(details.fch_sol.as_deref()),
            ),
            Self::Http { message, .. } if !message.is_empty() => message.clone(),
            Self::Network(_) | Self::Parse(_) | Self::Http { .. } => {
                "No se pudo establecer conexión con el servidor. Intente nuevamente.".to_owned()
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<crate::geo::GeometryError> for ApiError {
    fn from(e: crate::geo::GeometryError) -> Self {
        Self::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_number_status_and_date() {
        let err = ApiError::Conflict(ConflictDetails {
            nro_sol: Some(17),
            approved: false,
            fch_sol: Some("2026-02-03 09:00:00".into()),
        });
        assert_eq!(
            err.user_message(),
            "Existe una solicitud activa (#17) para esta notaría con estado: EN TRÁMITE. Registrada el 03/02/2026."
        );
    }

    #[test]
    fn network_errors_get_a_generic_retry_message() {
        let err = ApiError::Network("connection refused".into());
        assert!(err.user_message().contains("Intente nuevamente"));
    }

    #[test]
    fn http_errors_prefer_backend_message() {
        let err = ApiError::Http { status: 500, message: "DNI inválido".into() };
        assert_eq!(err.user_message(), "DNI inválido");
    }
}
