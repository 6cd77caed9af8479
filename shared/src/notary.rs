//! Notary onboarding requests: the admin listing and the public submission.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{NotaryOffice, Persona, SolicitudAltaPayload, SolicitudAltaResponse};
use crate::error::{ApiError, ConflictDetails};
use crate::lenient;

pub const DNI_LEN: usize = 8;

/// One row of `notary-requests`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotaryRequest {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub nro_sol: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub fch_sol: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub dni_not: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub nom_not: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub dni_sol: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub nom_sol: Option<String>,
    #[serde(alias = "nro_wha", deserialize_with = "lenient::opt_string")]
    pub cel_sol: Option<String>,
    #[serde(alias = "cor_ele", deserialize_with = "lenient::opt_string")]
    pub cor_sol: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub flg_apr: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub fch_apr: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub flg_sus: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub fch_sus: Option<String>,
}

impl NotaryRequest {
    pub fn is_suspended(&self) -> bool {
        self.flg_sus == Some(1)
    }

    /// Flag to send when toggling suspension: `1 → 0`, anything else `→ 1`.
    pub fn toggled_suspension(&self) -> i64 {
        if self.is_suspended() { 0 } else { 1 }
    }
}

/// Rows that are not objects are dropped with a warning.
pub fn parse_requests(value: &Value) -> Vec<NotaryRequest> {
    let Some(rows) = value.as_array() else {
        tracing::warn!("notary-requests body is not an array");
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| match NotaryRequest::deserialize(row) {
            Ok(req) => Some(req),
            Err(e) => {
                tracing::warn!(error = %e, "skipping notary request row");
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotaryTab {
    #[default]
    Pending,
    Authorized,
    Suspended,
}

impl NotaryTab {
    pub const ALL: [NotaryTab; 3] = [Self::Pending, Self::Authorized, Self::Suspended];

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Solicitudes de Alta",
            Self::Authorized => "Autorizados",
            Self::Suspended => "Suspendidos",
        }
    }

    pub fn empty_title(self) -> &'static str {
        match self {
            Self::Pending => "Sin Solicitudes Pendientes",
            Self::Authorized | Self::Suspended => "Sin Notarías Autorizadas",
        }
    }

    pub fn matches(self, req: &NotaryRequest) -> bool {
        match self {
            Self::Pending => req.flg_apr == Some(0),
            Self::Authorized => req.flg_apr == Some(1) && !req.is_suspended(),
            Self::Suspended => req.is_suspended(),
        }
    }

    pub fn filter(self, rows: &[NotaryRequest]) -> Vec<NotaryRequest> {
        rows.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Exactly eight characters. The length check is all the backend expects;
/// digits are also required so the value is safe to put in a path.
pub fn validate_dni(dni: &str) -> Result<&str, ApiError> {
    let dni = dni.trim();
    if dni.chars().count() == DNI_LEN && dni.chars().all(|c| c.is_ascii_digit()) {
        Ok(dni)
    } else {
        Err(ApiError::Validation("Ingrese un DNI válido de 8 dígitos.".to_owned()))
    }
}

/// Form state of the onboarding modal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnboardingDraft {
    pub dni: String,
    pub persona: Option<Persona>,
    pub notary_query: String,
    pub notary: Option<NotaryOffice>,
    pub whatsapp: String,
    pub email: String,
    pub notes: String,
    pub public_ip: String,
}

impl OnboardingDraft {
    /// Editing the search text drops the selected notary.
    pub fn set_notary_query(&mut self, query: String) {
        self.notary_query = query;
        self.notary = None;
    }

    pub fn select_notary(&mut self, office: NotaryOffice) {
        self.notary = Some(office);
        self.notary_query.clear();
    }

    /// Editing the DNI drops a person found for a different number.
    pub fn set_dni(&mut self, dni: String) {
        if dni.trim() != self.dni.trim() {
            self.persona = None;
        }
        self.dni = dni;
    }

    /// Apply a lookup made for `looked_up`. Ignored (returns `false`) when the
    /// DNI field changed while the lookup was in flight.
    pub fn apply_persona(&mut self, looked_up: &str, persona: Option<Persona>) -> bool {
        if self.dni.trim() != looked_up.trim() {
            return false;
        }
        self.persona = persona;
        true
    }

    pub fn to_payload(&self) -> Result<SolicitudAltaPayload, ApiError> {
        let Some(ide_per) = self.persona.as_ref().and_then(|p| p.ide_per) else {
            return Err(ApiError::Validation(
                "Debe identificar primero al solicitante mediante su DNI.".to_owned(),
            ));
        };
        let Some(ide_not) = self.notary.as_ref().and_then(|n| n.ide_not) else {
            return Err(ApiError::Validation(
                "Debe seleccionar una notaría válida del listado.".to_owned(),
            ));
        };
        Ok(SolicitudAltaPayload {
            ide_per,
            ide_not,
            nro_wha: self.whatsapp.trim().to_owned(),
            cor_ele: self.email.trim().to_owned(),
            obs_sol: self.notes.trim().to_owned(),
            nro_dni: self.dni.trim().to_owned(),
            i_p_pub: self.public_ip.clone(),
        })
    }
}

/// Map a submission response to the request number or a typed failure.
pub fn interpret_submission(status: u16, body: &Value) -> Result<i64, ApiError> {
    let resp = SolicitudAltaResponse::deserialize(body).unwrap_or_default();
    match status {
        200..=299 => resp
            .solicitud
            .and_then(|s| s.nro_sol)
            .ok_or_else(|| ApiError::Parse("response without solicitud.nro_sol".to_owned())),
        409 => {
            let sol = resp.solicitud.unwrap_or_default();
            Err(ApiError::Conflict(ConflictDetails {
                nro_sol: sol.nro_sol,
                approved: sol.flg_apr == Some(1),
                fch_sol: sol.fch_sol,
            }))
        }
        _ => Err(ApiError::Http {
            status,
            message: resp.error.unwrap_or_else(|| {
                "Ocurrió un error inesperado al procesar el registro.".to_owned()
            }),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(nro: i64, apr: i64, sus: Option<i64>) -> NotaryRequest {
        NotaryRequest {
            nro_sol: Some(nro),
            flg_apr: Some(apr),
            flg_sus: sus,
            ..Default::default()
        }
    }

    #[test]
    fn tabs_partition_by_flags() {
        let rows = vec![row(1, 0, None), row(2, 1, Some(0)), row(3, 1, Some(1)), row(4, 1, None)];
        let ids = |tab: NotaryTab| -> Vec<i64> {
            tab.filter(&rows).iter().filter_map(|r| r.nro_sol).collect()
        };
        assert_eq!(ids(NotaryTab::Pending), vec![1]);
        assert_eq!(ids(NotaryTab::Authorized), vec![2, 4]);
        assert_eq!(ids(NotaryTab::Suspended), vec![3]);
    }

    #[test]
    fn suspension_toggle() {
        assert_eq!(row(1, 1, Some(1)).toggled_suspension(), 0);
        assert_eq!(row(1, 1, Some(0)).toggled_suspension(), 1);
        assert_eq!(row(1, 1, None).toggled_suspension(), 1);
    }

    #[test]
    fn parse_requests_accepts_string_flags_and_aliases() {
        let rows = parse_requests(&json!([
            {"nro_sol": "5", "flg_apr": "1", "flg_sus": 0, "nro_wha": "999", "cor_ele": "a@b.pe"},
            "junk"
        ]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nro_sol, Some(5));
        assert_eq!(rows[0].cel_sol.as_deref(), Some("999"));
        assert_eq!(rows[0].cor_sol.as_deref(), Some("a@b.pe"));
        assert!(NotaryTab::Authorized.matches(&rows[0]));
        assert!(parse_requests(&json!({"error": "x"})).is_empty());
    }

    #[test]
    fn dni_must_be_eight_digits() {
        assert_eq!(validate_dni(" 12345678 "), Ok("12345678"));
        assert!(validate_dni("1234567").is_err());
        assert!(validate_dni("123456789").is_err());
        assert!(validate_dni("1234567a").is_err());
    }

    #[test]
    fn payload_requires_persona_then_notary() {
        let mut draft = OnboardingDraft { dni: "12345678".into(), ..Default::default() };
        let err = draft.to_payload().unwrap_err();
        assert!(err.user_message().contains("DNI"));

        assert!(draft.apply_persona("12345678", Some(Persona { ide_per: Some(10), ..Default::default() })));
        let err = draft.to_payload().unwrap_err();
        assert!(err.user_message().contains("notaría"));

        draft.select_notary(NotaryOffice { ide_not: Some(3), ..Default::default() });
        draft.whatsapp = " 987654321 ".into();
        draft.public_ip = "1.2.3.4".into();
        let payload = draft.to_payload().expect("payload");
        assert_eq!(payload.ide_per, 10);
        assert_eq!(payload.ide_not, 3);
        assert_eq!(payload.nro_wha, "987654321");
        assert_eq!(payload.nro_dni, "12345678");
        assert_eq!(payload.i_p_pub, "1.2.3.4");
    }

    #[test]
    fn editing_notary_query_clears_selection() {
        let mut draft = OnboardingDraft::default();
        draft.select_notary(NotaryOffice { ide_not: Some(3), ..Default::default() });
        draft.set_notary_query("lima".into());
        assert!(draft.notary.is_none());
    }

    #[test]
    fn submission_outcomes() {
        assert_eq!(interpret_submission(201, &json!({"solicitud": {"nro_sol": 42}})), Ok(42));

        let conflict = interpret_submission(
            409,
            &json!({"solicitud": {"nro_sol": 17, "flg_apr": 1, "fch_sol": "2026-02-03"}}),
        )
        .unwrap_err();
        assert_eq!(
            conflict.user_message(),
            "Existe una solicitud activa (#17) para esta notaría con estado: APROBADA. Registrada el 03/02/2026."
        );

        let other = interpret_submission(500, &json!({"error": "DNI duplicado"})).unwrap_err();
        assert_eq!(other.user_message(), "DNI duplicado");
        let generic = interpret_submission(500, &json!("oops")).unwrap_err();
        assert!(generic.user_message().contains("inesperado"));
    }

    #[test]
    fn editing_the_dni_drops_the_found_person() {
        let mut draft = OnboardingDraft::default();
        draft.set_dni("12345678".into());
        assert!(draft.apply_persona("12345678", Some(Persona { ide_per: Some(10), ..Default::default() })));
        draft.set_dni(" 12345678 ".into());
        assert!(draft.persona.is_some());
        draft.set_dni("87654321".into());
        assert_eq!(draft.persona, None);
    }

    #[test]
    fn late_lookup_for_an_old_dni_is_ignored() {
        let mut draft = OnboardingDraft::default();
        draft.set_dni("87654321".into());
        let applied =
            draft.apply_persona("12345678", Some(Persona { ide_per: Some(10), ..Default::default() }));
        assert!(!applied);
        assert_eq!(draft.persona, None);
        assert_eq!(
            draft.to_payload().unwrap_err(),
            ApiError::Validation("Debe identificar primero al solicitante mediante su DNI.".into())
        );
    }
}
