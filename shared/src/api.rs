//! Wire types and paths for the SIAM backend.

use serde::{Deserialize, Serialize};

use crate::lenient;

pub const TERRITORY_PATH: &str = "/api/mantenimiento/siam/territorio";
pub const PERU_BOUNDARY_PATH: &str = "/api/mantenimiento/siam/peru-boundary";
pub const COMPANY_INFO_PATH: &str = "/api/company/info";
pub const AUTH_IDENTIFY_PATH: &str = "/api/auth/identify";
pub const AUTH_VERIFY_PATH: &str = "/api/auth/verify";
pub const NOTARY_REQUESTS_PATH: &str = "/api/mantenimiento/siam/notary-requests";
pub const NOTARY_SEARCH_PATH: &str = "/api/mantenimiento/siam/notarias/search";
pub const SOLICITUD_ALTA_PATH: &str = "/api/mantenimiento/siam/solicitud-alta-notaria";
pub const CONTACTOS_PATH: &str = "/api/mantenimiento/siam/contactos";
/// Served by the front-end host rather than the backend.
pub const CLIENT_CONFIG_PATH: &str = "/api/client-config";
pub const HEALTH_PATH: &str = "/api/health";
pub const PUBLIC_IP_URL: &str = "https://api.ipify.org?format=json";

pub fn approve_request_path(nro_sol: i64) -> String {
    format!("/api/mantenimiento/siam/approve-request/{nro_sol}")
}

pub fn suspend_request_path(nro_sol: i64) -> String {
    format!("/api/mantenimiento/siam/suspend-request/{nro_sol}")
}

/// Only call with a validated (all-digit) DNI.
pub fn persona_path(dni: &str) -> String {
    format!("/api/mantenimiento/siam/persona/{dni}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyRequest {
    pub username: String,
}

/// Worker record resolved by `identify`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerIdentity {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub nlineno: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub ide_gru: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub des_gru: Option<String>,
    /// Base64 JPEG photo handle.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub fot_trb: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub nom_trb: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentifyResponse {
    pub success: bool,
    pub data: Option<WorkerIdentity>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub nlineno: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub ccpassword: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyRecord {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub ide_eje: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub ruc_eje: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub nom_en1: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub nom_en2: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub cel_mov: Option<String>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub lat_eje: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub lon_eje: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub ide_dis: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompanyInfoResponse {
    pub success: bool,
    pub data: Option<Vec<CompanyRecord>>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspendRequest {
    pub flg_sus: i64,
}

/// Person resolved by DNI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Persona {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub ide_per: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub pat_per: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub mat_per: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub nom_per: Option<String>,
}

impl Persona {
    pub fn full_name(&self) -> String {
        [&self.pat_per, &self.mat_per, &self.nom_per]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Notary office from the catalog search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotaryOffice {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub ide_not: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub nom_com: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub dir_not: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub ruc_not: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolicitudAltaPayload {
    pub ide_per: i64,
    pub ide_not: i64,
    pub nro_wha: String,
    pub cor_ele: String,
    pub obs_sol: String,
    pub nro_dni: String,
    pub i_p_pub: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolicitudSummary {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub nro_sol: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub flg_apr: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub fch_sol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SolicitudAltaResponse {
    pub solicitud: Option<SolicitudSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactPayload {
    pub nom_ent: String,
    pub ape_nom: String,
    pub car_goo: String,
    pub cor_ele: String,
    pub cel_wha: String,
    pub obs_des: String,
    pub ide_eje: Option<i64>,
    pub i_p_pub: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PublicIpResponse {
    pub ip: String,
}

/// Generic error body; the backend uses `error` or `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub success: Option<bool>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn text(&self) -> Option<&str> {
        self.error.as_deref().or(self.message.as_deref())
    }
}

/// Runtime settings the host hands to the browser client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub ide_eje: i64,
    #[serde(default)]
    pub whatsapp_number: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ide_eje: 1,
            whatsapp_number: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identify_response_decodes_string_ids() {
        let resp: IdentifyResponse = serde_json::from_value(json!({
            "success": true,
            "data": {"nlineno": "12", "ide_gru": 3, "des_gru": "ADMIN", "fot_trb": null, "nom_trb": "ANA"}
        }))
        .expect("identify response");
        let data = resp.data.expect("data");
        assert_eq!(data.nlineno, Some(12));
        assert_eq!(data.ide_gru, Some(3));
        assert_eq!(data.fot_trb, None);
    }

    #[test]
    fn failed_identify_has_no_data() {
        let resp: IdentifyResponse =
            serde_json::from_value(json!({"success": false})).expect("identify response");
        assert!(!resp.success);
        assert!(resp.data.is_none());
    }

    #[test]
    fn persona_full_name_skips_blank_parts() {
        let p = Persona {
            ide_per: Some(1),
            pat_per: Some("QUISPE".into()),
            mat_per: Some(" ".into()),
            nom_per: Some("ROSA".into()),
        };
        assert_eq!(p.full_name(), "QUISPE ROSA");
    }

    #[test]
    fn request_paths_embed_ids() {
        assert_eq!(approve_request_path(9), "/api/mantenimiento/siam/approve-request/9");
        assert_eq!(suspend_request_path(9), "/api/mantenimiento/siam/suspend-request/9");
        assert_eq!(persona_path("12345678"), "/api/mantenimiento/siam/persona/12345678");
    }
}
