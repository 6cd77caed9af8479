use crate::api::{CompanyInfoResponse, CompanyRecord};
use crate::error::{ApiError, ApiResult};
use crate::geo::LatLng;

pub const OFFICE_ZOOM: f64 = 16.0;

/// The configured entity, with empty fields until the profile loads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyProfile {
    pub ide_eje: Option<i64>,
    pub ruc: String,
    pub name: String,
    pub subtitle: String,
    pub mobile: String,
    pub location: Option<LatLng>,
    pub district_code: String,
}

impl From<&CompanyRecord> for CompanyProfile {
    fn from(record: &CompanyRecord) -> Self {
        let location = match (record.lat_eje, record.lon_eje) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)).filter(LatLng::is_finite),
            _ => None,
        };
        Self {
            ide_eje: record.ide_eje,
            ruc: record.ruc_eje.clone().unwrap_or_default(),
            name: record.nom_en1.clone().unwrap_or_default(),
            subtitle: record.nom_en2.clone().unwrap_or_default(),
            mobile: record.cel_mov.clone().unwrap_or_default(),
            location,
            district_code: record.ide_dis.clone().unwrap_or_default(),
        }
    }
}

impl CompanyProfile {
    pub fn is_loaded(&self) -> bool {
        self.ide_eje.is_some()
    }

    /// `wa.me` link from the mobile number, digits only.
    pub fn whatsapp_url(&self) -> Option<String> {
        whatsapp_url(&self.mobile)
    }

    pub fn directions_url(&self) -> Option<String> {
        self.location.map(|p| {
            format!("https://www.google.com/maps/dir/?api=1&destination={},{}", p.lat, p.lng)
        })
    }
}

pub fn whatsapp_url(number: &str) -> Option<String> {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then(|| format!("https://wa.me/{digits}"))
}

/// Pick the record for `ide_eje` out of a `company/info` response.
pub fn select_company(resp: &CompanyInfoResponse, ide_eje: i64) -> ApiResult<CompanyProfile> {
    if !resp.success {
        return Err(ApiError::Http {
            status: 200,
            message: resp.message.clone().unwrap_or_default(),
        });
    }
    resp.data
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|r| r.ide_eje == Some(ide_eje))
        .map(CompanyProfile::from)
        .ok_or_else(|| ApiError::NotFound(format!("no se encontró la ejecutora con IDE_EJE: {ide_eje}")))
}
