use crate::api::ContactPayload;
use crate::error::ApiError;

/// Contact form fields as typed by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactDraft {
    pub organization: String,
    pub full_name: String,
    pub position: String,
    pub email: String,
    pub whatsapp: String,
    pub message: String,
}

impl ContactDraft {
    fn required(&self) -> [(&'static str, &str); 6] {
        [
            ("Entidad", self.organization.as_str()),
            ("Apellidos y nombres", self.full_name.as_str()),
            ("Cargo", self.position.as_str()),
            ("Correo electrónico", self.email.as_str()),
            ("Celular / WhatsApp", self.whatsapp.as_str()),
            ("Mensaje", self.message.as_str()),
        ]
    }

    pub fn to_payload(&self, ide_eje: Option<i64>, public_ip: &str) -> Result<ContactPayload, ApiError> {
        if let Some((label, _)) = self.required().into_iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ApiError::Validation(format!("El campo \"{label}\" es obligatorio.")));
        }
        if !self.email.contains('@') {
            return Err(ApiError::Validation("Ingrese un correo electrónico válido.".to_owned()));
        }
        Ok(ContactPayload {
            nom_ent: self.organization.trim().to_owned(),
            ape_nom: self.full_name.trim().to_owned(),
            car_goo: self.position.trim().to_owned(),
            cor_ele: self.email.trim().to_owned(),
            cel_wha: self.whatsapp.trim().to_owned(),
            obs_des: self.message.trim().to_owned(),
            ide_eje,
            i_p_pub: public_ip.to_owned(),
        })
    }
}

/// Entity id from a `?eje=N` query string, as used by campaign links.
pub fn entity_from_query(search: &str) -> Option<i64> {
    search
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "eje")
        .and_then(|(_, value)| value.trim().parse().ok())
}
