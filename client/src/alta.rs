use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use siam_shared::api::{NotaryOffice, Persona};
use siam_shared::notary::{DNI_LEN, OnboardingDraft};
use siam_shared::{ApiError, ApiResult};

use crate::api;
use crate::app::OpenModal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NoticeKind {
    Error,
    Warning,
    Loading,
    Info,
}

impl NoticeKind {
    fn class(self) -> &'static str {
        match self {
            Self::Error => "status-msg status-error",
            Self::Warning => "status-msg status-warning",
            Self::Loading => "status-msg status-loading",
            Self::Info => "status-msg status-info",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub(crate) fn persona_notice(result: &ApiResult<Persona>) -> Notice {
    match result {
        Ok(_) => Notice::new(NoticeKind::Info, "Persona identificada correctamente."),
        Err(ApiError::Validation(msg)) => Notice::new(NoticeKind::Error, msg.clone()),
        Err(ApiError::NotFound(_) | ApiError::Http { .. }) => Notice::new(
            NoticeKind::Error,
            "No se encontró información para este DNI.",
        ),
        Err(_) => Notice::new(
            NoticeKind::Error,
            "Error de comunicación al buscar datos de la persona.",
        ),
    }
}

/// `None` leaves the current notice alone (results to pick from, or a
/// rejected search that was only logged).
pub(crate) fn notary_search_notice(result: &ApiResult<Vec<NotaryOffice>>) -> Option<Notice> {
    match result {
        Ok(found) if found.is_empty() => Some(Notice::new(
            NoticeKind::Warning,
            "No se encontraron notarias con el criterio ingresado.",
        )),
        Ok(_) | Err(ApiError::Http { .. }) => None,
        Err(_) => Some(Notice::new(
            NoticeKind::Error,
            "Error de red al consultar el catálogo de notarias.",
        )),
    }
}

pub(crate) fn submission_notice(result: &ApiResult<i64>) -> Notice {
    match result {
        Ok(nro_sol) => Notice::new(
            NoticeKind::Info,
            format!("¡Solicitud #{nro_sol} registrada exitosamente!"),
        ),
        Err(e) => Notice::new(NoticeKind::Error, e.user_message()),
    }
}

/// Onboarding request for a notary office: identify the applicant by DNI,
/// pick the office from the catalog, leave contact details, submit.
#[component]
pub fn OnboardingModal() -> impl IntoView {
    let OpenModal(open_modal) = expect_context();

    let draft = RwSignal::new(OnboardingDraft::default());
    let offices: RwSignal<Vec<NotaryOffice>> = RwSignal::new(Vec::new());
    let notice: RwSignal<Option<Notice>> = RwSignal::new(None);
    let loading_persona = RwSignal::new(false);
    let loading_offices = RwSignal::new(false);
    let submitted = RwSignal::new(false);

    // The public IP travels with the request for auditing.
    spawn_local(async move {
        match api::fetch_public_ip().await {
            Ok(ip) => {
                draft.try_update(|d| d.public_ip = ip);
            }
            Err(e) => web_sys::console::error_1(&format!("public ip lookup failed: {e}").into()),
        }
    });

    let close = move || open_modal.set(None);

    let lookup_persona = move || {
        if loading_persona.get_untracked() {
            return;
        }
        let dni = draft.with_untracked(|d| d.dni.clone());
        loading_persona.set(true);
        notice.set(None);
        spawn_local(async move {
            let result = api::fetch_persona(&dni).await;
            let found = result.as_ref().ok().cloned();
            if draft.try_update(|d| d.apply_persona(&dni, found)) == Some(true) {
                notice.try_set(Some(persona_notice(&result)));
            }
            loading_persona.try_set(false);
        });
    };

    let search_offices = move || {
        let query = draft.with_untracked(|d| d.notary_query.trim().to_owned());
        if query.is_empty() || loading_offices.get_untracked() {
            return;
        }
        loading_offices.set(true);
        notice.set(None);
        spawn_local(async move {
            let result = api::search_notaries(&query).await;
            if let Err(e) = &result {
                web_sys::console::error_1(&format!("notary search failed: {e}").into());
            }
            notice.try_set(notary_search_notice(&result));
            offices.try_set(result.unwrap_or_default());
            loading_offices.try_set(false);
        });
    };

    let submit = move || {
        let payload = match draft.with_untracked(|d| d.to_payload()) {
            Ok(payload) => payload,
            Err(e) => {
                notice.set(Some(Notice::new(NoticeKind::Error, e.user_message())));
                return;
            }
        };
        notice.set(Some(Notice::new(
            NoticeKind::Loading,
            "Registrando solicitud en el sistema...",
        )));
        spawn_local(async move {
            let result = api::submit_onboarding(&payload).await;
            if let Err(e) = &result {
                web_sys::console::error_1(&format!("onboarding submission failed: {e}").into());
            }
            notice.try_set(Some(submission_notice(&result)));
            submitted.try_set(result.is_ok());
        });
    };

    let sending = move || notice.with(|n| n.as_ref().is_some_and(|n| n.kind == NoticeKind::Loading));
    let ready = move || {
        draft.with(|d| {
            d.persona.as_ref().is_some_and(|p| p.ide_per.is_some())
                && d.notary.as_ref().is_some_and(|n| n.ide_not.is_some())
        })
    };
    let persona_field = move |pick: fn(&Persona) -> String| {
        move || draft.with(|d| d.persona.as_ref().map(pick).unwrap_or_default())
    };
    let surnames = persona_field(|p| {
        format!(
            "{} {}",
            p.pat_per.as_deref().unwrap_or(""),
            p.mat_per.as_deref().unwrap_or("")
        )
        .trim()
        .to_owned()
    });
    let names = persona_field(|p| p.nom_per.clone().unwrap_or_default());
    let office_field = move |pick: fn(&NotaryOffice) -> Option<String>| {
        move || draft.with(|d| d.notary.as_ref().and_then(pick).unwrap_or_default())
    };
    let office_name = office_field(|n| n.nom_com.clone());
    let office_address = office_field(|n| n.dir_not.clone());

    view! {
        {move || {
            if submitted.get() {
                let message = notice
                    .with(|n| n.as_ref().map(|n| n.message.clone()))
                    .unwrap_or_else(|| "Su solicitud ha sido registrada correctamente.".to_owned());
                return view! {
                    <div class="alta-modal-overlay">
                        <div class="alta-modal-content success-screen-content">
                            <div class="success-icon">"🎉"</div>
                            <h2 class="success-title">"¡Solicitud Enviada!"</h2>
                            <p class="success-message">{message}</p>
                            <button class="btn-registrar btn-success-close" on:click=move |_| close()>
                                "Aceptar"
                            </button>
                        </div>
                    </div>
                }
                .into_any();
            }

            view! {
                <div class="alta-modal-overlay">
                    <div class="alta-modal-content">
                        <div class="alta-modal-header" style="position: relative;">
                            <button class="modal-close-btn-alta" title="Cerrar" on:click=move |_| close()>"×"</button>
                            <div class="header-title-row" style="padding-right: 40px;">
                                <h2>"Solicitud de Alta - Servicio Notarial"</h2>
                                <span class="alta-badge">"SIAMsoft Notarias"</span>
                            </div>
                            <p class="header-subtitle">"Complete los datos para generar un nuevo ticket de inscripción."</p>
                        </div>

                        <div class="alta-modal-body">
                            {move || notice.get().map(|n| view! { <div class=n.kind.class()>{n.message}</div> })}

                            <div class="alta-form-container">
                                <section class="alta-form-section section-applicant">
                                    <h3 class="alta-section-title">"1. Identificación del Solicitante"</h3>
                                    <div class="alta-fields-grid">
                                        <div class="dni-search-container">
                                            <div class="alta-field">
                                                <label>"DNI"</label>
                                                <input
                                                    type="text"
                                                    placeholder="Ingrese DNI"
                                                    maxlength=DNI_LEN.to_string()
                                                    prop:value=move || draft.with(|d| d.dni.clone())
                                                    on:input=move |e| {
                                                        let value = event_target_value(&e);
                                                        draft.update(|d| d.set_dni(value));
                                                    }
                                                    on:keydown=move |e| {
                                                        if e.key() == "Enter" {
                                                            e.prevent_default();
                                                            lookup_persona();
                                                        }
                                                    }
                                                />
                                            </div>
                                            <button
                                                type="button"
                                                class="verify-btn"
                                                disabled=move || loading_persona.get()
                                                on:click=move |_| lookup_persona()
                                            >
                                                {move || if loading_persona.get() { "..." } else { "Verificar" }}
                                            </button>
                                        </div>
                                        <div class="alta-field">
                                            <label>"Apellidos"</label>
                                            <input type="text" readonly disabled placeholder="Apellidos del solicitante" prop:value=surnames />
                                        </div>
                                        <div class="alta-field">
                                            <label>"Nombres"</label>
                                            <input type="text" readonly disabled placeholder="Nombres del solicitante" prop:value=names />
                                        </div>
                                    </div>
                                </section>

                                <section class="alta-form-section section-notary">
                                    <h3 class="alta-section-title">"2. Catálogo de Notaría"</h3>
                                    <div class="alta-fields-grid">
                                        <div class="alta-field" style="position: relative;">
                                            <label>"Localizar Notaría (Nombre / Apellido)"</label>
                                            <div class="search-input-wrapper">
                                                <input
                                                    type="text"
                                                    class="search-input"
                                                    placeholder="Ej: Notaria Perez, RUC 20123456789"
                                                    prop:value=move || draft.with(|d| d.notary_query.clone())
                                                    on:input=move |e| {
                                                        let value = event_target_value(&e);
                                                        draft.update(|d| d.set_notary_query(value));
                                                    }
                                                    on:keydown=move |e| {
                                                        if e.key() == "Enter" {
                                                            e.prevent_default();
                                                            search_offices();
                                                        }
                                                    }
                                                />
                                                <button
                                                    type="button"
                                                    class="search-btn"
                                                    disabled=move || loading_offices.get()
                                                    on:click=move |_| search_offices()
                                                >
                                                    {move || if loading_offices.get() { "..." } else { "🔍" }}
                                                </button>
                                            </div>
                                            {move || {
                                                let found = offices.get();
                                                (!found.is_empty()).then(|| view! {
                                                    <ul class="floating-results-list">
                                                        {found
                                                            .into_iter()
                                                            .map(|office| {
                                                                let name = office.nom_com.clone().unwrap_or_default();
                                                                let detail = format!(
                                                                    "RUC: {} • {}",
                                                                    office.ruc_not.as_deref().unwrap_or("-"),
                                                                    office.dir_not.as_deref().unwrap_or(""),
                                                                );
                                                                view! {
                                                                    <li on:click=move |_| {
                                                                        draft.update(|d| d.select_notary(office.clone()));
                                                                        offices.set(Vec::new());
                                                                    }>
                                                                        <div class="result-name">{name}</div>
                                                                        <div class="result-detail">{detail}</div>
                                                                    </li>
                                                                }
                                                            })
                                                            .collect_view()}
                                                    </ul>
                                                })
                                            }}
                                        </div>
                                        <div class="alta-field">
                                            <label>"Notaría Seleccionada"</label>
                                            <input
                                                type="text"
                                                class="selected-entity-input"
                                                readonly
                                                disabled
                                                placeholder="Ninguna notaría seleccionada"
                                                prop:value=office_name
                                            />
                                        </div>
                                        <div class="alta-field field-full-width">
                                            <label>"Ubicación"</label>
                                            <input
                                                type="text"
                                                readonly
                                                disabled
                                                placeholder="Dirección de la notaría"
                                                prop:value=office_address
                                            />
                                        </div>
                                    </div>
                                </section>

                                <section class="alta-form-section section-contact">
                                    <h3 class="alta-section-title">"3. Canales de Comunicación"</h3>
                                    <div class="alta-fields-grid">
                                        <div class="alta-field">
                                            <label>"WhatsApp de Contacto"</label>
                                            <input
                                                type="tel"
                                                required
                                                placeholder="900000000"
                                                prop:value=move || draft.with(|d| d.whatsapp.clone())
                                                on:input=move |e| {
                                                    let value = event_target_value(&e);
                                                    draft.update(|d| d.whatsapp = value);
                                                }
                                            />
                                        </div>
                                        <div class="alta-field">
                                            <label>"E-mail"</label>
                                            <input
                                                type="email"
                                                required
                                                placeholder="usuario@notaria.com"
                                                prop:value=move || draft.with(|d| d.email.clone())
                                                on:input=move |e| {
                                                    let value = event_target_value(&e);
                                                    draft.update(|d| d.email = value);
                                                }
                                            />
                                        </div>
                                        <div class="alta-field field-full-width">
                                            <label>"Notas Adicionales / Observaciones"</label>
                                            <textarea
                                                rows="4"
                                                placeholder="Ej: Necesitamos acceso para 3 usuarios"
                                                prop:value=move || draft.with(|d| d.notes.clone())
                                                on:input=move |e| {
                                                    let value = event_target_value(&e);
                                                    draft.update(|d| d.notes = value);
                                                }
                                            ></textarea>
                                        </div>
                                    </div>
                                </section>
                            </div>
                        </div>

                        <div class="alta-modal-footer">
                            <button type="button" class="btn-cancelar" on:click=move |_| close()>"Cancelar"</button>
                            <button
                                type="button"
                                class="btn-registrar"
                                disabled=move || !ready() || sending()
                                on:click=move |_| submit()
                            >
                                {move || if sending() { "Enviando..." } else { "Enviar Solicitud ✓" }}
                            </button>
                        </div>
                    </div>
                </div>
            }
            .into_any()
        }}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siam_shared::ConflictDetails;

    #[test]
    fn persona_lookup_messages() {
        let found = Ok(Persona {
            ide_per: Some(3),
            ..Persona::default()
        });
        assert_eq!(persona_notice(&found).kind, NoticeKind::Info);

        let invalid = Err(ApiError::Validation("Ingrese un DNI válido de 8 dígitos.".into()));
        assert_eq!(persona_notice(&invalid).message, "Ingrese un DNI válido de 8 dígitos.");

        let missing = Err(ApiError::NotFound(String::new()));
        assert_eq!(
            persona_notice(&missing).message,
            "No se encontró información para este DNI."
        );

        let offline = Err(ApiError::Network("offline".into()));
        assert_eq!(
            persona_notice(&offline).message,
            "Error de comunicación al buscar datos de la persona."
        );
    }

    #[test]
    fn empty_catalog_search_warns() {
        let notice = notary_search_notice(&Ok(Vec::new()));
        assert_eq!(notice.map(|n| n.kind), Some(NoticeKind::Warning));
        assert_eq!(notary_search_notice(&Ok(vec![NotaryOffice::default()])), None);
        assert_eq!(
            notary_search_notice(&Err(ApiError::Network("x".into()))).map(|n| n.kind),
            Some(NoticeKind::Error)
        );
    }

    #[test]
    fn submission_reports_number_or_conflict() {
        assert_eq!(
            submission_notice(&Ok(41)).message,
            "¡Solicitud #41 registrada exitosamente!"
        );
        let conflict = Err(ApiError::Conflict(ConflictDetails {
            nro_sol: Some(12),
            approved: true,
            fch_sol: Some("2026-01-15 10:00:00".into()),
        }));
        let notice = submission_notice(&conflict);
        assert_eq!(notice.kind, NoticeKind::Error);
        assert!(notice.message.contains("(#12)"));
        assert!(notice.message.contains("APROBADA"));
    }
}
