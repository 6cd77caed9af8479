use chrono::Datelike;
use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use siam_shared::ApiError;
use siam_shared::contact::{ContactDraft, entity_from_query};

use crate::api;
use crate::app::{Config, OpenModal};

/// The modal closes itself this long after a successful send.
const AUTO_CLOSE_MS: u32 = 3500;
const CONTACT_EMAIL: &str = "siamsoft2013@gmail.com";

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SendStatus {
    Idle,
    Sending,
    Sent,
    Failed(String),
}

/// Message for a failed send: form problems are shown as-is, anything the
/// backend or network caused gets `fallback`.
pub(crate) fn failure_text(error: &ApiError, fallback: &str) -> String {
    match error {
        ApiError::Validation(msg) => msg.clone(),
        _ => fallback.to_owned(),
    }
}

/// Validate, attach the public IP and post. Resolves to the new status.
async fn send(draft: ContactDraft, ide_eje: Option<i64>, fallback: &'static str) -> SendStatus {
    let public_ip = match api::fetch_public_ip().await {
        Ok(ip) => ip,
        Err(e) => {
            web_sys::console::error_1(&format!("public ip lookup failed: {e}").into());
            String::new()
        }
    };
    let result = match draft.to_payload(ide_eje, &public_ip) {
        Ok(payload) => api::submit_contact(&payload).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => SendStatus::Sent,
        Err(e) => {
            web_sys::console::error_1(&format!("contact submission failed: {e}").into());
            SendStatus::Failed(failure_text(&e, fallback))
        }
    }
}

fn bind(
    draft: RwSignal<ContactDraft>,
    field: fn(&mut ContactDraft) -> &mut String,
) -> (impl Fn() -> String + Copy, impl Fn(leptos::ev::Event) + Copy) {
    let read = move || {
        let mut current = draft.get();
        std::mem::take(field(&mut current))
    };
    let write = move |e: leptos::ev::Event| {
        let value = event_target_value(&e);
        draft.update(|d| *field(d) = value);
    };
    (read, write)
}

/// Header "Contactar" form.
#[component]
pub fn ContactModal() -> impl IntoView {
    let OpenModal(open_modal) = expect_context();
    let Config(config) = expect_context();

    let draft = RwSignal::new(ContactDraft::default());
    let status = RwSignal::new(SendStatus::Idle);
    let close = move || open_modal.set(None);

    let on_submit = move |e: leptos::ev::SubmitEvent| {
        e.prevent_default();
        if status.get_untracked() == SendStatus::Sending {
            return;
        }
        status.set(SendStatus::Sending);
        let fields = draft.get_untracked();
        let ide_eje = Some(config.with_untracked(|c| c.ide_eje));
        spawn_local(async move {
            let outcome =
                send(fields, ide_eje, "Hubo un error al enviar. Por favor intente nuevamente.").await;
            let sent = outcome == SendStatus::Sent;
            status.try_set(outcome);
            if sent {
                draft.try_set(ContactDraft::default());
                TimeoutFuture::new(AUTO_CLOSE_MS).await;
                if open_modal.try_get_untracked() == Some(Some(crate::app::ActiveModal::Contact)) {
                    open_modal.try_set(None);
                }
            }
        });
    };

    let (organization, set_organization) = bind(draft, |d| &mut d.organization);
    let (full_name, set_full_name) = bind(draft, |d| &mut d.full_name);
    let (position, set_position) = bind(draft, |d| &mut d.position);
    let (whatsapp, set_whatsapp) = bind(draft, |d| &mut d.whatsapp);
    let (email, set_email) = bind(draft, |d| &mut d.email);
    let (message, set_message) = bind(draft, |d| &mut d.message);

    view! {
        <div class="contact-modal-overlay" on:click=move |_| close()>
            <div class="contact-modal-box" on:click=|e| e.stop_propagation()>
                {move || {
                    if status.get() == SendStatus::Sent {
                        return view! {
                            <div class="success-message">
                                <span class="success-icon-large">"🎉"</span>
                                <h2 class="success-text">"¡Mensaje Enviado!"</h2>
                                <p class="success-subtext">
                                    "Tu solicitud ha sido registrada correctamente."
                                    <br />
                                    "Pronto nos pondremos en contacto contigo."
                                </p>
                            </div>
                        }
                        .into_any();
                    }
                    let sending = status.get() == SendStatus::Sending;
                    view! {
                        <button class="modal-close-btn" on:click=move |_| close()>"×"</button>
                        <div class="contact-form-container">
                            <div class="contact-header">
                                <h2 class="contact-title">"Contáctanos"</h2>
                                <p class="contact-subtitle">"¿Listo para transformar tu gestión municipal?"</p>
                            </div>
                            <form on:submit=on_submit>
                                <div class="contact-form-group">
                                    <label class="contact-label">"Entidad"</label>
                                    <input type="text" class="contact-input" required placeholder="Ej. Municipalidad Distrital de..."
                                        prop:value=organization on:input=set_organization />
                                </div>
                                <div class="form-row-grid">
                                    <div class="contact-form-group">
                                        <label class="contact-label">"Nombre Completo"</label>
                                        <input type="text" class="contact-input" required placeholder="Tus Nombres y Apellidos"
                                            prop:value=full_name on:input=set_full_name />
                                    </div>
                                    <div class="contact-form-group">
                                        <label class="contact-label">"Cargo"</label>
                                        <input type="text" class="contact-input" required placeholder="Ej. Gerente de Rentas"
                                            prop:value=position on:input=set_position />
                                    </div>
                                </div>
                                <div class="form-row-grid">
                                    <div class="contact-form-group">
                                        <label class="contact-label">"Celular / WhatsApp"</label>
                                        <input type="tel" class="contact-input" required placeholder="999 888 777"
                                            prop:value=whatsapp on:input=set_whatsapp />
                                    </div>
                                    <div class="contact-form-group">
                                        <label class="contact-label">"Correo Electrónico"</label>
                                        <input type="email" class="contact-input" required placeholder="nombre@entidad.gob.pe"
                                            prop:value=email on:input=set_email />
                                    </div>
                                </div>
                                <div class="contact-form-group">
                                    <label class="contact-label">"¿En qué podemos ayudarte?"</label>
                                    <textarea class="contact-textarea" rows="4" required
                                        placeholder="Describa brevemente su requerimiento o consulta..."
                                        prop:value=message on:input=set_message></textarea>
                                </div>
                                <button
                                    type="submit"
                                    class=if sending { "btn-submit-premium loading" } else { "btn-submit-premium" }
                                    disabled=sending
                                >
                                    {if sending { "Enviando Solicitud..." } else { "Enviar Mensaje Ahora" }}
                                </button>
                                <button type="button" class="btn-cancel" on:click=move |_| close()>"Cancelar"</button>
                                {match status.get() {
                                    SendStatus::Failed(text) => Some(view! { <p class="contact-error">{text}</p> }),
                                    _ => None,
                                }}
                            </form>
                        </div>
                    }
                    .into_any()
                }}
            </div>
        </div>
    }
}

/// Standalone `/contacto` page for campaign links; `?eje=N` tags the
/// message with an entity.
#[component]
pub fn ContactPage() -> impl IntoView {
    let draft = RwSignal::new(ContactDraft::default());
    let status = RwSignal::new(SendStatus::Idle);
    let whatsapp_number: RwSignal<Option<String>> = RwSignal::new(None);
    let ide_eje = web_sys::window()
        .and_then(|w| w.location().search().ok())
        .and_then(|search| entity_from_query(&search));

    spawn_local(async move {
        match api::fetch_client_config().await {
            Ok(config) => {
                whatsapp_number.try_set(config.whatsapp_number);
            }
            Err(e) => web_sys::console::warn_1(&format!("client config unavailable: {e}").into()),
        }
    });

    let on_submit = move |e: leptos::ev::SubmitEvent| {
        e.prevent_default();
        if status.get_untracked() == SendStatus::Sending {
            return;
        }
        status.set(SendStatus::Sending);
        let fields = draft.get_untracked();
        spawn_local(async move {
            let outcome = send(fields, ide_eje, "Error al enviar mensaje. Intenta nuevamente.").await;
            if outcome == SendStatus::Sent {
                draft.try_set(ContactDraft::default());
            }
            status.try_set(outcome);
        });
    };

    let (organization, set_organization) = bind(draft, |d| &mut d.organization);
    let (full_name, set_full_name) = bind(draft, |d| &mut d.full_name);
    let (position, set_position) = bind(draft, |d| &mut d.position);
    let (whatsapp, set_whatsapp) = bind(draft, |d| &mut d.whatsapp);
    let (email, set_email) = bind(draft, |d| &mut d.email);
    let (message, set_message) = bind(draft, |d| &mut d.message);
    let year = chrono::Local::now().year();

    view! {
        <div class="contact-public-page">
            <div class="contact-public-container">
                {move || {
                    if status.get() == SendStatus::Sent {
                        return view! {
                            <div class="success-card">
                                <div class="success-icon">"🎉"</div>
                                <h1>"¡Mensaje Enviado!"</h1>
                                <p>"Gracias por contactarnos."</p>
                                <p class="success-subtitle">"Nuestro equipo se pondrá en contacto contigo a la brevedad."</p>
                                <button class="btn-send-another" on:click=move |_| status.set(SendStatus::Idle)>
                                    "Enviar otro mensaje"
                                </button>
                            </div>
                        }
                        .into_any();
                    }
                    let sending = status.get() == SendStatus::Sending;
                    view! {
                        <div class="contact-public-header">
                            <div class="logo-area">
                                <h1 class="brand-title">"SIAM"<span class="brand-soft">"soft"</span></h1>
                                <p class="brand-tagline">"Soluciones Integrales para tu Municipalidad"</p>
                            </div>
                        </div>
                        <div class="contact-public-form-wrapper">
                            <h2 class="form-title">"Contáctanos"</h2>
                            <p class="form-subtitle">"Cuéntanos sobre tu proyecto y nos comunicaremos contigo."</p>
                            {match status.get() {
                                SendStatus::Failed(text) => Some(view! { <div class="alert-error">{text}</div> }),
                                _ => None,
                            }}
                            <form class="public-contact-form" on:submit=on_submit>
                                <div class="form-row">
                                    <div class="form-field">
                                        <label for="nom_ent">"Nombre de la Entidad *"</label>
                                        <input type="text" id="nom_ent" required placeholder="Municipalidad de..."
                                            prop:value=organization on:input=set_organization />
                                    </div>
                                </div>
                                <div class="form-row">
                                    <div class="form-field">
                                        <label for="ape_nom">"Apellidos y Nombres *"</label>
                                        <input type="text" id="ape_nom" required placeholder="Tu nombre completo"
                                            prop:value=full_name on:input=set_full_name />
                                    </div>
                                </div>
                                <div class="form-row">
                                    <div class="form-field">
                                        <label for="car_goo">"Cargo / Puesto *"</label>
                                        <input type="text" id="car_goo" required placeholder="Ej: Gerente de TI"
                                            prop:value=position on:input=set_position />
                                    </div>
                                </div>
                                <div class="form-row two-cols">
                                    <div class="form-field">
                                        <label for="cel_wha">"Celular / WhatsApp *"</label>
                                        <input type="tel" id="cel_wha" required placeholder="999 999 999"
                                            prop:value=whatsapp on:input=set_whatsapp />
                                    </div>
                                    <div class="form-field">
                                        <label for="cor_ele">"Correo Electrónico *"</label>
                                        <input type="email" id="cor_ele" required placeholder="correo@ejemplo.com"
                                            prop:value=email on:input=set_email />
                                    </div>
                                </div>
                                <div class="form-row">
                                    <div class="form-field">
                                        <label for="obs_des">"Cuéntanos sobre tu necesidad *"</label>
                                        <textarea id="obs_des" rows="5" required
                                            placeholder="Descripción de lo que necesitas (Software de Rentas, Sistema de Trámites, etc.)"
                                            prop:value=message on:input=set_message></textarea>
                                    </div>
                                </div>
                                <button type="submit" class="btn-submit-public" disabled=sending>
                                    {if sending { "Enviando..." } else { "Enviar Mensaje" }}
                                </button>
                            </form>
                            <div class="contact-info-footer">
                                <p>
                                    <strong>"Email:"</strong>
                                    {format!(" {CONTACT_EMAIL}")}
                                    {move || whatsapp_number.get().map(|number| view! {
                                        " | "
                                        <strong>"WhatsApp:"</strong>
                                        {format!(" {number}")}
                                    })}
                                </p>
                                <p class="contact-copyright">{format!("© {year} SIAMsoft")}</p>
                            </div>
                        </div>
                    }
                    .into_any()
                }}
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_errors_are_shown_verbatim() {
        let invalid = ApiError::Validation("Ingrese un correo electrónico válido.".into());
        assert_eq!(failure_text(&invalid, "fallback"), "Ingrese un correo electrónico válido.");
    }

    #[test]
    fn backend_failures_use_the_generic_text() {
        let rejected = ApiError::Http {
            status: 500,
            message: "db down".into(),
        };
        assert_eq!(failure_text(&rejected, "fallback"), "fallback");
        assert_eq!(failure_text(&ApiError::Network("x".into()), "fallback"), "fallback");
    }
}
