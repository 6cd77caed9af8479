use chrono::Datelike;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use siam_shared::api::WorkerIdentity;

use crate::app::{AuthHandle, Company, Session, login_closer, photo_src, publish_session};

const UNKNOWN_USER: &str = "Usuario no encontrado";
const WRONG_PASSWORD: &str = "clave incorrecta";

/// Greeting once a username resolves, preferring the worker's own name.
pub(crate) fn greeting(worker: &WorkerIdentity, username: &str) -> String {
    let name = worker
        .nom_trb
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(username.trim());
    format!("¡Hola, {name}!")
}

/// Whether an answer for `requested` still matches the field. `None` means
/// the modal is gone.
pub(crate) fn still_current(field: Option<&str>, requested: &str) -> bool {
    field.is_some_and(|current| current.trim() == requested.trim())
}

/// Login modal: identify on leaving the username field, check the password
/// on leaving its field, and confirm on submit.
#[component]
pub fn LoginModal() -> impl IntoView {
    let auth: AuthHandle = expect_context();
    let Session(session) = expect_context();
    let Company(company) = expect_context();
    let close_login = login_closer();

    let username = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let show_password = RwSignal::new(false);
    let remember = RwSignal::new(false);
    let error = RwSignal::new(String::new());
    let greeting_text = RwSignal::new(String::new());
    let busy = RwSignal::new(false);
    let password_ref = NodeRef::<leptos::html::Input>::new();

    if let Some(saved) = auth.controller().remembered_user() {
        username.set(saved.username);
        remember.set(true);
    }

    let on_user_blur = move |_| {
        error.set(String::new());
        greeting_text.set(String::new());
        let name = username.get_untracked();
        if name.trim().is_empty() {
            return;
        }
        spawn_local(async move {
            let controller = auth.controller();
            let found = controller.identify(&name).await;
            publish_session(&controller, session);
            if !still_current(username.try_get_untracked().as_deref(), &name) {
                return;
            }
            match found {
                Some(worker) => {
                    greeting_text.try_set(greeting(&worker, &name));
                    if let Some(input) = password_ref.get_untracked() {
                        input.focus().ok();
                    }
                }
                None => {
                    error.try_set(UNKNOWN_USER.to_owned());
                }
            }
        });
    };

    // Early feedback only; nothing is confirmed here.
    let on_password_blur = move |_| {
        let candidate = password.get_untracked();
        let Some(line_id) = session.with_untracked(|s| s.line_id()) else {
            return;
        };
        if candidate.trim().is_empty() {
            return;
        }
        spawn_local(async move {
            let ok = auth.controller().verify(line_id, &candidate).await;
            error.try_set(if ok { String::new() } else { WRONG_PASSWORD.to_owned() });
        });
    };

    let on_submit = move |e: leptos::ev::SubmitEvent| {
        e.prevent_default();
        if busy.get_untracked() {
            return;
        }
        error.set(String::new());
        busy.set(true);
        let candidate = password.get_untracked();
        let keep = remember.get_untracked();
        spawn_local(async move {
            let controller = auth.controller();
            let result = controller.login(&candidate, keep).await;
            publish_session(&controller, session);
            busy.try_set(false);
            match result {
                Ok(()) => close_login(true),
                Err(e) => {
                    error.try_set(e.user_message());
                }
            }
        });
    };

    let entity_name = move || {
        company.with(|c| format!("{} {}", c.name, c.subtitle).trim().to_owned())
    };
    let photo = move || {
        session.with(|s| photo_src(s.worker.as_ref().and_then(|w| w.fot_trb.as_deref())))
    };
    let year = chrono::Local::now().year();

    view! {
        <div class="login-overlay">
            <div class="login-card">
                <div class="login-content-grid">
                    <div class="login-section-left">
                        <div class="section-header">"DATOS DE LA ENTIDAD"</div>
                        <div class="section-body">
                            <div class="entity-badge">"SIAM"</div>
                            <div class="form-group">
                                <label class="form-label">"Ruc"</label>
                                <input type="text" class="form-input" prop:value=move || company.with(|c| c.ruc.clone()) disabled />
                            </div>
                            <div class="form-group">
                                <label class="form-label">"Empresa"</label>
                                <textarea class="form-input" rows="3" prop:value=entity_name disabled style="resize: none;"></textarea>
                            </div>
                        </div>
                    </div>

                    <div class="login-section-right">
                        <div class="section-header">"IDENTIFICACIÓN DEL USUARIO"</div>
                        <div class="section-body">
                            <div class="user-login-layout">
                                <img src=photo alt="Usuario" class="user-photo-large" />
                                <form class="user-inputs-container" autocomplete="off" on:submit=on_submit>
                                    <div class="form-group">
                                        <label class="form-label">"Usuario"</label>
                                        <input
                                            type="text"
                                            class="form-input"
                                            autofocus
                                            autocomplete="off"
                                            spellcheck="false"
                                            prop:value=move || username.get()
                                            on:input=move |e| username.set(event_target_value(&e))
                                            on:blur=on_user_blur
                                        />
                                    </div>
                                    <div class="form-group">
                                        <label class="form-label">"Password"</label>
                                        <div class="password-input-wrapper" style="position: relative;">
                                            <input
                                                node_ref=password_ref
                                                type=move || if show_password.get() { "text" } else { "password" }
                                                class="form-input"
                                                autocomplete="new-password"
                                                spellcheck="false"
                                                prop:value=move || password.get()
                                                on:input=move |e| password.set(event_target_value(&e))
                                                on:blur=on_password_blur
                                            />
                                            <button
                                                type="button"
                                                class="password-toggle-btn"
                                                on:click=move |_| show_password.update(|v| *v = !*v)
                                            >
                                                {move || if show_password.get() { "🙈" } else { "👁️" }}
                                            </button>
                                        </div>
                                    </div>

                                    {move || {
                                        let text = greeting_text.get();
                                        (!text.is_empty()).then(|| view! { <div class="login-greeting">{text}</div> })
                                    }}
                                    {move || {
                                        let text = error.get();
                                        (!text.is_empty()).then(|| view! { <div class="login-error">{text}</div> })
                                    }}

                                    <div class="checkbox-group">
                                        <input
                                            type="checkbox"
                                            id="chkRemember"
                                            prop:checked=move || remember.get()
                                            on:change=move |e| remember.set(event_target_checked(&e))
                                        />
                                        <label for="chkRemember">"Recordar Usuario"</label>
                                    </div>

                                    <div class="login-actions">
                                        <button type="submit" class="btn btn-accept" disabled=move || busy.get()>
                                            "Aceptar ✓"
                                        </button>
                                        <button type="button" class="btn btn-exit" on:click=move |_| close_login(false)>
                                            "Salir ✕"
                                        </button>
                                    </div>
                                </form>
                            </div>
                        </div>
                    </div>
                </div>

                <div class="login-footer">
                    <span>{format!("Copyright (c) {year} By SIAMsoft - Todos los derechos reservados.")}</span>
                </div>
            </div>
        </div>
    }
}
