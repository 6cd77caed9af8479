use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use siam_shared::ApiError;
use siam_shared::notary::{NotaryRequest, NotaryTab};
use siam_shared::time_format::format_datetime;

use crate::api;
use crate::app::OpenModal;

/// The refresh spinner stays up at least this long.
const SPINNER_LINGER_MS: u32 = 400;

const APPROVE_FAILED: &str = "No se pudo procesar la aprobación.";
const SUSPEND_FAILED: &str = "No se pudo actualizar el estado de suspensión.";
const CONNECTION_FAILED: &str = "Error de conexión.";
const LOAD_FAILED: &str = "No se pudo cargar la lista de solicitudes. Intente nuevamente.";

/// Notice for a failed approve/suspend call.
pub(crate) fn mutation_failure(error: &ApiError, rejected: &str) -> String {
    match error {
        ApiError::Network(_) => CONNECTION_FAILED.to_owned(),
        _ => rejected.to_owned(),
    }
}

/// Notice for a failed list load. Shown instead of an empty table so a
/// connection problem never reads as "no records".
pub(crate) fn load_failure(error: &ApiError) -> String {
    match error {
        ApiError::Network(_) => format!("{CONNECTION_FAILED} {LOAD_FAILED}"),
        _ => LOAD_FAILED.to_owned(),
    }
}

/// Approval waiting for confirmation.
#[derive(Clone, Debug, PartialEq)]
struct PendingApproval {
    nro_sol: i64,
    notary: String,
}

#[derive(Clone, Copy)]
struct PanelState {
    rows: RwSignal<Vec<NotaryRequest>>,
    refreshing: RwSignal<bool>,
    notice: RwSignal<Option<String>>,
    /// Last list load failed; `rows` may be stale or empty.
    load_failed: RwSignal<bool>,
}

impl PanelState {
    async fn reload(self) {
        self.refreshing.try_set(true);
        match api::fetch_notary_requests().await {
            Ok(list) => {
                self.rows.try_set(list);
                self.load_failed.try_set(false);
            }
            Err(e) => {
                web_sys::console::error_1(&format!("notary requests refresh failed: {e}").into());
                self.notice.try_set(Some(load_failure(&e)));
                self.load_failed.try_set(true);
            }
        }
        TimeoutFuture::new(SPINNER_LINGER_MS).await;
        self.refreshing.try_set(false);
    }

    fn refresh(self) {
        spawn_local(self.reload());
    }

    fn approve(self, nro_sol: i64) {
        self.refreshing.set(true);
        spawn_local(async move {
            match api::approve_request(nro_sol).await {
                Ok(()) => self.reload().await,
                Err(e) => self.fail(&e, APPROVE_FAILED),
            }
        });
    }

    fn toggle_suspension(self, nro_sol: i64, flg_sus: i64) {
        self.refreshing.set(true);
        spawn_local(async move {
            match api::set_suspension(nro_sol, flg_sus).await {
                Ok(()) => self.reload().await,
                Err(e) => self.fail(&e, SUSPEND_FAILED),
            }
        });
    }

    fn fail(self, error: &ApiError, rejected: &str) {
        web_sys::console::error_1(&format!("notary request update failed: {error}").into());
        self.notice.try_set(Some(mutation_failure(error, rejected)));
        self.refreshing.try_set(false);
    }
}

/// Back-office panel: review onboarding requests, approve them, and
/// suspend or reactivate authorized notaries.
#[component]
pub fn AuthorizationPanel() -> impl IntoView {
    let OpenModal(open_modal) = expect_context();

    let state = PanelState {
        rows: RwSignal::new(Vec::new()),
        refreshing: RwSignal::new(false),
        notice: RwSignal::new(None),
        load_failed: RwSignal::new(false),
    };
    let tab = RwSignal::new(NotaryTab::default());
    let confirm: RwSignal<Option<PendingApproval>> = RwSignal::new(None);

    state.refresh();

    let close = move |_| open_modal.set(None);

    let table = move || {
        let current = tab.get();
        let visible = state.rows.with(|rows| current.filter(rows));
        if visible.is_empty() && state.load_failed.get() {
            return view! {
                <div class="auth-empty-state">
                    <div class="empty-icon">"⚠️"</div>
                    <h3>"No se pudo cargar la lista"</h3>
                    <p>"Use \"Actualizar\" para reintentar."</p>
                </div>
            }
            .into_any();
        }
        if visible.is_empty() {
            let icon = if current == NotaryTab::Pending { "📂" } else { "🛡️" };
            return view! {
                <div class="auth-empty-state">
                    <div class="empty-icon">{icon}</div>
                    <h3>{current.empty_title()}</h3>
                    <p>"No se encontraron registros en la base de datos."</p>
                </div>
            }
            .into_any();
        }

        view! {
            <div class="auth-table-wrapper">
                <table class="auth-data-table">
                    <thead>
                        <tr>
                            <th>"Nº Sol."</th>
                            <th>"Fecha"</th>
                            <th>"DNI Notario"</th>
                            <th>"Notario"</th>
                            <th>"DNI Solicitante"</th>
                            <th>"Solicitante"</th>
                            <th>"Celular"</th>
                            <th>"Email"</th>
                            {match current {
                                NotaryTab::Pending => view! { <th>"Apr."</th> }.into_any(),
                                NotaryTab::Authorized => view! {
                                    <th>"Fch. Aprobación"</th>
                                    <th class="txt-center">"Sus."</th>
                                }
                                .into_any(),
                                NotaryTab::Suspended => view! {
                                    <th>"Fch. Suspensión"</th>
                                    <th class="txt-center">"Reactivar"</th>
                                }
                                .into_any(),
                            }}
                        </tr>
                    </thead>
                    <tbody>
                        {visible
                            .into_iter()
                            .map(|row| request_row(current, row, state, confirm))
                            .collect_view()}
                    </tbody>
                </table>
            </div>
        }
        .into_any()
    };

    view! {
        <div class="auth-modal-overlay">
            <div class="auth-modal-content">
                <div class="auth-modal-header">
                    <div class="auth-header-info">
                        <h2>"Autorización de Servicio Notarial"</h2>
                        <div class="auth-header-actions">
                            <span class="auth-badge">"Gestión Administrativa"</span>
                            <button
                                class=move || if state.refreshing.get() { "auth-refresh-btn refreshing" } else { "auth-refresh-btn" }
                                title="Refrescar lista"
                                disabled=move || state.refreshing.get()
                                on:click=move |_| state.refresh()
                            >
                                <span class="refresh-icon">"🔄"</span>
                                <span class="refresh-text">
                                    {move || if state.refreshing.get() { "Cargando..." } else { "Actualizar" }}
                                </span>
                            </button>
                        </div>
                    </div>
                    <button class="auth-close-x" title="Cerrar" on:click=close>"×"</button>
                </div>

                <div class="auth-tabs-container">
                    <div class="auth-tabs-nav">
                        {NotaryTab::ALL
                            .into_iter()
                            .map(|t| {
                                let icon = match t {
                                    NotaryTab::Pending => "📥",
                                    NotaryTab::Authorized => "✅",
                                    NotaryTab::Suspended => "🚫",
                                };
                                view! {
                                    <button
                                        class=move || if tab.get() == t { "auth-tab-btn active" } else { "auth-tab-btn" }
                                        on:click=move |_| tab.set(t)
                                    >
                                        <span class="tab-icon">{icon}</span>
                                        {t.label()}
                                    </button>
                                }
                            })
                            .collect_view()}
                    </div>
                </div>

                {move || state.notice.get().map(|text| view! {
                    <div class="auth-notice" role="alert">
                        <span>{text}</span>
                        <button class="auth-notice-close" on:click=move |_| state.notice.set(None)>"×"</button>
                    </div>
                })}

                <div class="auth-modal-body">
                    {move || {
                        if state.refreshing.get() {
                            view! {
                                <div class="auth-loading-screen">
                                    <div class="spinner-large"></div>
                                    <p>"Sincronizando con el servidor..."</p>
                                </div>
                            }
                            .into_any()
                        } else {
                            view! { <div class="auth-view-container">{table}</div> }.into_any()
                        }
                    }}
                </div>

                <div class="auth-modal-footer">
                    <button class="auth-exit-btn" on:click=close>
                        <span class="exit-icon">"🚪"</span>
                        " Salir"
                    </button>
                </div>

                {move || confirm.get().map(|pending| {
                    let nro_sol = pending.nro_sol;
                    view! {
                        <div class="confirm-overlay">
                            <div class="confirm-card">
                                <div class="confirm-icon-wrapper">
                                    <span class="confirm-main-icon">"🛡️"</span>
                                </div>
                                <h3>"Confirmar Aprobación"</h3>
                                <p>"¿Está seguro de que desea aprobar el acceso de la notaría?"</p>
                                <div class="confirm-details">
                                    <div class="detail-item">
                                        <span class="detail-label">"Nº Solicitud:"</span>
                                        <span class="detail-value">{nro_sol}</span>
                                    </div>
                                    <div class="detail-item">
                                        <span class="detail-label">"Notaría:"</span>
                                        <span class="detail-value">{pending.notary.clone()}</span>
                                    </div>
                                </div>
                                <div class="confirm-actions">
                                    <button class="btn-cancel" on:click=move |_| confirm.set(None)>
                                        "Cancelar"
                                    </button>
                                    <button
                                        class="btn-confirm"
                                        on:click=move |_| {
                                            confirm.set(None);
                                            state.approve(nro_sol);
                                        }
                                    >
                                        "Sí, Aprobar Notaría"
                                    </button>
                                </div>
                            </div>
                        </div>
                    }
                })}
            </div>
        </div>
    }
}

fn request_row(
    tab: NotaryTab,
    row: NotaryRequest,
    state: PanelState,
    confirm: RwSignal<Option<PendingApproval>>,
) -> impl IntoView {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let nro_sol = row.nro_sol;
    let notary = text(&row.nom_not);
    let next_sus = row.toggled_suspension();
    let suspended = row.is_suspended();

    let actions = match (tab, nro_sol) {
        (_, None) => view! { <td></td> }.into_any(),
        (NotaryTab::Pending, Some(nro_sol)) => view! {
            <td class="txt-center">
                <input
                    type="checkbox"
                    class="auth-checkbox"
                    title="Clic para Aprobar esta Notaría"
                    prop:checked=false
                    on:click=move |e| {
                        e.prevent_default();
                        confirm.set(Some(PendingApproval { nro_sol, notary: notary.clone() }));
                    }
                />
            </td>
        }
        .into_any(),
        (NotaryTab::Authorized, Some(nro_sol)) => view! {
            <td class="txt-success">{format_datetime(row.fch_apr.as_deref())}</td>
            <td class="txt-center">
                <input
                    type="checkbox"
                    class="auth-checkbox sus-checkbox"
                    title="Clic para Suspender/Reactivar"
                    prop:checked=suspended
                    on:change=move |_| state.toggle_suspension(nro_sol, next_sus)
                />
            </td>
        }
        .into_any(),
        (NotaryTab::Suspended, Some(nro_sol)) => view! {
            <td class="txt-error">{format_datetime(row.fch_sus.as_deref())}</td>
            <td class="txt-center">
                <button
                    class="reactivate-btn"
                    title="Regresar a Autorizados"
                    on:click=move |_| state.toggle_suspension(nro_sol, next_sus)
                >
                    "🔓"
                </button>
            </td>
        }
        .into_any(),
    };

    view! {
        <tr>
            <td class="txt-center font-bold">{nro_sol.map(|n| n.to_string()).unwrap_or_default()}</td>
            <td>{format_datetime(row.fch_sol.as_deref())}</td>
            <td>{text(&row.dni_not)}</td>
            <td class="txt-primary">{text(&row.nom_not)}</td>
            <td>{text(&row.dni_sol)}</td>
            <td>{text(&row.nom_sol)}</td>
            <td class="txt-whatsapp">{text(&row.cel_sol)}</td>
            <td class="txt-email">{text(&row.cor_sol)}</td>
            {actions}
        </tr>
    }
}
