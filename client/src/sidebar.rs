use leptos::prelude::*;

use crate::app::{
    ActiveModal, LoginRequest, OpenModal, PendingAction, Session, SidebarOpen, login_requester,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NavAction {
    Onboarding,
    /// Requires an authenticated session.
    Authorization,
    Navigate,
}

#[derive(Clone, Copy)]
struct NavItem {
    icon: &'static str,
    label: &'static str,
    color: &'static str,
    icon_color: &'static str,
    action: NavAction,
}

const fn item(
    icon: &'static str,
    label: &'static str,
    color: &'static str,
    icon_color: &'static str,
) -> NavItem {
    NavItem {
        icon,
        label,
        color,
        icon_color,
        action: NavAction::Navigate,
    }
}

const NOTARY_ITEMS: [NavItem; 3] = [
    NavItem {
        action: NavAction::Onboarding,
        ..item("📝", "Solicitud de Alta", "#e0f2fe", "#0ea5e9")
    },
    NavItem {
        action: NavAction::Authorization,
        ..item("🔏", "Autorizaciones / Permisos", "#dcfce7", "#22c55e")
    },
    item("⚖️", "SIAMsoft Notarial", "#f3e8ff", "#a855f7"),
];

const MUNICIPAL_ITEMS: [NavItem; 3] = [
    item("🗺️", "Servicios Catastrales", "#f3f4f6", "#6b7280"),
    item("🧾", "Servicios de Emisión Masiva de Cuponeras", "#f3f4f6", "#6b7280"),
    item("🤝", "Asesoría y Consultoría", "#f3f4f6", "#6b7280"),
];

const PRODUCT_ITEMS: [NavItem; 9] = [
    item("💰", "Software de Gestión Tributaria y Caja", "#fee2e2", "#ef4444"),
    item("🏘️", "Software de Catastro Municipal", "#ffedd5", "#f97316"),
    item("⏰", "Software de Control de Asistencia y Planillas", "#fef3c7", "#d97706"),
    item("📂", "Software de Trámite Documentario", "#ecfccb", "#65a30d"),
    item("🗄️", "Software de Archivo Central", "#ccfbf1", "#0d9488"),
    item("🥛", "Software de Vaso de Leche", "#e0f2fe", "#0284c7"),
    item("🆔", "Software de Registro Civil", "#e0e7ff", "#4f46e5"),
    item("🧾", "Software de Facturación Electrónica FACTUsoft", "#fae8ff", "#d946ef"),
    item("🏙️", "SMARTcity", "#caf0f8", "#0077b6"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NavOutcome {
    Open(ActiveModal),
    Login(LoginRequest),
    Log,
}

fn resolve(action: NavAction, authenticated: bool) -> NavOutcome {
    match action {
        NavAction::Onboarding => NavOutcome::Open(ActiveModal::Onboarding),
        NavAction::Authorization if authenticated => NavOutcome::Open(ActiveModal::Authorization),
        NavAction::Authorization => NavOutcome::Login(LoginRequest {
            pending: Some(PendingAction::OpenAuthorization),
        }),
        NavAction::Navigate => NavOutcome::Log,
    }
}

/// Left navigation: notary services, municipal services and products, each
/// in a collapsible section. On narrow screens it slides over the map.
#[component]
pub fn Sidebar() -> impl IntoView {
    let SidebarOpen(mobile_open) = expect_context();

    view! {
        {move || mobile_open.get().then(|| view! {
            <div class="sidebar-overlay" on:click=move |_| mobile_open.set(false)></div>
        })}
        <aside class=move || if mobile_open.get() { "saas-sidebar mobile-open" } else { "saas-sidebar" }>
            <div class="sidebar-content">
                <NavSection title="Notarias Públicas" items=&NOTARY_ITEMS />
                <NavSection title="Municipalidades" items=&MUNICIPAL_ITEMS />
                <NavSection title="Productos" items=&PRODUCT_ITEMS />
                <div class="sidebar-footer">
                    <a href="#">"Términos de Servicio"</a>
                    <a href="#">"Privacidad"</a>
                    <span>{concat!("SIAM v", env!("CARGO_PKG_VERSION"))}</span>
                </div>
            </div>
        </aside>
    }
}

#[component]
fn NavSection(title: &'static str, items: &'static [NavItem]) -> impl IntoView {
    let Session(session) = expect_context();
    let OpenModal(open_modal) = expect_context();
    let SidebarOpen(mobile_open) = expect_context();
    let request_login = login_requester();
    let expanded = RwSignal::new(true);

    let on_item = move |item: NavItem| {
        match resolve(item.action, session.with_untracked(|s| s.is_authenticated())) {
            NavOutcome::Open(modal) => open_modal.set(Some(modal)),
            NavOutcome::Login(request) => request_login(request),
            NavOutcome::Log => {
                web_sys::console::log_1(&format!("Navegando a: {}", item.label).into());
            }
        }
        mobile_open.set(false);
    };

    view! {
        <div class="nav-section">
            <h3 class="nav-category" on:click=move |_| expanded.update(|v| *v = !*v)>
                {title}
                <span class=move || if expanded.get() { "nav-chevron open" } else { "nav-chevron" }>"⌄"</span>
            </h3>
            {move || expanded.get().then(|| view! {
                <ul class="nav-list">
                    {items
                        .iter()
                        .copied()
                        .map(|item| view! {
                            <li class="nav-item">
                                <a
                                    href="#"
                                    on:click=move |e| {
                                        e.prevent_default();
                                        on_item(item);
                                    }
                                >
                                    <div
                                        class="item-icon"
                                        style=format!("background-color: {}; color: {};", item.color, item.icon_color)
                                    >
                                        {item.icon}
                                    </div>
                                    <span class="item-label">{item.label}</span>
                                </a>
                            </li>
                        })
                        .collect_view()}
                </ul>
            })}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_asks_for_login_when_anonymous() {
        assert_eq!(
            resolve(NavAction::Authorization, false),
            NavOutcome::Login(LoginRequest {
                pending: Some(PendingAction::OpenAuthorization)
            })
        );
        assert_eq!(
            resolve(NavAction::Authorization, true),
            NavOutcome::Open(ActiveModal::Authorization)
        );
    }

    #[test]
    fn onboarding_is_public() {
        assert_eq!(
            resolve(NavAction::Onboarding, false),
            NavOutcome::Open(ActiveModal::Onboarding)
        );
    }

    #[test]
    fn only_the_notary_section_has_modal_entries() {
        let actions = |items: &[NavItem]| {
            items
                .iter()
                .filter(|i| i.action != NavAction::Navigate)
                .count()
        };
        assert_eq!(actions(&NOTARY_ITEMS), 2);
        assert_eq!(actions(&MUNICIPAL_ITEMS), 0);
        assert_eq!(actions(&PRODUCT_ITEMS), 0);
    }
}
