use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use siam_shared::company::whatsapp_url;
use siam_shared::{
    AuthController, AuthSession, ClientConfig, CompanyProfile, Geometry, LatLng, RegionKind,
    TerritorySets,
};

use crate::alta::OnboardingModal;
use crate::api::{self, HttpAuthBackend};
use crate::contact::ContactModal;
use crate::login::LoginModal;
use crate::map::MapView;
use crate::notary::AuthorizationPanel;
use crate::sidebar::Sidebar;
use crate::storage::LocalStorageCredentials;
use crate::viewport::Viewport;

pub(crate) type Auth = AuthController<HttpAuthBackend, LocalStorageCredentials>;

/// Grey silhouette for workers without a photo.
pub(crate) const USER_PLACEHOLDER: &str = "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 24 24' fill='%23cbd5e1'%3E%3Cpath d='M12 12c2.21 0 4-1.79 4-4s-1.79-4-4-4-4 1.79-4 4 1.79 4 4 4zm0 2c-2.67 0-8 1.34-8 4v2h16v-2c0-2.66-5.33-4-8-4z'%3E%3C/path%3E%3C/svg%3E";

pub(crate) fn photo_src(photo: Option<&str>) -> String {
    match photo.filter(|p| !p.is_empty()) {
        Some(b64) => format!("data:image/jpeg;base64,{b64}"),
        None => USER_PLACEHOLDER.to_owned(),
    }
}

// Newtypes keep same-shaped signals apart in Leptos context.
#[derive(Clone, Copy)]
pub(crate) struct Company(pub RwSignal<CompanyProfile>);
#[derive(Clone, Copy)]
pub(crate) struct Config(pub RwSignal<ClientConfig>);
#[derive(Clone, Copy)]
pub(crate) struct Session(pub RwSignal<AuthSession>);
#[derive(Clone, Copy)]
pub(crate) struct AuthHandle(pub StoredValue<Rc<Auth>, LocalStorage>);

impl AuthHandle {
    pub fn controller(&self) -> Rc<Auth> {
        self.0.get_value()
    }
}

/// Copy the controller state into the session signal after every transition.
pub(crate) fn publish_session(auth: &Auth, session: RwSignal<AuthSession>) {
    session.try_set(auth.session());
}

/// Region address inside the current `TerritorySets`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RegionRef {
    pub kind: RegionKind,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Clone, Copy)]
pub(crate) struct Territory(pub RwSignal<Option<Arc<TerritorySets>>>);
#[derive(Clone, Copy)]
pub(crate) struct TerritoryLoad(pub RwSignal<LoadState>);
#[derive(Clone, Copy)]
pub(crate) struct Boundary(pub RwSignal<Option<Arc<Geometry>>>);
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<Option<RegionRef>>);
/// Search selection, drawn with the highlight style.
#[derive(Clone, Copy)]
pub(crate) struct Selected(pub RwSignal<Option<RegionRef>>);
#[derive(Clone, Copy)]
pub(crate) struct MousePos(pub RwSignal<(f64, f64)>);
#[derive(Clone, Copy)]
pub(crate) struct SidebarOpen(pub RwSignal<bool>);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct VisibleLayers {
    pub departments: bool,
    pub provinces: bool,
    pub districts: bool,
}

impl Default for VisibleLayers {
    fn default() -> Self {
        Self {
            departments: true,
            provinces: true,
            districts: true,
        }
    }
}

impl VisibleLayers {
    pub fn shows(&self, kind: RegionKind) -> bool {
        match kind {
            RegionKind::Department => self.departments,
            RegionKind::Province => self.provinces,
            RegionKind::District => self.districts,
        }
    }

    pub fn toggle(&mut self, kind: RegionKind) {
        let flag = match kind {
            RegionKind::Department => &mut self.departments,
            RegionKind::Province => &mut self.provinces,
            RegionKind::District => &mut self.districts,
        };
        *flag = !*flag;
    }
}

#[derive(Clone, Copy)]
pub(crate) struct Layers(pub RwSignal<VisibleLayers>);

/// Camera requests from outside the canvas (search, office button).
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum MapCommand {
    FitRegion(RegionRef),
    FlyTo { center: LatLng, zoom: f64 },
}

#[derive(Clone, Copy)]
pub(crate) struct MapCommands(pub RwSignal<Option<MapCommand>>);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PendingAction {
    OpenAuthorization,
}

/// Ask the shell to show the login modal, optionally with an action to run
/// once the session is authenticated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct LoginRequest {
    pub pending: Option<PendingAction>,
}

/// `Some` while the login modal is open.
#[derive(Clone, Copy)]
pub(crate) struct LoginRequests(pub RwSignal<Option<LoginRequest>>);
#[derive(Clone, Copy)]
pub(crate) struct PendingAfterLogin(pub RwSignal<Option<PendingAction>>);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ActiveModal {
    Onboarding,
    Authorization,
    Contact,
}

#[derive(Clone, Copy)]
pub(crate) struct OpenModal(pub RwSignal<Option<ActiveModal>>);

/// Handle that asks the shell for the login modal. Resolve it while the
/// component is being built; handlers and tasks have no context to read.
pub(crate) fn login_requester() -> impl Fn(LoginRequest) + Copy + 'static {
    let LoginRequests(requests) = expect_context();
    let PendingAfterLogin(pending) = expect_context();
    move |request: LoginRequest| {
        pending.set(request.pending);
        requests.set(Some(request));
    }
}

/// Handle that closes the login modal. A pending action survives only a
/// successful login.
pub(crate) fn login_closer() -> impl Fn(bool) + Copy + 'static {
    let LoginRequests(requests) = expect_context();
    let PendingAfterLogin(pending) = expect_context();
    move |success: bool| {
        requests.try_set(None);
        if !success {
            pending.try_set(None);
        }
    }
}

/// Modal to open for a pending action, once the session allows it.
pub(crate) fn replay_pending(
    session: &AuthSession,
    pending: Option<PendingAction>,
) -> Option<ActiveModal> {
    if !session.is_authenticated() {
        return None;
    }
    match pending? {
        PendingAction::OpenAuthorization => Some(ActiveModal::Authorization),
    }
}

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
}

fn load_company(config: RwSignal<ClientConfig>, company: RwSignal<CompanyProfile>) {
    spawn_local(async move {
        let client_config = match api::fetch_client_config().await {
            Ok(c) => c,
            Err(e) => {
                web_sys::console::warn_1(
                    &format!("client config unavailable, using defaults: {e}").into(),
                );
                ClientConfig::default()
            }
        };
        let ide_eje = client_config.ide_eje;
        config.try_set(client_config);

        match api::fetch_company(ide_eje).await {
            Ok(profile) => {
                company.try_set(profile);
            }
            Err(e) => {
                web_sys::console::error_1(
                    &format!("company profile for ide_eje={ide_eje} not loaded: {e}").into(),
                );
            }
        }
    });
}

fn load_territory(
    territory: RwSignal<Option<Arc<TerritorySets>>>,
    load_state: RwSignal<LoadState>,
    boundary: RwSignal<Option<Arc<Geometry>>>,
) {
    spawn_local(async move {
        match api::fetch_territory().await {
            Ok(sets) => {
                if sets.skipped_fields > 0 {
                    web_sys::console::warn_1(
                        &format!("{} territory geometries could not be parsed", sets.skipped_fields)
                            .into(),
                    );
                }
                territory.try_set(Some(Arc::new(sets)));
                load_state.try_set(LoadState::Ready);
            }
            Err(e) => {
                web_sys::console::error_1(&format!("territory fetch failed: {e}").into());
                let message = match e {
                    siam_shared::ApiError::Http { .. } => {
                        "Error al cargar datos del territorio".to_owned()
                    }
                    other => other.user_message(),
                };
                load_state.try_set(LoadState::Failed(message));
                return;
            }
        }

        match api::fetch_peru_boundary().await {
            Ok(geometry) => {
                boundary.try_set(Some(Arc::new(geometry)));
            }
            Err(e) => {
                web_sys::console::warn_1(&format!("national boundary not loaded: {e}").into());
            }
        }
    });
}

#[component]
pub fn App() -> impl IntoView {
    let company = RwSignal::new(CompanyProfile::default());
    let config = RwSignal::new(ClientConfig::default());
    let session = RwSignal::new(AuthSession::default());
    let auth = StoredValue::new_local(Rc::new(Auth::new(
        HttpAuthBackend,
        LocalStorageCredentials,
    )));

    let territory: RwSignal<Option<Arc<TerritorySets>>> = RwSignal::new(None);
    let load_state = RwSignal::new(LoadState::Loading);
    let boundary: RwSignal<Option<Arc<Geometry>>> = RwSignal::new(None);
    let viewport = RwSignal::new(Viewport::default());
    let hovered: RwSignal<Option<RegionRef>> = RwSignal::new(None);
    let selected: RwSignal<Option<RegionRef>> = RwSignal::new(None);
    let mouse_pos = RwSignal::new((0.0f64, 0.0f64));
    let layers = RwSignal::new(VisibleLayers::default());
    let commands: RwSignal<Option<MapCommand>> = RwSignal::new(None);
    let sidebar_open = RwSignal::new(false);

    let login_requests: RwSignal<Option<LoginRequest>> = RwSignal::new(None);
    let pending: RwSignal<Option<PendingAction>> = RwSignal::new(None);
    let open_modal: RwSignal<Option<ActiveModal>> = RwSignal::new(None);

    provide_context(Company(company));
    provide_context(Config(config));
    provide_context(Session(session));
    provide_context(AuthHandle(auth));
    provide_context(Territory(territory));
    provide_context(TerritoryLoad(load_state));
    provide_context(Boundary(boundary));
    provide_context(viewport);
    provide_context(Hovered(hovered));
    provide_context(Selected(selected));
    provide_context(MousePos(mouse_pos));
    provide_context(Layers(layers));
    provide_context(MapCommands(commands));
    provide_context(SidebarOpen(sidebar_open));
    provide_context(LoginRequests(login_requests));
    provide_context(PendingAfterLogin(pending));
    provide_context(OpenModal(open_modal));

    Effect::new(move || {
        load_company(config, company);
        load_territory(territory, load_state, boundary);
    });

    // Run the action that asked for a login once it succeeds; drop the
    // authorization panel if the session ends.
    Effect::new(move || {
        let current = session.get();
        if let Some(modal) = replay_pending(&current, pending.get()) {
            pending.set(None);
            open_modal.set(Some(modal));
        }
        if !current.is_authenticated()
            && open_modal.get_untracked() == Some(ActiveModal::Authorization)
        {
            open_modal.set(None);
        }
    });

    // Escape closes the topmost overlay, "/" focuses the map search.
    Effect::new(move || {
        use wasm_bindgen::prelude::*;

        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                let target_tag = e
                    .target()
                    .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    .map(|el| el.tag_name())
                    .unwrap_or_default();
                let typing = matches!(target_tag.as_str(), "INPUT" | "TEXTAREA");

                match e.key().as_str() {
                    "Escape" => {
                        if login_requests.get_untracked().is_some() {
                            login_requests.set(None);
                            pending.set(None);
                        } else if open_modal.get_untracked().is_some() {
                            open_modal.set(None);
                        } else {
                            selected.set(None);
                            hovered.set(None);
                        }
                    }
                    "/" if !typing => {
                        e.prevent_default();
                        let Some(doc) = web_sys::window().and_then(|w| w.document()) else {
                            return;
                        };
                        if let Some(el) = doc.query_selector("[data-search-input]").ok().flatten()
                            && let Ok(input) = el.dyn_into::<web_sys::HtmlElement>()
                        {
                            input.focus().ok();
                        }
                    }
                    _ => {}
                }
            });

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    view! {
        <div class="app" style="display: flex; flex-direction: column; width: 100%; height: 100%;">
            <Header />
            <div class="main-layout" style="flex: 1; display: flex; min-height: 0; position: relative;">
                <Sidebar />
                <main class="content-area" style="flex: 1; min-width: 0; display: flex; flex-direction: column;">
                    <MapView />
                </main>
            </div>
            {move || login_requests.get().map(|_| view! { <LoginModal /> })}
            {move || match open_modal.get() {
                Some(ActiveModal::Onboarding) => view! { <OnboardingModal /> }.into_any(),
                Some(ActiveModal::Authorization) if session.get().is_authenticated() => {
                    view! { <AuthorizationPanel /> }.into_any()
                }
                Some(ActiveModal::Contact) => view! { <ContactModal /> }.into_any(),
                _ => ().into_any(),
            }}
            <WhatsAppButton />
        </div>
    }
}

#[component]
fn Header() -> impl IntoView {
    let Company(company) = expect_context();
    let Session(session) = expect_context();
    let auth: AuthHandle = expect_context();
    let OpenModal(open_modal) = expect_context();
    let SidebarOpen(sidebar_open) = expect_context();
    let request_login = login_requester();

    let on_logout = move |_| {
        let controller = auth.controller();
        controller.logout();
        publish_session(&controller, session);
    };

    view! {
        <header class="saas-header">
            <div class="header-left">
                <button
                    class="mobile-menu-btn"
                    aria-label="Menu"
                    on:click=move |_| sidebar_open.update(|v| *v = !*v)
                >
                    "☰"
                </button>
                <span class="brand-logo" title="SIAM - Sistema de Inteligencia Administrativa">"SIAM"</span>
                {move || {
                    let profile = company.get();
                    profile.is_loaded().then(|| view! {
                        <div class="company-info-container">
                            <span style="font-weight: bold;">{profile.name.clone()}</span>
                            <span>{profile.subtitle.clone()}</span>
                            <span>{format!("RUC Nº {}", profile.ruc)}</span>
                        </div>
                    })
                }}
            </div>
            <nav class="header-center">
                <ul class="tool-nav">
                    <li class="active">
                        <a href="/"><span class="icon">"🕒"</span>" Inicio"</a>
                    </li>
                    <li>
                        <a
                            href="#"
                            on:click=move |e| {
                                e.prevent_default();
                                open_modal.set(Some(ActiveModal::Contact));
                            }
                        >
                            <span class="icon">"🔍"</span>" Contactos"
                        </a>
                    </li>
                </ul>
            </nav>
            <div class="header-right">
                {move || {
                    let current = session.get();
                    if !current.is_authenticated() {
                        return view! {
                            <button
                                class="create-btn"
                                on:click=move |_| request_login(LoginRequest::default())
                            >
                                <span style="font-size: 1.2rem;">"🔐"</span>" Acceder"
                            </button>
                        }
                        .into_any();
                    }
                    let name = current.display_name().unwrap_or("Usuario").to_owned();
                    let photo = photo_src(current.worker.as_ref().and_then(|w| w.fot_trb.as_deref()));
                    view! {
                        <div class="user-profile-header">
                            <span class="user-name-text" title=name.clone()>{name.clone()}</span>
                            <div class="avatar-container">
                                <img src=photo alt="Avatar" class="avatar-img" />
                            </div>
                            <button class="logout-icon-btn" title="Cerrar Sesión" on:click=on_logout>
                                "⎋"
                            </button>
                        </div>
                    }
                    .into_any()
                }}
            </div>
        </header>
    }
}

/// Floating WhatsApp link built from the company mobile, or the number the
/// host is configured with.
#[component]
fn WhatsAppButton() -> impl IntoView {
    let Company(company) = expect_context();
    let Config(config) = expect_context();

    let href = Memo::new(move |_| {
        company.with(|c| c.whatsapp_url()).or_else(|| {
            config.with(|c| c.whatsapp_number.as_deref().and_then(whatsapp_url))
        })
    });

    move || {
        href.get().map(|href| view! {
            <a
                href=href
                target="_blank"
                rel="noopener noreferrer"
                title="Escríbenos por WhatsApp"
                style="position: fixed; bottom: 20px; right: 20px; z-index: 1000; width: 60px; height: 60px; border-radius: 50%; background: #25D366; display: flex; align-items: center; justify-content: center; box-shadow: 0 4px 10px rgba(0,0,0,0.3); color: white; font-size: 30px; text-decoration: none;"
            >
                "✆"
            </a>
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siam_shared::AuthState;

    fn session(state: AuthState) -> AuthSession {
        AuthSession {
            state,
            ..AuthSession::default()
        }
    }

    #[test]
    fn pending_authorization_waits_for_authentication() {
        let pending = Some(PendingAction::OpenAuthorization);
        assert_eq!(replay_pending(&session(AuthState::Anonymous), pending), None);
        assert_eq!(replay_pending(&session(AuthState::Identified), pending), None);
        assert_eq!(
            replay_pending(&session(AuthState::Authenticated), pending),
            Some(ActiveModal::Authorization)
        );
    }

    #[test]
    fn nothing_to_replay_without_pending_action() {
        assert_eq!(replay_pending(&session(AuthState::Authenticated), None), None);
    }

    #[test]
    fn layer_toggle_flips_one_tier() {
        let mut layers = VisibleLayers::default();
        layers.toggle(RegionKind::Province);
        assert!(layers.shows(RegionKind::Department));
        assert!(!layers.shows(RegionKind::Province));
        assert!(layers.shows(RegionKind::District));
    }

    #[test]
    fn photo_falls_back_to_placeholder() {
        assert_eq!(photo_src(None), USER_PLACEHOLDER);
        assert_eq!(photo_src(Some("")), USER_PLACEHOLDER);
        assert_eq!(photo_src(Some("AAAA")), "data:image/jpeg;base64,AAAA");
    }
}
