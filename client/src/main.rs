mod alta;
mod api;
mod app;
mod colors;
mod contact;
mod login;
mod map;
mod notary;
mod render_loop;
mod search;
mod sidebar;
mod storage;
mod viewport;

use leptos::mount::mount_to;
use std::any::Any;
use std::cell::RefCell;
use wasm_bindgen::JsCast;

/// Public route served by the same bundle; everything else is the map shell.
const CONTACT_PATH: &str = "/contacto";

thread_local! {
    static APP_MOUNT_HANDLE: RefCell<Option<Box<dyn Any>>> = RefCell::new(None);
}

fn is_contact_path(path: &str) -> bool {
    path.trim_end_matches('/') == CONTACT_PATH
}

fn main() {
    console_error_panic_hook::set_once();
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let mount_target = document
        .get_element_by_id("app")
        .and_then(|node| node.dyn_into::<web_sys::HtmlElement>().ok())
        .or_else(|| document.body());
    let Some(target) = mount_target else {
        return;
    };
    let contact_route = window
        .location()
        .pathname()
        .map(|path| is_contact_path(&path))
        .unwrap_or(false);

    APP_MOUNT_HANDLE.with(move |slot| {
        // Drop a previous mount so its effects stop touching state.
        let _old = slot.borrow_mut().take();
        let handle: Box<dyn Any> = if contact_route {
            Box::new(mount_to(target, contact::ContactPage))
        } else {
            Box::new(mount_to(target, app::App))
        };
        *slot.borrow_mut() = Some(handle);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_route_matches_with_or_without_trailing_slash() {
        assert!(is_contact_path("/contacto"));
        assert!(is_contact_path("/contacto/"));
        assert!(!is_contact_path("/"));
        assert!(!is_contact_path("/contactos"));
    }
}
