use gloo_storage::{LocalStorage, Storage};
use siam_shared::{CredentialStore, RememberedUser};

const USER_KEY: &str = "siam_remembered_user";
const PHOTO_KEY: &str = "siam_remembered_photo";

/// "Remember me" in `localStorage`: the username and the photo handle,
/// never a password or digest.
#[derive(Clone, Copy, Default)]
pub struct LocalStorageCredentials;

impl CredentialStore for LocalStorageCredentials {
    fn load(&self) -> Option<RememberedUser> {
        let username: String = LocalStorage::get(USER_KEY).ok()?;
        if username.trim().is_empty() {
            return None;
        }
        Some(RememberedUser {
            username,
            photo: LocalStorage::get(PHOTO_KEY).ok(),
        })
    }

    fn save(&self, user: &RememberedUser) {
        if let Err(e) = LocalStorage::set(USER_KEY, &user.username) {
            web_sys::console::warn_1(&format!("failed to remember user: {e}").into());
            return;
        }
        match &user.photo {
            Some(photo) => {
                if let Err(e) = LocalStorage::set(PHOTO_KEY, photo) {
                    web_sys::console::warn_1(&format!("failed to remember photo: {e}").into());
                }
            }
            None => LocalStorage::delete(PHOTO_KEY),
        }
    }

    fn clear(&self) {
        LocalStorage::delete(USER_KEY);
        LocalStorage::delete(PHOTO_KEY);
    }
}
