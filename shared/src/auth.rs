//! Two-step identify/verify login.
//!
//! This is a placeholder mechanism, not a security boundary: the reference
//! digest is an unsalted MD5 sent to the client, the comparison runs in the
//! browser, and `Authenticated` is set by the caller through
//! [`AuthController::confirm_login`] rather than by a server-issued session.
//! The behavior is kept as-is for compatibility with the existing backend.

use std::cell::{Cell, RefCell};
use std::future::Future;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::api::WorkerIdentity;
use crate::error::{ApiError, ApiResult};

/// Lowercase hex MD5 of `secret`, the format the backend stores.
pub fn password_digest(secret: &str) -> String {
    hex::encode(Md5::digest(secret.as_bytes()))
}

pub fn digest_matches(candidate: &str, reference: &str) -> bool {
    password_digest(candidate) == reference
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Identified,
    Authenticated,
}

/// What "remember me" keeps between visits. Never the secret or its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RememberedUser {
    pub username: String,
    pub photo: Option<String>,
}

pub trait AuthBackend {
    /// Resolve a username. `Ok(None)` when the backend reports no match.
    fn identify(&self, username: &str) -> impl Future<Output = ApiResult<Option<WorkerIdentity>>>;

    /// Reference digest held for a worker line. `Ok(None)` when unavailable.
    fn reference_digest(&self, line_id: i64) -> impl Future<Output = ApiResult<Option<String>>>;
}

pub trait CredentialStore {
    fn load(&self) -> Option<RememberedUser>;
    fn save(&self, user: &RememberedUser);
    fn clear(&self);
}

/// Snapshot of the controller state for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSession {
    pub state: AuthState,
    pub username: Option<String>,
    pub worker: Option<WorkerIdentity>,
    pub remember: bool,
}

impl AuthSession {
    pub fn line_id(&self) -> Option<i64> {
        self.worker.as_ref().and_then(|w| w.nlineno)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    pub fn display_name(&self) -> Option<&str> {
        self.worker
            .as_ref()
            .and_then(|w| w.nom_trb.as_deref())
            .filter(|n| !n.is_empty())
            .or(self.username.as_deref())
    }
}

/// Drives `Anonymous → Identified → Authenticated`.
///
/// State lives behind a `RefCell` that is never held across an await, so a
/// shared controller can run several requests from the UI thread. Every
/// identity change bumps `generation`; an `identify` answer is applied only
/// if no other change happened while it was in flight.
pub struct AuthController<B, S> {
    backend: B,
    store: S,
    session: RefCell<AuthSession>,
    generation: Cell<u64>,
}

impl<B: AuthBackend, S: CredentialStore> AuthController<B, S> {
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            store,
            session: RefCell::new(AuthSession::default()),
            generation: Cell::new(0),
        }
    }

    fn next_generation(&self) -> u64 {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        next
    }

    pub fn session(&self) -> AuthSession {
        self.session.borrow().clone()
    }

    pub fn state(&self) -> AuthState {
        self.session.borrow().state
    }

    pub fn remembered_user(&self) -> Option<RememberedUser> {
        self.store.load()
    }

    pub fn set_remember(&self, remember: bool) {
        self.session.borrow_mut().remember = remember;
    }

    /// Resolve `username` to a worker. Success caches the identity and moves
    /// to `Identified`; a miss or transport failure clears it and leaves the
    /// controller `Anonymous`. An answer overtaken by a newer `identify`,
    /// login or logout is discarded and yields `None`.
    pub async fn identify(&self, username: &str) -> Option<WorkerIdentity> {
        let ticket = self.next_generation();
        let username = username.trim();
        if username.is_empty() {
            self.reset_identity();
            return None;
        }
        let result = self.backend.identify(username).await;
        if self.generation.get() != ticket {
            tracing::debug!(username, "discarding superseded identify answer");
            return None;
        }
        let mut session = self.session.borrow_mut();
        match result {
            Ok(Some(worker)) => {
                session.state = AuthState::Identified;
                session.username = Some(username.to_owned());
                session.worker = Some(worker.clone());
                Some(worker)
            }
            Ok(None) => {
                clear_identity(&mut session);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "identify request failed");
                clear_identity(&mut session);
                None
            }
        }
    }

    /// Compare the digest of `candidate` with the server reference for
    /// `line_id`. Any failure is a mismatch. Never changes state.
    pub async fn verify(&self, line_id: i64, candidate: &str) -> bool {
        match self.backend.reference_digest(line_id).await {
            Ok(Some(reference)) => digest_matches(candidate, &reference),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, line_id, "verify request failed");
                false
            }
        }
    }

    /// The only way into `Authenticated`. `false` is a failed login or a
    /// logout: cached worker fields and remembered credentials are dropped.
    pub fn confirm_login(&self, success: bool) {
        self.next_generation();
        let mut session = self.session.borrow_mut();
        if success {
            session.state = AuthState::Authenticated;
            match (&session.username, session.remember) {
                (Some(username), true) => self.store.save(&RememberedUser {
                    username: username.clone(),
                    photo: session.worker.as_ref().and_then(|w| w.fot_trb.clone()),
                }),
                _ => self.store.clear(),
            }
        } else {
            clear_identity(&mut session);
            session.remember = false;
            self.store.clear();
        }
    }

    pub fn logout(&self) {
        self.confirm_login(false);
    }

    /// Final submit: verify the password for the identified worker, then
    /// confirm. Identity is kept on a wrong password so the user can retry.
    pub async fn login(&self, password: &str, remember: bool) -> ApiResult<()> {
        let Some(line_id) = self.session.borrow().line_id() else {
            return Err(ApiError::Validation(
                "Primero identifíquese con un usuario válido".to_owned(),
            ));
        };
        if !self.verify(line_id, password).await {
            return Err(ApiError::Validation("clave incorrecta".to_owned()));
        }
        self.set_remember(remember);
        self.confirm_login(true);
        Ok(())
    }

    fn reset_identity(&self) {
        clear_identity(&mut self.session.borrow_mut());
    }
}

fn clear_identity(session: &mut AuthSession) {
    session.state = AuthState::Anonymous;
    session.username = None;
    session.worker = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::pin::Pin;
    use std::rc::Rc;
    use std::task::{Context, Poll};

    #[derive(Default)]
    struct FakeBackend {
        worker: Option<WorkerIdentity>,
        digest: Option<String>,
        offline: bool,
        digest_calls: Cell<u32>,
        /// Per-username line ids; overrides `worker` when non-empty.
        lines: Vec<(&'static str, i64)>,
        /// Username whose answer takes a few extra polls to arrive.
        slow: Option<&'static str>,
    }

    /// Returns `Pending` once, asking to be polled again.
    struct YieldNow(bool);

    impl Future for YieldNow {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                return Poll::Ready(());
            }
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    impl AuthBackend for FakeBackend {
        async fn identify(&self, username: &str) -> ApiResult<Option<WorkerIdentity>> {
            if self.slow == Some(username) {
                for _ in 0..3 {
                    YieldNow(false).await;
                }
            }
            if self.offline {
                return Err(ApiError::Network("offline".into()));
            }
            if !self.lines.is_empty() {
                return Ok(self
                    .lines
                    .iter()
                    .find(|(name, _)| *name == username)
                    .map(|&(_, line)| WorkerIdentity { nlineno: Some(line), ..worker() }));
            }
            Ok(self.worker.clone())
        }

        async fn reference_digest(&self, _line_id: i64) -> ApiResult<Option<String>> {
            self.digest_calls.set(self.digest_calls.get() + 1);
            if self.offline {
                return Err(ApiError::Network("offline".into()));
            }
            Ok(self.digest.clone())
        }
    }

    #[derive(Default, Clone)]
    struct MemoryStore(Rc<RefCell<Option<RememberedUser>>>);

    impl CredentialStore for MemoryStore {
        fn load(&self) -> Option<RememberedUser> {
            self.0.borrow().clone()
        }
        fn save(&self, user: &RememberedUser) {
            *self.0.borrow_mut() = Some(user.clone());
        }
        fn clear(&self) {
            self.0.borrow_mut().take();
        }
    }

    fn worker() -> WorkerIdentity {
        WorkerIdentity {
            nlineno: Some(7),
            ide_gru: Some(2),
            des_gru: Some("ADMIN".into()),
            fot_trb: Some("cGhvdG8=".into()),
            nom_trb: Some("María".into()),
        }
    }

    fn controller(backend: FakeBackend) -> (AuthController<FakeBackend, MemoryStore>, MemoryStore) {
        let store = MemoryStore::default();
        (AuthController::new(backend, store.clone()), store)
    }

    #[test]
    fn digest_is_lowercase_hex_md5() {
        assert_eq!(password_digest(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(password_digest("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn unknown_user_yields_none_and_stays_anonymous() {
        let (auth, _) = controller(FakeBackend::default());
        assert_eq!(block_on(auth.identify("baduser")), None);
        assert_eq!(auth.state(), AuthState::Anonymous);
        assert!(auth.session().worker.is_none());
    }

    #[test]
    fn network_failure_on_identify_stays_anonymous() {
        let (auth, _) = controller(FakeBackend { worker: Some(worker()), offline: true, ..Default::default() });
        assert_eq!(block_on(auth.identify("ana")), None);
        assert_eq!(auth.state(), AuthState::Anonymous);
    }

    #[test]
    fn identify_caches_worker_without_authenticating() {
        let (auth, _) = controller(FakeBackend { worker: Some(worker()), ..Default::default() });
        let found = block_on(auth.identify("  ana ")).expect("worker");
        assert_eq!(found.nlineno, Some(7));
        let session = auth.session();
        assert_eq!(session.state, AuthState::Identified);
        assert_eq!(session.username.as_deref(), Some("ana"));
        assert_eq!(session.display_name(), Some("María"));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn verify_is_true_only_on_exact_digest_match() {
        let (auth, _) = controller(FakeBackend {
            digest: Some(password_digest("s3cret")),
            ..Default::default()
        });
        assert!(block_on(auth.verify(7, "s3cret")));
        assert!(!block_on(auth.verify(7, "S3cret")));
        assert_eq!(auth.state(), AuthState::Anonymous);

        let (upper, _) = controller(FakeBackend {
            digest: Some(password_digest("s3cret").to_uppercase()),
            ..Default::default()
        });
        assert!(!block_on(upper.verify(7, "s3cret")));
    }

    #[test]
    fn verify_fails_closed_on_network_error_or_missing_digest() {
        let (offline, _) = controller(FakeBackend { offline: true, ..Default::default() });
        assert!(!block_on(offline.verify(7, "x")));
        let (missing, _) = controller(FakeBackend::default());
        assert!(!block_on(missing.verify(7, "x")));
    }

    #[test]
    fn confirm_with_remember_persists_only_username_and_photo() {
        let (auth, store) = controller(FakeBackend { worker: Some(worker()), ..Default::default() });
        block_on(auth.identify("ana"));
        auth.set_remember(true);
        auth.confirm_login(true);
        assert_eq!(auth.state(), AuthState::Authenticated);
        assert_eq!(
            store.load(),
            Some(RememberedUser { username: "ana".into(), photo: Some("cGhvdG8=".into()) })
        );
    }

    #[test]
    fn confirm_without_remember_clears_previous_remembered_user() {
        let (auth, store) = controller(FakeBackend { worker: Some(worker()), ..Default::default() });
        store.save(&RememberedUser { username: "old".into(), photo: None });
        block_on(auth.identify("ana"));
        auth.confirm_login(true);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn confirm_false_clears_worker_and_remembered_state() {
        let (auth, store) = controller(FakeBackend { worker: Some(worker()), ..Default::default() });
        block_on(auth.identify("ana"));
        auth.set_remember(true);
        auth.confirm_login(true);
        assert!(store.load().is_some());

        auth.logout();
        let session = auth.session();
        assert_eq!(session.state, AuthState::Anonymous);
        assert!(session.worker.is_none() && session.username.is_none());
        assert_eq!(store.load(), None);
    }

    #[test]
    fn login_requires_identification_first() {
        let (auth, _) = controller(FakeBackend::default());
        let err = block_on(auth.login("x", false)).unwrap_err();
        assert_eq!(err, ApiError::Validation("Primero identifíquese con un usuario válido".into()));
    }

    #[test]
    fn wrong_password_keeps_identity_for_retry() {
        let (auth, store) = controller(FakeBackend {
            worker: Some(worker()),
            digest: Some(password_digest("right")),
            ..Default::default()
        });
        block_on(auth.identify("ana"));
        let err = block_on(auth.login("wrong", true)).unwrap_err();
        assert_eq!(err.user_message(), "clave incorrecta");
        assert_eq!(auth.state(), AuthState::Identified);
        assert_eq!(store.load(), None);

        block_on(auth.login("right", true)).expect("login");
        assert_eq!(auth.state(), AuthState::Authenticated);
        assert_eq!(store.load().map(|u| u.username), Some("ana".into()));
        assert_eq!(auth.backend.digest_calls.get(), 2);
    }

    #[test]
    fn late_identify_answer_does_not_replace_a_newer_one() {
        let (auth, _) = controller(FakeBackend {
            lines: vec![("ana", 1), ("bob", 2)],
            slow: Some("ana"),
            ..Default::default()
        });
        let (ana, bob) = block_on(async { futures::join!(auth.identify("ana"), auth.identify("bob")) });
        assert_eq!(ana, None);
        assert_eq!(bob.and_then(|w| w.nlineno), Some(2));

        let session = auth.session();
        assert_eq!(session.username.as_deref(), Some("bob"));
        assert_eq!(session.line_id(), Some(2));
        assert_eq!(session.state, AuthState::Identified);
    }

    #[test]
    fn logout_discards_identify_still_in_flight() {
        let (auth, _) = controller(FakeBackend {
            lines: vec![("ana", 1)],
            slow: Some("ana"),
            ..Default::default()
        });
        let (found, ()) = block_on(async {
            futures::join!(auth.identify("ana"), async { auth.logout() })
        });
        assert_eq!(found, None);
        assert_eq!(auth.state(), AuthState::Anonymous);
        assert_eq!(auth.session().line_id(), None);
    }
}
