//! The session guard: single owner of the persisted credential and of the
//! reaction to a server saying that credential is no longer valid.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use super::session::{derive_session_state, Credential, SessionState, SessionStore, StoredSession};
use super::storage::StorageError;

/// How long the authorization message stays visible before the redirect.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Shown when the server rejects the stored token.
pub const AUTH_FAILURE_MESSAGE: &str = "Session expired or unauthorized. Please login again.";

/// Something that can take the application back to its entry point.
pub trait Navigator: Send + Sync + 'static {
    fn to_entry_point(&self);
}

/// Whether [`SessionGuard::handle_auth_failure`] consumed a response.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credential cleared and redirect scheduled. The caller must not treat
    /// the response as a normal success or failure.
    Handled,
    NotHandled,
}

impl AuthOutcome {
    pub fn is_handled(self) -> bool {
        matches!(self, AuthOutcome::Handled)
    }
}

/// 401 and 403 are the statuses that invalidate a session
pub fn is_auth_failure(status: u16) -> bool {
    matches!(status, 401 | 403)
}

#[derive(Default)]
struct PendingRedirect {
    handle: Option<AbortHandle>,
    /// Bumped on every cancel; a timer only fires if its epoch is current.
    epoch: u64,
}

struct Inner {
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    pending: Mutex<PendingRedirect>,
}

/// Cheap to clone; clones share the store and the pending redirect.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<Inner>,
}

impl SessionGuard {
    pub fn new(store: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                navigator,
                pending: Mutex::new(PendingRedirect::default()),
            }),
        }
    }

    fn pending(&self) -> MutexGuard<'_, PendingRedirect> {
        // The state is two plain fields, always valid after a panic elsewhere
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self) -> StoredSession {
        self.inner.store.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read stored session, treating as logged out");
            StoredSession::default()
        })
    }

    // =========================================================================
    // Credential access
    // =========================================================================

    /// The bearer token, from the current key or else the legacy key
    pub fn token(&self) -> Option<String> {
        self.snapshot().effective_token().map(str::to_string)
    }

    pub fn credential(&self) -> Option<Credential> {
        self.snapshot().credential()
    }

    pub fn session_state(&self) -> SessionState {
        derive_session_state(&self.snapshot())
    }

    /// Persist a new credential. Cancels a pending redirect, so a login made
    /// during the redirect delay is not wiped when the timer fires.
    pub fn set_credential(&self, credential: &Credential) -> Result<(), StorageError> {
        let mut pending = self.pending();
        Self::cancel_locked(&mut pending);
        self.inner.store.save(credential)?;
        info!(username = %credential.username, role = %credential.role, "Credential stored");
        Ok(())
    }

    /// Remove every persisted session entry. Clearing an empty session is fine.
    pub fn clear_credential(&self) -> Result<(), StorageError> {
        self.inner.store.clear()?;
        debug!("Credential cleared");
        Ok(())
    }

    // =========================================================================
    // Authorization failures
    // =========================================================================

    /// React to a response status. For 401/403 the credential is cleared,
    /// `report` receives [`AUTH_FAILURE_MESSAGE`], and a redirect to login is
    /// scheduled after [`REDIRECT_DELAY`]. Other statuses are left alone.
    pub fn handle_auth_failure<F>(&self, status: u16, report: F) -> AuthOutcome
    where
        F: FnOnce(&str),
    {
        if !is_auth_failure(status) {
            return AuthOutcome::NotHandled;
        }

        warn!(status, "Server rejected the session token");
        if let Err(e) = self.clear_credential() {
            // The redirect clears again; keep going so the user still sees it.
            error!(error = %e, "Failed to clear credential after authorization failure");
        }
        report(AUTH_FAILURE_MESSAGE);
        self.schedule_redirect();
        AuthOutcome::Handled
    }

    /// Clear the credential and send the application to its entry point.
    pub fn redirect_to_login(&self) {
        if let Err(e) = self.clear_credential() {
            error!(error = %e, "Failed to clear credential before redirect");
        }
        info!("Redirecting to login");
        self.inner.navigator.to_entry_point();
    }

    /// Explicit logout: no delay, and any pending redirect is dropped.
    pub fn logout(&self) {
        self.cancel_pending_redirect();
        info!("Logging out");
        self.redirect_to_login();
    }

    pub fn has_pending_redirect(&self) -> bool {
        self.pending()
            .handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn cancel_pending_redirect(&self) {
        let mut pending = self.pending();
        Self::cancel_locked(&mut pending);
    }

    fn cancel_locked(pending: &mut PendingRedirect) {
        pending.epoch = pending.epoch.wrapping_add(1);
        if let Some(handle) = pending.handle.take() {
            if !handle.is_finished() {
                debug!("Cancelling pending redirect");
            }
            handle.abort();
        }
    }

    fn schedule_redirect(&self) {
        let mut pending = self.pending();
        if pending.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Redirect already pending");
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No async runtime for a delayed redirect, redirecting now");
                drop(pending);
                self.redirect_to_login();
                return;
            }
        };

        let epoch = pending.epoch;
        let guard = self.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(REDIRECT_DELAY).await;
            guard.fire_redirect(epoch);
        });
        pending.handle = Some(task.abort_handle());
        debug!(delay_ms = REDIRECT_DELAY.as_millis() as u64, "Redirect to login scheduled");
    }

    fn fire_redirect(&self, epoch: u64) {
        {
            let mut pending = self.pending();
            if pending.epoch != epoch {
                debug!("Redirect was cancelled before it fired");
                return;
            }
            pending.handle = None;
            // Clear while holding the lock so a concurrent set_credential
            // lands strictly before or after this clear.
            if let Err(e) = self.inner.store.clear() {
                error!(error = %e, "Failed to clear credential before redirect");
            }
        }
        info!("Redirecting to login");
        self.inner.navigator.to_entry_point();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{LEGACY_TOKEN_KEY, TOKEN_KEY};
    use crate::auth::{MemoryStore, Role};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingNavigator {
        redirects: AtomicUsize,
    }

    impl Navigator for CountingNavigator {
        fn to_entry_point(&self) {
            self.redirects.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CountingNavigator {
        fn count(&self) -> usize {
            self.redirects.load(Ordering::SeqCst)
        }
    }

    fn guard_with(backend: MemoryStore) -> (SessionGuard, Arc<CountingNavigator>) {
        let navigator = Arc::new(CountingNavigator::default());
        let guard = SessionGuard::new(SessionStore::new(Arc::new(backend)), navigator.clone());
        (guard, navigator)
    }

    fn alice() -> Credential {
        Credential::new("abc", "alice", Role::User)
    }

    // -------------------------------------------------------------------------
    // Credential lifecycle
    // -------------------------------------------------------------------------

    #[test]
    fn test_get_returns_last_set_token() {
        let (guard, _) = guard_with(MemoryStore::new());
        assert_eq!(guard.token(), None);

        for token in ["one", "two", "three"] {
            guard
                .set_credential(&Credential::new(token, "alice", Role::User))
                .unwrap();
            assert_eq!(guard.token().as_deref(), Some(token));
        }
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (guard, _) = guard_with(MemoryStore::new());
        guard.set_credential(&alice()).unwrap();

        for _ in 0..3 {
            guard.clear_credential().unwrap();
            assert_eq!(guard.token(), None);
        }
        assert_eq!(guard.session_state(), SessionState::Anonymous);
    }

    #[test]
    fn test_token_falls_back_to_legacy_key() {
        let (guard, _) = guard_with(MemoryStore::with_entries([(LEGACY_TOKEN_KEY, "old")]));
        assert_eq!(guard.token().as_deref(), Some("old"));

        let (guard, _) = guard_with(MemoryStore::with_entries([(TOKEN_KEY, "new")]));
        assert_eq!(guard.token().as_deref(), Some("new"));
    }

    #[test]
    fn test_legacy_session_resumes_as_authenticated() {
        let (guard, _) = guard_with(MemoryStore::with_entries([
            (LEGACY_TOKEN_KEY, "old"),
            ("username", "bob"),
        ]));
        assert_eq!(
            guard.session_state(),
            SessionState::Authenticated {
                username: "bob".to_string(),
                role: Role::User,
            }
        );
    }

    #[test]
    fn test_set_credential_is_observed_whole() {
        let (guard, _) = guard_with(MemoryStore::new());
        guard
            .set_credential(&Credential::new("t", "carol", Role::Admin))
            .unwrap();
        assert_eq!(
            guard.credential(),
            Some(Credential::new("t", "carol", Role::Admin))
        );
    }

    // -------------------------------------------------------------------------
    // Authorization failures
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_auth_statuses_are_handled() {
        for status in [401, 403] {
            let backend = MemoryStore::new();
            let (guard, _) = guard_with(backend.clone());
            guard.set_credential(&alice()).unwrap();

            let mut reported = None;
            let outcome = guard.handle_auth_failure(status, |msg| reported = Some(msg.to_string()));

            assert_eq!(outcome, AuthOutcome::Handled);
            assert_eq!(reported.as_deref(), Some(AUTH_FAILURE_MESSAGE));
            assert!(backend.is_empty(), "status {} should clear storage", status);
            assert!(guard.has_pending_redirect());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_statuses_are_not_handled() {
        for status in [200, 201, 400, 404, 500] {
            let (guard, navigator) = guard_with(MemoryStore::new());
            guard.set_credential(&alice()).unwrap();

            let mut reported = false;
            let outcome = guard.handle_auth_failure(status, |_| reported = true);

            assert_eq!(outcome, AuthOutcome::NotHandled);
            assert!(!reported);
            assert_eq!(guard.credential(), Some(alice()));
            assert!(!guard.has_pending_redirect());

            tokio::time::sleep(REDIRECT_DELAY * 2).await;
            assert_eq!(navigator.count(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_clears_and_redirects_after_delay() {
        let backend = MemoryStore::new();
        let (guard, navigator) = guard_with(backend.clone());
        guard.set_credential(&alice()).unwrap();

        let outcome = guard.handle_auth_failure(403, |_| {});
        assert!(outcome.is_handled());
        assert!(backend.is_empty());
        assert_eq!(guard.session_state(), SessionState::Anonymous);

        tokio::time::sleep(REDIRECT_DELAY - Duration::from_millis(1)).await;
        assert_eq!(navigator.count(), 0, "redirect must wait for the delay");

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(navigator.count(), 1);
        assert!(!guard.has_pending_redirect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_failures_schedule_one_redirect() {
        let backend = MemoryStore::new();
        let (guard, navigator) = guard_with(backend.clone());
        guard.set_credential(&alice()).unwrap();

        let first = tokio::spawn({
            let guard = guard.clone();
            async move { guard.handle_auth_failure(403, |_| {}) }
        });
        let second = tokio::spawn({
            let guard = guard.clone();
            async move { guard.handle_auth_failure(403, |_| {}) }
        });
        assert!(first.await.unwrap().is_handled());
        assert!(second.await.unwrap().is_handled());
        assert!(backend.is_empty());

        tokio::time::sleep(REDIRECT_DELAY * 2).await;
        assert_eq!(navigator.count(), 1);
        assert!(backend.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_during_delay_cancels_redirect() {
        let (guard, navigator) = guard_with(MemoryStore::new());
        guard.set_credential(&alice()).unwrap();
        let _ = guard.handle_auth_failure(401, |_| {});

        tokio::time::sleep(Duration::from_millis(500)).await;
        let fresh = Credential::new("fresh", "alice", Role::User);
        guard.set_credential(&fresh).unwrap();
        assert!(!guard.has_pending_redirect());

        tokio::time::sleep(REDIRECT_DELAY * 2).await;
        assert_eq!(navigator.count(), 0);
        assert_eq!(guard.credential(), Some(fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_is_immediate_and_drops_pending_redirect() {
        let (guard, navigator) = guard_with(MemoryStore::new());
        guard.set_credential(&alice()).unwrap();
        let _ = guard.handle_auth_failure(401, |_| {});

        guard.logout();
        assert_eq!(navigator.count(), 1);

        tokio::time::sleep(REDIRECT_DELAY * 2).await;
        assert_eq!(navigator.count(), 1, "cancelled timer must not fire");
    }

    #[test]
    fn test_redirect_without_runtime_happens_immediately() {
        let (guard, navigator) = guard_with(MemoryStore::new());
        guard.set_credential(&alice()).unwrap();

        assert!(guard.handle_auth_failure(401, |_| {}).is_handled());
        assert_eq!(navigator.count(), 1);
        assert_eq!(guard.token(), None);
    }

    #[test]
    fn test_redirect_to_login_clears_and_navigates() {
        let backend = MemoryStore::new();
        let (guard, navigator) = guard_with(backend.clone());
        guard.set_credential(&alice()).unwrap();

        guard.redirect_to_login();
        assert!(backend.is_empty());
        assert_eq!(navigator.count(), 1);
    }
}
