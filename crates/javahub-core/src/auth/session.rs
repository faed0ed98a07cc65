use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::StorageKind;

use super::credentials::{
    keychain_is_persistent, KeyringStore, SERVICE_NAME as KEYCHAIN_SERVICE,
};
use super::storage::{FileStore, KeyValueStore, Mutation, StorageError};

/// Storage key holding the bearer token
pub const TOKEN_KEY: &str = "authToken";

/// Older token key. Read as a fallback, never written.
pub const LEGACY_TOKEN_KEY: &str = "token";

pub const USERNAME_KEY: &str = "username";

pub const ROLE_KEY: &str = "role";

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

// ============================================================================
// Credential
// ============================================================================

/// Account role as reported by the server. Missing or blank reads as `User`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    #[default]
    User,
    Admin,
    Other(String),
}

impl Role {
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            None | Some("") => Role::User,
            Some(r) if r.eq_ignore_ascii_case("USER") => Role::User,
            Some(r) if r.eq_ignore_ascii_case("ADMIN") => Role::Admin,
            Some(r) => Role::Other(r.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Other(r) => r.as_str(),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::parse(Some(&s))
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bearer token plus the identity it was issued for
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub username: String,
    pub role: Role,
}

impl Credential {
    pub fn new(token: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
            role,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish()
    }
}

// ============================================================================
// Derived session state
// ============================================================================

/// One consistent read of every persisted session entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSession {
    pub token: Option<String>,
    pub legacy_token: Option<String>,
    pub username: Option<String>,
    pub role: Option<String>,
}

impl StoredSession {
    /// Current-schema token, else the legacy one. Empty values count as absent.
    pub fn effective_token(&self) -> Option<&str> {
        non_empty(&self.token).or_else(|| non_empty(&self.legacy_token))
    }

    pub fn username(&self) -> Option<&str> {
        non_empty(&self.username)
    }

    pub fn role(&self) -> Role {
        Role::parse(self.role.as_deref())
    }

    /// The full credential, if both token and username are present
    pub fn credential(&self) -> Option<Credential> {
        let token = self.effective_token()?;
        let username = self.username()?;
        Some(Credential::new(token, username, self.role()))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated { username: String, role: Role },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { username, .. } => Some(username),
            SessionState::Anonymous => None,
        }
    }
}

/// Derive the login state from what is persisted. This is the only place the
/// "logged in" decision is made.
pub fn derive_session_state(stored: &StoredSession) -> SessionState {
    match stored.credential() {
        Some(credential) => SessionState::Authenticated {
            username: credential.username,
            role: credential.role,
        },
        None => SessionState::Anonymous,
    }
}

// ============================================================================
// Session store
// ============================================================================

/// The persisted session, over an injectable key-value backend.
///
/// Reads and writes are crate-private: everything outside the crate goes
/// through [`SessionGuard`](super::SessionGuard).
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Open the production backend selected in the configuration. The
    /// keychain is only used when it actually keeps secrets across handles;
    /// otherwise the session goes to the file in `data_dir`.
    pub fn open(kind: StorageKind, data_dir: &Path) -> Self {
        let backend: Arc<dyn KeyValueStore> = match kind {
            StorageKind::Keyring if keychain_is_persistent(KEYCHAIN_SERVICE) => {
                Arc::new(KeyringStore::new())
            }
            StorageKind::Keyring => {
                warn!("Keychain storage requested but unavailable, using the session file");
                Arc::new(FileStore::new(data_dir.join(SESSION_FILE)))
            }
            StorageKind::File => Arc::new(FileStore::new(data_dir.join(SESSION_FILE))),
        };
        Self::new(backend)
    }

    pub(crate) fn load(&self) -> Result<StoredSession, StorageError> {
        let mut values = self
            .backend
            .get_many(&[TOKEN_KEY, LEGACY_TOKEN_KEY, USERNAME_KEY, ROLE_KEY])?
            .into_iter();
        Ok(StoredSession {
            token: values.next().flatten(),
            legacy_token: values.next().flatten(),
            username: values.next().flatten(),
            role: values.next().flatten(),
        })
    }

    /// Persist a credential in the current schema, dropping the legacy key in
    /// the same batch.
    pub(crate) fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        self.backend.apply(&[
            Mutation::set(TOKEN_KEY, credential.token.as_str()),
            Mutation::set(USERNAME_KEY, credential.username.as_str()),
            Mutation::set(ROLE_KEY, credential.role.as_str()),
            Mutation::remove(LEGACY_TOKEN_KEY),
        ])
    }

    pub(crate) fn clear(&self) -> Result<(), StorageError> {
        self.backend.apply(&[
            Mutation::remove(TOKEN_KEY),
            Mutation::remove(LEGACY_TOKEN_KEY),
            Mutation::remove(USERNAME_KEY),
            Mutation::remove(ROLE_KEY),
        ])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;
    use pretty_assertions::assert_eq;

    fn stored(token: Option<&str>, legacy: Option<&str>, username: Option<&str>) -> StoredSession {
        StoredSession {
            token: token.map(String::from),
            legacy_token: legacy.map(String::from),
            username: username.map(String::from),
            role: None,
        }
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse(None), Role::User);
        assert_eq!(Role::parse(Some("")), Role::User);
        assert_eq!(Role::parse(Some("USER")), Role::User);
        assert_eq!(Role::parse(Some("admin")), Role::Admin);
        assert_eq!(Role::parse(Some("MENTOR")), Role::Other("MENTOR".to_string()));
    }

    #[test]
    fn test_role_serde_uses_upper_case() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_credential_debug_hides_token() {
        let credential = Credential::new("abc", "alice", Role::User);
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("abc"));
        assert!(debug.contains("alice"));
    }

    #[test]
    fn test_effective_token_prefers_current_key() {
        assert_eq!(stored(Some("new"), Some("old"), None).effective_token(), Some("new"));
        assert_eq!(stored(None, Some("old"), None).effective_token(), Some("old"));
        assert_eq!(stored(Some(""), Some("old"), None).effective_token(), Some("old"));
        assert_eq!(stored(None, None, None).effective_token(), None);
    }

    #[test]
    fn test_derive_session_state() {
        assert_eq!(derive_session_state(&StoredSession::default()), SessionState::Anonymous);

        // Token without a username is not a session
        assert_eq!(
            derive_session_state(&stored(Some("abc"), None, None)),
            SessionState::Anonymous
        );
        assert_eq!(
            derive_session_state(&stored(Some("abc"), None, Some(""))),
            SessionState::Anonymous
        );

        assert_eq!(
            derive_session_state(&stored(None, Some("abc"), Some("alice"))),
            SessionState::Authenticated {
                username: "alice".to_string(),
                role: Role::User,
            }
        );
    }

    #[test]
    fn test_store_save_migrates_legacy_key() {
        let backend = MemoryStore::with_entries([(LEGACY_TOKEN_KEY, "old")]);
        let store = SessionStore::new(Arc::new(backend.clone()));

        store
            .save(&Credential::new("new", "alice", Role::Admin))
            .unwrap();

        let raw = backend.snapshot();
        assert_eq!(raw.get(TOKEN_KEY).map(String::as_str), Some("new"));
        assert_eq!(raw.get(ROLE_KEY).map(String::as_str), Some("ADMIN"));
        assert!(!raw.contains_key(LEGACY_TOKEN_KEY));
    }

    #[test]
    fn test_store_clear_removes_everything() {
        let backend = MemoryStore::with_entries([
            (TOKEN_KEY, "a"),
            (LEGACY_TOKEN_KEY, "b"),
            (USERNAME_KEY, "alice"),
            (ROLE_KEY, "USER"),
        ]);
        let store = SessionStore::new(Arc::new(backend.clone()));

        store.clear().unwrap();
        assert!(backend.is_empty());
        assert_eq!(store.load().unwrap(), StoredSession::default());
    }
}
