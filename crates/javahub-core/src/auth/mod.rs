//! Authentication module: the persisted credential and its guard.
//!
//! This module provides:
//! - `SessionGuard`: the only way to read, set, or clear the credential, and
//!   the uniform reaction to a 401/403 from the server
//! - `SessionStore`: the persisted session over a pluggable backend
//! - `MemoryStore`, `FileStore`, `KeyringStore`: the backends
//!
//! Nothing expires on the client. A token is valid until the server says
//! otherwise.

pub mod credentials;
pub mod guard;
pub mod session;
pub mod storage;

pub use credentials::{keychain_is_persistent, KeychainEntry, KeyringStore, SecretSlot};
pub use guard::{
    is_auth_failure, AuthOutcome, Navigator, SessionGuard, AUTH_FAILURE_MESSAGE, REDIRECT_DELAY,
};
pub use session::{derive_session_state, Credential, Role, SessionState, SessionStore, StoredSession};
pub use storage::{FileStore, KeyValueStore, MemoryStore, Mutation, StorageError};
