use std::collections::HashMap;
use std::sync::Mutex;

use keyring::Entry;
use tracing::{debug, warn};

use super::storage::{KeyValueStore, Mutation, StorageError};

/// Keychain service the session is stored under
pub const SERVICE_NAME: &str = "javahub";

/// Keychain account holding the whole session as one JSON object
const SESSION_ACCOUNT: &str = "session";

/// Keychain account used to check that the keychain keeps what it is given
const PROBE_ACCOUNT: &str = "availability-check";

/// A single secret slot in the OS keychain.
pub trait SecretSlot: Send + Sync {
    fn read(&self) -> Result<Option<String>, StorageError>;

    fn write(&self, secret: &str) -> Result<(), StorageError>;

    /// Deleting a missing secret is not an error
    fn delete(&self) -> Result<(), StorageError>;
}

/// A keychain entry addressed by service and account.
#[derive(Debug, Clone)]
pub struct KeychainEntry {
    service: String,
    account: String,
}

impl KeychainEntry {
    pub fn new(service: &str, account: &str) -> Self {
        Self {
            service: service.to_string(),
            account: account.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, &self.account)?)
    }
}

impl SecretSlot for KeychainEntry {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match self.entry()?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, secret: &str) -> Result<(), StorageError> {
        Ok(self.entry()?.set_password(secret)?)
    }

    fn delete(&self) -> Result<(), StorageError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether the platform keychain for `service` keeps a secret written through
/// one entry handle and read back through another. The keyring crate's mock
/// fallback does not, and neither does a locked or missing keychain.
pub fn keychain_is_persistent(service: &str) -> bool {
    let marker = "javahub";
    let written = KeychainEntry::new(service, PROBE_ACCOUNT).write(marker);
    let read_back = KeychainEntry::new(service, PROBE_ACCOUNT).read();
    if let Err(e) = KeychainEntry::new(service, PROBE_ACCOUNT).delete() {
        debug!(error = %e, "Failed to remove keychain availability marker");
    }

    match (written, read_back) {
        (Ok(()), Ok(Some(value))) if value == marker => true,
        (Err(e), _) | (_, Err(e)) => {
            warn!(service, error = %e, "OS keychain unavailable");
            false
        }
        _ => {
            warn!(service, "OS keychain does not persist secrets");
            false
        }
    }
}

/// Session storage in the OS keychain.
///
/// Every entry lives in one JSON object under a single secret, so a batch is
/// one write (or one delete once the session is empty) and the keychain
/// always holds either the old or the new batch.
pub struct KeyringStore {
    slot: Box<dyn SecretSlot>,
    lock: Mutex<()>,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a different keychain service name (e.g. to keep test runs away
    /// from the real session)
    pub fn with_service(service: &str) -> Self {
        Self::with_slot(KeychainEntry::new(service, SESSION_ACCOUNT))
    }

    pub fn with_slot(slot: impl SecretSlot + 'static) -> Self {
        Self {
            slot: Box::new(slot),
            lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Result<HashMap<String, String>, StorageError> {
        match self.slot.read()? {
            None => Ok(HashMap::new()),
            Some(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Some(contents) => {
                serde_json::from_str(&contents).map_err(StorageError::CorruptKeychain)
            }
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let _lock = self.lock.lock()?;
        let map = self.read_map()?;
        Ok(keys.iter().map(|k| map.get(*k).cloned()).collect())
    }

    fn apply(&self, batch: &[Mutation]) -> Result<(), StorageError> {
        let _lock = self.lock.lock()?;
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StorageError::CorruptKeychain(e)) => {
                warn!(error = %e, "Discarding corrupt keychain session");
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        for mutation in batch {
            mutation.apply_to(&mut map);
        }

        if map.is_empty() {
            self.slot.delete()?;
        } else {
            let contents = serde_json::to_string(&map).map_err(StorageError::CorruptKeychain)?;
            self.slot.write(&contents)?;
        }
        debug!(mutations = batch.len(), entries = map.len(), "Keychain session updated");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// In-process slot that can be told to fail its next write or delete
    #[derive(Default)]
    struct FakeSlot {
        secret: Mutex<Option<String>>,
        fail: AtomicBool,
        writes: AtomicUsize,
    }

    impl FakeSlot {
        fn failure() -> StorageError {
            StorageError::Keyring(keyring::Error::NoStorageAccess(
                std::io::Error::other("keychain locked").into(),
            ))
        }

        fn check(&self) -> Result<(), StorageError> {
            if self.fail.swap(false, Ordering::SeqCst) {
                Err(Self::failure())
            } else {
                Ok(())
            }
        }
    }

    impl SecretSlot for Arc<FakeSlot> {
        fn read(&self) -> Result<Option<String>, StorageError> {
            Ok(self.secret.lock().unwrap().clone())
        }

        fn write(&self, secret: &str) -> Result<(), StorageError> {
            self.check()?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            *self.secret.lock().unwrap() = Some(secret.to_string());
            Ok(())
        }

        fn delete(&self) -> Result<(), StorageError> {
            self.check()?;
            *self.secret.lock().unwrap() = None;
            Ok(())
        }
    }

    fn store() -> (KeyringStore, Arc<FakeSlot>) {
        let slot = Arc::new(FakeSlot::default());
        (KeyringStore::with_slot(slot.clone()), slot)
    }

    #[test]
    fn test_batch_is_a_single_write() {
        let (store, slot) = store();
        store
            .apply(&[
                Mutation::set("authToken", "abc"),
                Mutation::set("username", "alice"),
                Mutation::set("role", "USER"),
                Mutation::remove("token"),
            ])
            .unwrap();

        assert_eq!(slot.writes.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.get_many(&["authToken", "username", "token"]).unwrap(),
            vec![Some("abc".to_string()), Some("alice".to_string()), None]
        );
    }

    #[test]
    fn test_failed_write_keeps_previous_session() {
        let (store, slot) = store();
        store
            .apply(&[Mutation::set("authToken", "old"), Mutation::set("username", "alice")])
            .unwrap();

        slot.fail.store(true, Ordering::SeqCst);
        let result = store.apply(&[Mutation::set("authToken", "new"), Mutation::set("username", "bob")]);
        assert!(result.is_err());

        assert_eq!(
            store.get_many(&["authToken", "username"]).unwrap(),
            vec![Some("old".to_string()), Some("alice".to_string())]
        );
    }

    #[test]
    fn test_failed_clear_leaves_nothing_half_removed() {
        let (store, slot) = store();
        store
            .apply(&[Mutation::set("authToken", "abc"), Mutation::set("token", "legacy")])
            .unwrap();

        slot.fail.store(true, Ordering::SeqCst);
        assert!(store
            .apply(&[Mutation::remove("authToken"), Mutation::remove("token")])
            .is_err());
        assert_eq!(
            store.get_many(&["authToken", "token"]).unwrap(),
            vec![Some("abc".to_string()), Some("legacy".to_string())]
        );

        store
            .apply(&[Mutation::remove("authToken"), Mutation::remove("token")])
            .unwrap();
        assert_eq!(*slot.secret.lock().unwrap(), None);
    }

    #[test]
    fn test_corrupt_secret_is_reported_then_overwritten() {
        let (store, slot) = store();
        *slot.secret.lock().unwrap() = Some("{not json".to_string());

        assert!(matches!(store.get("authToken"), Err(StorageError::CorruptKeychain(_))));

        store.apply(&[Mutation::set("authToken", "abc")]).unwrap();
        assert_eq!(store.get("authToken").unwrap(), Some("abc".to_string()));
    }

    #[test]
    fn test_saved_session_is_read_back_by_a_new_store() {
        use crate::auth::{Credential, Role, SessionStore};

        let slot = Arc::new(FakeSlot::default());
        SessionStore::new(Arc::new(KeyringStore::with_slot(slot.clone())))
            .save(&Credential::new("abc", "alice", Role::User))
            .unwrap();

        let reopened = SessionStore::new(Arc::new(KeyringStore::with_slot(slot)));
        let session = reopened.load().unwrap();
        assert_eq!(session.effective_token(), Some("abc"));
        assert_eq!(session.username(), Some("alice"));
    }

    // Needs a real, unlocked OS keychain

    #[test]
    #[ignore]
    fn test_os_keychain_round_trip() {
        let service = "javahub-test";
        assert!(keychain_is_persistent(service), "no persistent keychain here");

        let store = KeyringStore::with_service(service);
        store
            .apply(&[Mutation::set("authToken", "abc"), Mutation::set("username", "alice")])
            .unwrap();

        let reopened = KeyringStore::with_service(service);
        assert_eq!(reopened.get("authToken").unwrap(), Some("abc".to_string()));

        reopened
            .apply(&[Mutation::remove("authToken"), Mutation::remove("username")])
            .unwrap();
        assert_eq!(store.get("authToken").unwrap(), None);
    }
}
