use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::hasher::PasswordHasher;
use crate::error::{AuthError, HashError, StoreError};
use crate::store::{CredentialRecord, CredentialStore};

/// Outcome handed to the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthResult {
    pub success: bool,
}

/// Verifies username/password pairs against a [`CredentialStore`].
///
/// Holds no mutable state: concurrent calls for any usernames are independent
/// and repeated calls give repeated answers.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    decoy: CredentialRecord,
    lookup_timeout: Option<Duration>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, HashError> {
        // Unknown usernames are checked against this record so a miss costs
        // the same hash work as a wrong password.
        let secret: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let hashed = hasher.hash(&secret)?;
        let decoy = CredentialRecord::new("", hashed.password_hash, hashed.salt);

        Ok(Self {
            store,
            hasher,
            decoy,
            lookup_timeout: None,
        })
    }

    pub fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult {
        AuthResult {
            success: self.verify(username, password).await.is_ok(),
        }
    }

    /// Like [`authenticate`](Self::authenticate) but reports why a check
    /// failed. Callers must not expose the distinction to clients.
    pub async fn verify(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let (record, failure) = match self.lookup(username).await {
            Ok(Some(record)) if self.is_verifiable(&record) => (record, None),
            Ok(Some(_)) => {
                // Checked against the decoy so the miss costs a full hash.
                warn!(username = %username, "Stored credential is not a valid hash for the configured scheme");
                (self.decoy.clone(), Some(AuthError::Mismatch))
            }
            Ok(None) => (self.decoy.clone(), Some(AuthError::NotFound)),
            Err(e) => {
                error!(username = %username, error = %e, "Credential store lookup failed");
                (self.decoy.clone(), Some(AuthError::StoreUnavailable(e)))
            }
        };

        let matched = self.check_password(password, record).await;

        match failure {
            Some(err) => {
                debug!(username = %username, reason = %err, "Login rejected");
                Err(err)
            }
            None if matched => {
                info!(username = %username, "Login successful");
                Ok(())
            }
            None => {
                debug!(username = %username, "Login rejected: password mismatch");
                Err(AuthError::Mismatch)
            }
        }
    }

    async fn lookup(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError> {
        match self.lookup_timeout {
            Some(limit) => tokio::time::timeout(limit, self.store.lookup(username))
                .await
                .map_err(|_| StoreError::Unavailable(format!("lookup timed out after {:?}", limit)))?,
            None => self.store.lookup(username).await,
        }
    }

    fn is_verifiable(&self, record: &CredentialRecord) -> bool {
        self.hasher
            .is_well_formed(&record.password_hash, record.salt.as_deref())
    }

    async fn check_password(&self, password: &str, record: CredentialRecord) -> bool {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();

        let result = tokio::task::spawn_blocking(move || {
            hasher.verify(&password, &record.password_hash, record.salt.as_deref())
        })
        .await;

        match result {
            Ok(matched) => matched,
            Err(e) => {
                error!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Sha256Hasher;
    use crate::store::MockCredentialStore;
    use crate::auth::HashedPassword;
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Wraps a real scheme and records every hash it is asked to verify against.
    struct RecordingHasher {
        inner: Sha256Hasher,
        verified: Mutex<Vec<String>>,
        verifies: AtomicUsize,
    }

    impl RecordingHasher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: Sha256Hasher::new(10),
                verified: Mutex::new(Vec::new()),
                verifies: AtomicUsize::new(0),
            })
        }

        fn verifies(&self) -> usize {
            self.verifies.load(Ordering::SeqCst)
        }

        fn last_verified(&self) -> Option<String> {
            self.verified.lock().unwrap().last().cloned()
        }
    }

    impl PasswordHasher for RecordingHasher {
        fn hash(&self, password: &str) -> Result<HashedPassword, HashError> {
            self.inner.hash(password)
        }

        fn verify(&self, password: &str, password_hash: &str, salt: Option<&str>) -> bool {
            self.verifies.fetch_add(1, Ordering::SeqCst);
            self.verified.lock().unwrap().push(password_hash.to_string());
            self.inner.verify(password, password_hash, salt)
        }

        fn is_well_formed(&self, password_hash: &str, salt: Option<&str>) -> bool {
            self.inner.is_well_formed(password_hash, salt)
        }
    }

    fn service_over(store: MockCredentialStore, hasher: &Arc<RecordingHasher>) -> AuthService {
        AuthService::new(Arc::new(store), hasher.clone()).unwrap()
    }

    fn hasher() -> Arc<dyn PasswordHasher> {
        Arc::new(Sha256Hasher::new(10))
    }

    fn record_for(hasher: &dyn PasswordHasher, username: &str, password: &str) -> CredentialRecord {
        let hashed = hasher.hash(password).unwrap();
        CredentialRecord::new(username, hashed.password_hash, hashed.salt)
    }

    #[tokio::test]
    async fn test_known_user_correct_password() {
        let hasher = hasher();
        let record = record_for(hasher.as_ref(), "alice", "secret123");
        let mut store = MockCredentialStore::new();
        store
            .expect_lookup()
            .with(eq("alice"))
            .times(1)
            .returning(move |_| Ok(Some(record.clone())));

        let service = AuthService::new(Arc::new(store), hasher).unwrap();
        assert!(service.verify("alice", "secret123").await.is_ok());
    }

    #[tokio::test]
    async fn test_known_user_wrong_password() {
        let hasher = hasher();
        let record = record_for(hasher.as_ref(), "alice", "secret123");
        let mut store = MockCredentialStore::new();
        store.expect_lookup().returning(move |_| Ok(Some(record.clone())));

        let service = AuthService::new(Arc::new(store), hasher).unwrap();
        assert!(matches!(service.verify("alice", "wrong").await, Err(AuthError::Mismatch)));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let mut store = MockCredentialStore::new();
        store.expect_lookup().returning(|_| Ok(None));

        let service = AuthService::new(Arc::new(store), hasher()).unwrap();
        assert!(matches!(service.verify("bob", "anything").await, Err(AuthError::NotFound)));
        assert!(!service.authenticate("bob", "anything").await.success);
    }

    #[tokio::test]
    async fn test_unknown_user_cannot_match_decoy() {
        let mut store = MockCredentialStore::new();
        store.expect_lookup().returning(|_| Ok(None));

        let service = AuthService::new(Arc::new(store), hasher()).unwrap();
        // Even an empty password, or the decoy's empty username, never passes.
        assert!(!service.authenticate("", "").await.success);
    }

    #[tokio::test]
    async fn test_store_outage_fails_closed() {
        let mut store = MockCredentialStore::new();
        store
            .expect_lookup()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("connection refused".into())));

        let service = AuthService::new(Arc::new(store), hasher()).unwrap();
        let err = service.verify("alice", "secret123").await.unwrap_err();
        assert!(err.is_infrastructure_fault());
    }

    #[tokio::test]
    async fn test_single_lookup_per_attempt() {
        let mut store = MockCredentialStore::new();
        store
            .expect_lookup()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("connection refused".into())));

        let service = AuthService::new(Arc::new(store), hasher()).unwrap();
        assert!(!service.authenticate("alice", "secret123").await.success);
    }

    #[tokio::test]
    async fn test_repeated_failures_do_not_lock_out() {
        let hasher = hasher();
        let record = record_for(hasher.as_ref(), "alice", "secret123");
        let mut store = MockCredentialStore::new();
        store.expect_lookup().times(6).returning(move |_| Ok(Some(record.clone())));

        let service = AuthService::new(Arc::new(store), hasher).unwrap();
        for _ in 0..5 {
            assert!(!service.authenticate("alice", "wrong").await.success);
        }
        assert!(service.authenticate("alice", "secret123").await.success);
    }

    #[tokio::test]
    async fn test_every_outcome_costs_one_verification() {
        let hasher = RecordingHasher::new();
        let record = record_for(hasher.as_ref(), "alice", "secret123");

        let mut store = MockCredentialStore::new();
        store.expect_lookup().with(eq("alice")).returning(move |_| Ok(Some(record.clone())));
        store.expect_lookup().with(eq("bob")).returning(|_| Ok(None));
        store
            .expect_lookup()
            .with(eq("carol"))
            .returning(|_| Err(StoreError::Unavailable("connection refused".into())));
        let service = service_over(store, &hasher);

        let cases: [(&str, &str, bool); 4] = [
            ("alice", "secret123", true),
            ("alice", "wrong", false),
            ("bob", "anything", false),
            ("carol", "anything", false),
        ];
        for (i, (username, password, expected)) in cases.into_iter().enumerate() {
            assert_eq!(service.authenticate(username, password).await.success, expected);
            assert_eq!(hasher.verifies(), i + 1, "{} did not cost exactly one verification", username);
        }
    }

    #[tokio::test]
    async fn test_unparseable_stored_hash_uses_decoy() {
        let hasher = RecordingHasher::new();
        // A row carried over from a plaintext table.
        let plaintext = CredentialRecord::new("alice", "secret123", None);

        let mut store = MockCredentialStore::new();
        store.expect_lookup().returning(move |_| Ok(Some(plaintext.clone())));
        let service = service_over(store, &hasher);

        assert!(matches!(service.verify("alice", "secret123").await, Err(AuthError::Mismatch)));
        assert_eq!(hasher.verifies(), 1);

        let verified_against = hasher.last_verified().unwrap();
        assert_ne!(verified_against, "secret123");
        assert!(hasher.is_well_formed(&verified_against, None));
    }
}
