//! Registration/login orchestration across storage backends, and the
//! session object login hands back (spec §4.8).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::aead::EncryptionResult;
use crate::backend::{BackendTag, StorageBackend};
use crate::error::{AuthError, Result};
use crate::masterkey::MasterKey;
use crate::sharing::{self, ShareData};

const DEFAULT_THRESHOLD: u8 = 2;
const DEFAULT_TOTAL_SHARES: u8 = 3;
const DEFAULT_SESSION_TTL_MS: i64 = 86_400_000;

pub struct AuthCoreConfig {
    pub backends: BTreeMap<BackendTag, Arc<dyn StorageBackend>>,
    pub threshold: u8,
    pub total_shares: u8,
}

impl AuthCoreConfig {
    pub fn new(backends: BTreeMap<BackendTag, Arc<dyn StorageBackend>>) -> Self {
        AuthCoreConfig {
            backends,
            threshold: DEFAULT_THRESHOLD,
            total_shares: DEFAULT_TOTAL_SHARES,
        }
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_total_shares(mut self, total_shares: u8) -> Self {
        self.total_shares = total_shares;
        self
    }
}

/// Registration and login orchestration across backends; enforces the
/// threshold policy and mints session objects (spec §4.8).
pub struct AuthCore {
    backends: Vec<Arc<dyn StorageBackend>>,
    threshold: u8,
    total_shares: u8,
}

#[derive(Debug, Clone)]
pub struct RegisterResult {
    pub success: bool,
    pub user_id: String,
    pub shares: Vec<ShareData>,
    pub master_key_hash: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub success: bool,
    pub user_id: String,
    pub master_key: MasterKey,
    pub shares_used: usize,
}

impl AuthCore {
    /// Construct an `AuthCore` over `config`. Fails with `ConfigError` when
    /// `threshold < 2`, `threshold > total_shares`, `total_shares` would
    /// overflow a share index, or fewer than `threshold` backends are
    /// enabled.
    pub fn new(config: AuthCoreConfig) -> Result<Self> {
        if config.threshold < 2 {
            return Err(AuthError::config("threshold must be >= 2"));
        }
        if config.threshold > config.total_shares {
            return Err(AuthError::config("threshold must be <= total_shares"));
        }
        // backends: BTreeMap<BackendTag, _> already iterates in BackendTag's
        // derived Ord, which is the lexicographic solana/starknet/zcash order.
        let backends: Vec<Arc<dyn StorageBackend>> = config.backends.into_values().collect();
        if backends.len() < config.threshold as usize {
            return Err(AuthError::config(format!(
                "need at least {} enabled backends, found {}",
                config.threshold,
                backends.len()
            )));
        }
        Ok(AuthCore {
            backends,
            threshold: config.threshold,
            total_shares: config.total_shares,
        })
    }

    fn backend_for_index(&self, index: u8) -> &Arc<dyn StorageBackend> {
        let pos = (index - 1) as usize % self.backends.len();
        &self.backends[pos]
    }

    /// `count(backends where has(uid)) >= threshold`.
    pub async fn is_registered(&self, uid: &str) -> Result<bool> {
        let mut count = 0usize;
        for backend in &self.backends {
            if backend.has(uid).await.unwrap_or(false) {
                count += 1;
            }
        }
        Ok(count >= self.threshold as usize)
    }

    pub async fn register(&self, pk_hex: &str) -> Result<RegisterResult> {
        let uid = MasterKey::generate_user_id(pk_hex)?;
        if self.is_registered(&uid).await? {
            return Err(AuthError::AlreadyRegistered);
        }

        let mk = MasterKey::generate();
        let split_result = sharing::split(&mk, self.threshold, self.total_shares)?;

        for share in &split_result.shares {
            let backend = self.backend_for_index(share.x);
            let envelope = sharing::encrypt_share(share, share.x, backend.tag().as_str(), pk_hex)?;
            // register does not swallow backend failures: any failed put
            // aborts the whole registration (spec §7).
            backend.put(&uid, envelope).await?;
        }

        Ok(RegisterResult {
            success: true,
            user_id: uid,
            shares: split_result.shares,
            master_key_hash: mk.hash(),
        })
    }

    pub async fn login(&self, pk_hex: &str) -> Result<LoginResult> {
        let uid = MasterKey::generate_user_id(pk_hex)?;
        if !self.is_registered(&uid).await? {
            return Err(AuthError::NotRegistered);
        }

        let mut collected: Vec<ShareData> = Vec::new();
        for backend in &self.backends {
            if collected.len() >= self.threshold as usize {
                break;
            }
            let envelope = match backend.get(&uid).await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => continue,
                Err(AuthError::BackendUnavailable(_)) => continue,
                Err(AuthError::AuthenticationFailure(_)) => continue,
                Err(other) => return Err(other),
            };
            match sharing::decrypt_share(&envelope, pk_hex) {
                Ok(share) => collected.push(share),
                Err(AuthError::AuthenticationFailure(_)) => continue,
                Err(other) => return Err(other),
            }
        }

        if collected.len() < self.threshold as usize {
            return Err(AuthError::InsufficientShares {
                collected: collected.len(),
                threshold: self.threshold as usize,
            });
        }

        let key_hex = sharing::combine(&collected)?;
        let master_key = MasterKey::from_hex(&key_hex)?;
        let shares_used = collected.len();
        Ok(LoginResult {
            success: true,
            user_id: uid,
            master_key,
            shares_used,
        })
    }

    pub fn create_session(&self, login_result: &LoginResult, ttl_ms: Option<i64>) -> Session {
        let ttl_ms = ttl_ms.unwrap_or(DEFAULT_SESSION_TTL_MS);
        Session {
            user_id: login_result.user_id.clone(),
            master_key: login_result.master_key.clone(),
            expires_at: Utc::now().timestamp_millis() + ttl_ms,
        }
    }
}

/// The object `AuthCore::create_session` hands back: an AEAD capability
/// scoped to one user and one expiry (spec §4.8).
#[derive(Clone)]
pub struct Session {
    pub user_id: String,
    master_key: MasterKey,
    pub expires_at: i64,
}

impl Session {
    fn check_not_expired(&self) -> Result<()> {
        if Utc::now().timestamp_millis() > self.expires_at {
            return Err(AuthError::SessionExpired);
        }
        Ok(())
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptionResult> {
        self.check_not_expired()?;
        self.master_key.encrypt_data(plaintext)
    }

    pub fn decrypt(&self, envelope: &EncryptionResult) -> Result<Vec<u8>> {
        self.check_not_expired()?;
        self.master_key.decrypt_data(envelope)
    }
}
