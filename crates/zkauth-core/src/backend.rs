//! The storage-backend capability (spec §4.7): a thin, async, put/get/has
//! contract that `AuthCore` fans a share out across.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AuthError, Result};
use crate::sharing::EncryptedShare;

/// The three chains a share can be pinned to (spec §3, §4.7). Ordering is
/// the stable lexicographic order `AuthCore` iterates enabled backends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BackendTag {
    Solana,
    Starknet,
    Zcash,
}

impl BackendTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendTag::Solana => "solana",
            BackendTag::Starknet => "starknet",
            BackendTag::Zcash => "zcash",
        }
    }

    /// The canonical ordering of all known backends, lexicographic by name
    /// (`solana`, `starknet`, `zcash`), the order `AuthCore::register` walks
    /// when pairing shares to backends (spec §4.8).
    pub fn canonical_order() -> [BackendTag; 3] {
        [BackendTag::Solana, BackendTag::Starknet, BackendTag::Zcash]
    }
}

impl std::fmt::Display for BackendTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single write confirmation (spec §3 `receipt`).
#[derive(Debug, Clone)]
pub struct PutReceipt {
    pub backend: BackendTag,
    pub reference: String,
}

/// The storage contract every chain adapter implements. All three methods
/// are keyed by `user_id`, the deterministic identifier from
/// [`crate::identity::user_identifier`] or one of its chain-specific lookup
/// variants, never by email or any other reversible identifier (spec §4.7).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn tag(&self) -> BackendTag;

    async fn put(&self, user_id: &str, share: EncryptedShare) -> Result<PutReceipt>;

    async fn get(&self, user_id: &str) -> Result<Option<EncryptedShare>>;

    async fn has(&self, user_id: &str) -> Result<bool>;
}

/// An in-process reference backend. Useful for tests and for the CLI demo;
/// not durable past process lifetime.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tag: Option<BackendTag>,
    store: Arc<Mutex<HashMap<String, EncryptedShare>>>,
}

impl InMemoryBackend {
    pub fn new(tag: BackendTag) -> Self {
        InMemoryBackend {
            tag: Some(tag),
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Test/demo helper: drop a stored share, simulating data loss at this
    /// backend without tearing down the whole adapter.
    pub async fn delete(&self, user_id: &str) {
        let mut guard = self.store.lock().await;
        guard.remove(user_id);
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn tag(&self) -> BackendTag {
        self.tag.expect("InMemoryBackend constructed via new()")
    }

    async fn put(&self, user_id: &str, share: EncryptedShare) -> Result<PutReceipt> {
        let mut guard = self.store.lock().await;
        guard.insert(user_id.to_string(), share);
        Ok(PutReceipt {
            backend: self.tag(),
            reference: format!("mem:{}:{user_id}", self.tag()),
        })
    }

    async fn get(&self, user_id: &str) -> Result<Option<EncryptedShare>> {
        let guard = self.store.lock().await;
        Ok(guard.get(user_id).cloned())
    }

    async fn has(&self, user_id: &str) -> Result<bool> {
        let guard = self.store.lock().await;
        Ok(guard.contains_key(user_id))
    }
}

/// An adapter that always fails, for exercising `AuthCore`'s
/// partial-failure / threshold tolerance (spec §4.8, §7).
#[derive(Debug)]
pub struct FailingBackend {
    tag: BackendTag,
    reason: String,
}

impl FailingBackend {
    pub fn new(tag: BackendTag, reason: impl Into<String>) -> Self {
        FailingBackend {
            tag,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl StorageBackend for FailingBackend {
    fn tag(&self) -> BackendTag {
        self.tag
    }

    async fn put(&self, _user_id: &str, _share: EncryptedShare) -> Result<PutReceipt> {
        Err(AuthError::backend_unavailable(self.reason.clone()))
    }

    async fn get(&self, _user_id: &str) -> Result<Option<EncryptedShare>> {
        Err(AuthError::backend_unavailable(self.reason.clone()))
    }

    async fn has(&self, _user_id: &str) -> Result<bool> {
        Err(AuthError::backend_unavailable(self.reason.clone()))
    }
}
