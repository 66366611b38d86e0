//! A reference `StorageBackend` for one chain. `zcash`, `starknet`, and
//! `solana` are all the same adapter shape parameterized by a
//! [`BackendTag`]; a production build would give each its own RPC client
//! behind this trait instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use zkauth_core::backend::{BackendTag, PutReceipt, StorageBackend};
use zkauth_core::error::Result;
use zkauth_core::sharing::EncryptedShare;

/// Record key convention used by the reference backends (spec §4.9):
/// `<backendTag>:<userId>:share`. Not load-bearing for correctness, just
/// the shape a durable adapter's keyspace would follow.
fn record_key(tag: BackendTag, user_id: &str) -> String {
    format!("{tag}:{user_id}:share")
}

#[derive(Debug, Default)]
struct ChainStore {
    records: HashMap<String, EncryptedShare>,
}

/// An in-memory stand-in for a single chain's share store. Construct one
/// per [`BackendTag`] via [`ChainBackend::new`].
#[derive(Clone)]
pub struct ChainBackend {
    tag: BackendTag,
    store: Arc<Mutex<ChainStore>>,
}

impl ChainBackend {
    pub fn new(tag: BackendTag) -> Self {
        ChainBackend {
            tag,
            store: Arc::new(Mutex::new(ChainStore::default())),
        }
    }
}

#[async_trait]
impl StorageBackend for ChainBackend {
    fn tag(&self) -> BackendTag {
        self.tag
    }

    async fn put(&self, user_id: &str, share: EncryptedShare) -> Result<PutReceipt> {
        let key = record_key(self.tag, user_id);
        let mut guard = self.store.lock().await;
        guard.records.insert(key.clone(), share);
        Ok(PutReceipt {
            backend: self.tag,
            reference: format!("{}-receipt-{}", self.tag, &key[..key.len().min(12)]),
        })
    }

    async fn get(&self, user_id: &str) -> Result<Option<EncryptedShare>> {
        let key = record_key(self.tag, user_id);
        let guard = self.store.lock().await;
        Ok(guard.records.get(&key).cloned())
    }

    async fn has(&self, user_id: &str) -> Result<bool> {
        let key = record_key(self.tag, user_id);
        let guard = self.store.lock().await;
        Ok(guard.records.contains_key(&key))
    }
}
