//! A reference append-only commit log for second-factor pointers (spec
//! §4.9, §11). Read-only from `zkauth-core`'s point of view; this crate
//! owns the only mutation (`append`).

use std::sync::Arc;

use tokio::sync::Mutex;
use zkauth_core::error::Result;
use zkauth_core::twofactor::{self, TwoFaPointer, TwoFaState};

/// An in-memory commit log. A durable build would replace this with reads
/// against whatever external ledger actually carries the pointer records;
/// the query surface (`fetch`) stays the same.
#[derive(Clone, Default)]
pub struct CommitLogStore {
    records: Arc<Mutex<Vec<TwoFaPointer>>>,
}

impl CommitLogStore {
    pub fn new() -> Self {
        CommitLogStore::default()
    }

    pub async fn append(&self, pointer: TwoFaPointer) {
        let mut guard = self.records.lock().await;
        guard.push(pointer);
    }

    /// Fetch the youngest `TwoFaState` whose pointer matches `lookup_key`,
    /// decrypting under `master_key_hex` (delegates the selection rule to
    /// [`zkauth_core::twofactor::fetch_state`]).
    pub async fn fetch(&self, lookup_key: &str, master_key_hex: &str) -> Result<Option<TwoFaState>> {
        let guard = self.records.lock().await;
        twofactor::fetch_state(&guard, lookup_key, master_key_hex)
    }
}
