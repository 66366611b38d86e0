//! End-to-end scenarios against the in-memory reference backends, mirroring
//! the literal fixtures a known-answer suite would check.

use std::collections::BTreeMap;
use std::sync::Arc;

use hex_literal::hex;
use zkauth_core::backend::{BackendTag, InMemoryBackend, StorageBackend};
use zkauth_core::{AuthCore, AuthCoreConfig, AuthError, MasterKey};

/// The literal `pk = "11" x 32` fixture used throughout these scenarios.
fn literal_pk() -> String {
    hex::encode(hex!(
        "1111111111111111111111111111111111111111111111111111111111111111"
    ))
}

struct ThreeBackends {
    zcash: Arc<InMemoryBackend>,
    starknet: Arc<InMemoryBackend>,
    solana: Arc<InMemoryBackend>,
}

impl ThreeBackends {
    fn new() -> Self {
        ThreeBackends {
            zcash: Arc::new(InMemoryBackend::new(BackendTag::Zcash)),
            starknet: Arc::new(InMemoryBackend::new(BackendTag::Starknet)),
            solana: Arc::new(InMemoryBackend::new(BackendTag::Solana)),
        }
    }

    fn as_map(&self) -> BTreeMap<BackendTag, Arc<dyn StorageBackend>> {
        let mut backends: BTreeMap<BackendTag, Arc<dyn StorageBackend>> = BTreeMap::new();
        backends.insert(BackendTag::Zcash, self.zcash.clone());
        backends.insert(BackendTag::Starknet, self.starknet.clone());
        backends.insert(BackendTag::Solana, self.solana.clone());
        backends
    }
}

#[tokio::test]
async fn happy_register_login_and_session_roundtrip() {
    let backends = ThreeBackends::new();
    let core = AuthCore::new(AuthCoreConfig::new(backends.as_map())).unwrap();
    let pk = literal_pk();

    let registered = core.register(&pk).await.unwrap();
    assert!(registered.success);
    assert_eq!(registered.shares.len(), 3);
    for (i, share) in registered.shares.iter().enumerate() {
        assert_eq!(share.x as usize, i + 1);
    }
    assert_eq!(registered.user_id, MasterKey::generate_user_id(&pk).unwrap());

    let logged_in = core.login(&pk).await.unwrap();
    assert!(logged_in.success);
    assert!((2..=3).contains(&logged_in.shares_used));

    let session = core.create_session(&logged_in, None);
    let envelope = session.encrypt(b"Hello").unwrap();
    assert_eq!(session.decrypt(&envelope).unwrap(), b"Hello");
}

#[tokio::test]
async fn deleting_one_share_of_three_still_allows_login() {
    let backends = ThreeBackends::new();
    let uid_source = backends.as_map();
    let core = AuthCore::new(AuthCoreConfig::new(uid_source)).unwrap();
    let pk = "22".repeat(32);
    core.register(&pk).await.unwrap();
    let uid = MasterKey::generate_user_id(&pk).unwrap();

    backends.starknet.delete(&uid).await;

    let logged_in = core.login(&pk).await.unwrap();
    assert_eq!(logged_in.shares_used, 2);
}

#[tokio::test]
async fn deleting_two_shares_of_three_fails_with_insufficient_shares() {
    let backends = ThreeBackends::new();
    let core = AuthCore::new(AuthCoreConfig::new(backends.as_map())).unwrap();
    let pk = "33".repeat(32);
    core.register(&pk).await.unwrap();
    let uid = MasterKey::generate_user_id(&pk).unwrap();

    backends.starknet.delete(&uid).await;
    backends.solana.delete(&uid).await;

    assert!(matches!(
        core.login(&pk).await,
        Err(AuthError::InsufficientShares { .. })
    ));
}

#[tokio::test]
async fn tampered_share_is_skipped_not_trusted() {
    let backends = ThreeBackends::new();
    let core = AuthCore::new(AuthCoreConfig::new(backends.as_map())).unwrap();
    let pk = "44".repeat(32);
    let registered = core.register(&pk).await.unwrap();
    let uid = MasterKey::generate_user_id(&pk).unwrap();

    // `login` walks backends in canonical order (solana, starknet, zcash)
    // and stops once it has collected `threshold` shares, so tampering the
    // *first* backend is what actually forces the tamper-skip path to run;
    // tampering the last one would never be fetched at all.
    let mut tampered = backends.solana.get(&uid).await.unwrap().unwrap();
    let mut bytes = hex::decode(&tampered.encrypted_data).unwrap();
    bytes[0] ^= 0x01;
    tampered.encrypted_data = hex::encode(bytes);
    backends.solana.put(&uid, tampered).await.unwrap();

    // The untouched starknet and zcash shares remain, so login must still
    // succeed with the correct key -- it must never silently accept the
    // tampered solana share.
    let logged_in = core.login(&pk).await.unwrap();
    assert_eq!(logged_in.shares_used, 2);
    let expected_key = zkauth_core::sharing::combine(&registered.shares[1..]).unwrap();
    assert_eq!(logged_in.master_key.key_hex(), expected_key);
}

#[tokio::test]
async fn register_is_rejected_for_an_already_registered_key() {
    let backends = ThreeBackends::new();
    let core = AuthCore::new(AuthCoreConfig::new(backends.as_map())).unwrap();
    let pk = "55".repeat(32);
    core.register(&pk).await.unwrap();
    assert!(matches!(core.register(&pk).await, Err(AuthError::AlreadyRegistered)));
}
