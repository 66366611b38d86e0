//! Threshold-sharded, non-custodial authentication: a user's master key is
//! split across pluggable storage backends and never held in full by any
//! one of them. This crate implements the cryptographic core: field
//! arithmetic, AEAD, key derivation, secret sharing, identity derivation,
//! second-factor state, and session tokens. Concrete storage backends live
//! in `zkauth-backends`.

pub mod aead;
pub mod auth_core;
pub mod backend;
pub mod error;
pub mod field;
pub mod identity;
pub mod kdf;
pub mod masterkey;
pub mod session_token;
pub mod sharing;
pub mod twofactor;

pub use auth_core::{AuthCore, AuthCoreConfig, LoginResult, RegisterResult, Session};
pub use backend::{BackendTag, InMemoryBackend, PutReceipt, StorageBackend};
pub use error::{AuthError, Result};
pub use masterkey::MasterKey;
pub use sharing::{EncryptedShare, ShareData, SplitResult};
