//! Concrete `StorageBackend` adapters and the second-factor commit-log
//! pointer store that sits alongside them.
//!
//! Everything here is a reference implementation: an in-process store
//! keyed the way a real chain adapter would key its records
//! (`<backendTag>:<userId>:share`), with mock receipts. A production
//! adapter would replace the `HashMap` with an actual RPC client but keep
//! the same `StorageBackend` surface.

pub mod chain;
pub mod pointer_store;

pub use chain::ChainBackend;
pub use pointer_store::CommitLogStore;
