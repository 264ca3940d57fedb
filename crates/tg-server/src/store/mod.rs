//! Account store backends
//!
//! The registry persists every provisioned account through an
//! [`AccountStore`](tg_core::traits::AccountStore). Two backends exist:
//! a sharded on-disk JSON store for the daemon and an in-memory store
//! for tests and embedding.

mod disk;
mod memory;

pub use disk::{shard_path, DiskStore, FALLBACK_SHARD};
pub use memory::MemoryStore;
