//! Token persistence: a key-value collaborator and the token operations
//! built on top of it.

pub mod kv;
pub mod tokens;

pub use kv::{FileStore, KvStore, MemoryStore};
pub use tokens::TokenStore;
