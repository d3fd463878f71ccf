//! Shared ring-state store client.
//!
//! This crate defines the [`StateStore`] trait for reading and publishing
//! the cluster's ring-state record, along with two concrete backends:
//!
//! - [`HttpStateStore`] — the production client, speaking to a Kubernetes
//!   Secret over the cluster API with bearer-token auth and optimistic
//!   concurrency via `resourceVersion`.
//! - [`MemoryStateStore`] — in-memory backend with the same
//!   create/update/conflict semantics, used by tests and dry runs.

mod error;
mod http_store;
mod memory_store;
mod traits;

pub use error::StoreError;
pub use http_store::{HttpStateStore, HttpStoreOptions, OwnerReference};
pub use memory_store::MemoryStateStore;
pub use traits::{ArtifactMap, StateRecord, StateStore};
