//! Link store implementations.
//!
//! Both backends implement [`LinkStore`]: an in-memory store for tests and
//! single-process deployments, and a MySQL store for durable persistence.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryLinkStore;
pub use mysql::MySqlLinkStore;
pub use redishort_core::{LinkRecord, LinkStore, StorageError};
