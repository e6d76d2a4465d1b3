//! Redirect resolution in front of a bounded, score-ordered cache.
//!
//! [`RedirectorService`] answers a short code from the [`ScoredCache`] when it
//! can and falls through to the [`LinkStore`] when it cannot, offering every
//! record it reads from the store to the cache. Visit counts are pushed to
//! the store in the background; a redirect never waits on them.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use redishort_cache::ScoredCache;
//! use redishort_core::ShortCode;
//! use redishort_redirector::{RedirectorService, Resolution};
//! # use redishort_core::{LinkRecord, LinkStore, StorageError};
//! # use async_trait::async_trait;
//! # struct EmptyStore;
//! # #[async_trait]
//! # impl LinkStore for EmptyStore {
//! #     async fn find_by_code(&self, _: &ShortCode) -> Result<Option<LinkRecord>, StorageError> { Ok(None) }
//! #     async fn find_by_target(&self, _: &str) -> Result<Option<LinkRecord>, StorageError> { Ok(None) }
//! #     async fn insert(&self, _: LinkRecord) -> Result<(), StorageError> { Ok(()) }
//! #     async fn increment_visit(&self, _: &ShortCode, _: jiff::Timestamp) -> Result<(), StorageError> { Ok(()) }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(ScoredCache::new(10_000));
//! let service = RedirectorService::new(EmptyStore, cache);
//!
//! match service.resolve(&ShortCode::new("abc123")?).await? {
//!     Resolution::Redirect { target } => println!("Redirect to: {target}"),
//!     Resolution::NotFound => println!("no such code"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`ScoredCache`]: redishort_cache::ScoredCache
//! [`LinkStore`]: redishort_core::LinkStore

pub mod error;
pub mod redirector;
pub mod service;

pub use error::{RedirectorError, Result};
pub use redirector::{Redirector, Resolution};
pub use service::{RedirectorService, ResolverConfig};
