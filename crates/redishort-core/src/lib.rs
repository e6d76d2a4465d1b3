//! Core types and traits for the redishort URL shortener.
//!
//! This crate provides the vocabulary shared by the cache, the resolver,
//! the shortener and the storage backends: validated short codes, the
//! persisted link record, the link store capability and the clock
//! abstraction used for every timestamp that feeds into scoring.

pub mod clock;
pub mod error;
pub mod record;
pub mod shortcode;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, StorageError};
pub use record::LinkRecord;
pub use shortcode::ShortCode;
pub use store::LinkStore;
