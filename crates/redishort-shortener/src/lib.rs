//! URL shortening: validation, dedupe by target, code generation and
//! creation of the persisted record.

pub mod error;
pub mod service;
pub mod shortener;

pub use error::ShortenerError;
pub use service::{ShortenerConfig, ShortenerService};
pub use shortener::{ShortenOutcome, Shortener};
