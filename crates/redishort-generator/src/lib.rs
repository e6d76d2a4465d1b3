//! Short code generation.
//!
//! Generators are pure: they never consult the store, so uniqueness of what
//! they produce is advisory. Collisions are detected when the record is
//! inserted.

pub mod base62;

pub use base62::{Base62Generator, Disambiguator, GeneratorSettings};

use redishort_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations can vary from time-based encoders to distributed ID
/// generators; none of them is required to guarantee global uniqueness.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Generates a value that converts into a (likely unique) short code.
    fn generate(&self) -> Self::Output;
}
