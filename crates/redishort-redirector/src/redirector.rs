use crate::Result;
use async_trait::async_trait;
use redishort_core::ShortCode;

/// Outcome of resolving a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The code is known; send the client to `target`.
    Redirect { target: String },
    /// Neither the cache nor the store knows the code.
    NotFound,
}

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a short code to its redirect target.
    ///
    /// The code is expected to have been shape-checked by the caller.
    async fn resolve(&self, code: &ShortCode) -> Result<Resolution>;
}
