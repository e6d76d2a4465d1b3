use crate::error::ShortenerError;
use async_trait::async_trait;
use redishort_core::ShortCode;

/// What a shortening request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortenOutcome {
    /// A new record was created under this code.
    Created(ShortCode),
    /// The URL had been shortened before; this is its existing code.
    Existing(ShortCode),
    /// The URL is no longer than a short link would be, so it was not shortened.
    AlreadyShort,
}

impl ShortenOutcome {
    pub fn code(&self) -> Option<&ShortCode> {
        match self {
            ShortenOutcome::Created(code) | ShortenOutcome::Existing(code) => Some(code),
            ShortenOutcome::AlreadyShort => None,
        }
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens `url`, reusing the existing code if it was shortened before.
    async fn shorten(&self, url: &str) -> Result<ShortenOutcome, ShortenerError>;
}
