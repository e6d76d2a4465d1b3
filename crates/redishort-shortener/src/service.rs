use crate::error::ShortenerError;
use crate::shortener::{ShortenOutcome, Shortener};
use async_trait::async_trait;
use redishort_core::{Clock, LinkRecord, LinkStore, ShortCode, SystemClock};
use redishort_generator::Generator;
use std::sync::Arc;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

/// Length of a code produced by the base-62 generator for present-day timestamps.
const GENERATED_CODE_LEN: usize = 8;

#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerConfig {
    /// Public base URL short links are served under, e.g. `https://redi.sh`.
    #[builder(setter(into))]
    pub public_base_url: String,
    /// Expected length of a generated code, used to decide whether a URL is
    /// already as short as its short link would be.
    #[builder(default = GENERATED_CODE_LEN)]
    pub code_len: usize,
}

impl ShortenerConfig {
    /// Length of a full short link: base URL, a slash and the code.
    fn short_link_len(&self) -> usize {
        self.public_base_url.trim_end_matches('/').len() + 1 + self.code_len
    }
}

/// A concrete implementation of the [`Shortener`] trait.
///
/// Note: the generator gives no uniqueness guarantee. A generated code that
/// is already taken surfaces as [`ShortenerError::CodeCollision`]; the
/// existing record is never overwritten and no retry is attempted.
#[derive(Debug)]
pub struct ShortenerService<S, G, C = SystemClock> {
    store: Arc<S>,
    generator: Arc<G>,
    clock: C,
    config: ShortenerConfig,
}

impl<S: LinkStore, G: Generator> ShortenerService<S, G, SystemClock> {
    pub fn new(store: S, generator: G, config: ShortenerConfig) -> Self {
        Self::with_clock(store, generator, SystemClock, config)
    }
}

impl<S: LinkStore, G: Generator, C: Clock> ShortenerService<S, G, C> {
    pub fn with_clock(store: S, generator: G, clock: C, config: ShortenerConfig) -> Self {
        Self {
            store: Arc::new(store),
            generator: Arc::new(generator),
            clock,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validates that the URL has a valid format (has a scheme and host).
    fn validate_url(url: &str) -> Result<(), ShortenerError> {
        if url.is_empty() {
            return Err(ShortenerError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }

        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {}",
                url
            )));
        };

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if scheme.is_empty() || host.is_empty() {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {}",
                url
            )));
        }

        let scheme = scheme.to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL scheme must be http or https: {}",
                scheme
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl<S: LinkStore, G: Generator, C: Clock> Shortener for ShortenerService<S, G, C> {
    async fn shorten(&self, url: &str) -> Result<ShortenOutcome, ShortenerError> {
        Self::validate_url(url)?;

        if url.len() <= self.config.short_link_len() {
            debug!(url, "url is already short");
            return Ok(ShortenOutcome::AlreadyShort);
        }

        if let Some(existing) = self.store.find_by_target(url).await? {
            debug!(code = %existing.code, url, "url was shortened before");
            return Ok(ShortenOutcome::Existing(existing.code));
        }

        let code: ShortCode = self.generator.generate().into();
        let record = LinkRecord::new(code.clone(), url, self.clock.now());

        match self.store.insert(record).await {
            Ok(()) => {
                info!(code = %code, url, "created short link");
                Ok(ShortenOutcome::Created(code))
            }
            Err(err) => {
                let err = ShortenerError::from(err);
                if let ShortenerError::CodeCollision(_) = err {
                    warn!(code = %code, url, "generated short code collided with an existing record");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::Timestamp;
    use redishort_core::ManualClock;
    use redishort_generator::{Base62Generator, GeneratorSettings};
    use redishort_storage::InMemoryLinkStore;

    const NOW_MS: i64 = 1_700_000_000_000;
    const LONG_URL: &str = "https://example.com/a/rather/long/path?with=query";

    type TestService = ShortenerService<InMemoryLinkStore, Base62Generator<ManualClock>, ManualClock>;

    fn test_service() -> TestService {
        let clock = ManualClock::at_millis(NOW_MS);
        let generator = Base62Generator::with_clock(GeneratorSettings::default(), clock.clone());
        let config = ShortenerConfig::builder()
            .public_base_url("https://redi.sh")
            .build();
        ShortenerService::with_clock(InMemoryLinkStore::new(), generator, clock, config)
    }

    /// Always hands out the same code.
    struct FixedGenerator(&'static str);

    impl Generator for FixedGenerator {
        type Output = ShortCode;

        fn generate(&self) -> ShortCode {
            ShortCode::new_unchecked(self.0)
        }
    }

    #[tokio::test]
    async fn shorten_creates_record() {
        let service = test_service();

        let outcome = service.shorten(LONG_URL).await.unwrap();

        let ShortenOutcome::Created(code) = outcome else {
            panic!("expected a new code, got {outcome:?}");
        };
        assert_eq!(code.as_str().len(), 8);

        let record = service.store().find_by_code(&code).await.unwrap().unwrap();
        assert_eq!(record.target, LONG_URL);
        assert_eq!(record.visit_count, 0);
        assert_eq!(record.created_at, Timestamp::from_millisecond(NOW_MS).unwrap());
        assert_eq!(record.last_visit_at, record.created_at);
    }

    #[tokio::test]
    async fn shortening_twice_returns_existing_code() {
        let service = test_service();

        let first = service.shorten(LONG_URL).await.unwrap();
        let second = service.shorten(LONG_URL).await.unwrap();

        assert!(matches!(first, ShortenOutcome::Created(_)));
        assert_eq!(second, ShortenOutcome::Existing(first.code().unwrap().clone()));
        assert_eq!(service.store().len(), 1);
    }

    #[tokio::test]
    async fn same_millisecond_requests_get_distinct_codes() {
        let service = test_service();

        let a = service.shorten("https://example.com/first/long/path").await.unwrap();
        let b = service.shorten("https://example.com/second/long/path").await.unwrap();

        assert_ne!(a.code(), b.code());
        assert_eq!(service.store().len(), 2);
    }

    #[tokio::test]
    async fn short_urls_are_not_shortened() {
        let service = test_service();

        // "https://redi.sh/" plus 8 characters is 24 characters
        let outcome = service.shorten("https://a.io/xyz").await.unwrap();
        assert_eq!(outcome, ShortenOutcome::AlreadyShort);
        assert!(outcome.code().is_none());
        assert!(service.store().is_empty());

        let boundary = "https://ab.example/12345";
        assert_eq!(boundary.len(), 24);
        assert_eq!(service.shorten(boundary).await.unwrap(), ShortenOutcome::AlreadyShort);
    }

    #[tokio::test]
    async fn invalid_urls_are_rejected() {
        let service = test_service();

        for url in ["", "not-a-valid-url", "ftp://example.com/some/long/path", "https:///nohost/long/path/here"] {
            let err = service.shorten(url).await.unwrap_err();
            assert!(matches!(err, ShortenerError::InvalidUrl(_)), "{url}");
        }
        assert!(service.store().is_empty());
    }

    #[tokio::test]
    async fn collision_is_surfaced_without_overwriting() {
        let store = InMemoryLinkStore::new();
        let taken = LinkRecord::new(
            ShortCode::new_unchecked("abcd1234"),
            "https://original.example/long/long/path",
            Timestamp::from_millisecond(NOW_MS).unwrap(),
        );
        store.insert(taken.clone()).await.unwrap();

        let config = ShortenerConfig::builder()
            .public_base_url("https://redi.sh")
            .build();
        let service = ShortenerService::new(store, FixedGenerator("abcd1234"), config);

        let err = service
            .shorten("https://intruder.example/another/long/path")
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::CodeCollision(ref code) if code == "abcd1234"));
        let kept = service
            .store()
            .find_by_code(&ShortCode::new_unchecked("abcd1234"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept, taken);
    }
}
