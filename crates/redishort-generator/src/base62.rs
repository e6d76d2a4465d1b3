use crate::Generator;
use redishort_core::{Clock, ShortCode, SystemClock};
use std::sync::atomic::{AtomicU8, Ordering};
use typed_builder::TypedBuilder;

/// The 62 characters a code is written with, in digit order.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const BASE: u64 = ALPHABET.len() as u64;

/// How the trailing digit that separates same-millisecond codes is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Disambiguator {
    /// A process-local counter, incremented modulo 62 on every call.
    ///
    /// Up to 62 calls within one millisecond get distinct codes; offers no
    /// protection across processes.
    #[default]
    Counter,
    /// A uniformly random alphabet index.
    Random,
}

/// Configures a [`Base62Generator`].
#[derive(Debug, Clone, Copy, Default, TypedBuilder)]
pub struct GeneratorSettings {
    #[builder(default)]
    pub disambiguator: Disambiguator,
    /// Starting value of the counter disambiguator, taken modulo 62.
    #[builder(default)]
    pub counter_offset: u8,
}

/// Encodes `value` in base 62, least significant digit first.
///
/// Zero encodes to the empty string.
pub fn encode_lsb_first(mut value: u64) -> String {
    let mut out = String::with_capacity(11);
    while value > 0 {
        out.push(ALPHABET[(value % BASE) as usize] as char);
        value /= BASE;
    }
    out
}

/// Produces codes from the current time in milliseconds plus one
/// disambiguating digit.
///
/// For present-day timestamps this yields 7 time digits and 1 disambiguator,
/// 8 characters in total.
pub struct Base62Generator<C: Clock = SystemClock> {
    clock: C,
    disambiguator: Disambiguator,
    counter: AtomicU8,
}

impl Base62Generator<SystemClock> {
    /// Creates a generator backed by the real system clock.
    pub fn new(settings: GeneratorSettings) -> Self {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> Base62Generator<C> {
    pub fn with_clock(settings: GeneratorSettings, clock: C) -> Self {
        Self {
            clock,
            disambiguator: settings.disambiguator,
            counter: AtomicU8::new(settings.counter_offset % BASE as u8),
        }
    }

    pub fn disambiguator(&self) -> Disambiguator {
        self.disambiguator
    }

    fn next_digit(&self) -> u8 {
        match self.disambiguator {
            Disambiguator::Counter => self
                .counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    Some((n + 1) % BASE as u8)
                })
                .unwrap_or_else(|n| n),
            Disambiguator::Random => rand::random_range(0..BASE as u8),
        }
    }
}

impl<C: Clock> Generator for Base62Generator<C> {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        // pre-epoch clocks encode as zero
        let millis = u64::try_from(self.clock.now().as_millisecond()).unwrap_or(0);
        let mut code = encode_lsb_first(millis);
        code.push(ALPHABET[self.next_digit() as usize] as char);
        ShortCode::new_unchecked(code)
    }
}

impl<C: Clock> std::fmt::Debug for Base62Generator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Base62Generator")
            .field("disambiguator", &self.disambiguator)
            .field("counter", &self.counter.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
