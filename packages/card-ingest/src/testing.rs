//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the ingestion library
//! without calling the real extraction service or waiting on real time.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::ExtractionFailure;
use crate::traits::{
    clock::Clock,
    extractor::{CardExtractor, Extracted},
};
use crate::types::card::CardInfo;

/// A mock extractor for testing.
///
/// Responses are keyed by the exact image bytes. Images without a
/// configured response come back as `Incomplete`, the same as a photo
/// with no readable card on it.
#[derive(Default)]
pub struct MockExtractor {
    /// Predefined responses by image bytes
    responses: Arc<RwLock<HashMap<Vec<u8>, Result<Extracted, ExtractionFailure>>>>,

    /// Simulated service latency
    latency: Option<(Arc<MockClock>, Duration)>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockExtractorCall>>>,
}

/// Record of a call made to the mock extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockExtractorCall {
    pub mime_type: String,
    pub byte_len: usize,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `card` for these bytes.
    pub fn with_card(self, image: impl AsRef<[u8]>, card: CardInfo) -> Self {
        self.respond(image, Ok(Extracted::Card(card)))
    }

    /// Answer without the named mandatory fields for these bytes.
    pub fn with_incomplete(
        self,
        image: impl AsRef<[u8]>,
        missing: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.respond(image, Ok(Extracted::incomplete(missing)))
    }

    /// Fail with `failure` for these bytes.
    pub fn with_failure(self, image: impl AsRef<[u8]>, failure: ExtractionFailure) -> Self {
        self.respond(image, Err(failure))
    }

    /// Advance `clock` by `latency` on every call.
    pub fn with_latency(mut self, clock: Arc<MockClock>, latency: Duration) -> Self {
        self.latency = Some((clock, latency));
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockExtractorCall> {
        self.calls.read().unwrap().clone()
    }

    fn respond(
        self,
        image: impl AsRef<[u8]>,
        response: Result<Extracted, ExtractionFailure>,
    ) -> Self {
        self.responses
            .write()
            .unwrap()
            .insert(image.as_ref().to_vec(), response);
        self
    }
}

#[async_trait]
impl CardExtractor for MockExtractor {
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Extracted, ExtractionFailure> {
        self.calls.write().unwrap().push(MockExtractorCall {
            mime_type: mime_type.to_string(),
            byte_len: image.len(),
        });

        if let Some((clock, latency)) = &self.latency {
            clock.advance(*latency);
        }

        self.responses
            .read()
            .unwrap()
            .get(image)
            .cloned()
            .unwrap_or_else(|| Ok(Extracted::incomplete(["rarity", "cardType", "cardId"])))
    }
}

/// A virtual clock for testing.
///
/// `sleep` returns immediately after moving time forward, and every
/// requested sleep is recorded.
pub struct MockClock {
    now: RwLock<DateTime<Utc>>,
    sleeps: RwLock<Vec<Duration>>,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// Start at 2024-01-01T00:00:00Z.
    pub fn new() -> Self {
        Self::starting_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
            sleeps: RwLock::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::milliseconds(by.as_millis() as i64);
        let mut now = self.now.write().unwrap();
        *now = *now + by;
    }

    /// Every duration passed to `sleep`, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.read().unwrap().clone()
    }
}

#[async_trait]
impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.write().unwrap().push(duration);
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::card::{CardType, Rarity};

    #[tokio::test]
    async fn test_mock_extractor_keyed_by_bytes() {
        let card = CardInfo::new(Rarity::N, CardType::Support, "IMT-01-069");
        let extractor = MockExtractor::new()
            .with_card(b"front", card.clone())
            .with_failure(b"bad", ExtractionFailure::QuotaExceeded);

        assert_eq!(
            extractor.extract(b"front", "image/jpeg").await,
            Ok(Extracted::Card(card))
        );
        assert_eq!(
            extractor.extract(b"bad", "image/png").await,
            Err(ExtractionFailure::QuotaExceeded)
        );
        assert!(matches!(
            extractor.extract(b"other", "image/png").await,
            Ok(Extracted::Incomplete { .. })
        ));

        let calls = extractor.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].mime_type, "image/jpeg");
        assert_eq!(calls[0].byte_len, 5);
    }

    #[tokio::test]
    async fn test_mock_clock_records_sleeps() {
        let clock = MockClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_millis(250)).await;
        clock.advance(Duration::from_secs(1));

        assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
        assert_eq!((clock.now() - start).num_milliseconds(), 1250);
    }

    #[tokio::test]
    async fn test_latency_advances_clock() {
        let clock = Arc::new(MockClock::new());
        let extractor = MockExtractor::new().with_latency(clock.clone(), Duration::from_secs(3));
        let start = clock.now();

        let _ = extractor.extract(b"x", "image/gif").await;

        assert_eq!((clock.now() - start).num_seconds(), 3);
        assert!(clock.sleeps().is_empty());
    }
}
