use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use exercise_images::cache::CacheStore;
use exercise_images::errors::TransportError;
use exercise_images::models::{ExpiryPolicy, ImageLocation};
use exercise_images::resolvers::{CatalogSearchResolver, ImageResolver};
use exercise_images::storage::MemoryPersistence;
use exercise_images::transport::{CatalogApi, CatalogExercise, CatalogImage};
use exercise_images::utils::Clock;

struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc::now()),
        })
    }

    fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Scripted catalog with call counters
struct FakeCatalog {
    search_error: AtomicBool,
    has_match: AtomicBool,
    primary_image: Mutex<Option<String>>,
    any_image: Mutex<Option<String>>,
    search_terms: Mutex<Vec<String>>,
    search_calls: AtomicUsize,
    image_calls: AtomicUsize,
}

impl FakeCatalog {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            search_error: AtomicBool::new(false),
            has_match: AtomicBool::new(true),
            primary_image: Mutex::new(Some("https://catalog.example/media/1.png".to_string())),
            any_image: Mutex::new(None),
            search_terms: Mutex::new(Vec::new()),
            search_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
        })
    }

    fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    fn last_search_term(&self) -> Option<String> {
        self.search_terms.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn search_exercises(&self, term: &str) -> Result<Vec<CatalogExercise>, TransportError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_terms.lock().unwrap().push(term.to_string());

        if self.search_error.load(Ordering::SeqCst) {
            return Err(TransportError::status(503, "https://catalog.example/exercise/"));
        }
        if !self.has_match.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        Ok(vec![CatalogExercise {
            exercise_base: 42,
            name: Some("Squat".to_string()),
        }])
    }

    async fn exercise_images(
        &self,
        _exercise_base: i64,
        main_only: bool,
    ) -> Result<Vec<CatalogImage>, TransportError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        let source = if main_only {
            &self.primary_image
        } else {
            &self.any_image
        };
        Ok(source
            .lock()
            .unwrap()
            .iter()
            .map(|url| CatalogImage {
                image: url.clone(),
                is_main: main_only,
            })
            .collect())
    }
}

struct Harness {
    resolver: CatalogSearchResolver,
    catalog: Arc<FakeCatalog>,
    clock: Arc<FixedClock>,
    persistence: Arc<MemoryPersistence>,
}

async fn harness() -> Harness {
    let persistence = MemoryPersistence::new();
    let clock = FixedClock::new();
    let cache = CacheStore::load(
        persistence.clone(),
        ExpiryPolicy::catalog_default(),
        clock.clone(),
    )
    .await;
    let catalog = FakeCatalog::new();
    let resolver = CatalogSearchResolver::new(cache, catalog.clone());

    Harness {
        resolver,
        catalog,
        clock,
        persistence,
    }
}

#[tokio::test]
async fn primary_image_is_cached_as_a_remote_url() {
    let h = harness().await;

    let location = h.resolver.resolve("squat").await;
    assert_eq!(
        location,
        Some(ImageLocation::Remote(
            "https://catalog.example/media/1.png".to_string()
        ))
    );
    assert_eq!(h.catalog.search_calls(), 1);
    assert_eq!(h.catalog.image_calls(), 1);

    // idempotent: second call is served from cache, zero remote work
    let again = h.resolver.resolve("squat").await;
    assert_eq!(again, location);
    assert_eq!(h.catalog.search_calls(), 1);
    assert_eq!(h.catalog.image_calls(), 1);
}

#[tokio::test]
async fn curated_and_fallback_search_phrases_are_used() {
    let h = harness().await;

    h.resolver.resolve("machine-chest-press").await;
    assert_eq!(
        h.catalog.last_search_term().as_deref(),
        Some("chest press machine")
    );

    h.resolver.resolve("bulgarian-split-squat").await;
    assert_eq!(
        h.catalog.last_search_term().as_deref(),
        Some("bulgarian split squat")
    );
}

#[tokio::test]
async fn zero_results_are_negative_cached_for_the_ttl_window() {
    let h = harness().await;
    h.catalog.has_match.store(false, Ordering::SeqCst);

    assert_eq!(h.resolver.resolve("obscure-movement").await, None);
    assert_eq!(h.persistence.save_count(), 1);

    // not re-queried inside the window, even a day short of expiry
    h.clock.advance(Duration::days(6));
    assert_eq!(h.resolver.resolve("obscure-movement").await, None);
    assert_eq!(h.catalog.search_calls(), 1);
}

#[tokio::test]
async fn entries_older_than_the_ttl_are_re_queried() {
    let h = harness().await;

    h.resolver.resolve("squat").await;
    assert_eq!(h.catalog.search_calls(), 1);

    h.clock.advance(Duration::days(8));
    h.resolver.resolve("squat").await;
    assert_eq!(h.catalog.search_calls(), 2);
}

#[tokio::test]
async fn transport_failure_is_served_uncached_so_the_next_call_retries() {
    let h = harness().await;
    h.catalog.search_error.store(true, Ordering::SeqCst);

    assert_eq!(h.resolver.resolve("squat").await, None);
    // deliberately no negative cache for transport failures
    assert_eq!(h.persistence.save_count(), 0);

    h.catalog.search_error.store(false, Ordering::SeqCst);
    let recovered = h.resolver.resolve("squat").await;
    assert!(matches!(recovered, Some(ImageLocation::Remote(_))));
    assert_eq!(h.catalog.search_calls(), 2);
}

#[tokio::test]
async fn falls_back_to_any_image_when_no_primary_exists() {
    let h = harness().await;
    *h.catalog.primary_image.lock().unwrap() = None;
    *h.catalog.any_image.lock().unwrap() =
        Some("https://catalog.example/media/7.png".to_string());

    let location = h.resolver.resolve("squat").await;
    assert_eq!(
        location,
        Some(ImageLocation::Remote(
            "https://catalog.example/media/7.png".to_string()
        ))
    );
    assert_eq!(h.catalog.image_calls(), 2);
}

#[tokio::test]
async fn a_match_without_any_images_is_negative_cached() {
    let h = harness().await;
    *h.catalog.primary_image.lock().unwrap() = None;
    *h.catalog.any_image.lock().unwrap() = None;

    assert_eq!(h.resolver.resolve("squat").await, None);
    assert_eq!(h.persistence.save_count(), 1);

    // cached negative answer, no further remote work
    assert_eq!(h.resolver.resolve("squat").await, None);
    assert_eq!(h.catalog.search_calls(), 1);
    assert_eq!(h.catalog.image_calls(), 2);
}

#[tokio::test]
async fn refresh_drops_the_entry_and_re_queries() {
    let h = harness().await;

    h.resolver.resolve("squat").await;
    assert_eq!(h.catalog.search_calls(), 1);

    let refreshed = h.resolver.refresh("squat").await;
    assert!(matches!(refreshed, Some(ImageLocation::Remote(_))));
    assert_eq!(h.catalog.search_calls(), 2);
}
