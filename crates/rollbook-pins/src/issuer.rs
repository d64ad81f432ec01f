//! Batch PIN issuance.
//!
//! Each PIN is drawn, checked against the full code history and inserted on
//! its own. A candidate that already exists, or that loses an insert race to
//! a concurrent issuer, is discarded and a fresh one drawn, up to
//! `max_attempts` times per PIN.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rollbook_config::PinConfig;
use rollbook_models::{IssuedPin, NewPin, PinType, SchoolId};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{PinError, StoreError};
use crate::generator::{CodeGenerator, RandomCodeGenerator};
use crate::store::PinStore;

pub struct PinIssuer<S, G = RandomCodeGenerator> {
    store: S,
    generator: G,
    config: PinConfig,
}

impl<S, G> PinIssuer<S, G>
where
    S: PinStore,
    G: CodeGenerator,
{
    pub fn new(store: S, generator: G, config: PinConfig) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Issues `count` PINs of `category` for `school_id`.
    ///
    /// # Errors
    ///
    /// Validation errors are returned before any storage call. Storage and
    /// retry failures report how many PINs of this call were already
    /// committed; those stay valid.
    pub async fn issue(
        &self,
        category: &str,
        count: i64,
        school_id: Option<SchoolId>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<IssuedPin>, PinError> {
        self.issue_at(category, count, school_id, expires_at, Utc::now())
            .await
    }

    /// [`issue`](Self::issue) with an explicit issuance instant.
    #[instrument(skip(self, now), fields(pin.category = %category, pin.count = count))]
    pub async fn issue_at(
        &self,
        category: &str,
        count: i64,
        school_id: Option<SchoolId>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<IssuedPin>, PinError> {
        let category = category.parse::<PinType>().inspect_err(|e| {
            warn!(error = %e, "Rejected PIN request with unknown category");
        })?;

        if count < 1 || count > self.config.max_batch {
            warn!(count, max = self.config.max_batch, "Rejected PIN request with invalid count");
            return Err(PinError::InvalidCount {
                requested: count,
                max: self.config.max_batch,
            });
        }

        let expires_at = match expires_at {
            Some(at) if at <= now => {
                warn!(expires_at = %at, "Rejected PIN request with expiry in the past");
                return Err(PinError::InvalidExpiry);
            }
            Some(at) => at,
            None => Duration::try_days(self.config.validity_days)
                .and_then(|validity| now.checked_add_signed(validity))
                .ok_or_else(|| {
                    error!(days = self.config.validity_days, "PIN validity overflows the calendar");
                    PinError::ValidityOutOfRange {
                        days: self.config.validity_days,
                    }
                })?,
        };

        let requested = count as usize;
        let mut issued = Vec::with_capacity(requested);

        for _ in 0..requested {
            match self
                .issue_one(category, school_id, now, expires_at, issued.len(), requested)
                .await
            {
                Ok(pin) => issued.push(pin),
                Err(e) => {
                    // Committed PINs stay valid and count as issued.
                    if !issued.is_empty() {
                        counter!("pins_issued_total", "category" => category.as_str())
                            .increment(issued.len() as u64);
                    }
                    return Err(e);
                }
            }
        }

        counter!("pins_issued_total", "category" => category.as_str()).increment(issued.len() as u64);
        info!(issued = issued.len(), "PINs issued");

        Ok(issued)
    }

    async fn issue_one(
        &self,
        category: PinType,
        school_id: Option<SchoolId>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        issued: usize,
        requested: usize,
    ) -> Result<IssuedPin, PinError> {
        let persistence_failure = |source: anyhow::Error| {
            error!(error = %source, issued, requested, "Failed to persist PIN");
            PinError::PersistenceFailure {
                issued,
                requested,
                source,
            }
        };

        for attempt in 1..=self.config.max_attempts {
            let code = self.generator.generate(self.config.code_length);

            match self.store.exists(&code).await {
                Ok(false) => {}
                Ok(true) => {
                    counter!("pin_collisions_total").increment(1);
                    debug!(attempt, "Candidate code already issued, retrying");
                    continue;
                }
                Err(StoreError::Conflict) => continue,
                Err(StoreError::Backend(e)) => return Err(persistence_failure(e)),
            }

            let new_pin = NewPin {
                code,
                category,
                school_id,
                issued_at,
                expires_at: Some(expires_at),
            };

            match self.store.insert(&new_pin).await {
                Ok(pin) => return Ok(pin),
                Err(StoreError::Conflict) => {
                    counter!("pin_collisions_total").increment(1);
                    debug!(attempt, "Candidate code taken concurrently, retrying");
                }
                Err(StoreError::Backend(e)) => return Err(persistence_failure(e)),
            }
        }

        error!(
            attempts = self.config.max_attempts,
            issued, "Gave up drawing an unused PIN code"
        );
        Err(PinError::ExhaustedRetries {
            attempts: self.config.max_attempts,
            issued,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::is_well_formed;
    use crate::memory::MemoryPinStore;
    use std::collections::{HashSet, VecDeque};
    use metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Hands out the scripted codes in order, then random ones.
    struct Scripted {
        codes: Mutex<VecDeque<String>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(codes: &[&str]) -> Self {
            Self {
                codes: Mutex::new(codes.iter().map(|c| c.to_string()).collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CodeGenerator for Scripted {
        fn generate(&self, length: usize) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.codes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| RandomCodeGenerator.generate(length))
        }
    }

    fn issuer(store: MemoryPinStore) -> PinIssuer<MemoryPinStore> {
        PinIssuer::new(store, RandomCodeGenerator, PinConfig::default())
    }

    #[tokio::test]
    async fn test_three_teacher_pins_on_empty_store() {
        let issuer = issuer(MemoryPinStore::new());
        let now = Utc::now();

        let pins = issuer.issue_at("teacher", 3, None, None, now).await.unwrap();

        assert_eq!(pins.len(), 3);
        let codes: HashSet<_> = pins.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes.len(), 3);
        for pin in &pins {
            assert!(is_well_formed(&pin.code, 10), "bad code {}", pin.code);
            assert_eq!(pin.category, PinType::Teacher);
            assert!(!pin.consumed);
            assert!(pin.redeemed_by.is_none());
            assert_eq!(pin.issued_at, now);
            assert_eq!(pin.expires_at, Some(now + Duration::days(30)));
        }
        assert_eq!(issuer.store().len(), 3);
    }

    #[tokio::test]
    async fn test_codes_unique_across_calls_and_categories() {
        let issuer = issuer(MemoryPinStore::new());

        let teachers = issuer.issue("teacher", 60, None, None).await.unwrap();
        let students = issuer.issue("Student", 60, None, None).await.unwrap();

        let codes: HashSet<_> = teachers
            .iter()
            .chain(students.iter())
            .map(|p| p.code.clone())
            .collect();
        assert_eq!(codes.len(), 120);
        assert!(students.iter().all(|p| p.category == PinType::Student));
    }

    #[tokio::test]
    async fn test_batch_shares_category_and_school() {
        let issuer = issuer(MemoryPinStore::new());
        let school = SchoolId::new();

        let pins = issuer
            .issue("student", 7, Some(school), None)
            .await
            .unwrap();

        assert_eq!(pins.len(), 7);
        assert!(pins.iter().all(|p| p.school_id == Some(school)));
        assert!(pins.iter().all(|p| p.category == PinType::Student));
    }

    #[tokio::test]
    async fn test_unknown_category_touches_nothing() {
        let issuer = issuer(MemoryPinStore::new());

        let err = issuer.issue("parent", 3, None, None).await.unwrap_err();

        assert!(matches!(err, PinError::InvalidCategory(_)));
        assert_eq!(issuer.store().exists_calls(), 0);
        assert_eq!(issuer.store().insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_counts() {
        let issuer = issuer(MemoryPinStore::new());

        for count in [0, -1, 501] {
            let err = issuer.issue("teacher", count, None, None).await.unwrap_err();
            assert!(
                matches!(err, PinError::InvalidCount { requested, max: 500 } if requested == count)
            );
        }
        assert!(issuer.store().is_empty());
        assert_eq!(issuer.store().insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_expiry_override() {
        let issuer = issuer(MemoryPinStore::new());
        let now = Utc::now();

        let err = issuer
            .issue_at("teacher", 1, None, Some(now), now)
            .await
            .unwrap_err();
        assert!(matches!(err, PinError::InvalidExpiry));
        assert_eq!(issuer.store().insert_calls(), 0);

        let at = now + Duration::days(3);
        let pins = issuer
            .issue_at("teacher", 1, None, Some(at), now)
            .await
            .unwrap();
        assert_eq!(pins[0].expires_at, Some(at));
    }

    #[tokio::test]
    async fn test_validity_days_from_config() {
        let config = PinConfig {
            validity_days: 7,
            code_length: 16,
            ..PinConfig::default()
        };
        let issuer = PinIssuer::new(MemoryPinStore::new(), RandomCodeGenerator, config);
        let now = Utc::now();

        let pins = issuer.issue_at("student", 1, None, None, now).await.unwrap();

        assert_eq!(pins[0].expires_at, Some(now + Duration::days(7)));
        assert_eq!(pins[0].code.len(), 16);
    }

    #[tokio::test]
    async fn test_unrepresentable_validity_is_an_error() {
        let config = PinConfig {
            validity_days: i64::MAX,
            ..PinConfig::default()
        };
        let issuer = PinIssuer::new(MemoryPinStore::new(), RandomCodeGenerator, config);

        let err = issuer.issue("teacher", 1, None, None).await.unwrap_err();

        assert!(matches!(err, PinError::ValidityOutOfRange { days: i64::MAX }));
        assert_eq!(err.status(), rollbook_core::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(issuer.store().exists_calls(), 0);
    }

    #[tokio::test]
    async fn test_capped_validity_from_env_issues() {
        let config = PinConfig::from_lookup(|key| {
            (key == "PIN_VALIDITY_DAYS").then(|| "100000000".to_string())
        });
        let issuer = PinIssuer::new(MemoryPinStore::new(), RandomCodeGenerator, config);
        let now = Utc::now();

        let pins = issuer.issue_at("teacher", 1, None, None, now).await.unwrap();

        assert_eq!(pins[0].expires_at, Some(now + Duration::days(3650)));
    }

    #[tokio::test]
    async fn test_existing_code_is_skipped() {
        let store = MemoryPinStore::with_codes(["AAAAAAAAAA"]);
        let generator = Scripted::new(&["AAAAAAAAAA", "BBBBBBBBBB"]);
        let issuer = PinIssuer::new(store, generator, PinConfig::default());

        let pins = issuer.issue("teacher", 1, None, None).await.unwrap();

        assert_eq!(pins[0].code, "BBBBBBBBBB");
        assert_eq!(issuer.generator().calls(), 2);
        assert_eq!(issuer.store().insert_calls(), 1);
    }

    #[tokio::test]
    async fn test_insert_conflict_is_retried() {
        let store = MemoryPinStore::new().race_on("CCCCCCCCCC");
        let generator = Scripted::new(&["CCCCCCCCCC", "DDDDDDDDDD"]);
        let issuer = PinIssuer::new(store, generator, PinConfig::default());

        let pins = issuer.issue("student", 1, None, None).await.unwrap();

        assert_eq!(pins[0].code, "DDDDDDDDDD");
        assert_eq!(issuer.store().insert_calls(), 2);
        // The racing writer's row and ours
        assert_eq!(issuer.store().len(), 2);
    }

    #[tokio::test]
    async fn test_same_batch_never_repeats_a_code() {
        let generator = Scripted::new(&["EEEEEEEEEE", "EEEEEEEEEE", "FFFFFFFFFF"]);
        let issuer = PinIssuer::new(MemoryPinStore::new(), generator, PinConfig::default());

        let pins = issuer.issue("teacher", 2, None, None).await.unwrap();

        assert_eq!(pins[0].code, "EEEEEEEEEE");
        assert_eq!(pins[1].code, "FFFFFFFFFF");
    }

    #[tokio::test]
    async fn test_retry_ceiling() {
        let config = PinConfig {
            max_attempts: 5,
            ..PinConfig::default()
        };
        let fixed = |_: usize| "AAAAAAAAAA".to_string();
        let issuer = PinIssuer::new(MemoryPinStore::with_codes(["AAAAAAAAAA"]), fixed, config);

        let err = issuer.issue("teacher", 2, None, None).await.unwrap_err();

        assert!(matches!(
            err,
            PinError::ExhaustedRetries {
                attempts: 5,
                issued: 0
            }
        ));
        assert_eq!(issuer.store().exists_calls(), 5);
        assert_eq!(issuer.store().insert_calls(), 0);
    }

    /// Captures `pins_issued_total` increments; every other metric is dropped.
    struct IssuedCounter(Arc<AtomicU64>);

    impl Recorder for IssuedCounter {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            if key.name() == "pins_issued_total" {
                Counter::from_arc(self.0.clone())
            } else {
                Counter::noop()
            }
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_exhausted_batch_counts_committed_pins() {
        let issued = Arc::new(AtomicU64::new(0));
        let recorder = IssuedCounter(issued.clone());

        let draws = AtomicUsize::new(0);
        let generator = move |_: usize| {
            if draws.fetch_add(1, Ordering::SeqCst) == 0 {
                "BBBBBBBBBB".to_string()
            } else {
                "AAAAAAAAAA".to_string()
            }
        };
        let config = PinConfig {
            max_attempts: 3,
            ..PinConfig::default()
        };
        let issuer = PinIssuer::new(MemoryPinStore::with_codes(["AAAAAAAAAA"]), generator, config);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let err = metrics::with_local_recorder(&recorder, || {
            runtime.block_on(issuer.issue("student", 2, None, None))
        })
        .unwrap_err();

        assert!(matches!(
            err,
            PinError::ExhaustedRetries {
                attempts: 3,
                issued: 1
            }
        ));
        assert_eq!(issued.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_batch_counts_committed_pins() {
        let issued = Arc::new(AtomicU64::new(0));
        let recorder = IssuedCounter(issued.clone());
        let issuer = issuer(MemoryPinStore::new().fail_after(2));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let err = metrics::with_local_recorder(&recorder, || {
            runtime.block_on(issuer.issue("teacher", 5, None, None))
        })
        .unwrap_err();

        assert_eq!(err.issued(), 2);
        assert_eq!(issued.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_partial_batch_is_kept_and_reported() {
        let issuer = issuer(MemoryPinStore::new().fail_after(2));

        let err = issuer.issue("teacher", 5, None, None).await.unwrap_err();

        match err {
            PinError::PersistenceFailure {
                issued, requested, ..
            } => {
                assert_eq!(issued, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let kept = issuer.store().pins();
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|p| !p.consumed));
    }
}
