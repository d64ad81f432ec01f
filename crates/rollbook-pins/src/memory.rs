//! In-memory [`PinStore`] for tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rollbook_models::{IssuedPin, NewPin, PinId, PinType};

use crate::error::StoreError;
use crate::store::PinStore;

#[derive(Debug, Default)]
struct Inner {
    pins: Vec<IssuedPin>,
    exists_calls: usize,
    insert_calls: usize,
    inserted: usize,
    fail_after: Option<usize>,
    racing_codes: HashSet<String>,
}

/// Mutex-guarded store that records calls and can inject failures.
#[derive(Debug, Default)]
pub struct MemoryPinStore {
    inner: Mutex<Inner>,
}

impl MemoryPinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose history already holds `codes` (as consumed PINs).
    pub fn with_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for code in codes {
                let mut pin = NewPin {
                    code: code.into(),
                    category: PinType::Student,
                    school_id: None,
                    issued_at: Utc::now(),
                    expires_at: None,
                }
                .into_issued(PinId::new());
                pin.consumed = true;
                inner.pins.push(pin);
            }
        }
        store
    }

    /// Every insert after the first `n` successful ones fails with a backend error.
    pub fn fail_after(self, n: usize) -> Self {
        self.lock().fail_after = Some(n);
        self
    }

    /// Simulates a concurrent writer taking `code` between the existence
    /// check and the insert.
    pub fn race_on(self, code: impl Into<String>) -> Self {
        self.lock().racing_codes.insert(code.into());
        self
    }

    pub fn pins(&self) -> Vec<IssuedPin> {
        self.lock().pins.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn exists_calls(&self) -> usize {
        self.lock().exists_calls
    }

    pub fn insert_calls(&self) -> usize {
        self.lock().insert_calls
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PinStore for MemoryPinStore {
    async fn exists(&self, code: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        inner.exists_calls += 1;
        Ok(inner.pins.iter().any(|p| p.code == code))
    }

    async fn insert(&self, pin: &NewPin) -> Result<IssuedPin, StoreError> {
        let mut inner = self.lock();
        inner.insert_calls += 1;

        if inner.racing_codes.remove(&pin.code) {
            let foreign = pin.clone().into_issued(PinId::new());
            inner.pins.push(foreign);
            return Err(StoreError::Conflict);
        }

        if inner.pins.iter().any(|p| p.code == pin.code) {
            return Err(StoreError::Conflict);
        }

        let inserted = inner.inserted;
        if inner.fail_after.is_some_and(|n| inserted >= n) {
            return Err(StoreError::Backend(anyhow::anyhow!("storage unavailable")));
        }

        let issued = pin.clone().into_issued(PinId::new());
        inner.pins.push(issued.clone());
        inner.inserted += 1;
        Ok(issued)
    }
}
