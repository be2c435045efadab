//! Idempotent payment creation.
//!
//! A client sends an `Idempotency-Key` with each write. The first request
//! for a key computes and stores its result; every later request with the
//! same key gets that stored result back verbatim, whatever its payload.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Header name as reported in validation errors.
const KEY_HEADER: &str = "Idempotency-Key";

/// Stores one result per idempotency key for the life of the process.
#[derive(Debug)]
pub struct IdempotencyStore<T> {
    results: Mutex<HashMap<String, T>>,
}

impl<T> Default for IdempotencyStore<T> {
    fn default() -> Self {
        Self {
            results: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> IdempotencyStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn results(&self) -> MutexGuard<'_, HashMap<String, T>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the result stored under `key`, or computes one with `create`,
    /// stores it and returns it.
    ///
    /// A missing or blank key fails before the store is consulted. The
    /// lookup and the insert happen under one lock, so concurrent calls with
    /// the same key observe a single result. `create` runs with the lock
    /// held and must not block.
    pub fn get_or_create<F>(&self, key: Option<&str>, create: F) -> ApiResult<T>
    where
        F: FnOnce(&str) -> T,
    {
        let key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ApiError::MissingHeader(KEY_HEADER))?;

        let mut results = self.results();
        if let Some(stored) = results.get(key) {
            debug!(key, "replaying stored result");
            return Ok(stored.clone());
        }
        let fresh = create(key);
        results.insert(key.to_owned(), fresh.clone());
        Ok(fresh)
    }

    /// Snapshot of every stored result, ordered by key.
    pub fn all(&self) -> BTreeMap<String, T> {
        self.results()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.results().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every stored result and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut results = self.results();
        let count = results.len();
        results.clear();
        count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_id: String,
    pub amount: f64,
    pub status: String,
    /// RFC 3339, millisecond precision.
    pub timestamp: String,
    pub idempotency_key: String,
}

/// Body of `POST /payments`. A missing amount is recorded as zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPayment {
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Creates payments at most once per idempotency key.
#[derive(Debug, Default)]
pub struct PaymentService {
    store: IdempotencyStore<Payment>,
}

impl PaymentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, key: Option<&str>, input: NewPayment) -> ApiResult<Payment> {
        self.store.get_or_create(key, |key| {
            let payment = Payment {
                payment_id: Uuid::new_v4().simple().to_string(),
                amount: input.amount.unwrap_or(0.0),
                status: "success".to_owned(),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                idempotency_key: key.to_owned(),
            };
            info!(payment_id = %payment.payment_id, key, "created payment");
            payment
        })
    }

    pub fn all(&self) -> BTreeMap<String, Payment> {
        self.store.all()
    }

    pub fn clear(&self) -> usize {
        let count = self.store.clear();
        info!(count, "cleared stored payments");
        count
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn pay(amount: f64) -> NewPayment {
        NewPayment {
            amount: Some(amount),
        }
    }

    #[test]
    fn missing_key_never_touches_store() {
        let store: IdempotencyStore<u32> = IdempotencyStore::new();
        let calls = AtomicUsize::new(0);

        for key in [None, Some(""), Some("   ")] {
            let err = store
                .get_or_create(key, |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    1
                })
                .unwrap_err();
            assert!(matches!(err, ApiError::MissingHeader("Idempotency-Key")));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn same_key_replays_first_result() {
        let service = PaymentService::new();
        let first = service.create(Some("abc"), pay(100.0)).unwrap();
        let second = service.create(Some("abc"), pay(999.0)).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.amount, 100.0);
        assert_eq!(second.status, "success");
        assert_eq!(second.idempotency_key, "abc");
    }

    #[test]
    fn different_keys_get_different_payments() {
        let service = PaymentService::new();
        let a = service.create(Some("a"), pay(1.0)).unwrap();
        let b = service.create(Some("b"), pay(1.0)).unwrap();
        assert_ne!(a.payment_id, b.payment_id);
        assert_eq!(service.all().len(), 2);
    }

    #[test]
    fn missing_amount_defaults_to_zero() {
        let service = PaymentService::new();
        let payment = service.create(Some("k"), NewPayment::default()).unwrap();
        assert_eq!(payment.amount, 0.0);
    }

    #[test]
    fn clear_reports_count() {
        let service = PaymentService::new();
        service.create(Some("a"), pay(1.0)).unwrap();
        service.create(Some("b"), pay(2.0)).unwrap();

        assert_eq!(service.clear(), 2);
        assert_eq!(service.clear(), 0);
        assert!(service.all().is_empty());
    }

    #[test]
    fn payment_serializes_camel_case() {
        let service = PaymentService::new();
        let json = serde_json::to_value(service.create(Some("k"), pay(5.0)).unwrap()).unwrap();
        assert!(json.get("paymentId").is_some());
        assert_eq!(json["idempotencyKey"], "k");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_yield_one_result() {
        let service = Arc::new(PaymentService::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.create(Some("race"), pay(f64::from(i))).unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().payment_id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(service.all().len(), 1);
    }
}
