//! Round-robin, health-tracked fabric over a list of Ethereum JSON-RPC
//! endpoints. Grounded in `web3_utils.py`'s `ProviderManager`/
//! `ProviderState`/`TrackedWeb3` (see DESIGN.md); the mutable global state
//! of the source becomes an owned, mutex-protected record per spec.md §9.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use ethers::providers::{Http, Middleware, Provider};
use tracing::{info, warn};

use crate::error::ProviderError;
use crate::retry::{retry, Transience};

const RESPONSE_WINDOW: usize = 100;

/// Health metrics for a single RPC endpoint. Created once at startup and
/// never destroyed; updated atomically on every call attempt.
#[derive(Debug, Default)]
struct ProviderRecordInner {
    error_count: u64,
    success_count: u64,
    last_success_time: Option<DateTime<Utc>>,
    last_error_message: Option<String>,
    response_times_ms: VecDeque<f64>,
}

pub struct ProviderRecord {
    pub url: String,
    inner: Mutex<ProviderRecordInner>,
}

impl ProviderRecord {
    fn new(url: String) -> Self {
        Self { url, inner: Mutex::new(ProviderRecordInner::default()) }
    }

    fn mark_success(&self, response_time: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.success_count += 1;
        inner.last_success_time = Some(Utc::now());
        inner.last_error_message = None;
        if inner.response_times_ms.len() >= RESPONSE_WINDOW {
            inner.response_times_ms.pop_front();
        }
        inner.response_times_ms.push_back(response_time.as_secs_f64() * 1000.0);
    }

    fn mark_failure(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.error_count += 1;
        inner.last_error_message = Some(message.into());
    }

    fn error_count(&self) -> u64 {
        self.inner.lock().unwrap().error_count
    }

    pub fn stat(&self) -> ProviderStat {
        let inner = self.inner.lock().unwrap();
        let total = inner.success_count + inner.error_count;
        let success_rate = if total > 0 { inner.success_count as f64 / total as f64 * 100.0 } else { 0.0 };
        let avg_response_ms = if inner.response_times_ms.is_empty() {
            0.0
        } else {
            inner.response_times_ms.iter().sum::<f64>() / inner.response_times_ms.len() as f64
        };
        ProviderStat {
            url: self.url.clone(),
            success: inner.success_count,
            errors: inner.error_count,
            total,
            success_rate,
            avg_response_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderStat {
    pub url: String,
    pub success: u64,
    pub errors: u64,
    pub total: u64,
    pub success_rate: f64,
    pub avg_response_ms: f64,
}

/// A vended client together with the index into the pool so the caller can
/// report the outcome of the RPC call it makes.
#[derive(Clone)]
pub struct ProviderHandle {
    pub index: usize,
    pub client: Arc<Provider<Http>>,
}

pub struct ProviderPool {
    records: Vec<Arc<ProviderRecord>>,
    expected_chain_id: u64,
    last_index: AtomicI64,
    sticky: Mutex<Option<ProviderHandle>>,
}

impl ProviderPool {
    pub fn new(urls: Vec<String>, expected_chain_id: u64) -> Arc<Self> {
        let records = urls.into_iter().map(|u| Arc::new(ProviderRecord::new(u))).collect();
        Arc::new(Self {
            records,
            expected_chain_id,
            last_index: AtomicI64::new(-1),
            sticky: Mutex::new(None),
        })
    }

    /// Round-robin starting point, ascending error count as a tiebreaker,
    /// mirroring `ProviderManager._provider_order` in the original source.
    fn provider_order(&self) -> Vec<usize> {
        let n = self.records.len();
        if n == 0 {
            return Vec::new();
        }
        let last = self.last_index.load(Ordering::SeqCst);
        let start = ((last + 1).rem_euclid(n as i64)) as usize;
        let mut rotated: Vec<usize> = (0..n).map(|i| (start + i) % n).collect();
        let position: std::collections::HashMap<usize, usize> =
            rotated.iter().enumerate().map(|(pos, &idx)| (idx, pos)).collect();
        rotated.sort_by_key(|&idx| (self.records[idx].error_count(), position[&idx]));
        rotated
    }

    fn log_status(&self) {
        let summary = self
            .records
            .iter()
            .map(|r| {
                let inner = r.inner.lock().unwrap();
                format!(
                    "{} (errors={}, last_success={:?}, last_error={:?})",
                    r.url, inner.error_count, inner.last_success_time, inner.last_error_message
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        info!(providers = %summary, "provider status");
    }

    /// Vend a connected, chain-id-validated client. `base_timeout` grows
    /// with each attempt (`base_timeout * attempt_number`), matching the
    /// original source's escalating per-attempt timeout. Tries each
    /// provider in `provider_order()` exactly once via the shared `retry`
    /// combinator; every failure (bad URL, network error, wrong chain id)
    /// is transient from the pool's point of view, since the next attempt
    /// simply moves on to the next endpoint.
    pub async fn acquire(
        self: &Arc<Self>,
        base_timeout: Duration,
        force_new: bool,
        sticky: bool,
    ) -> Result<ProviderHandle, ProviderError> {
        if sticky && !force_new {
            if let Some(handle) = self.sticky.lock().unwrap().clone() {
                return Ok(handle);
            }
        }

        if self.records.is_empty() {
            return Err(ProviderError::NoProvidersConfigured);
        }

        let order = self.provider_order();
        let attempts = order.len();

        let outcome = retry(
            |attempt| {
                let idx = order[attempt];
                async move { self.try_provider(idx, base_timeout, attempt).await }
            },
            attempts,
            |_e: &()| Transience::Transient,
            |_attempt, _e: &()| {},
        )
        .await;

        self.log_status();
        match outcome {
            Ok(handle) => {
                if sticky {
                    *self.sticky.lock().unwrap() = Some(handle.clone());
                }
                Ok(handle)
            }
            Err(()) => Err(ProviderError::AllProvidersExhausted),
        }
    }

    /// Connects to a single provider by index, validating its chain id.
    /// Every failure just marks the record and returns `Err(())`; the
    /// caller's retry loop moves on to the next provider in the order.
    async fn try_provider(&self, idx: usize, base_timeout: Duration, attempt: usize) -> Result<ProviderHandle, ()> {
        let record = &self.records[idx];
        let timeout = base_timeout * (attempt as u32 + 1);
        info!(url = %record.url, timeout_secs = timeout.as_secs(), errors = record.error_count(), "connecting to provider");

        let parsed_url: url::Url = match record.url.parse() {
            Ok(u) => u,
            Err(e) => {
                record.mark_failure(format!("invalid provider url: {e}"));
                return Err(());
            }
        };
        let http_client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(c) => c,
            Err(e) => {
                record.mark_failure(e.to_string());
                return Err(());
            }
        };
        let provider = Provider::new(Http::new_with_client(parsed_url, http_client));

        let started = Instant::now();
        match provider.get_chainid().await {
            Ok(chain_id) => {
                let chain_id = chain_id.as_u64();
                if chain_id != self.expected_chain_id {
                    record.mark_failure(format!("wrong chain (reported {})", chain_id));
                    warn!(url = %record.url, reported = chain_id, expected = self.expected_chain_id, "provider on wrong chain, skipping");
                    return Err(());
                }
                record.mark_success(started.elapsed());
                self.last_index.store(idx as i64, Ordering::SeqCst);
                Ok(ProviderHandle { index: idx, client: Arc::new(provider) })
            }
            Err(e) => {
                record.mark_failure(e.to_string());
                warn!(url = %record.url, error = %e, "network error on provider");
                Err(())
            }
        }
    }

    /// Abandon the current sticky client so the next `acquire(.., sticky=true)`
    /// picks a fresh endpoint.
    pub fn rotate(&self) {
        *self.sticky.lock().unwrap() = None;
    }

    pub fn observe_success(&self, index: usize, response_time: Duration) {
        if let Some(record) = self.records.get(index) {
            record.mark_success(response_time);
        }
    }

    pub fn observe_failure(&self, index: usize, message: impl Into<String>) {
        if let Some(record) = self.records.get(index) {
            record.mark_failure(message);
        }
    }

    /// Stats table sorted by total descending then success-rate descending,
    /// matching `get_rpc_stats` in the original source.
    pub fn stats(&self) -> Vec<ProviderStat> {
        let mut stats: Vec<ProviderStat> = self.records.iter().map(|r| r.stat()).collect();
        stats.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then(b.success_rate.partial_cmp(&a.success_rate).unwrap_or(std::cmp::Ordering::Equal))
        });
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_order_rotates_and_prefers_fewer_errors() {
        let pool = ProviderPool::new(
            vec!["http://a".into(), "http://b".into(), "http://c".into()],
            1,
        );
        pool.records[1].mark_failure("boom");
        pool.last_index.store(0, Ordering::SeqCst);
        let order = pool.provider_order();
        // Rotation starts at index 1, but index 1 has an error so it's
        // pushed behind index 2.
        assert_eq!(order[0], 2);
        assert!(order.contains(&1));
    }

    #[test]
    fn stats_sort_by_total_desc_then_success_rate_desc() {
        let pool = ProviderPool::new(vec!["http://a".into(), "http://b".into()], 1);
        pool.records[0].mark_success(Duration::from_millis(10));
        pool.records[0].mark_success(Duration::from_millis(20));
        pool.records[1].mark_success(Duration::from_millis(5));
        pool.records[1].mark_failure("x");
        let stats = pool.stats();
        assert_eq!(stats[0].url, "http://a");
        assert_eq!(stats[0].total, 2);
    }

    #[tokio::test]
    async fn acquire_skips_provider_reporting_the_wrong_chain_id() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x2"}"#)
            .create();

        let pool = ProviderPool::new(vec![server.url()], 1);
        let result = pool.acquire(Duration::from_secs(1), false, false).await;
        assert!(matches!(result, Err(ProviderError::AllProvidersExhausted)));
        assert_eq!(pool.records[0].error_count(), 1);
    }
}
