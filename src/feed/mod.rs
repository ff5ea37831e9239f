//! Analytics Feed Client (C3) — polls the external benchmark/pricing feed
//! with ETag-conditional requests and a drift-free daily scheduler, in the
//! manner of `ozone_studio::network::NetworkManager`'s single background
//! task plus `reqwest`-based outbound calls.

use crate::types::{ModelType, RouterError, RouterResult};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock};

/// One row of the feed payload's `data` array (spec.md §4.3/§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedModelRow {
    pub slug: String,
    pub provider: String,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub model_type: Option<ModelType>,
    #[serde(default)]
    pub composite_indices: std::collections::HashMap<String, f64>,
    #[serde(default)]
    pub benchmarks: std::collections::HashMap<String, f64>,
    #[serde(default)]
    pub price_1m_input: Option<f64>,
    #[serde(default)]
    pub price_1m_output: Option<f64>,
    #[serde(default)]
    pub median_throughput_tokens_sec: Option<f64>,
    #[serde(default)]
    pub median_ttft_seconds: Option<f64>,
}

impl FeedModelRow {
    /// Translate feed units into the internal Model Profile units
    /// (spec.md §4.3 "Mapping to internal units").
    pub fn cost_in_per_1k(&self) -> Option<f64> {
        self.price_1m_input.map(|p| p / 1000.0)
    }

    pub fn cost_out_per_1k(&self) -> Option<f64> {
        self.price_1m_output.map(|p| p / 1000.0)
    }

    pub fn avg_latency_ms(&self) -> Option<u32> {
        self.median_ttft_seconds.map(|s| (s * 1000.0).round() as u32)
    }

    /// Composite indices arrive on a 0-100 scale from some sources; values
    /// already in [0,1] pass through unchanged.
    pub fn normalized_composite(&self, key: &str) -> Option<f64> {
        self.composite_indices.get(key).map(|v| if *v > 1.0 { v / 100.0 } else { *v })
    }
}

#[derive(Debug, Deserialize)]
struct FeedPayload {
    #[allow(dead_code)]
    status: String,
    data: Vec<FeedModelRow>,
}

/// Outcome of one fetch attempt (spec.md §4.3 contract).
pub enum FetchOutcome {
    Updated { etag: Option<String>, rows: Vec<FeedModelRow> },
    NotModified,
}

pub struct AnalyticsFeedClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    pub feed_success_count: AtomicU64,
    pub feed_fallback_count: AtomicU64,
}

impl AnalyticsFeedClient {
    pub fn new(base_url: String, api_key: Option<String>, timeout_secs: u64) -> RouterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RouterError::FeedUnavailable(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            api_key,
            feed_success_count: AtomicU64::new(0),
            feed_fallback_count: AtomicU64::new(0),
        })
    }

    /// `fetch(etag?) -> (new_etag, rows?) | NotModified | FeedError` (spec.md §4.3).
    pub async fn fetch(&self, etag: Option<&str>) -> RouterResult<FetchOutcome> {
        let mut req = self.client.get(&self.base_url);
        if let Some(tag) = etag {
            req = req.header(reqwest::header::IF_NONE_MATCH, tag);
        }
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| {
            self.feed_fallback_count.fetch_add(1, Ordering::Relaxed);
            RouterError::FeedUnavailable(format!("request failed: {e}"))
        })?;

        if resp.status() == reqwest::StatusCode::NOT_MODIFIED {
            self.feed_success_count.fetch_add(1, Ordering::Relaxed);
            return Ok(FetchOutcome::NotModified);
        }

        if !resp.status().is_success() {
            self.feed_fallback_count.fetch_add(1, Ordering::Relaxed);
            return Err(RouterError::FeedUnavailable(format!("upstream status {}", resp.status())));
        }

        let new_etag = resp
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let payload: FeedPayload = resp
            .json()
            .await
            .map_err(|e| RouterError::FeedUnavailable(format!("decode failed: {e}")))?;

        self.feed_success_count.fetch_add(1, Ordering::Relaxed);
        Ok(FetchOutcome::Updated { etag: new_etag, rows: payload.data })
    }
}

/// Drives the daily wall-clock refresh and coalesces concurrent on-demand
/// refresh calls, matching the single-background-task shape of
/// `ozone_studio::network::NetworkManager`.
pub struct FeedScheduler {
    pub client: Arc<AnalyticsFeedClient>,
    refresh_hour_local: u32,
    last_etag: RwLock<Option<String>>,
    pub last_fetched_at: RwLock<Option<DateTime<Utc>>>,
    refresh_gate: Mutex<()>,
    refresh_done: Notify,
    /// Outcome of the most recently completed `do_refresh`, read by callers
    /// that lost the `force_refresh` coalescing race (spec.md §5).
    last_outcome: Mutex<Option<Result<Option<(Vec<FeedModelRow>, Option<String>)>, String>>>,
}

impl FeedScheduler {
    pub fn new(client: Arc<AnalyticsFeedClient>, refresh_hour_local: u32) -> Arc<Self> {
        Arc::new(Self {
            client,
            refresh_hour_local,
            last_etag: RwLock::new(None),
            last_fetched_at: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            refresh_done: Notify::new(),
            last_outcome: Mutex::new(None),
        })
    }

    /// Spawns the background loop. The caller keeps `Arc<FeedScheduler>`
    /// around to call `force_refresh` from the admin endpoint.
    pub fn spawn<F, G>(self: &Arc<Self>, mut on_refresh: F, mut on_failure: G)
    where
        F: FnMut(Vec<FeedModelRow>, Option<String>) + Send + 'static,
        G: FnMut() + Send + 'static,
    {
        let scheduler = self.clone();
        tokio::spawn(async move {
            loop {
                let next_run = scheduler.next_run_at();
                let now = Utc::now();
                let delay = (next_run - now).to_std().unwrap_or(Duration::from_secs(0));
                tokio::time::sleep(delay).await;

                match scheduler.do_refresh().await {
                    Ok(Some((rows, etag))) => on_refresh(rows, etag),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "scheduled feed refresh failed");
                        on_failure();
                    }
                }
            }
        });
    }

    /// Next 02:00-local run: today if not yet passed, else tomorrow
    /// (spec.md §4.3 "Scheduling").
    fn next_run_at(&self) -> DateTime<Utc> {
        let now_local = Local::now();
        let today_run = Local
            .with_ymd_and_hms(now_local.year(), now_local.month(), now_local.day(), self.refresh_hour_local, 0, 0)
            .single();

        let target = match today_run {
            Some(t) if t > now_local => t,
            Some(t) => t + chrono::Duration::days(1),
            None => now_local + chrono::Duration::days(1),
        };
        target.with_timezone(&Utc)
    }

    /// On-demand refresh; concurrent callers coalesce onto the first
    /// in-flight fetch rather than double-fetching, and observe that
    /// fetch's actual result rather than a synthesized empty one
    /// (spec.md §5).
    pub async fn force_refresh(&self) -> RouterResult<Option<(Vec<FeedModelRow>, Option<String>)>> {
        match self.refresh_gate.try_lock() {
            Ok(_guard) => self.do_refresh().await,
            Err(_) => {
                self.refresh_done.notified().await;
                match self.last_outcome.lock().await.clone() {
                    Some(Ok(outcome)) => Ok(outcome),
                    Some(Err(message)) => Err(RouterError::FeedUnavailable(message)),
                    None => Ok(None),
                }
            }
        }
    }

    async fn do_refresh(&self) -> RouterResult<Option<(Vec<FeedModelRow>, Option<String>)>> {
        let etag = self.last_etag.read().await.clone();
        let outcome = self.client.fetch(etag.as_deref()).await;
        *self.last_fetched_at.write().await = Some(Utc::now());

        let result = match outcome {
            Ok(FetchOutcome::NotModified) => Ok(None),
            Ok(FetchOutcome::Updated { etag, rows }) => {
                *self.last_etag.write().await = etag.clone();
                Ok(Some((rows, etag)))
            }
            Err(e) => Err(e),
        };

        *self.last_outcome.lock().await = Some(result.as_ref().map(|o| o.clone()).map_err(|e| e.to_string()));
        self.refresh_done.notify_waiters();
        result
    }
}

use chrono::Datelike;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_unit_mapping() {
        let row = FeedModelRow {
            slug: "gpt-5".into(),
            provider: "openai".into(),
            release_date: None,
            model_type: None,
            composite_indices: std::collections::HashMap::from([("coding".to_string(), 87.0)]),
            benchmarks: std::collections::HashMap::new(),
            price_1m_input: Some(5.0),
            price_1m_output: Some(15.0),
            median_throughput_tokens_sec: Some(120.0),
            median_ttft_seconds: Some(0.4),
        };

        assert_eq!(row.cost_in_per_1k(), Some(0.005));
        assert_eq!(row.cost_out_per_1k(), Some(0.015));
        assert_eq!(row.avg_latency_ms(), Some(400));
        assert_eq!(row.normalized_composite("coding"), Some(0.87));
    }

    #[test]
    fn composite_already_normalized_passes_through() {
        let row = FeedModelRow {
            slug: "m".into(),
            provider: "p".into(),
            release_date: None,
            model_type: None,
            composite_indices: std::collections::HashMap::from([("math".to_string(), 0.6)]),
            benchmarks: std::collections::HashMap::new(),
            price_1m_input: None,
            price_1m_output: None,
            median_throughput_tokens_sec: None,
            median_ttft_seconds: None,
        };
        assert_eq!(row.normalized_composite("math"), Some(0.6));
    }

    #[tokio::test]
    async fn scheduler_next_run_is_in_the_future() {
        let client = Arc::new(AnalyticsFeedClient::new("https://example.invalid".into(), None, 15).unwrap());
        let scheduler = FeedScheduler::new(client, 2);
        assert!(scheduler.next_run_at() > Utc::now());
    }
}
