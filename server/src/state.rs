use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use siam_shared::ClientConfig;
use tracing::warn;

use crate::config::{
    api_base_url, ide_eje_current, upstream_connect_timeout, upstream_http_timeout,
    whatsapp_number,
};

#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    /// Backend base URL, no trailing slash.
    pub upstream: Arc<str>,
    pub client_config: Arc<ClientConfig>,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    proxied_requests_total: AtomicU64,
    upstream_errors_total: AtomicU64,
    upstream_client_errors_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservabilitySnapshot {
    pub proxied_requests_total: u64,
    pub upstream_errors_total: u64,
    pub upstream_client_errors_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            proxied_requests_total: self.proxied_requests_total.load(Ordering::Relaxed),
            upstream_errors_total: self.upstream_errors_total.load(Ordering::Relaxed),
            upstream_client_errors_total: self
                .upstream_client_errors_total
                .load(Ordering::Relaxed),
        }
    }

    pub fn record_proxied_request(&self) {
        self.proxied_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Transport failures reaching the backend.
    pub fn record_upstream_error(&self) {
        self.upstream_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 4xx answers relayed from the backend (not found, conflict, ...).
    pub fn record_upstream_client_error(&self) {
        self.upstream_client_errors_total
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn from_env() -> Result<Self, reqwest::Error> {
        let config = ClientConfig {
            ide_eje: ide_eje_current(),
            whatsapp_number: whatsapp_number(),
        };
        Self::new(api_base_url(), config)
    }

    pub fn new(upstream: impl Into<String>, client_config: ClientConfig) -> Result<Self, reqwest::Error> {
        let request_timeout = upstream_http_timeout();
        let connect_timeout = upstream_connect_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent("siam-server/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(request_timeout)
                    .connect_timeout(connect_timeout)
                    .build()
            })?;
        let upstream: String = upstream.into();
        Ok(Self {
            http_client,
            upstream: Arc::from(upstream.trim_end_matches('/')),
            client_config: Arc::new(client_config),
            observability: Arc::new(ObservabilityCounters::default()),
        })
    }
}
