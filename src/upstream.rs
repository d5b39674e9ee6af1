use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use tokio::time::{Duration, interval};

use crate::error::{AppError, Result};
use crate::metrics::{UPSTREAM_FAILURES, UPSTREAM_LATENCY};

// Single backend-as-a-service instance
pub struct Backend {
    pub url: String,
    healthy: AtomicBool,
}

impl Backend {
    pub fn new(url: String) -> Self {
        Self {
            url,
            healthy: AtomicBool::new(true),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.url, function)
    }

    pub fn probe_url(&self) -> String {
        format!("{}/rest/v1/", self.url)
    }
}

/// Round-robin pool of backends plus the credentials every call carries.
pub struct UpstreamPool {
    backends: Vec<Arc<Backend>>,
    current: AtomicUsize,
    service_key: Option<String>,
    timeout: Duration,
}

impl UpstreamPool {
    pub fn new(urls: Vec<String>, service_key: Option<String>, timeout: Duration) -> Result<Self> {
        if urls.is_empty() {
            return Err(AppError::Config("at least one backend required".to_string()));
        }
        let backends: Vec<Arc<Backend>> = urls
            .into_iter()
            .map(|url| Arc::new(Backend::new(url)))
            .collect();

        tracing::info!(count = backends.len(), "upstream pool initialized");
        for (i, b) in backends.iter().enumerate() {
            tracing::info!(index = i + 1, url = %b.url, "upstream backend");
        }

        Ok(Self {
            backends,
            current: AtomicUsize::new(0),
            service_key,
            timeout,
        })
    }

    // Next healthy backend, round-robin
    pub fn get_backend(&self) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        let start = self.current.fetch_add(1, Ordering::Relaxed) % len;

        (0..len)
            .map(|i| &self.backends[(start + i) % len])
            .find(|backend| backend.is_healthy())
            .map(Arc::clone)
    }

    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.service_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    /// Invokes a remote procedure and returns its JSON result.
    ///
    /// A transport failure takes the chosen backend out of rotation until the
    /// health checker sees it again. Non-2xx replies do not.
    pub async fn call<P: Serialize + ?Sized>(
        &self,
        client: &reqwest::Client,
        function: &str,
        params: &P,
    ) -> Result<Value> {
        let backend = self.get_backend().ok_or(AppError::NoHealthyBackends)?;
        let start = Instant::now();

        let sent = self
            .authorize(client.post(backend.rpc_url(function)))
            .timeout(self.timeout)
            .json(params)
            .send()
            .await;

        let res = match sent {
            Ok(res) => res,
            Err(e) => {
                backend.set_healthy(false);
                UPSTREAM_FAILURES.inc();
                tracing::warn!(backend = %backend.url, function, error = %e, "upstream call failed, marked unhealthy");
                return Err(AppError::Upstream(e.to_string()));
            }
        };
        UPSTREAM_LATENCY.observe(start.elapsed().as_secs_f64());

        let status = res.status();
        if !status.is_success() {
            UPSTREAM_FAILURES.inc();
            let body = res.text().await.unwrap_or_default();
            tracing::warn!(backend = %backend.url, function, status = status.as_u16(), "upstream rejected call");
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;
        // void functions answer with an empty body
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| AppError::Upstream(format!("Parse error: {}", e)))
    }
}

// Probes every backend on a fixed interval and flips its health flag
pub async fn health_checker(pool: Arc<UpstreamPool>, client: reqwest::Client, check_interval: Duration) {
    let mut interval = interval(check_interval);

    tracing::info!(interval = ?check_interval, "health checker started");

    loop {
        interval.tick().await;

        for backend in pool.all_backends() {
            let was_healthy = backend.is_healthy();

            let is_healthy = match pool
                .authorize(client.get(backend.probe_url()))
                .timeout(Duration::from_secs(5))
                .send()
                .await
            {
                Ok(res) => res.status().is_success(),
                Err(_) => false,
            };
            backend.set_healthy(is_healthy);

            if was_healthy != is_healthy {
                if is_healthy {
                    tracing::info!(backend = %backend.url, "backend is now healthy");
                } else {
                    tracing::warn!(backend = %backend.url, "backend is now unhealthy");
                }
            }
        }
    }
}
