use crate::config::Upstream;
use crate::core::cache::*;
use crate::core::ent::*;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

// Body of `{base_url}/internal/status` as the upstream reports it.
#[derive(Debug, Deserialize)]
struct UpstreamStatus {
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    version: Option<String>,
    status: String,
    #[serde(default)]
    dependencies: Option<Vec<UpstreamDependency>>,
}

#[derive(Debug, Deserialize)]
struct UpstreamDependency {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    status: Option<DependencyStatus>,
    #[serde(default)]
    details: Option<UpstreamDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamDetails {
    #[serde(default)]
    replica_set: Option<ReplicaSet>,
}

#[derive(Debug, Deserialize)]
struct ReplicaSet {
    #[serde(default)]
    nodes: Option<Vec<ReplicaNode>>,
}

#[derive(Debug, Deserialize)]
struct ReplicaNode {
    #[serde(default)]
    state: Option<NodeRole>,
    #[serde(default)]
    healthy: Option<bool>,
}

impl UpstreamDependency {
    // Dependencies are diagnostic only; one without a type is dropped instead
    // of failing the whole reading.
    fn into_health(self) -> Option<DependencyHealth> {
        let kind = self.kind.filter(|kind| !kind.is_empty())?;
        let cluster_detail = self
            .details
            .and_then(|details| details.replica_set)
            .map(|replica_set| {
                replica_set
                    .nodes
                    .unwrap_or_default()
                    .into_iter()
                    .map(|node| ClusterNodeHealth {
                        role: node.state.unwrap_or(NodeRole::Unknown),
                        healthy: node.healthy.unwrap_or(false),
                    })
                    .collect()
            });
        Some(DependencyHealth {
            kind,
            status: self.status.unwrap_or(DependencyStatus::Down),
            cluster_detail,
        })
    }
}

/// Checks the configured upstream and keeps its last good reading in a
/// [`HealthCache`]. Every failure is reported as data, never as an error.
pub struct Doctor {
    name: String,
    base_url: Option<String>,
    status_path: String,
    timeout: Duration,
    client: reqwest::Client,
    cache: Arc<HealthCache>,
    clock: Arc<dyn Clock>,
    events: Option<mpsc::Sender<Event>>,
}

impl Doctor {
    pub fn new(upstream: &Upstream, cache: Arc<HealthCache>) -> Result<Doctor, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(upstream.timeout()).build()?;
        Ok(Doctor {
            name: upstream.name.clone(),
            base_url: upstream.base_url().map(String::from),
            status_path: upstream.status_path.clone(),
            timeout: upstream.timeout(),
            client,
            cache,
            clock: Arc::new(SystemClock),
            events: None,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Doctor {
        self.clock = clock;
        self
    }

    /// Network checks are reported on `events` as heartbeats.
    pub fn with_events(mut self, events: mpsc::Sender<Event>) -> Doctor {
        self.events = Some(events);
        self
    }

    pub fn endpoint(&self) -> Option<String> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}{}", base, self.status_path))
    }

    /// Epoch millis of the last successful check still held by the cache.
    pub fn last_updated(&self) -> Option<u64> {
        self.cache.last_updated()
    }

    pub async fn check_upstream(&self) -> ServiceHealth {
        let base_url = match &self.base_url {
            Some(base_url) => base_url,
            None => return ServiceHealth::unknown(&self.name, "API URL not configured"),
        };

        if let Some(cached) = self.cache.fresh(self.clock.now_millis()) {
            tracing::debug!(status = ?cached.status, "health cache hit");
            return cached;
        }

        let url = format!("{}{}", base_url, self.status_path);
        let started = Instant::now();
        let result = self.fetch(&url).await;
        let elapsed = started.elapsed().as_millis() as u64;

        let health = match result {
            Ok(body) => {
                let health = self.diagnose(body, base_url, elapsed);
                self.cache.store(health.clone(), self.clock.now_millis());
                tracing::info!(status = ?health.status, elapsed_ms = elapsed, "upstream checked");
                health
            }
            Err(error) => {
                tracing::warn!(%url, elapsed_ms = elapsed, "upstream check failed: {}", error);
                ServiceHealth::down(&self.name, base_url, elapsed, error)
            }
        };
        self.report(&health);
        health
    }

    async fn fetch(&self, url: &str) -> Result<UpstreamStatus, String> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.describe(e))?;
        if !res.status().is_success() {
            return Err(format!("HTTP {}", res.status().as_u16()));
        }
        res.json::<UpstreamStatus>().await.map_err(|e| {
            if e.is_timeout() {
                self.describe(e)
            } else {
                format!("invalid response body: {}", e)
            }
        })
    }

    fn describe(&self, error: reqwest::Error) -> String {
        if error.is_timeout() {
            format!("request timed out after {}ms", self.timeout.as_millis())
        } else {
            error.to_string()
        }
    }

    fn diagnose(&self, body: UpstreamStatus, base_url: &str, elapsed: u64) -> ServiceHealth {
        let name = body
            .service
            .filter(|service| !service.is_empty())
            .unwrap_or_else(|| self.name.clone());
        let status = if body.status == "UP" {
            ServiceStatus::Up
        } else {
            ServiceStatus::Down
        };
        let dependencies = body
            .dependencies
            .map(|deps| {
                deps.into_iter()
                    .filter_map(UpstreamDependency::into_health)
                    .collect::<Vec<_>>()
            })
            .filter(|deps| !deps.is_empty());
        ServiceHealth {
            name,
            status,
            version: body.version,
            response_time_ms: Some(elapsed),
            source_url: Some(base_url.to_string()),
            error: None,
            dependencies,
        }
    }

    fn report(&self, health: &ServiceHealth) {
        if let Some(tx) = &self.events {
            let info = HealthInfo {
                target: self.name.clone(),
                health: health.clone(),
            };
            if let Err(e) = tx.try_send(Event::Heartbeat(info)) {
                tracing::debug!("heartbeat dropped: {}", e);
            }
        }
    }
}

/// Reduces per-service readings into one overall status.
///
/// An empty slice is `Operational`: with no readings there is no known failure.
pub fn derive_overall_status(services: &[ServiceHealth]) -> OverallStatus {
    if services.is_empty() {
        return OverallStatus::Operational;
    }
    let down = services
        .iter()
        .filter(|s| s.status == ServiceStatus::Down)
        .count();
    let unknown = services
        .iter()
        .filter(|s| s.status == ServiceStatus::Unknown)
        .count();
    if down == services.len() {
        OverallStatus::Outage
    } else if down > 0 || unknown > 0 {
        OverallStatus::Degraded
    } else {
        OverallStatus::Operational
    }
}

/// Version of this service itself, not of the upstream.
pub fn reported_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
