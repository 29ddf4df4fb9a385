use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Up,
    Down,
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyStatus {
    Up,
    Degraded,
    // anything the upstream reports beyond UP/DEGRADED counts as down
    #[serde(other)]
    Down,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeRole {
    Primary,
    Secondary,
    Arbiter,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Operational,
    Degraded,
    Outage,
}

/// One upstream service's observed state at a point in time.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub name: String,
    pub status: ServiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<DependencyHealth>>,
}

impl ServiceHealth {
    pub fn unknown(name: &str, error: &str) -> ServiceHealth {
        ServiceHealth {
            name: name.to_string(),
            status: ServiceStatus::Unknown,
            version: None,
            response_time_ms: None,
            source_url: None,
            error: Some(error.to_string()),
            dependencies: None,
        }
    }

    pub fn down(name: &str, source_url: &str, response_time_ms: u64, error: String) -> ServiceHealth {
        ServiceHealth {
            name: name.to_string(),
            status: ServiceStatus::Down,
            version: None,
            response_time_ms: Some(response_time_ms),
            source_url: Some(source_url.to_string()),
            error: Some(error),
            dependencies: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyHealth {
    pub kind: String,
    pub status: DependencyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_detail: Option<Vec<ClusterNodeHealth>>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq)]
pub struct ClusterNodeHealth {
    pub role: NodeRole,
    pub healthy: bool,
}

/// A network check of one configured upstream. `target` is the configured
/// name, which stays the same whatever name the upstream reports itself under.
#[derive(Debug, Clone)]
pub struct HealthInfo {
    pub target: String,
    pub health: ServiceHealth,
}

#[derive(Debug)]
pub enum Event {
    // a check that actually went over the network
    Heartbeat(HealthInfo),
    // end of one refresher round
    CheckAll,
}
