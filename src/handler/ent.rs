use crate::core::*;
use chrono::{DateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Self-report of this service, shown next to the upstream readings.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq)]
pub struct PixelInfo {
    pub name: String,
    pub version: String,
    pub status: ServiceStatus,
}

impl PixelInfo {
    pub fn current() -> PixelInfo {
        PixelInfo {
            name: "Pixel".to_string(),
            version: reported_version().to_string(),
            status: ServiceStatus::Up,
        }
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq)]
pub struct HealthReport {
    pub overall: OverallStatus,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub pixel: PixelInfo,
    pub services: Vec<ServiceHealth>,
}

impl HealthReport {
    pub fn new(services: Vec<ServiceHealth>, now: DateTime<Utc>) -> HealthReport {
        HealthReport {
            overall: derive_overall_status(&services),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            pixel: PixelInfo::current(),
            services,
        }
    }
}
