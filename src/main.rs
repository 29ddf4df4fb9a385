//! Provides the Pixel status server.
//!
//! API will be:
//!
//! - `GET /api/health`: overall status plus every service reading as JSON.
//! - `GET /api/health/schema`: JSON Schema of the health report.
//! - `GET /status`: human-facing status page.
//!
//! Run with
//!
//! ```not_rust
//! STASH_API_URL=https://stash.example.com cargo run
//! ```

use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pixel_status::config::load_bootstrap_config;
use pixel_status::core::*;
use pixel_status::handler::{self, AppState};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixel_status=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    //1. 初始化配置
    let bootstrap = load_bootstrap_config(Path::new("."))?;
    if bootstrap.upstream.base_url().is_none() {
        tracing::warn!("upstream base url not configured, health will report UNKNOWN");
    }

    //2. 启动记录状态变化的任务
    let (tx, rx) = mpsc::channel(32);
    let watcher = tokio::spawn(pixel_status::core::watch(rx));

    //3. 根据配置生成医生
    let cache = Arc::new(HealthCache::new());
    let dc = Arc::new(Doctor::new(&bootstrap.upstream, cache)?.with_events(tx.clone()));
    if let Some(endpoint) = dc.endpoint() {
        tracing::info!(%endpoint, "checking upstream health");
    }

    //4. 定时轮询上游 保持缓存新鲜
    let collector = if bootstrap.refresh.enabled {
        Some(tokio::spawn(collect(dc.clone(), tx)))
    } else {
        drop(tx);
        None
    };

    //5. 启动HTTP服务
    let addr: SocketAddr = bootstrap.server.addr.parse()?;
    let app = handler::router(
        Arc::new(AppState { dc }),
        Duration::from_secs(bootstrap.server.request_timeout_secs),
    );
    handler::listen(addr, app, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
    })
    .await?;

    if let Some(collector) = collector {
        collector.abort();
    }
    watcher.abort();
    Ok(())
}
