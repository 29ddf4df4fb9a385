use crate::core::doctor::*;
use crate::core::ent::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;

pub const POLL_INTERVAL_HEALTHY: Duration = Duration::from_secs(10 * 60);
pub const POLL_INTERVAL_UNHEALTHY: Duration = Duration::from_secs(5 * 60);

pub fn poll_interval(overall: OverallStatus) -> Duration {
    match overall {
        OverallStatus::Operational => POLL_INTERVAL_HEALTHY,
        _ => POLL_INTERVAL_UNHEALTHY,
    }
}

/// Re-checks the upstream in the background so page requests mostly hit a
/// warm cache. Returns once the logger side of `tx` is gone.
pub async fn collect(doctor: Arc<Doctor>, tx: mpsc::Sender<Event>) {
    loop {
        let health = doctor.check_upstream().await;
        let overall = derive_overall_status(&[health]);
        if tx.send(Event::CheckAll).await.is_err() {
            tracing::debug!("logger gone, stop collecting");
            break;
        }
        let wait = poll_interval(overall);
        tracing::debug!(?overall, wait_secs = wait.as_secs(), "next collection scheduled");
        time::sleep(wait).await;
    }
}
