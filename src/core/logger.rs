use crate::core::doctor::*;
use crate::core::ent::*;
use std::collections::HashMap;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    First(ServiceStatus),
    Changed {
        from: ServiceStatus,
        to: ServiceStatus,
    },
}

// 记录数据同时判断状态是否变化
pub struct Logger {
    services: HashMap<String, ServiceHealth>, // last heartbeat per configured target
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new()
    }
}

impl Logger {
    pub fn new() -> Logger {
        Logger {
            services: HashMap::new(),
        }
    }

    /// Records `event` and returns the status transition it caused, if any.
    pub fn log(&mut self, event: Event) -> Option<Transition> {
        match event {
            Event::Heartbeat(info) => self.update_service(info),
            Event::CheckAll => {
                self.traverse_check();
                None
            }
        }
    }

    fn update_service(&mut self, info: HealthInfo) -> Option<Transition> {
        let name = info.target;
        let to = info.health.status;
        let transition = match self.services.insert(name.clone(), info.health) {
            None => Some(Transition::First(to)),
            Some(prev) if prev.status != to => Some(Transition::Changed {
                from: prev.status,
                to,
            }),
            Some(_) => None,
        };
        match transition {
            Some(Transition::First(status)) => {
                tracing::info!(service = %name, ?status, "first reading")
            }
            Some(Transition::Changed {
                from,
                to: ServiceStatus::Up,
            }) => tracing::info!(service = %name, ?from, "service recovered"),
            Some(Transition::Changed { from, to }) => {
                tracing::warn!(service = %name, ?from, ?to, "service status changed")
            }
            None => tracing::debug!(service = %name, status = ?to, "heartbeat"),
        }
        transition
    }

    fn traverse_check(&self) {
        let services: Vec<ServiceHealth> = self.services.values().cloned().collect();
        let overall = derive_overall_status(&services);
        for health in &services {
            if let Some(error) = &health.error {
                tracing::info!(service = %health.name, status = ?health.status, "{}", error);
            }
        }
        tracing::info!(?overall, services = services.len(), "finished check all services");
    }
}

/// Drains `rx` until every sender is gone.
pub async fn watch(mut rx: mpsc::Receiver<Event>) {
    let mut logger = Logger::new();
    tracing::debug!("into watch");
    while let Some(event) = rx.recv().await {
        logger.log(event);
    }
    tracing::debug!("break watch");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(target: &str, reported_as: &str, status: ServiceStatus) -> Event {
        Event::Heartbeat(HealthInfo {
            target: target.to_string(),
            health: ServiceHealth {
                name: reported_as.to_string(),
                status,
                version: None,
                response_time_ms: Some(5),
                source_url: None,
                error: None,
                dependencies: None,
            },
        })
    }

    fn heartbeat(name: &str, status: ServiceStatus) -> Event {
        reading(name, name, status)
    }

    #[test]
    fn reports_first_reading_and_changes_only() {
        let mut logger = Logger::new();
        assert_eq!(
            logger.log(heartbeat("stash", ServiceStatus::Up)),
            Some(Transition::First(ServiceStatus::Up))
        );
        assert_eq!(logger.log(heartbeat("stash", ServiceStatus::Up)), None);
        assert_eq!(
            logger.log(heartbeat("stash", ServiceStatus::Down)),
            Some(Transition::Changed {
                from: ServiceStatus::Up,
                to: ServiceStatus::Down
            })
        );
        assert_eq!(
            logger.log(heartbeat("stash", ServiceStatus::Up)),
            Some(Transition::Changed {
                from: ServiceStatus::Down,
                to: ServiceStatus::Up
            })
        );
    }

    #[test]
    fn services_are_tracked_separately() {
        let mut logger = Logger::new();
        logger.log(heartbeat("a", ServiceStatus::Up));
        assert_eq!(
            logger.log(heartbeat("b", ServiceStatus::Down)),
            Some(Transition::First(ServiceStatus::Down))
        );
        assert_eq!(logger.log(Event::CheckAll), None);
    }

    #[test]
    fn reported_name_changes_do_not_split_a_target() {
        let mut logger = Logger::new();
        assert_eq!(
            logger.log(reading("Stash API", "stash", ServiceStatus::Up)),
            Some(Transition::First(ServiceStatus::Up))
        );
        assert_eq!(
            logger.log(reading("Stash API", "Stash API", ServiceStatus::Down)),
            Some(Transition::Changed {
                from: ServiceStatus::Up,
                to: ServiceStatus::Down
            })
        );
        assert_eq!(
            logger.log(reading("Stash API", "stash", ServiceStatus::Up)),
            Some(Transition::Changed {
                from: ServiceStatus::Down,
                to: ServiceStatus::Up
            })
        );
        assert_eq!(logger.services.len(), 1);
        let services: Vec<ServiceHealth> = logger.services.values().cloned().collect();
        assert_eq!(derive_overall_status(&services), OverallStatus::Operational);
    }

    #[tokio::test]
    async fn watch_stops_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(watch(rx));
        tx.send(heartbeat("stash", ServiceStatus::Up)).await.unwrap();
        tx.send(Event::CheckAll).await.unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
