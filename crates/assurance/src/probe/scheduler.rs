use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use assurance_core::{EngineMetrics, SchedulerSettings};

use crate::error::Result;
use crate::probe::model::Probe;
use crate::probe::service::DefaultProbeService;
use crate::probe::store::ProbeStore;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Drives every ENABLED probe at its declared interval.
///
/// Due times derive from `last_run + interval`; a probe waiting on a free
/// worker slot therefore stays due until it actually runs. Ticks for one
/// probe never overlap, so its results append in timestamp order.
pub struct ProbeScheduler {
    service: Arc<DefaultProbeService>,
    store: Arc<ProbeStore>,
    metrics: EngineMetrics,
    settings: SchedulerSettings,
    semaphore: Arc<Semaphore>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl ProbeScheduler {
    pub fn new(
        service: Arc<DefaultProbeService>,
        metrics: EngineMetrics,
        settings: SchedulerSettings,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(settings.max_concurrent_probes.max(1)));
        let store = service.store();
        Self {
            service,
            store,
            metrics,
            settings,
            semaphore,
            shutdown_tx: None,
        }
    }

    /// Start the scheduling loop (non-blocking).
    pub fn start(&mut self) {
        if self.shutdown_tx.is_some() {
            warn!("Scheduler already running");
            return;
        }
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        let service = Arc::clone(&self.service);
        let store = Arc::clone(&self.store);
        let metrics = self.metrics.clone();
        let semaphore = Arc::clone(&self.semaphore);

        tokio::spawn(async move {
            Self::scheduling_loop(service, store, metrics, semaphore, shutdown_rx).await;
        });

        info!(
            max_concurrent = self.settings.max_concurrent_probes,
            "Probe scheduler started"
        );
    }

    /// Stop scheduling and drain in-flight executions within the grace
    /// period.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;

            let max_permits = self.settings.max_concurrent_probes.max(1) as u32;
            let grace = Duration::from_secs(self.settings.shutdown_grace_s);
            match timeout(grace, self.semaphore.acquire_many(max_permits)).await {
                Ok(Ok(_permits)) => {
                    info!("Probe scheduler drained and stopped");
                }
                Ok(Err(_)) | Err(_) => {
                    warn!(
                        grace_seconds = self.settings.shutdown_grace_s,
                        "Probe scheduler shutdown grace elapsed with work in flight"
                    );
                    return Err(assurance_core::Error::ShutdownTimeout {
                        grace_seconds: self.settings.shutdown_grace_s,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    async fn scheduling_loop(
        service: Arc<DefaultProbeService>,
        store: Arc<ProbeStore>,
        metrics: EngineMetrics,
        semaphore: Arc<Semaphore>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let in_flight: Arc<DashSet<Uuid>> = Arc::new(DashSet::new());
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping scheduling loop");
                    break;
                }
                _ = poll.tick() => {
                    Self::dispatch_due_probes(
                        &service,
                        &store,
                        &metrics,
                        &semaphore,
                        &in_flight,
                    ).await;
                }
            }
        }
    }

    async fn dispatch_due_probes(
        service: &Arc<DefaultProbeService>,
        store: &Arc<ProbeStore>,
        metrics: &EngineMetrics,
        semaphore: &Arc<Semaphore>,
        in_flight: &Arc<DashSet<Uuid>>,
    ) {
        let now = Utc::now();

        for probe in store.enabled_probes() {
            if in_flight.contains(&probe.probe_id) {
                continue;
            }

            let next_due = next_due_at(&probe);
            if next_due > now {
                continue;
            }

            // No free slot: leave the probe due; it runs when one opens.
            let permit = match Arc::clone(semaphore).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => return,
            };

            in_flight.insert(probe.probe_id);
            let service = Arc::clone(service);
            let in_flight = Arc::clone(in_flight);
            let metrics = metrics.clone();

            tokio::spawn(async move {
                let probe_id = probe.probe_id;

                // More than one interval behind at the moment it actually
                // runs: honor only the most recent interval and count the
                // earlier misses, once.
                let interval = ChronoDuration::seconds(i64::from(probe.interval_seconds));
                let lag = Utc::now() - next_due;
                if lag > interval {
                    let missed = (lag.num_seconds() / interval.num_seconds().max(1)) as u64;
                    metrics.missed_runs.inc_by(missed);
                    debug!(probe_id = %probe_id, missed, "Probe fell behind schedule");
                }

                if let Err(e) = service.run_and_record(&probe).await {
                    error!(probe_id = %probe_id, error = %e, "Probe tick failed internally");
                }
                in_flight.remove(&probe_id);
                drop(permit);
            });
        }
    }
}

fn next_due_at(probe: &Probe) -> DateTime<Utc> {
    match probe.last_run {
        Some(last_run) => last_run + ChronoDuration::seconds(i64::from(probe.interval_seconds)),
        None => Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::executor::SimulatedProbeExecutor;
    use crate::probe::model::CreateProbeRequest;
    use crate::probe::service::ProbeService;
    use crate::sla::store::SlaStore;
    use crate::types::{ProbeStatus, ProbeType};
    use assurance_core::{ProbeSettings, TenantId};

    fn build_service(success_rate: f64) -> Arc<DefaultProbeService> {
        Arc::new(DefaultProbeService::new(
            TenantId::new("t1"),
            Arc::new(ProbeStore::new(1000)),
            Arc::new(SlaStore::new()),
            Arc::new(SimulatedProbeExecutor::new(success_rate, 10.0, 0.25)),
            EngineMetrics::unregistered(),
            ProbeSettings::default(),
        ))
    }

    #[tokio::test]
    async fn scheduler_ticks_enabled_probe_at_interval() {
        let service = build_service(1.0);
        let probe = service
            .create_probe(
                CreateProbeRequest::new("gw", ProbeType::Icmp, "192.0.2.1").with_cadence(1, 1),
            )
            .await
            .unwrap();

        let mut scheduler = ProbeScheduler::new(
            Arc::clone(&service),
            EngineMetrics::unregistered(),
            SchedulerSettings::default(),
        );
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(3300)).await;
        scheduler.stop().await.unwrap();

        let store = service.store();
        let count = store.result_count(probe.probe_id);
        assert!(count >= 3, "expected at least 3 results, got {}", count);

        // results appended in non-decreasing timestamp order
        let results = store.results_since(probe.probe_id, Utc::now() - ChronoDuration::hours(1));
        assert!(results.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let stored = service.get_probe(probe.probe_id).await.unwrap();
        assert!(stored.last_run.is_some());
        assert!(stored.last_success.is_some());
        assert_eq!(stored.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn disabled_probes_are_skipped() {
        let service = build_service(1.0);
        let probe = service
            .create_probe(
                CreateProbeRequest::new("gw", ProbeType::Icmp, "192.0.2.1").with_cadence(1, 1),
            )
            .await
            .unwrap();
        service
            .update_probe(
                probe.probe_id,
                crate::probe::model::UpdateProbeRequest {
                    status: Some(ProbeStatus::Disabled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut scheduler = ProbeScheduler::new(
            Arc::clone(&service),
            EngineMetrics::unregistered(),
            SchedulerSettings::default(),
        );
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        scheduler.stop().await.unwrap();

        assert_eq!(service.store().result_count(probe.probe_id), 0);
    }

    #[tokio::test]
    async fn stop_is_idempotent_without_start() {
        let service = build_service(1.0);
        let mut scheduler = ProbeScheduler::new(
            service,
            EngineMetrics::unregistered(),
            SchedulerSettings::default(),
        );
        assert!(!scheduler.is_running());
        scheduler.stop().await.unwrap();
    }
}
