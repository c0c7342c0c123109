use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::features::reports::services::ReportService;

/// Background worker that keeps the spatial index in line with the store.
///
/// Builds the index once at startup, then rebuilds it on each tick where an
/// index or storage failure has marked it stale.
pub struct IndexReconciler {
    report_service: Arc<ReportService>,
    period: Duration,
}

impl IndexReconciler {
    pub fn new(report_service: Arc<ReportService>, period: Duration) -> Self {
        Self {
            report_service,
            period,
        }
    }

    /// Run the reconciler in a background loop
    pub async fn run(&self) {
        tracing::info!(
            "Starting index reconciler (interval: {}s)",
            self.period.as_secs()
        );

        let mut interval = interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First tick completes immediately and performs the initial build
        let mut initial = true;
        loop {
            interval.tick().await;

            if initial || self.report_service.index().is_stale() {
                self.reconcile().await;
                initial = false;
            }
        }
    }

    /// One rebuild pass; failures leave the index stale for the next tick
    pub async fn reconcile(&self) -> bool {
        match self.report_service.rebuild_index().await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Spatial index rebuild failed: {:?}", e);
                false
            }
        }
    }
}
