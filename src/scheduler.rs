use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::api::ApiError;
use crate::engine::{CycleOutcome, RefreshEngine};

/// Periodic driver of refresh cycles.
///
/// A repeated job with a fixed period invokes the refresh engine while the
/// feed has content. The job is armed only when content exists: `sync` must
/// be called after the timeline loads or after inserts, and `shutdown`
/// disarms everything on teardown. The manual trigger path never touches the
/// timer schedule.
pub struct CycleScheduler {
    scheduler: JobScheduler,
    engine: Arc<RefreshEngine>,
    period: Duration,
    job_id: Mutex<Option<Uuid>>,
}

impl CycleScheduler {
    pub async fn new(engine: Arc<RefreshEngine>, period: Duration) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        Ok(Self {
            scheduler,
            engine,
            period,
            job_id: Mutex::new(None),
        })
    }

    /// Bring the timer in line with the store: armed while content exists,
    /// disarmed otherwise. Content is never removed in this system, so in
    /// practice this arms once the first post arrives.
    pub async fn sync(&self) -> Result<()> {
        let armed = self.job_id.lock().unwrap().is_some();
        let has_content = self.engine.has_content();

        if has_content && !armed {
            self.arm().await?;
        } else if !has_content && armed {
            self.disarm().await?;
        }
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.job_id.lock().unwrap().is_some()
    }

    async fn arm(&self) -> Result<()> {
        let engine = Arc::clone(&self.engine);

        let job = Job::new_repeated_async(self.period, move |_uuid, _l| {
            let engine = Arc::clone(&engine);
            Box::pin(async move {
                debug!("⏰ Scheduled refresh cycle triggered");
                match engine.run_cycle().await {
                    Ok(CycleOutcome::Committed { generation, dialect }) => {
                        debug!(generation, dialect = %dialect, "scheduled cycle committed");
                    }
                    Ok(CycleOutcome::Discarded { generation }) => {
                        debug!(generation, "scheduled cycle discarded");
                    }
                    Ok(CycleOutcome::Skipped) => {
                        debug!("scheduled cycle skipped");
                    }
                    Err(e) => {
                        error!("Scheduled refresh cycle failed: {}", e);
                    }
                }
            })
        })?;

        let id = self.scheduler.add(job).await?;
        *self.job_id.lock().unwrap() = Some(id);
        info!(period_secs = self.period.as_secs(), "✓ Refresh timer armed");
        Ok(())
    }

    async fn disarm(&self) -> Result<()> {
        let id = self.job_id.lock().unwrap().take();
        if let Some(id) = id {
            self.scheduler.remove(&id).await?;
            info!("Refresh timer disarmed");
        }
        Ok(())
    }

    /// Tear the scheduler down. The timer stops firing; in-flight cycles
    /// finish on their own and are arbitrated by the generation guard.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.disarm().await?;
        self.scheduler.shutdown().await?;
        info!("Scheduler stopped");
        Ok(())
    }
}

/// Manually trigger one refresh cycle (user action). Runs independently of
/// the timer: a manual cycle may overlap a scheduled one, and the generation
/// guard arbitrates between them.
pub async fn trigger_refresh(engine: &RefreshEngine) -> Result<CycleOutcome, ApiError> {
    info!("Manual refresh triggered");
    engine.run_cycle().await
}
