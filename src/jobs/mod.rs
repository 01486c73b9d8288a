use std::{sync::Arc, time::Instant};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

/// Run one task and record its outcome
async fn run_recorded<F, T>(job_type: &str, task: F) -> Option<T>
where
    F: std::future::Future<Output = crate::error::HubResult<T>>,
{
    let start = Instant::now();
    let result = task.await;
    let elapsed = start.elapsed().as_secs_f64();

    match result {
        Ok(value) => {
            crate::metrics::record_background_job(job_type, "success", elapsed);
            Some(value)
        }
        Err(e) => {
            crate::metrics::record_background_job(job_type, "failure", elapsed);
            error!(job = job_type, error = %e, "Background job failed");
            None
        }
    }
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        if !self.context.config.jobs.enabled {
            info!("Background jobs disabled");
            return;
        }

        info!("Starting background job scheduler");

        tokio::spawn(Self::retirement_retry_job(Arc::clone(&self)));
        tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::stale_upload_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Retry queued asset retirements
    async fn retirement_retry_job(scheduler: Arc<Self>) {
        let every = scheduler.context.config.jobs.retirement_retry_interval_secs;
        let mut interval = interval(Duration::from_secs(every.max(1)));

        loop {
            interval.tick().await;
            debug!("Running retirement retry");

            if let Some(summary) =
                run_recorded("retirement_retry", tasks::retry_retirements(&scheduler.context)).await
            {
                if summary.abandoned > 0 {
                    warn!(abandoned = summary.abandoned, "Some asset retirements were abandoned");
                }
                if summary.retired > 0 || summary.failed > 0 {
                    info!(
                        retired = summary.retired,
                        failed = summary.failed,
                        "Retirement retry pass finished"
                    );
                }
            }
        }
    }

    /// Cleanup expired sessions (runs every hour)
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;
            info!("Running expired session cleanup");
            run_recorded("session_cleanup", tasks::cleanup_expired_sessions(&scheduler.context)).await;
        }
    }

    /// Remove staged uploads abandoned by crashed or aborted requests (every hour)
    async fn stale_upload_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;

            if let Some(count) =
                run_recorded("stale_upload_cleanup", tasks::cleanup_stale_uploads(&scheduler.context)).await
            {
                if count > 0 {
                    info!("Removed {} stale staged uploads", count);
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;
            run_recorded("health_check", tasks::health_check(&scheduler.context)).await;
        }
    }
}
