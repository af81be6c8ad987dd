use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        if self.context.config.reminder.enabled {
            tokio::spawn(Self::vote_reminder_job(Arc::clone(&self)));
        } else {
            info!("Vote reminder job disabled");
        }

        tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Email users who have not voted today (runs on the configured interval)
    async fn vote_reminder_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(
            scheduler.context.config.reminder.interval_secs,
        ));

        // The first tick completes immediately; consume it so a restart does
        // not fire a reminder blast.
        interval.tick().await;

        loop {
            interval.tick().await;
            info!("Running vote reminder job");

            match tasks::send_vote_reminders(&scheduler.context).await {
                Ok((sent, failed)) => {
                    if sent > 0 || failed > 0 {
                        info!(sent, failed, "Vote reminder run complete");
                    } else {
                        info!("Vote reminder: everyone has voted today");
                    }
                }
                Err(e) => error!("Failed to send vote reminders: {}", e),
            }
        }
    }

    /// Cleanup expired sessions (runs every hour)
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600)); // Every hour

        loop {
            interval.tick().await;
            info!("Running expired session cleanup");

            match tasks::cleanup_expired_sessions(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired tokens (sessions + refresh tokens)", count);
                    } else {
                        info!("Session cleanup: no expired tokens found");
                    }
                }
                Err(e) => error!("Failed to cleanup expired sessions: {}", e),
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300)); // Every 5 minutes

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    // Silent success - health is good
                }
                Err(e) => error!("Health check failed: {}", e),
            }
        }
    }
}
