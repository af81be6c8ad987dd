/// Background task implementations
use crate::{context::AppContext, error::AppResult};
use chrono::Utc;

/// Send a reminder email to every user who has not voted today
///
/// "Today" is the server's UTC date. Each recipient is attempted regardless
/// of earlier failures; there is no retry. Returns (sent, failed).
pub async fn send_vote_reminders(ctx: &AppContext) -> AppResult<(usize, usize)> {
    if !ctx.mailer.is_configured() {
        tracing::warn!("Email not configured, skipping vote reminders");
        return Ok((0, 0));
    }

    let today = Utc::now().date_naive();
    let pending = ctx.vote_store.non_voters(today).await?;

    tracing::info!(count = pending.len(), "Found users to remind");

    let mut sent = 0;
    let mut failed = 0;
    for user in pending {
        match ctx.mailer.send_vote_reminder(&user.user_email).await {
            Ok(()) => sent += 1,
            Err(e) => {
                failed += 1;
                tracing::error!(email = %user.user_email, error = %e, "Failed to send reminder");
            }
        }
    }

    Ok((sent, failed))
}

/// Cleanup expired sessions
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> AppResult<u64> {
    let (sessions_deleted, refresh_tokens_deleted) =
        ctx.account_manager.cleanup_expired_sessions().await?;

    Ok(sessions_deleted + refresh_tokens_deleted)
}

/// Health check - verify the database is reachable
pub async fn health_check(ctx: &AppContext) -> AppResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    Ok(())
}
