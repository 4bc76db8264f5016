/// Periodic cleanup of expired rows
///
/// Expired refresh tokens (and their blacklist entries) and expired email
/// verification tokens are deleted once per `cleanup.interval_seconds`.

use chrono::Utc;
use sqlx::PgPool;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::auth::token_store::{self, PurgeReport};
use crate::error::AppError;
use crate::verification_token;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub tokens: PurgeReport,
    pub verification_tokens: u64,
}

pub async fn run_cleanup(pool: &PgPool) -> Result<CleanupReport, AppError> {
    let now = Utc::now();
    let tokens = token_store::purge_expired(pool, now).await?;
    let verification_tokens = verification_token::purge_expired(pool, now).await?;

    Ok(CleanupReport {
        tokens,
        verification_tokens,
    })
}

/// Spawn the cleanup loop. The first run happens one interval after start.
pub fn spawn_cleanup_job(pool: PgPool, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match run_cleanup(&pool).await {
                Ok(report) => tracing::info!(
                    outstanding_tokens = report.tokens.outstanding,
                    blacklisted_tokens = report.tokens.blacklisted,
                    verification_tokens = report.verification_tokens,
                    "Expired token cleanup finished"
                ),
                Err(e) => tracing::error!(error = %e, "Expired token cleanup failed"),
            }
        }
    })
}
