use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::time::MissedTickBehavior;

use crate::global::GlobalState;

/// Periodically downgrades users whose paid plan has lapsed. The update is
/// idempotent, so racing against concurrent requests is harmless.
pub async fn run(global: Arc<GlobalState>) -> Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(global.config.sweep_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            _ = global.ctx.done() => return Ok(()),
            _ = ticker.tick() => {}
        }

        let result = sqlx::query(
            "UPDATE users SET premium = FALSE, approved = FALSE, plan = NULL, expires_at = NULL \
             WHERE premium = TRUE AND expires_at < NOW()",
        )
        .execute(&global.db)
        .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => {
                tracing::info!(count = done.rows_affected(), "downgraded lapsed premium users");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!("premium expiry sweep failed: {}", err);
            }
        }
    }
}
