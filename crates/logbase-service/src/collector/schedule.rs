use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::collector_for;
use crate::AppState;
use crate::shutdown::ShutdownState;

/// The first `hour:00` local time strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, tz: Tz, hour: u32) -> DateTime<Utc> {
    let local_now = now.with_timezone(&tz);
    let run_time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);

    let mut day = local_now.date_naive();
    loop {
        let candidate = tz
            .from_local_datetime(&day.and_time(run_time))
            .earliest()
            .map(|local| local.with_timezone(&Utc));
        if let Some(candidate) = candidate {
            if candidate > now {
                return candidate;
            }
        }
        day += Duration::days(1);
    }
}

/// Runs the collector every day at the configured local hour until shutdown.
pub fn spawn_daily_collection<S: AppState>(state: S, shutdown: ShutdownState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let settings = state.config().collect.clone();
        loop {
            let now = Utc::now();
            let next = next_run_after(now, settings.timezone, settings.schedule_hour);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, "Scheduled next RSS collection");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.cancelled() => {
                    info!("Stopping scheduled RSS collection");
                    return;
                }
            }

            match collector_for(&state).run(Utc::now()).await {
                Ok(report) => info!(
                    saved = report.saved,
                    skipped = report.skipped,
                    failed_feeds = report.failed_feeds,
                    "Scheduled RSS collection completed"
                ),
                Err(err) => error!(error = %err, "Scheduled RSS collection failed"),
            }
        }
    })
}
