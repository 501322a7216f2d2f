use anyhow::{Context, Result};
use log::warn;
use owo_colors::OwoColorize;
use tokio::time::MissedTickBehavior;

use calsync_core::queue::RunGuard;

use super::sync::{SyncContext, run_calendars};

/// Run the sync on an interval until interrupted.
///
/// Each tick dispatches every registered calendar through the run guard, so
/// a calendar still mid-run from a previous tick is skipped instead of
/// racing its own cursor.
pub async fn run(every: &str) -> Result<()> {
    let period = humantime::parse_duration(every)
        .with_context(|| format!("Invalid interval '{every}' (try \"90s\" or \"15m\")"))?;

    let mut ctx = SyncContext::load()?;
    let guard = RunGuard::new();

    println!(
        "Watching {} calendar(s), syncing every {}. Ctrl-C to stop.",
        ctx.registry.calendars().len(),
        humantime::format_duration(period)
    );

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let slugs: Vec<String> = ctx
            .registry
            .calendars()
            .iter()
            .map(|c| c.slug.clone())
            .collect();

        match run_calendars(&mut ctx, &slugs, false, &guard).await {
            Ok(totals) if totals.failed > 0 => {
                warn!("{} calendar(s) failed this tick; will retry next tick", totals.failed);
            }
            Ok(_) => {}
            Err(e) => {
                // Registry/storage trouble; keep the loop alive and retry.
                println!("{}", e.to_string().red());
                warn!("Sync tick failed: {e}");
            }
        }

        println!();
    }
}
