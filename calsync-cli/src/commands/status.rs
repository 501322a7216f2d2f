use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;

use calsync_core::calendar::CalendarRegistry;
use calsync_core::event::EventStatus;
use calsync_core::store::{EventStore, JsonEventStore};

use crate::config::Config;

pub async fn run(calendar: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let registry = CalendarRegistry::load(&config.registry_path()?)?;
    let mut events = JsonEventStore::new(&config.events_dir()?);

    let calendars: Vec<_> = registry
        .calendars()
        .iter()
        .filter(|c| calendar.is_none_or(|slug| c.slug == slug))
        .collect();

    if calendars.is_empty() {
        match calendar {
            Some(slug) => anyhow::bail!("Calendar '{}' not found", slug),
            None => {
                println!("No calendars registered.");
                return Ok(());
            }
        }
    }

    for (i, cal) in calendars.iter().enumerate() {
        println!("{} ({})", cal.slug.bold(), cal.calendar_id);

        let confirmed = events.list_by_status(&cal.slug, EventStatus::Confirmed)?.len();
        let tentative = events.list_by_status(&cal.slug, EventStatus::Tentative)?.len();
        println!("   {} confirmed, {} tentative", confirmed, tentative);

        match cal.last_synced {
            Some(at) => println!("   last synced {}", render_ago(at)),
            None => println!("   {}", "never synced".yellow()),
        }

        if i < calendars.len() - 1 {
            println!();
        }
    }

    Ok(())
}

fn render_ago(at: chrono::DateTime<Utc>) -> String {
    let elapsed = Utc::now() - at;
    match elapsed.to_std() {
        Ok(duration) => {
            // Drop sub-second noise before rendering.
            let rounded = std::time::Duration::from_secs(duration.as_secs());
            format!("{} ago", humantime::format_duration(rounded))
        }
        Err(_) => at.to_rfc3339(),
    }
}
