use anyhow::Result;
use owo_colors::OwoColorize;

use calsync_core::calendar::{Calendar, CalendarRegistry};
use calsync_core::cursor::{CursorStore, FileCursorStore};
use calsync_core::store::{EventStore, JsonEventStore};

use crate::config::Config;

pub fn add(slug: &str, calendar_id: &str, name: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let mut registry = CalendarRegistry::load(&config.registry_path()?)?;

    let name = name.unwrap_or(slug);
    registry.add(Calendar::new(slug, calendar_id, name))?;
    registry.save()?;

    println!("{} Registered '{}' for {}", "✓".green(), slug, calendar_id);
    println!("Run `calsync sync --calendar {slug}` to import its events.");

    Ok(())
}

pub fn list() -> Result<()> {
    let config = Config::load()?;
    let registry = CalendarRegistry::load(&config.registry_path()?)?;

    if registry.calendars().is_empty() {
        println!("No calendars registered.");
        return Ok(());
    }

    for calendar in registry.calendars() {
        let synced = match calendar.last_synced {
            Some(at) => at.to_rfc3339(),
            None => "never".to_string(),
        };
        println!(
            "{}  {}  last synced: {}",
            calendar.slug.bold(),
            calendar.calendar_id,
            synced
        );
    }

    Ok(())
}

/// Unregister a calendar and cascade: its stored events and cursor go too.
pub fn remove(slug: &str) -> Result<()> {
    let config = Config::load()?;
    let mut registry = CalendarRegistry::load(&config.registry_path()?)?;

    let Some(calendar) = registry.remove(slug) else {
        anyhow::bail!("Calendar '{}' not found", slug);
    };

    let mut events = JsonEventStore::new(&config.events_dir()?);
    events.delete_calendar(&calendar.slug)?;

    let mut cursors = FileCursorStore::load(&config.cursors_path()?)?;
    cursors.clear(&calendar.calendar_id);
    cursors.commit()?;

    registry.save()?;

    println!("{} Removed '{}' and its events", "✓".green(), slug);

    Ok(())
}
