use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use calsync_core::calendar::CalendarRegistry;
use calsync_core::cursor::FileCursorStore;
use calsync_core::engine::{DEFAULT_MAX_PAGES, SyncEngine, SyncRunResult};
use calsync_core::identity::StaticUserDirectory;
use calsync_core::queue::RunGuard;
use calsync_core::store::JsonEventStore;
use calsync_provider_google::{GoogleCalendarClient, ProviderConfig};

use crate::config::Config;
use crate::utils::tui;

/// Everything one sync invocation needs, loaded once.
pub struct SyncContext {
    pub registry: CalendarRegistry,
    pub events: JsonEventStore,
    pub cursors: FileCursorStore,
    pub users: StaticUserDirectory,
    pub provider: GoogleCalendarClient,
    pub max_pages: u32,
}

impl SyncContext {
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        let provider_config = ProviderConfig::load()?;

        let registry = CalendarRegistry::load(&config.registry_path()?)?;
        let events = JsonEventStore::new(&config.events_dir()?);
        let cursors = FileCursorStore::load(&config.cursors_path()?)?;
        let users = config.user_directory();
        let provider =
            GoogleCalendarClient::new(provider_config.base_url(), &provider_config.access_token)?;

        Ok(SyncContext {
            registry,
            events,
            cursors,
            users,
            provider,
            max_pages: config.max_pages.unwrap_or(DEFAULT_MAX_PAGES),
        })
    }

    /// Slugs to operate on: all registered calendars, or just one.
    pub fn resolve(&self, filter: Option<&str>) -> Result<Vec<String>> {
        if self.registry.calendars().is_empty() {
            anyhow::bail!(
                "No calendars registered.\n\n\
                Register your first calendar with:\n  \
                calsync calendars add <slug> <calendar-id>"
            );
        }

        match filter {
            Some(slug) => match self.registry.find(slug) {
                Some(calendar) => Ok(vec![calendar.slug.clone()]),
                None => {
                    let available: Vec<_> = self
                        .registry
                        .calendars()
                        .iter()
                        .map(|c| c.slug.clone())
                        .collect();
                    anyhow::bail!(
                        "Calendar '{}' not found. Available: {}",
                        slug,
                        available.join(", ")
                    );
                }
            },
            None => Ok(self
                .registry
                .calendars()
                .iter()
                .map(|c| c.slug.clone())
                .collect()),
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncTotals {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl SyncTotals {
    fn absorb(&mut self, result: &SyncRunResult) {
        self.created += result.created;
        self.updated += result.updated;
        self.deleted += result.deleted;
    }
}

/// Run the engine for each slug in turn, printing one block per calendar.
pub async fn run_calendars(
    ctx: &mut SyncContext,
    slugs: &[String],
    force_full: bool,
    guard: &RunGuard,
) -> Result<SyncTotals> {
    let mut totals = SyncTotals::default();

    for (i, slug) in slugs.iter().enumerate() {
        let Some(_permit) = guard.begin(slug) else {
            println!("{} {}", slug.bold(), "(already syncing, skipped)".yellow());
            continue;
        };

        let calendar = ctx
            .registry
            .find_mut(slug)
            .with_context(|| format!("Calendar '{slug}' disappeared from the registry"))?;

        let spinner = tui::create_spinner(format!("{} syncing...", calendar.name));
        let result = SyncEngine::new(&ctx.provider, &mut ctx.events, &mut ctx.cursors, &ctx.users)
            .with_max_pages(ctx.max_pages)
            .import(calendar, force_full)
            .await;
        spinner.finish_and_clear();

        println!("{}", slug.bold());
        match result {
            Ok(run) => {
                println!(
                    "   {} created, {} updated, {} deleted ({} fetched over {} page{})",
                    run.created,
                    run.updated,
                    run.deleted,
                    run.fetched,
                    run.pages,
                    if run.pages == 1 { "" } else { "s" }
                );
                if run.skipped > 0 {
                    println!("   {}", format!("{} malformed event(s) skipped", run.skipped).yellow());
                }
                if !run.cursor_advanced {
                    println!("   {}", "more pages pending; next run continues".yellow());
                }
                totals.absorb(&run);
            }
            Err(e) => {
                println!("   {}", e.to_string().red());
                totals.failed += 1;
            }
        }

        if i < slugs.len() - 1 {
            println!();
        }
    }

    // Last-sync stamps changed on successful runs.
    ctx.registry.save()?;

    Ok(totals)
}

pub async fn run(calendar: Option<&str>, full: bool) -> Result<()> {
    let mut ctx = SyncContext::load()?;
    let slugs = ctx.resolve(calendar)?;
    let guard = RunGuard::new();

    let totals = run_calendars(&mut ctx, &slugs, full, &guard).await?;

    if totals.created > 0 || totals.updated > 0 || totals.deleted > 0 {
        println!(
            "\nSynced {} created, {} updated, {} deleted",
            totals.created, totals.updated, totals.deleted
        );
    }

    if totals.failed > 0 {
        anyhow::bail!("{} calendar(s) failed to sync", totals.failed);
    }

    Ok(())
}
