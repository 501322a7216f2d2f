//! Core types and engine for the calsync ecosystem.
//!
//! This crate provides everything needed to run an incremental sync of a
//! remote calendar's event feed into a local event store:
//! - `event` for the provider records and the typed local event
//! - `dates` for normalizing the provider's date encodings to UTC epochs
//! - `cursor` for per-calendar sync cursor persistence
//! - `fetch` for the provider port and the paging fetch loop
//! - `reconcile` for the create/update/delete diff-and-apply step
//! - `engine` for the orchestrator driving the fetch, reconcile, commit loop

pub mod calendar;
pub mod cursor;
pub mod dates;
pub mod engine;
pub mod error;
pub mod event;
pub mod fetch;
pub mod identity;
pub mod queue;
pub mod reconcile;
pub mod store;

#[cfg(test)]
pub mod testing;

// Re-export the types callers touch most at crate root for convenience
pub use calendar::Calendar;
pub use engine::{SyncEngine, SyncRunResult};
pub use error::{SyncError, SyncResult};
pub use event::{EventStatus, RemoteEvent, StoredEvent};
