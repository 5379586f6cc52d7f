//! # Declarative
//!
//! Per-resource apply engine for declarative configuration management.
//!
//! Given a resource whose attributes carry desired values, the engine
//! retrieves the current state, brings each out-of-sync attribute in line
//! (or only reports it in noop mode), detects drift on audited attributes
//! against values cached by earlier runs, and returns a structured status
//! describing every change.
//!
//! ## Core Concepts
//!
//! - **Attribute**: One managed property of a resource, with an optional desired value
//! - **Resource**: A managed entity exposing its attributes and current state
//! - **ValueCache**: Per-resource key/value store persisted across runs
//! - **Schedule**: Gate deciding whether a resource is due for evaluation
//! - **ResourceHarness**: Drives one resource through a full evaluation
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{MemoryCache, ResourceHarness};
//!
//! let cache = MemoryCache::new();
//! let harness = ResourceHarness::new(&cache);
//!
//! if harness.scheduled(&resource)? {
//!     let status = harness.evaluate(&resource);
//!     for event in status.events() {
//!         println!("{}: {}", event.property, event.message);
//!     }
//!     if status.is_fatal() {
//!         anyhow::bail!("evaluation interrupted");
//!     }
//! }
//! ```
//!
//! ## Provider Traits
//!
//! - [`ValueCache`]: Where checked/synced times and audited values live
//! - [`EventSink`]: Receives event messages, failures and notices
//! - [`Catalog`]: Resolves schedule names for a resource
//!
//! None of these tie the crate to a particular storage backend or UI.

pub mod attribute;
pub mod audit;
pub mod cache;
pub mod context;
pub mod error;
pub mod event;
pub mod harness;
pub mod resource;
pub mod schedule;
pub mod sync;
pub mod value;

#[cfg(test)]
mod test_support;

// Re-export main types at crate root
pub use attribute::{Attribute, ENSURE};
pub use audit::{audit_event, audit_message, audited_values_equal, capture_audit_events};
pub use cache::{CHECKED, FileCache, MemoryCache, SYNCED, ValueCache};
pub use context::{ApplicationContext, EventSink, LogSink};
pub use error::{AttributeError, HarnessError, ScheduleError};
pub use event::{Event, EventStatus, ResourceStatus};
pub use harness::{HarnessSettings, ResourceHarness};
pub use resource::{AUDIT_ALL, BoxedResource, Catalog, Resource, audited_attributes};
pub use schedule::{
    Period, PeriodMatch, PeriodSchedule, Schedule, ScheduleGate, Schedules, TimeRange,
};
pub use sync::{SyncOutcome, sync_if_needed};
pub use value::{REDACTED, Value, Values};
