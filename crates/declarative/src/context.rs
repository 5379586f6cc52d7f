//! Application context and logging sink
//!
//! The [`ApplicationContext`] is the scratch state of one resource
//! evaluation. It is built fresh by the harness, passed by reference
//! through the sync and audit steps, and dropped when the evaluation ends.

use crate::error::AttributeError;
use crate::event::{Event, EventStatus, ResourceStatus};
use crate::resource::{Resource, audited_attributes};
use crate::value::{Value, Values};
use std::collections::BTreeSet;

/// Receiver of user-visible evaluation output
///
/// Implement this trait to route event messages somewhere other than the
/// `log` facade (a report, a UI, a test recorder).
pub trait EventSink: Send + Sync {
    /// Called once for every event recorded into a status
    fn send_log(&self, event: &Event);

    /// Called with the error behind a failure event
    fn log_failure(&self, resource: &str, attribute: &str, error: &AttributeError);

    /// Informational message that carries no event
    fn notice(&self, resource: &str, attribute: &str, message: &str);
}

/// Default sink writing through the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn send_log(&self, event: &Event) {
        let level = match event.status {
            EventStatus::Failure => log::Level::Error,
            _ => log::Level::Info,
        };
        log::log!(level, "{}/{}: {}", event.resource, event.property, event.message);
    }

    fn log_failure(&self, resource: &str, attribute: &str, error: &AttributeError) {
        if error.is_fatal() {
            log::error!("{resource}/{attribute}: {error}");
        } else {
            log::warn!("{resource}/{attribute}: {error}");
        }
    }

    fn notice(&self, resource: &str, attribute: &str, message: &str) {
        log::info!("{resource}/{attribute}: {message}");
    }
}

/// Per-evaluation snapshot shared by the sync and audit steps
pub struct ApplicationContext<'a> {
    pub resource: &'a dyn Resource,
    /// Identity of the resource, cached for messages and cache keys
    pub reference: String,
    /// Values freshly retrieved from the system
    pub current_values: Values,
    /// Values cached by previous runs
    pub historical_values: Values,
    /// Attributes under audit, in declaration order
    pub audited_params: Vec<String>,
    /// Attributes the sync engine recorded an event for this run
    pub synced_params: BTreeSet<String>,
    pub status: &'a mut ResourceStatus,
}

impl<'a> ApplicationContext<'a> {
    pub fn new(
        resource: &'a dyn Resource,
        current_values: Values,
        historical_values: Values,
        status: &'a mut ResourceStatus,
    ) -> Self {
        Self {
            resource,
            reference: resource.reference(),
            current_values,
            historical_values,
            audited_params: audited_attributes(resource),
            synced_params: BTreeSet::new(),
            status,
        }
    }

    pub fn current(&self, name: &str) -> Option<&Value> {
        self.current_values.get(name)
    }

    pub fn historical(&self, name: &str) -> Option<&Value> {
        self.historical_values.get(name)
    }

    pub fn is_audited(&self, name: &str) -> bool {
        self.audited_params.iter().any(|p| p == name)
    }

    pub fn resource_present(&self) -> bool {
        self.resource.is_present(&self.current_values)
    }

    pub fn record(&mut self, event: Event) {
        self.status.add_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::ENSURE;
    use crate::test_support::{TestAttribute, TestResource};
    use chrono::Utc;

    #[test]
    fn test_context_from_resource() {
        let res = TestResource::new("File[/a]")
            .with_attribute(TestAttribute::new("mode"))
            .with_audit(&["mode"]);
        let mut status = ResourceStatus::new(res.reference(), Utc::now());

        let mut current = Values::new();
        current.insert(ENSURE.into(), Value::Absent);
        current.insert("mode".into(), Value::from("0644"));
        let ctx = ApplicationContext::new(&res, current, Values::new(), &mut status);

        assert_eq!(ctx.reference, "File[/a]");
        assert!(ctx.is_audited("mode"));
        assert!(!ctx.is_audited("owner"));
        assert!(!ctx.resource_present());
        assert_eq!(ctx.current("mode"), Some(&Value::from("0644")));
        assert_eq!(ctx.historical("mode"), None);
        assert!(ctx.synced_params.is_empty());
    }
}
