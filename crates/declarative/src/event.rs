//! Events and resource status
//!
//! An [`Event`] records one attribute decision. A [`ResourceStatus`] is the
//! outcome of evaluating one resource: its events in order, plus a failure
//! cause when the evaluation as a whole was aborted.

use crate::attribute::Attribute;
use crate::error::HarnessError;
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of an attribute decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// The change was applied
    Success,
    /// The change was attempted and failed
    Failure,
    /// The change was computed but not applied
    Noop,
    /// Drift was observed on an audited attribute
    Audit,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Noop => "noop",
            Self::Audit => "audit",
        })
    }
}

/// Record of one attribute decision
///
/// Values of sensitive attributes are replaced by the redaction token when
/// the event is created, so nothing downstream can render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub resource: String,
    pub property: String,
    pub previous_value: Option<Value>,
    pub desired_value: Option<Value>,
    pub historical_value: Option<Value>,
    pub status: EventStatus,
    pub message: String,
    pub audited: bool,
    pub time: DateTime<Utc>,
}

impl Event {
    /// Build a change event for `attribute`, redacting if it is sensitive
    pub fn change(
        resource: &str,
        attribute: &dyn Attribute,
        current: Option<&Value>,
        historical: Option<&Value>,
    ) -> Self {
        let should = attribute.should();
        let sensitive = attribute.is_sensitive();
        let keep = |v: Option<Value>| {
            if sensitive {
                v.map(|_| Value::redacted())
            } else {
                v
            }
        };

        Self {
            resource: resource.to_string(),
            property: attribute.name().to_string(),
            previous_value: keep(current.cloned()),
            desired_value: keep(should),
            historical_value: keep(historical.cloned()),
            status: EventStatus::Success,
            message: String::new(),
            audited: false,
            time: Utc::now(),
        }
    }
}

/// Outcome of evaluating one resource
#[derive(Debug)]
pub struct ResourceStatus {
    pub resource: String,
    /// When the evaluation started
    pub time: DateTime<Utc>,
    events: Vec<Event>,
    change_count: usize,
    out_of_sync_count: usize,
    failure: Option<HarnessError>,
    evaluation_time: Option<Duration>,
}

impl ResourceStatus {
    pub fn new(resource: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            resource: resource.into(),
            time,
            events: Vec::new(),
            change_count: 0,
            out_of_sync_count: 0,
            failure: None,
            evaluation_time: None,
        }
    }

    /// Append an event; events are never modified after this
    pub fn add_event(&mut self, event: Event) {
        if event.status == EventStatus::Success {
            self.change_count += 1;
        }
        if event.status != EventStatus::Audit {
            self.out_of_sync_count += 1;
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_for<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.property == property)
    }

    /// Whether any change was applied
    pub fn changed(&self) -> bool {
        self.change_count > 0
    }

    pub fn change_count(&self) -> usize {
        self.change_count
    }

    /// Number of attributes found out of sync, audits excluded
    pub fn out_of_sync_count(&self) -> usize {
        self.out_of_sync_count
    }

    /// Whether any individual attribute change failed
    pub fn has_failed_events(&self) -> bool {
        self.events.iter().any(|e| e.status == EventStatus::Failure)
    }

    /// Record why the evaluation as a whole failed
    pub fn failed_because(&mut self, error: HarnessError) {
        log::error!("{}: {}", self.resource, error);
        self.failure = Some(error);
    }

    /// Whether the evaluation as a whole failed
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure(&self) -> Option<&HarnessError> {
        self.failure.as_ref()
    }

    /// Whether the evaluation was interrupted and the caller must stop
    pub fn is_fatal(&self) -> bool {
        self.failure.as_ref().is_some_and(HarnessError::is_fatal)
    }

    pub fn evaluation_time(&self) -> Option<Duration> {
        self.evaluation_time
    }

    pub(crate) fn set_evaluation_time(&mut self, elapsed: Duration) {
        self.evaluation_time = Some(elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestAttribute;
    use crate::value::REDACTED;

    fn event(status: EventStatus) -> Event {
        let attr = TestAttribute::new("mode").with_should("0644");
        let mut event = Event::change("File[/a]", &attr, Some(&Value::from("0755")), None);
        event.status = status;
        event
    }

    #[test]
    fn test_change_event_values() {
        let attr = TestAttribute::new("mode").with_should("0644");
        let event = Event::change(
            "File[/a]",
            &attr,
            Some(&Value::from("0755")),
            Some(&Value::from("0700")),
        );

        assert_eq!(event.property, "mode");
        assert_eq!(event.previous_value, Some(Value::from("0755")));
        assert_eq!(event.desired_value, Some(Value::from("0644")));
        assert_eq!(event.historical_value, Some(Value::from("0700")));
        assert!(!event.audited);
    }

    #[test]
    fn test_change_event_redacts_sensitive() {
        let attr = TestAttribute::new("password")
            .with_should("hunter2")
            .sensitive();
        let event = Event::change("User[bob]", &attr, Some(&Value::from("letmein")), None);

        assert_eq!(event.previous_value, Some(Value::from(REDACTED)));
        assert_eq!(event.desired_value, Some(Value::from(REDACTED)));
        assert_eq!(event.historical_value, None);

        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("letmein"));
    }

    #[test]
    fn test_status_counters() {
        let mut status = ResourceStatus::new("File[/a]", Utc::now());
        status.add_event(event(EventStatus::Audit));
        assert!(!status.changed());
        assert_eq!(status.out_of_sync_count(), 0);

        status.add_event(event(EventStatus::Noop));
        status.add_event(event(EventStatus::Success));
        status.add_event(event(EventStatus::Failure));

        assert!(status.changed());
        assert_eq!(status.change_count(), 1);
        assert_eq!(status.out_of_sync_count(), 3);
        assert!(status.has_failed_events());
        assert!(!status.failed());
        assert_eq!(status.events_for("mode").count(), 4);
    }
}
