//! Audit reconciler - drift detection on audited attributes
//!
//! Audited attributes have their value cached on every run. When the cached
//! value differs from the one just retrieved, the drift is reported, either
//! on the sync engine's own event (for attributes it visited) or by the
//! sweep in [`capture_audit_events`] (for everything else).

use crate::attribute::{Attribute, render};
use crate::context::{ApplicationContext, EventSink};
use crate::event::{Event, EventStatus};
use crate::value::Value;

/// Equality used when comparing cached and current values
///
/// Timestamps only survive the cache with microsecond precision, so two
/// times agreeing to the microsecond are considered equal. An unreported
/// value and an explicit `Absent` are the same thing.
pub fn audited_values_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    let a = a.filter(|v| !v.is_absent());
    let b = b.filter(|v| !v.is_absent());
    if a == b {
        return true;
    }
    match (a.and_then(Value::as_time), b.and_then(Value::as_time)) {
        (Some(x), Some(y)) => {
            x.timestamp() == y.timestamp()
                && x.timestamp_subsec_micros() == y.timestamp_subsec_micros()
        }
        _ => false,
    }
}

/// Mark `event` as an audit event, describing drift if there was any
///
/// The comparison uses the raw values held by the context; the event's own
/// values may already be redacted.
pub fn audit_event(mut event: Event, attribute: &dyn Attribute, context: &ApplicationContext<'_>) -> Event {
    event.audited = true;
    event.status = EventStatus::Audit;

    let historical = context.historical(attribute.name());
    let current = context.current(attribute.name());
    if !audited_values_equal(historical, current) {
        event.message = format!(
            "previously recorded value {} has been changed to {}",
            render(attribute, historical),
            render(attribute, current)
        );
    }
    event
}

/// Suffix appended to sync messages of audited attributes that drifted
pub fn audit_message(
    attribute: &dyn Attribute,
    audited: bool,
    historical: Option<&Value>,
    current: Option<&Value>,
) -> String {
    match historical {
        Some(previous) if audited && !audited_values_equal(Some(previous), current) => {
            format!(
                " (previously recorded value was {})",
                render(attribute, Some(previous))
            )
        }
        _ => String::new(),
    }
}

/// Report drift on audited attributes the sync engine did not handle
pub fn capture_audit_events(context: &mut ApplicationContext<'_>, sink: &dyn EventSink) {
    let resource = context.resource;
    let pending: Vec<String> = context
        .audited_params
        .iter()
        .filter(|name| !context.synced_params.contains(*name))
        .cloned()
        .collect();

    for name in pending {
        let Some(attribute) = resource.attribute(&name) else {
            continue;
        };
        let current = context.current(&name);

        match context.historical(&name) {
            Some(historical) => {
                if audited_values_equal(Some(historical), current) {
                    continue;
                }
                let event = Event::change(&context.reference, attribute, current, Some(historical));
                let event = audit_event(event, attribute, context);
                sink.send_log(&event);
                context.record(event);
            }
            None => {
                let message = format!("newly-recorded value {}", render(attribute, current));
                sink.notice(&context.reference, &name, &message);
            }
        }
    }
}
