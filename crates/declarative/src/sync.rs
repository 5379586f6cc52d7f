//! Attribute sync engine
//!
//! Decides whether one attribute is out of sync, applies or suppresses the
//! change, and records exactly one event for it.

use crate::attribute::{Attribute, render};
use crate::audit::{audit_event, audit_message};
use crate::context::{ApplicationContext, EventSink};
use crate::error::{AttributeError, HarnessError};
use crate::event::{Event, EventStatus};
use crate::value::{REDACTED, Value};

/// What the sync engine did with an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Unmanaged or already in sync; no event
    NoAction,
    /// An event with this status was recorded
    Recorded(EventStatus),
}

/// Bring `attribute` in sync, recording an event if anything was out of sync
///
/// `noop` is the resource-wide noop flag; the attribute's own flag is
/// honoured as well. Recoverable failures become a failure event and
/// `Ok`. Fatal failures are recorded the same way and then returned as
/// [`HarnessError::Interrupted`].
pub fn sync_if_needed(
    attribute: &dyn Attribute,
    context: &mut ApplicationContext<'_>,
    sink: &dyn EventSink,
    noop: bool,
) -> Result<SyncOutcome, HarnessError> {
    let name = attribute.name().to_string();
    let current = context.current(&name).cloned();
    let historical = context.historical(&name).cloned();

    let (event, fatal) = match try_sync(
        attribute,
        context,
        current.as_ref(),
        historical.as_ref(),
        noop,
    ) {
        Ok(None) => return Ok(SyncOutcome::NoAction),
        Ok(Some(event)) => (event, None),
        Err(error) => {
            sink.log_failure(&context.reference, &name, &error);

            let mut event =
                Event::change(&context.reference, attribute, current.as_ref(), historical.as_ref());
            event.status = EventStatus::Failure;
            event.message = format!(
                "change from {} to {} failed: {}",
                render(attribute, current.as_ref()),
                render(attribute, attribute.should().as_ref()),
                error
            );
            (event, error.is_fatal().then_some(error))
        }
    };

    let status = event.status;
    sink.send_log(&event);
    context.record(event);
    context.synced_params.insert(name.clone());

    match fatal {
        Some(source) => Err(HarnessError::Interrupted {
            attribute: name,
            source,
        }),
        None => Ok(SyncOutcome::Recorded(status)),
    }
}

fn try_sync(
    attribute: &dyn Attribute,
    context: &ApplicationContext<'_>,
    current: Option<&Value>,
    historical: Option<&Value>,
    noop: bool,
) -> Result<Option<Event>, AttributeError> {
    let Some(should) = attribute.should() else {
        return Ok(None);
    };
    if attribute.safe_insync(current)? {
        return Ok(None);
    }

    let mut event = Event::change(&context.reference, attribute, current, historical);
    let audited = context.is_audited(attribute.name());
    if audited {
        event = audit_event(event, attribute, context);
    }
    let suffix = audit_message(attribute, audited, historical, current);

    if noop || attribute.is_noop() {
        event.message = if attribute.is_sensitive() {
            format!("current value {REDACTED}, should be {REDACTED} (noop){suffix}")
        } else {
            format!(
                "current value {}, should be {} (noop){suffix}",
                attribute.format_value(current),
                attribute.format_value(Some(&should))
            )
        };
        event.status = EventStatus::Noop;
    } else {
        attribute.sync()?;
        event.message = if attribute.is_sensitive() {
            format!("changed {REDACTED} to {REDACTED}{suffix}")
        } else {
            format!("{}{suffix}", attribute.change_to_s(current, Some(&should)))
        };
        event.status = EventStatus::Success;
    }

    Ok(Some(event))
}
