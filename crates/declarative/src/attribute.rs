//! Attribute capability interface
//!
//! An attribute is one named facet of a resource's state (a file's mode, a
//! package's version, whether something exists at all). The engine never
//! looks at concrete attribute kinds; everything it needs goes through
//! this trait.

use crate::error::AttributeError;
use crate::value::Value;
use std::fmt;

/// Name of the attribute controlling existence of a resource
pub const ENSURE: &str = "ensure";

/// Capabilities the engine needs from a single attribute
///
/// # Example
///
/// ```ignore
/// use declarative::{Attribute, AttributeError, Value};
///
/// #[derive(Debug)]
/// struct Mode { path: String, want: String }
///
/// impl Attribute for Mode {
///     fn name(&self) -> &str { "mode" }
///     fn should(&self) -> Option<Value> { Some(Value::from(self.want.as_str())) }
///     fn sync(&self) -> Result<(), AttributeError> {
///         set_mode(&self.path, &self.want)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Attribute: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Desired value, if the attribute is managed
    fn should(&self) -> Option<Value>;

    /// Whether values must be redacted from events and messages
    fn is_sensitive(&self) -> bool {
        false
    }

    /// Attribute-level noop: report changes without applying them
    fn is_noop(&self) -> bool {
        false
    }

    /// Compare the current value against the desired one
    ///
    /// `current` is `None` when retrieval did not report a value; override
    /// this for attributes with a looser notion of equality (e.g. unordered
    /// lists, normalized modes).
    fn insync(&self, current: Option<&Value>) -> Result<bool, AttributeError> {
        Ok(current == self.should().as_ref())
    }

    /// In-sync test that treats an unmanaged attribute as in sync
    fn safe_insync(&self, current: Option<&Value>) -> Result<bool, AttributeError> {
        if self.should().is_none() {
            return Ok(true);
        }
        self.insync(current)
    }

    /// Apply the desired value to the system
    fn sync(&self) -> Result<(), AttributeError>;

    /// Human-readable form of a value of this attribute
    fn format_value(&self, value: Option<&Value>) -> String {
        value.map_or_else(|| Value::Absent.to_string(), ToString::to_string)
    }

    /// Describe the transition from `current` to `should`
    fn change_to_s(&self, current: Option<&Value>, should: Option<&Value>) -> String {
        let current_absent = current.is_none_or(Value::is_absent);
        let should_absent = should.is_none_or(Value::is_absent);

        if current_absent {
            format!("defined '{}' as {}", self.name(), self.format_value(should))
        } else if should_absent {
            format!(
                "undefined '{}' from {}",
                self.name(),
                self.format_value(current)
            )
        } else {
            format!(
                "{} changed {} to {}",
                self.name(),
                self.format_value(current),
                self.format_value(should)
            )
        }
    }
}

/// Render a value for user-visible text, honouring redaction
pub(crate) fn render(attribute: &dyn Attribute, value: Option<&Value>) -> String {
    if attribute.is_sensitive() {
        crate::value::REDACTED.to_string()
    } else {
        attribute.format_value(value)
    }
}
