//! Resource trait for the apply engine
//!
//! A Resource is a single declared unit of desired configuration state,
//! composed of attributes. Resources are produced upstream (already bound
//! to their desired values) and are read-only to the engine, apart from
//! the post-apply `flush` notification.

use crate::attribute::{Attribute, ENSURE};
use crate::schedule::Schedule;
use crate::value::{Value, Values};
use anyhow::Result;
use std::fmt;

/// Audit list entry that expands to every attribute of the resource
pub const AUDIT_ALL: &str = "all";

/// Lookup scope a resource was declared in
///
/// Only schedule resolution is needed by the engine.
pub trait Catalog: Send + Sync {
    fn schedule(&self, name: &str) -> Option<&dyn Schedule>;
}

/// Core trait for resources driven through the harness
///
/// # Example
///
/// ```ignore
/// use declarative::{Attribute, Resource, Values};
///
/// #[derive(Debug)]
/// struct File { path: String, attrs: Vec<Box<dyn Attribute>> }
///
/// impl Resource for File {
///     fn reference(&self) -> String { format!("File[{}]", self.path) }
///     fn attributes(&self) -> Vec<&dyn Attribute> {
///         self.attrs.iter().map(AsRef::as_ref).collect()
///     }
///     fn retrieve(&self) -> anyhow::Result<Values> { stat_file(&self.path) }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Stable identity across runs, e.g. `File[/etc/hosts]`
    ///
    /// Used as the value cache key.
    fn reference(&self) -> String;

    /// All attributes, in evaluation order
    fn attributes(&self) -> Vec<&dyn Attribute>;

    /// Look up an attribute by name
    fn attribute(&self, name: &str) -> Option<&dyn Attribute> {
        self.attributes().into_iter().find(|a| a.name() == name)
    }

    /// Read the current value of every attribute from the system
    fn retrieve(&self) -> Result<Values>;

    /// Whether the resource exists, given a freshly retrieved snapshot
    fn is_present(&self, current: &Values) -> bool {
        !matches!(current.get(ENSURE), Some(Value::Absent))
    }

    /// Resource-level noop
    fn noop(&self) -> bool {
        false
    }

    /// Names of attributes whose values are tracked across runs
    fn audit(&self) -> Vec<String> {
        Vec::new()
    }

    /// Name of the schedule limiting how often this resource is checked
    fn schedule(&self) -> Option<&str> {
        None
    }

    /// Catalog the resource was declared in, used to resolve schedules
    fn catalog(&self) -> Option<&dyn Catalog> {
        None
    }

    /// Post-apply notification, called once after changes were made
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Resolve the audit list of a resource to attribute names
///
/// `all` expands to every attribute. Names that match no attribute are
/// dropped with a warning. Order follows the audit list, without duplicates.
pub fn audited_attributes(resource: &dyn Resource) -> Vec<String> {
    let declared = resource.audit();
    if declared.is_empty() {
        return Vec::new();
    }

    let known: Vec<String> = resource
        .attributes()
        .iter()
        .map(|a| a.name().to_string())
        .collect();

    let mut names: Vec<String> = Vec::new();
    for name in declared {
        if name == AUDIT_ALL {
            for attr in &known {
                if !names.contains(attr) {
                    names.push(attr.clone());
                }
            }
        } else if !known.contains(&name) {
            log::warn!(
                "{}: cannot audit unknown attribute '{}'",
                resource.reference(),
                name
            );
        } else if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestAttribute, TestResource};

    #[test]
    fn test_is_present_default() {
        let res = TestResource::new("File[/tmp/a]");
        let mut current = Values::new();
        assert!(res.is_present(&current));

        current.insert(ENSURE.into(), Value::from("present"));
        assert!(res.is_present(&current));

        current.insert(ENSURE.into(), Value::Absent);
        assert!(!res.is_present(&current));
    }

    #[test]
    fn test_audited_attributes() {
        let res = TestResource::new("File[/tmp/a]")
            .with_attribute(TestAttribute::new("owner"))
            .with_attribute(TestAttribute::new("mode"))
            .with_audit(&["mode", "bogus", "mode"]);
        assert_eq!(audited_attributes(&res), vec!["mode".to_string()]);

        let res = res.with_audit(&["mode", "all"]);
        assert_eq!(
            audited_attributes(&res),
            vec!["mode".to_string(), "owner".to_string()]
        );
    }
}
