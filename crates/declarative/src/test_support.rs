//! Scripted attributes, resources and sinks shared by the unit tests

use crate::attribute::Attribute;
use crate::context::EventSink;
use crate::error::AttributeError;
use crate::event::Event;
use crate::resource::{Catalog, Resource};
use crate::schedule::Schedules;
use crate::value::{Value, Values};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Failure {
    Sync { message: String, fatal: bool },
    Insync(String),
}

/// Attribute that counts apply calls and fails on demand
#[derive(Debug)]
pub struct TestAttribute {
    name: String,
    should: Option<Value>,
    sensitive: bool,
    noop: bool,
    failure: Option<Failure>,
    syncs: AtomicUsize,
}

impl TestAttribute {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            should: None,
            sensitive: false,
            noop: false,
            failure: None,
            syncs: AtomicUsize::new(0),
        }
    }

    pub fn with_should(mut self, value: impl Into<Value>) -> Self {
        self.should = Some(value.into());
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn noop(mut self) -> Self {
        self.noop = true;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(Failure::Sync {
            message: message.to_string(),
            fatal: false,
        });
        self
    }

    pub fn interrupted(mut self, message: &str) -> Self {
        self.failure = Some(Failure::Sync {
            message: message.to_string(),
            fatal: true,
        });
        self
    }

    pub fn failing_insync(mut self, message: &str) -> Self {
        self.failure = Some(Failure::Insync(message.to_string()));
        self
    }

    pub fn sync_count(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }
}

impl Attribute for TestAttribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn should(&self) -> Option<Value> {
        self.should.clone()
    }

    fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    fn is_noop(&self) -> bool {
        self.noop
    }

    fn insync(&self, current: Option<&Value>) -> Result<bool, AttributeError> {
        if let Some(Failure::Insync(message)) = &self.failure {
            return Err(AttributeError::failed(message.clone()));
        }
        Ok(current == self.should.as_ref())
    }

    fn sync(&self) -> Result<(), AttributeError> {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(Failure::Sync { message, fatal: true }) => {
                Err(AttributeError::interrupted(message.clone()))
            }
            Some(Failure::Sync { message, .. }) => Err(AttributeError::failed(message.clone())),
            _ => Ok(()),
        }
    }
}

/// Resource with a scripted current state
#[derive(Debug)]
pub struct TestResource {
    reference: String,
    attributes: Vec<TestAttribute>,
    current: Values,
    retrieve_error: Option<String>,
    noop: bool,
    audit: Vec<String>,
    schedule: Option<String>,
    catalog: Option<Arc<Schedules>>,
    flush_error: Option<String>,
    flushes: AtomicUsize,
}

impl TestResource {
    pub fn new(reference: &str) -> Self {
        Self {
            reference: reference.to_string(),
            attributes: Vec::new(),
            current: Values::new(),
            retrieve_error: None,
            noop: false,
            audit: Vec::new(),
            schedule: None,
            catalog: None,
            flush_error: None,
            flushes: AtomicUsize::new(0),
        }
    }

    pub fn with_attribute(mut self, attribute: TestAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_current(mut self, name: &str, value: Value) -> Self {
        self.current.insert(name.to_string(), value);
        self
    }

    pub fn with_audit(mut self, names: &[&str]) -> Self {
        self.audit = names.iter().map(|n| (*n).to_string()).collect();
        self
    }

    pub fn with_schedule(mut self, name: &str) -> Self {
        self.schedule = Some(name.to_string());
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<Schedules>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn noop(mut self) -> Self {
        self.noop = true;
        self
    }

    pub fn failing_retrieve(mut self, message: &str) -> Self {
        self.retrieve_error = Some(message.to_string());
        self
    }

    pub fn failing_flush(mut self, message: &str) -> Self {
        self.flush_error = Some(message.to_string());
        self
    }

    pub fn test_attribute(&self, name: &str) -> &TestAttribute {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .unwrap_or_else(|| panic!("no attribute {name}"))
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Resource for TestResource {
    fn reference(&self) -> String {
        self.reference.clone()
    }

    fn attributes(&self) -> Vec<&dyn Attribute> {
        self.attributes.iter().map(|a| a as &dyn Attribute).collect()
    }

    fn retrieve(&self) -> anyhow::Result<Values> {
        match &self.retrieve_error {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(self.current.clone()),
        }
    }

    fn noop(&self) -> bool {
        self.noop
    }

    fn audit(&self) -> Vec<String> {
        self.audit.clone()
    }

    fn schedule(&self) -> Option<&str> {
        self.schedule.as_deref()
    }

    fn catalog(&self) -> Option<&dyn Catalog> {
        self.catalog.as_deref().map(|c| c as &dyn Catalog)
    }

    fn flush(&self) -> anyhow::Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        match &self.flush_error {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

/// Sink that keeps everything it is sent
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
    notices: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn send_log(&self, event: &Event) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("{}: {}", event.property, event.message));
    }

    fn log_failure(&self, _resource: &str, attribute: &str, error: &AttributeError) {
        self.failures
            .lock()
            .unwrap()
            .push(format!("{attribute}: {error}"));
    }

    fn notice(&self, _resource: &str, attribute: &str, message: &str) {
        self.notices
            .lock()
            .unwrap()
            .push(format!("{attribute}: {message}"));
    }
}
