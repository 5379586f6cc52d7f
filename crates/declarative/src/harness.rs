//! Resource harness - drives one resource through a full evaluation
//!
//! 1. Snapshot current (retrieved) and historical (cached) values
//! 2. Record the check and the current value of every audited attribute
//! 3. Sync `ensure`, then every other attribute if the resource exists
//! 4. Sweep audited attributes the sync step didn't report
//! 5. Record the sync time and flush if anything changed

use crate::attribute::{Attribute, ENSURE};
use crate::audit::capture_audit_events;
use crate::cache::{CHECKED, SYNCED, ValueCache};
use crate::context::{ApplicationContext, EventSink, LogSink};
use crate::error::{HarnessError, ScheduleError};
use crate::event::ResourceStatus;
use crate::resource::{BoxedResource, Resource};
use crate::schedule::ScheduleGate;
use crate::sync::{SyncOutcome, sync_if_needed};
use crate::value::Value;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Process-wide switches consulted by the harness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessSettings {
    /// Treat every resource as due regardless of its schedule
    #[serde(default)]
    pub ignore_schedules: bool,
    /// Report changes on every resource without applying them
    #[serde(default)]
    pub noop: bool,
}

/// Evaluates resources against an injected value cache
pub struct ResourceHarness<'a> {
    cache: &'a dyn ValueCache,
    sink: &'a dyn EventSink,
    settings: HarnessSettings,
}

impl<'a> ResourceHarness<'a> {
    /// Create a harness logging through the `log` facade
    pub fn new(cache: &'a dyn ValueCache) -> Self {
        Self {
            cache,
            sink: &LogSink,
            settings: HarnessSettings::default(),
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn EventSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_settings(mut self, settings: HarnessSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> HarnessSettings {
        self.settings
    }

    /// Whether `resource` is due for evaluation now
    pub fn scheduled(&self, resource: &dyn Resource) -> Result<bool, ScheduleError> {
        self.scheduled_at(resource, Utc::now())
    }

    pub fn scheduled_at(
        &self,
        resource: &dyn Resource,
        now: DateTime<Utc>,
    ) -> Result<bool, ScheduleError> {
        ScheduleGate::new(self.settings.ignore_schedules).scheduled(resource, self.cache, now)
    }

    /// Evaluate one resource
    ///
    /// Never fails: errors that abort the evaluation are stored on the
    /// returned status. Check [`ResourceStatus::is_fatal`] to learn whether
    /// the process must stop.
    pub fn evaluate(&self, resource: &dyn Resource) -> ResourceStatus {
        let started = Instant::now();
        let now = Utc::now();
        let mut status = ResourceStatus::new(resource.reference(), now);

        if let Err(error) = self.apply(resource, &mut status, now) {
            status.failed_because(error);
        }

        status.set_evaluation_time(started.elapsed());
        status
    }

    /// Evaluate a batch of independent resources on `jobs` threads
    ///
    /// The batch must not contain resources that depend on each other or
    /// share an identity. Statuses are returned in input order, and every
    /// resource is evaluated even if another one was interrupted.
    pub fn evaluate_batch(
        &self,
        resources: &[BoxedResource],
        jobs: usize,
    ) -> Result<Vec<ResourceStatus>> {
        if jobs <= 1 || resources.len() <= 1 {
            return Ok(resources.iter().map(|r| self.evaluate(r.as_ref())).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

        Ok(pool.install(|| {
            resources
                .par_iter()
                .map(|r| self.evaluate(r.as_ref()))
                .collect()
        }))
    }

    /// Sync one attribute within an evaluation
    pub fn sync_if_needed(
        &self,
        attribute: &dyn Attribute,
        context: &mut ApplicationContext<'_>,
    ) -> Result<SyncOutcome, HarnessError> {
        let noop = self.resource_noop(context.resource);
        sync_if_needed(attribute, context, self.sink, noop)
    }

    fn resource_noop(&self, resource: &dyn Resource) -> bool {
        self.settings.noop || resource.noop()
    }

    fn apply(
        &self,
        resource: &dyn Resource,
        status: &mut ResourceStatus,
        now: DateTime<Utc>,
    ) -> Result<(), HarnessError> {
        let current = resource.retrieve().map_err(HarnessError::Retrieve)?;
        let reference = status.resource.clone();
        let historical = self.cache.snapshot(&reference);

        let mut context = ApplicationContext::new(resource, current, historical, status);
        self.perform_changes(&mut context, now)?;

        if status.changed() && !self.resource_noop(resource) {
            self.cache.set(&reference, SYNCED, Value::from(now));
            resource.flush().map_err(HarnessError::Flush)?;
        }
        Ok(())
    }

    fn perform_changes(
        &self,
        context: &mut ApplicationContext<'_>,
        now: DateTime<Utc>,
    ) -> Result<(), HarnessError> {
        let reference = context.reference.clone();
        self.cache.set(&reference, CHECKED, Value::from(now));

        for name in &context.audited_params {
            let value = context.current(name).cloned().unwrap_or(Value::Absent);
            log::debug!("{reference}: caching audited value of {name}");
            self.cache.set(&reference, name, value);
        }

        let resource = context.resource;
        let ensure_outcome = match resource.attribute(ENSURE) {
            Some(ensure) if ensure.should().is_some() => self.sync_if_needed(ensure, context)?,
            _ => SyncOutcome::NoAction,
        };

        if ensure_outcome == SyncOutcome::NoAction {
            if context.resource_present() {
                for attribute in resource.attributes() {
                    if attribute.name() != ENSURE {
                        self.sync_if_needed(attribute, context)?;
                    }
                }
            } else {
                log::debug!("{reference}: resource does not exist, nothing to manage");
            }
        }

        capture_audit_events(context, self.sink);
        Ok(())
    }
}
