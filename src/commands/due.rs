use anyhow::Result;
use chrono::{DateTime, Utc};
use declarative::{
    Attribute, CHECKED, Catalog, FileCache, ResourceHarness, Schedules, ValueCache, Values,
};

use crate::Context;
use crate::cli::DueArgs;
use crate::config::Config;
use crate::ui;

/// A resource known only by its identity and schedule name
#[derive(Debug)]
struct ScheduledResource<'a> {
    reference: String,
    schedule: Option<String>,
    schedules: &'a Schedules,
}

impl declarative::Resource for ScheduledResource<'_> {
    fn reference(&self) -> String {
        self.reference.clone()
    }

    fn attributes(&self) -> Vec<&dyn Attribute> {
        Vec::new()
    }

    fn retrieve(&self) -> Result<Values> {
        Ok(Values::new())
    }

    fn schedule(&self) -> Option<&str> {
        self.schedule.as_deref()
    }

    fn catalog(&self) -> Option<&dyn Catalog> {
        Some(self.schedules)
    }
}

pub fn run(ctx: &Context, args: DueArgs) -> Result<()> {
    let config = Config::load()?;
    let cache = FileCache::load(config.cache_path()?)?;
    let now = args.at.unwrap_or_else(Utc::now);

    let due = is_due(&config, &cache, &args.resource, args.schedule.as_deref(), now)?;

    if ctx.quiet {
        println!("{}", if due { "yes" } else { "no" });
        return Ok(());
    }

    ui::header(&args.resource);
    ui::kv("schedule", args.schedule.as_deref().unwrap_or("none"));
    let checked = cache
        .get(&args.resource, CHECKED)
        .map_or_else(|| "never".to_string(), |v| v.to_string());
    ui::kv("last checked", &checked);
    if config.ignore_schedules {
        ui::dim("schedules are ignored by configuration");
    }
    ui::kv("due", &ui::yes_no(due));
    Ok(())
}

/// Run the schedule gate for `resource` against the configured schedules
pub fn is_due(
    config: &Config,
    cache: &dyn ValueCache,
    resource: &str,
    schedule: Option<&str>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let resource = ScheduledResource {
        reference: resource.to_string(),
        schedule: schedule.map(ToString::to_string),
        schedules: &config.schedules,
    };

    let harness = ResourceHarness::new(cache).with_settings(config.settings());
    Ok(harness.scheduled_at(&resource, now)?)
}
