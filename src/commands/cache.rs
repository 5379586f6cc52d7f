use anyhow::{Context as _, Result};
use declarative::{CHECKED, FileCache, ValueCache};

use crate::Context;
use crate::cli::CacheCommand;
use crate::config::Config;
use crate::ui;

/// Longest value shown before truncation
const MAX_VALUE_WIDTH: usize = 72;

pub fn run(ctx: &Context, cmd: CacheCommand) -> Result<()> {
    let config = Config::load()?;
    let cache = FileCache::load(config.cache_path()?)?;

    match cmd {
        CacheCommand::List => list(ctx, &cache),
        CacheCommand::Show { resource, json } => show(&cache, &resource, json),
        CacheCommand::Clear { resource } => clear(ctx, &cache, &resource),
    }
}

fn list(ctx: &Context, cache: &FileCache) -> Result<()> {
    let resources = cache.resources();

    if ctx.quiet {
        for resource in &resources {
            println!("{resource}");
        }
        return Ok(());
    }

    if resources.is_empty() {
        ui::info(&format!("Cache is empty ({})", cache.path().display()));
        return Ok(());
    }

    ui::header(&format!("Cached resources ({})", resources.len()));
    for resource in &resources {
        let checked = cache
            .get(resource, CHECKED)
            .map_or_else(|| "never checked".to_string(), |v| v.to_string());
        ui::kv(resource, &checked);
    }
    Ok(())
}

fn show(cache: &FileCache, resource: &str, json: bool) -> Result<()> {
    let values = cache.snapshot(resource);
    if values.is_empty() {
        anyhow::bail!("No cached values for '{resource}'");
    }

    if json {
        let out = serde_json::to_string_pretty(&values).context("Failed to serialize values")?;
        println!("{out}");
        return Ok(());
    }

    ui::header(resource);
    for (key, value) in &values {
        ui::kv(key, &ui::truncate(&value.to_string(), MAX_VALUE_WIDTH));
    }
    Ok(())
}

fn clear(ctx: &Context, cache: &FileCache, resource: &str) -> Result<()> {
    if !forget(cache, resource)? {
        ui::warn(&format!("Nothing cached for '{resource}'"));
        return Ok(());
    }
    if !ctx.quiet {
        ui::success(&format!("Forgot cached values for '{resource}'"));
    }
    Ok(())
}

/// Drop a resource from the cache and persist the result
fn forget(cache: &FileCache, resource: &str) -> Result<bool> {
    if !cache.forget(resource) {
        return Ok(false);
    }
    cache.save()?;
    Ok(true)
}
