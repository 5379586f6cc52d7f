use anyhow::Result;
use declarative::PeriodSchedule;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::{paths, ui};

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let path = paths::config_file()?;
    let config = Config::load_from(&path)?;

    ui::header("Configuration");
    let origin = if path.exists() { "" } else { " (not found, using defaults)" };
    ui::kv("Config file", &format!("{}{origin}", path.display()));
    ui::kv("Cache file", &config.cache_path()?.display().to_string());
    ui::kv("Ignore schedules", &ui::yes_no(config.ignore_schedules));
    ui::kv("Noop", &ui::yes_no(config.noop));

    ui::section(&format!("Schedules ({})", config.schedules.iter().count()));
    if config.schedules.iter().next().is_none() {
        ui::dim("No schedules defined");
    }
    for (name, schedule) in config.schedules.iter() {
        ui::kv(name, &describe(schedule));
    }

    if !ctx.quiet {
        println!();
        ui::dim(&format!(
            "Override locations with {} and {}.",
            paths::ENV_CONFIG_DIR,
            paths::ENV_STATE_DIR
        ));
    }
    Ok(())
}

/// One-line summary of a schedule
fn describe(schedule: &PeriodSchedule) -> String {
    let mut parts = Vec::new();

    match schedule.period {
        Some(period) => {
            let period = format!("{period:?}").to_lowercase();
            if schedule.repeat > 1 {
                parts.push(format!("{} times {period}", schedule.repeat));
            } else {
                parts.push(period);
            }
            parts.push(format!("{:?}", schedule.periodmatch).to_lowercase());
        }
        None => parts.push("any time".to_string()),
    }

    if let Some(range) = schedule.range {
        parts.push(format!("within {}", String::from(range)));
    }
    parts.join(", ")
}
