use anyhow::Result;

use crate::cli::args::{Cli, Command};
use crate::cli::context::init_configs;
use crate::cli::refuel::{RefuelMode, preview_plan, print_limits, run_refuel};
use crate::config::AppConfig;

pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    if config.bot.prometheus.enable && command_runs_jobs(&cli.command) {
        crate::monitoring::try_init_prometheus(&config.bot.prometheus)?;
    }

    dispatch(cli.command, config).await
}

async fn dispatch(command: Command, config: AppConfig) -> Result<()> {
    match command {
        Command::Run => run_refuel(&config, RefuelMode::Live).await?,
        Command::DryRun => run_refuel(&config, RefuelMode::DryRun).await?,
        Command::Limits => print_limits(&config).await?,
        Command::Plan(args) => preview_plan(&config, args)?,
        Command::Init(args) => init_configs(args)?,
    }

    Ok(())
}

fn command_runs_jobs(command: &Command) -> bool {
    matches!(command, Command::Run | Command::DryRun)
}
