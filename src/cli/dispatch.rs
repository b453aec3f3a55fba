use super::check::cmd_check;
use super::config::cmd_config;
use super::env::CliArgs;
use super::run::cmd_run;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Check(args) => cmd_check(args, ctx, cli.output).await,
        Commands::Config(args) => cmd_config(args, ctx, cli.output).await,
    }
}
