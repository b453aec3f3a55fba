use clap::Subcommand;

use super::check::CheckArgs;
use super::config::ConfigArgs;
use super::run::RunArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Enter every workbook row into the case form
    Run(RunArgs),

    /// Read the workbook and show what would be entered, without a browser
    Check(CheckArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}
