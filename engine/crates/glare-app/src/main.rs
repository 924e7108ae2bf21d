mod app;
mod cli;

use clap::Parser;
use glare_crate_tools::init_log::init_log;

use crate::app::WinitApp;
use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    init_log();

    let cli = Cli::parse();
    let config = cli.initial_config()?;

    WinitApp::run(config);
    Ok(())
}
