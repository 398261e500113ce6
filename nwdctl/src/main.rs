use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use log::LevelFilter;
use nwdctl::{cli::{Cli, Commands}, commands::CommandHandler, config::CtlConfig, ctx::AppContext};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp(None);
    // RUST_LOG overrides the verbosity flags
    builder.parse_default_env();
    builder.init();
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    // needs no schema directory
    if matches!(cli.command, Commands::ConfigSchema) {
        return CtlConfig::json_schema();
    }
    let config = CtlConfig::load(&cli.config).await?;
    let ctx = AppContext::new(config, &cli.schema).await?;
    CommandHandler::handle(&ctx, &cli.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
