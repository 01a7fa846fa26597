mod cli;
mod commands;
mod config;
mod error;
mod input;
mod output;

use crate::{
    cli::{Args, Commands},
    commands::{AnalyzeOptions, CommandExecutor},
    config::AppConfig,
    error::{CliError, Result},
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use std::process;
use std::time::Duration;
use tracing::{Level, debug, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        #[cfg(feature = "colored-output")]
        {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        #[cfg(not(feature = "colored-output"))]
        {
            eprintln!("Error: {}", e);
        }
        process::exit(e.exit_code());
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet)?;

    // Load configuration
    let config = AppConfig::load(args.config.as_deref())?;
    debug!("Loaded config: {:?}", config);

    match args.command {
        Some(Commands::Completions { shell }) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }

        Some(Commands::Config { show, reset }) => {
            if reset {
                AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults");
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }

        None => {
            let input = args.input.ok_or_else(|| {
                CliError::InvalidInput("an input is required (-i <file|url>)".to_string())
            })?;

            let options = AnalyzeOptions {
                input,
                input_format: args.input_format,
                format: args.format.unwrap_or(config.default_output_format),
                output_file: args.output_file,
                dump: !args.disable_dump,
                strict: args.validate,
                timeout: Duration::from_secs(args.timeout.unwrap_or(config.default_timeout)),
                show_progress: !args.quiet,
            };
            CommandExecutor::new(config).analyze(&options).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .with(filter)
        .init();

    Ok(())
}
