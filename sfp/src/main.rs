// sfp/src/main.rs
use std::process;

use clap::Parser;
use colored::Colorize;
use sfp_common::config::Config;
use sfp_common::error::{SfpError, ISSUE_URL};
use sfp_core::{installed_binary, InstallResolver, Resolution};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod cli;
use cli::CliArgs;

fn init_logging(verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("SFP_LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .without_time()
        .try_init();
}

fn print_installed_path(config: &Config) -> bool {
    match installed_binary(config.package_dir()) {
        Some(binary) => {
            println!("{}", binary.display());
            true
        }
        None => {
            eprintln!(
                "{}: no sfdx location recorded under {}",
                "Error".red().bold(),
                config.lib_dir().display()
            );
            false
        }
    }
}

async fn run(cli_args: &CliArgs) -> Result<Resolution, SfpError> {
    let mut config = Config::load()?;
    cli_args.apply(&mut config);
    debug!(
        "Installing into {} for {}",
        config.package_dir().display(),
        config.target
    );
    InstallResolver::new(config)?.run().await
}

#[tokio::main]
async fn main() {
    let cli_args = CliArgs::parse();
    init_logging(cli_args.verbose);

    if cli_args.print_path {
        let found = Config::load()
            .map(|mut config| {
                cli_args.apply(&mut config);
                print_installed_path(&config)
            })
            .unwrap_or_else(|e| {
                error!("{:#}", e);
                false
            });
        process::exit(if found { 0 } else { 1 });
    }

    match run(&cli_args).await {
        Ok(resolution) => {
            debug!("Resolved: {:?}", resolution);
        }
        Err(e) => {
            error!("Install failed: {:#}", e);
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            if e.is_reportable() {
                eprintln!(
                    "{} {}",
                    "Please report this full log at".yellow(),
                    ISSUE_URL
                );
            }
            process::exit(1);
        }
    }
}
