//! fwmig-provision: create or validate the migrated security group
//!
//! The invocation event is JSON read from `--event FILE` or stdin. The
//! response JSON goes to stdout; the exit status is 0 only for status 200.

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command, ValueHint};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fwmig_provisioner::aws_cli::AwsCli;
use fwmig_provisioner::config::{self, ProvisionerConfig};

mod cmd_create;
mod cmd_validate;

const GLOBAL_ARG_CONFIG: &str = "config";
const COMMAND_ARG_EVENT: &str = "event";

fn build_cli_args() -> Command {
    Command::new("fwmig-provision")
        .about("Provision and validate the AWS security group for migrated firewalld rules")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new(GLOBAL_ARG_CONFIG)
                .help("Config file (default: $FWMIG_CONFIG or /etc/fwmig/config.toml)")
                .long(GLOBAL_ARG_CONFIG)
                .short('c')
                .num_args(1)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(cmd_create::command())
        .subcommand(cmd_validate::command())
        .subcommand_required(true)
}

/// `--event FILE`, shared by every subcommand
fn event_arg() -> Arg {
    Arg::new(COMMAND_ARG_EVENT)
        .help("Invocation event JSON (default: read stdin)")
        .long(COMMAND_ARG_EVENT)
        .short('e')
        .num_args(1)
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn read_event(args: &ArgMatches) -> Result<Value> {
    let content = match args.get_one::<PathBuf>(COMMAND_ARG_EVENT) {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read event from stdin")?;
            buf
        }
    };
    serde_json::from_str(&content).context("Event is not valid JSON")
}

fn print_response(response: &Value) -> Result<()> {
    let json = serde_json::to_string_pretty(response).context("Failed to serialize response")?;
    println!("{json}");
    Ok(())
}

fn aws_cli(config: &ProvisionerConfig) -> AwsCli {
    AwsCli::new(&config.provision.aws_cli)
        .with_region(config.provision.region.clone())
        .with_profile(config.provision.profile.clone())
}

fn main() -> ExitCode {
    let args = build_cli_args().get_matches();
    match run(&args) {
        Ok(200) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("FATAL: fwmig-provision failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &ArgMatches) -> Result<u16> {
    let config = config::load_config(args.get_one::<PathBuf>(GLOBAL_ARG_CONFIG).map(|p| p.as_path()))?;
    init_logging(&config.logging.level)?;

    match &config.source {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => warn!("No config file found, using defaults"),
    }

    let Some((cmd, sub_args)) = args.subcommand() else {
        return Err(anyhow!("no subcommand given"));
    };
    match cmd {
        cmd_create::COMMAND => cmd_create::run(&config, sub_args),
        cmd_validate::COMMAND => cmd_validate::run(&config, sub_args),
        _ => Err(anyhow!("invalid subcommand {cmd}")),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{level}'"))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}
