//! fwmig-extract: read firewalld state and save it as security group rules
//!
//! Prints the artifact JSON on stdout and writes it to the configured output
//! directory. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fwmig_extractor::config::{self, ExtractorConfig};
use fwmig_extractor::export::{self, Owner};
use fwmig_extractor::firewalld::{self, FirewallCmd};

const ARG_CONFIG: &str = "config";
const ARG_ZONE: &str = "zone";
const ARG_OUTPUT_DIR: &str = "output-dir";
const ARG_NO_SAVE: &str = "no-save";

fn build_cli_args() -> Command {
    Command::new("fwmig-extract")
        .about("Extract firewalld rules as AWS security group ingress rules")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new(ARG_CONFIG)
                .help("Config file (default: $FWMIG_CONFIG or /etc/fwmig/config.toml)")
                .long(ARG_CONFIG)
                .short('c')
                .num_args(1)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_ZONE)
                .help("firewalld zone to read instead of the default zone")
                .long(ARG_ZONE)
                .num_args(1)
                .value_name("ZONE"),
        )
        .arg(
            Arg::new(ARG_OUTPUT_DIR)
                .help("Directory for firewall_rules.json")
                .long(ARG_OUTPUT_DIR)
                .short('o')
                .num_args(1)
                .value_name("DIR"),
        )
        .arg(
            Arg::new(ARG_NO_SAVE)
                .help("Only print the rules, do not write the artifact")
                .long(ARG_NO_SAVE)
                .action(ArgAction::SetTrue),
        )
}

fn main() {
    let args = build_cli_args().get_matches();
    if let Err(e) = run(&args) {
        eprintln!("FATAL: fwmig-extract failed: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: &ArgMatches) -> Result<()> {
    let mut config = config::load_config(args.get_one::<PathBuf>(ARG_CONFIG).map(|p| p.as_path()))?;
    init_logging(&config.logging.level)?;

    match &config.source {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => warn!("No config file found, using defaults"),
    }
    apply_overrides(&mut config, args);

    let source = FirewallCmd::new(&config.extract.firewall_cmd, config.extract.zone.clone());
    let result = firewalld::collect(&source)?;

    let json = result.to_json_pretty().context("Failed to serialize rules")?;
    println!("{json}");

    if args.get_flag(ARG_NO_SAVE) {
        return Ok(());
    }

    let owner = Owner::detect();
    let output_dir = owner.expand_home(&config.extract.output_dir);
    let path = export::export(&result, &output_dir, &config.extract.file_name, &owner)?;

    info!("Rules saved to: {}", path.display());
    info!("Total rules: {}", result.rule_count());
    info!("File owner: {}", owner.name);
    Ok(())
}

fn apply_overrides(config: &mut ExtractorConfig, args: &ArgMatches) {
    if let Some(zone) = args.get_one::<String>(ARG_ZONE) {
        config.extract.zone = Some(zone.clone());
    }
    if let Some(dir) = args.get_one::<String>(ARG_OUTPUT_DIR) {
        config.extract.output_dir = dir.clone();
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
