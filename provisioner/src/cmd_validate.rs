use anyhow::Result;
use clap::{ArgMatches, Command};

use fwmig_provisioner::config::ProvisionerConfig;
use fwmig_provisioner::validate::Validator;

pub const COMMAND: &str = "validate";

pub fn command() -> Command {
    Command::new(COMMAND)
        .about("Count the ingress rules on a migrated security group")
        .arg(super::event_arg())
}

pub fn run(config: &ProvisionerConfig, args: &ArgMatches) -> Result<u16> {
    let event = super::read_event(args)?;
    let api = super::aws_cli(config);

    let response = Validator::new(&api).handle(&event);
    super::print_response(&response.to_json())?;
    Ok(response.status_code())
}
