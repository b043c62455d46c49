use anyhow::Result;
use clap::{ArgMatches, Command};
use tracing::info;

use fwmig_provisioner::clock::SystemClock;
use fwmig_provisioner::config::ProvisionerConfig;
use fwmig_provisioner::create::Provisioner;

pub const COMMAND: &str = "create";

pub fn command() -> Command {
    Command::new(COMMAND)
        .about("Create the security group and authorize the migrated ingress rules")
        .arg(super::event_arg())
}

pub fn run(config: &ProvisionerConfig, args: &ArgMatches) -> Result<u16> {
    let event = super::read_event(args)?;
    let api = super::aws_cli(config);

    let response = Provisioner::new(&api, &SystemClock, &config.provision).handle(&event);
    info!("Provisioning finished with status {}", response.status_code());

    super::print_response(&response.to_json())?;
    Ok(response.status_code())
}
