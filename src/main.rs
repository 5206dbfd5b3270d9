//! Binary entry point for the `buildbox` CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use buildbox::{
    ApiError, ConfigError, CpuCount, EnvironmentConfig, GceClient, InstancePayloads, PayloadError,
    ProvisionError, ProvisionOrchestrator, TeardownError, TeardownOrchestrator,
};

mod cli;

use cli::{Cli, ProvisionCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),
    #[error("failed to initialise API client: {0}")]
    Client(#[source] ApiError),
    #[error("CPU count must be at least 1, got {0}")]
    InvalidCpus(u32),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Teardown(#[from] TeardownError),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = load_config()?;
    match cli {
        Cli::Provision(command) => provision(&config, &command).await,
        Cli::Teardown => teardown(&config).await,
    }
}

fn load_config() -> Result<EnvironmentConfig, CliError> {
    let config = EnvironmentConfig::load_without_cli_args()?;
    config.validate()?;
    Ok(config)
}

fn client_for(config: &EnvironmentConfig) -> Result<GceClient, CliError> {
    let token = config.require_access_token()?;
    GceClient::new(token).map_err(CliError::Client)
}

fn cpu_count(command: &ProvisionCommand) -> Result<CpuCount, CliError> {
    CpuCount::new(command.cpus).ok_or(CliError::InvalidCpus(command.cpus))
}

async fn provision(config: &EnvironmentConfig, command: &ProvisionCommand) -> Result<(), CliError> {
    let cpus = cpu_count(command)?;
    let payloads = InstancePayloads::load(config)?;
    let client = client_for(config)?;

    let outcome = ProvisionOrchestrator::new(client)
        .with_poll_settings(config.poll_settings())
        .with_propagation_delay(config.propagation_delay())
        .provision(config, &payloads, cpus)
        .await?;

    info!(ip = %outcome.ip_address, dns = ?outcome.dns, "environment ready");
    writeln!(io::stdout(), "{}", outcome.ip_address).ok();
    Ok(())
}

async fn teardown(config: &EnvironmentConfig) -> Result<(), CliError> {
    let client = client_for(config)?;
    let summary = TeardownOrchestrator::new(client)
        .with_poll_settings(config.poll_settings())
        .teardown(config)
        .await?;

    writeln!(
        io::stdout(),
        "deleted {} instance(s), {} forwarding rule(s), {} target proxy(ies)",
        summary.deleted_instances,
        summary.deleted_forwarding_rules,
        summary.deleted_proxies
    )
    .ok();
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildbox::{ProvisionStage, test_support::environment_config};
    use rstest::rstest;

    #[rstest]
    #[case(&["buildbox", "provision"], 1)]
    #[case(&["buildbox", "provision", "4"], 4)]
    #[case(&["buildbox", "spawn", "8"], 8)]
    fn provision_parses_cpu_count(#[case] args: &[&str], #[case] expected: u32) {
        let cli = Cli::try_parse_from(args).expect("arguments should parse");
        let Cli::Provision(command) = cli else {
            panic!("expected provision subcommand");
        };
        assert_eq!(command.cpus, expected);
    }

    #[rstest]
    #[case(&["buildbox", "provision", "0"])]
    #[case(&["buildbox", "provision", "-2"])]
    #[case(&["buildbox", "provision", "many"])]
    fn provision_rejects_invalid_cpu_counts(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[rstest]
    #[case("teardown")]
    #[case("cleanup")]
    fn teardown_accepts_alias(#[case] name: &str) {
        let cli = Cli::try_parse_from(["buildbox", name]).expect("arguments should parse");
        assert!(matches!(cli, Cli::Teardown));
    }

    #[test]
    fn cpu_count_rejects_zero_when_constructed_directly() {
        let err = cpu_count(&ProvisionCommand { cpus: 0 }).expect_err("zero is invalid");
        assert!(matches!(err, CliError::InvalidCpus(0)));
    }

    #[test]
    fn client_requires_access_token() {
        let config = EnvironmentConfig {
            access_token: None,
            ..environment_config()
        };
        let err = client_for(&config).expect_err("token is required");
        assert!(
            err.to_string().contains("BUILDBOX_ACCESS_TOKEN"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn write_error_includes_failed_stage() {
        let err = CliError::Provision(ProvisionError::RemoteCall {
            stage: ProvisionStage::IpAssigned,
            source: ApiError::Status {
                status: 403,
                details: String::from("permission denied"),
            },
        });
        let mut buf = Vec::new();
        write_error(&mut buf, &err);
        let rendered = String::from_utf8(buf).expect("utf8");
        assert!(rendered.contains("IP assigned"), "rendered: {rendered}");
        assert!(rendered.contains("permission denied"), "rendered: {rendered}");
    }
}
