//! Command-line interface definitions for the `buildbox` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `buildbox` binary.
#[derive(Debug, Parser)]
#[command(
    name = "buildbox",
    about = "Stand up or tear down a load-balanced build VM on Google Cloud",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create the proxy, forwarding rule, and instance, then update DNS.
    #[command(
        name = "provision",
        visible_alias = "spawn",
        about = "Create the load balancer front end and build VM, then update DNS"
    )]
    Provision(ProvisionCommand),
    /// Delete every instance, forwarding rule, and target proxy.
    #[command(
        name = "teardown",
        visible_alias = "cleanup",
        about = "Delete all instances, forwarding rules, and target HTTPS proxies"
    )]
    Teardown,
}

/// Arguments for the `buildbox provision` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct ProvisionCommand {
    /// Number of vCPUs; appended to the configured machine series.
    #[arg(
        value_name = "CPUS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub(crate) cpus: u32,
}
