use clap::{Args, Parser, Subcommand};

/// TryFi pet-tracker bridge.
#[derive(Debug, Parser)]
#[command(name = "fibridge", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the vendor API on an interval and publish snapshots to MQTT.
    Run,

    /// Fetch one detail snapshot and print it to stdout.
    Fetch,

    /// Serve the local HTTP user routes.
    Serve,
}
