use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_check;
mod cmd_dump;
mod common;

#[derive(Parser, Debug)]
#[command(name = "dmrctl", version, about = "DAP4 DMR CLI")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Output JSON where applicable
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Parse a DMR document and report whether it is accepted
    Check {
        /// DMR file, or `-` for standard input
        file: PathBuf,
    },
    /// Parse a DMR document and print its dataset tree
    Dump {
        /// DMR file, or `-` for standard input
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let Cli { verbose, json, cmd } = Cli::parse();

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cmd {
        Cmd::Check { file } => cmd_check::run(&file, json)?,
        Cmd::Dump { file } => cmd_dump::run(&file, json)?,
    };

    Ok(())
}
