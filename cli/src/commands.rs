pub mod claim;
pub mod interfaces;

use std::net::Ipv4Addr;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "acd")]
#[command(about = "Claim and defend an IPv4 address with RFC 5227 conflict detection.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe for an address, announce it and optionally keep defending it
    #[command(alias = "c")]
    Claim(ClaimArgs),
    /// List interfaces that conflict detection can run on
    #[command(alias = "i")]
    Interfaces,
}

#[derive(Args, Debug)]
pub struct ClaimArgs {
    /// Address to claim
    pub address: Ipv4Addr,
    /// Interface to claim on (defaults to the best viable one)
    #[arg(short, long)]
    pub interface: Option<String>,
    /// Keep defending the address until Ctrl-C
    #[arg(long)]
    pub defend: bool,
    /// Re-probe the claimed address every SECS seconds while defending
    #[arg(long, value_name = "SECS", requires = "defend")]
    pub periodic_defend: Option<u64>,
    /// Wait before acquiring again after the address was lost
    #[arg(long, value_name = "MS", default_value_t = 10_000)]
    pub retry_delay: u64,
    /// Give up after this many acquisition retries (unlimited by default)
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,
    /// Length of one engine tick in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub tick_ms: u64,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}



// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
