use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "fanout", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct Cli {
    /// TOML configuration file; missing files are ignored.
    #[arg(long, global = true, default_value = "fanout.toml")]
    pub config: PathBuf,

    /// Override the download worker count.
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Debug logging with source locations, console only.
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a catalog link and stream every cover to a chat.
    #[command(alias = "s")]
    Send(SendArgs),
    /// Resolve a catalog link and save every cover to a directory.
    #[command(alias = "f")]
    Fetch(FetchArgs),
    /// Read catalog links from stdin, one per line, and send each to a chat.
    #[command(alias = "w")]
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Text containing a catalog link.
    pub text: String,

    #[arg(long, allow_negative_numbers = true)]
    pub chat: i64,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Text containing a catalog link.
    pub text: String,

    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub chat: i64,
}

impl Command {
    /// Whether the command needs the delivery channels.
    pub fn delivers(&self) -> bool {
        !matches!(self, Self::Fetch(_))
    }
}
