mod app;
mod cli;
mod config;
mod logging;

use clap::Parser;
use fanout_deliver::ChatId;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::App;
use crate::cli::{Cli, Command};
use crate::config::{Config, Overrides};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = Overrides {
        workers: cli.workers,
        debug: cli.debug.then_some(true),
    };
    let config = Config::load(&cli.config, &overrides)?;
    config.validate()?;
    if cli.command.delivers() {
        config.validate_delivery()?;
    }

    let _guard = logging::init(&config)?;
    info!(
        workers = config.workers,
        secondary_agents = config.worker_bot_tokens.len(),
        mirror = config.log_channel_id.is_some(),
        process_timeout_secs = config.process_timeout_secs,
        messages_per_second = config.messages_per_second,
        debug = config.debug,
        "configuration loaded"
    );

    let app = App::new(&config, cli.command.delivers())?;

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal.cancel();
        }
    });

    let result = match cli.command {
        Command::Send(args) => app.send(ChatId(args.chat), &args.text, &cancel).await.map(|sent| {
            println!("sent {sent} covers");
        }),
        Command::Fetch(args) => app.fetch_to_dir(&args.text, &args.out, &cancel).await.map(|summary| {
            println!(
                "saved {} of {} covers to {}",
                summary.succeeded,
                summary.total,
                args.out.display()
            );
        }),
        Command::Watch(args) => app.watch(ChatId(args.chat), &cancel).await,
    };

    app.shutdown().await;
    info!("shutdown complete");
    result
}
