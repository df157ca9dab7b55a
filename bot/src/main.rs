//! Kursbot Binary
//!
//! Reads updates from stdin, one per line, and writes JSON replies to stdout.
//! A line is `<chat_id> <text>` or `<chat_id> !<callback data>`.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kursbot_bot::{
    BotConfig, Dispatcher, DispatcherParts, InMemoryUserDirectory, LogNotifier, Reply, Update,
};
use kursbot_common::ChatId;
use kursbot_fx::{
    ConversionEngine, HttpFeedFetcher, InMemoryFeeSettings, InMemoryRateStore,
    RateIngestionEngine,
};
use kursbot_ledger::InMemoryLedger;

#[derive(Serialize)]
struct Output<'a> {
    chat_id: ChatId,
    text: String,
    reply: &'a Reply,
}

fn parse_line(line: &str) -> Option<Update> {
    let (chat, rest) = line.trim().split_once(char::is_whitespace)?;
    let chat_id = ChatId::new(chat.parse().ok()?);
    let rest = rest.trim();
    match rest.strip_prefix('!') {
        Some(data) => Some(Update::callback(chat_id, data)),
        None => Some(Update::text(chat_id, rest)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    info!("Starting kursbot");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let rates = Arc::new(InMemoryRateStore::new());
    let ingestion = Arc::new(RateIngestionEngine::new(
        Arc::new(HttpFeedFetcher::new(config.feed_url.clone())),
        rates.clone(),
        config.ingestion(),
    ));
    let users = Arc::new(InMemoryUserDirectory::new());
    let fees = Arc::new(InMemoryFeeSettings::new());
    let engine = Arc::new(ConversionEngine::new(
        ingestion.clone(),
        rates,
        users.clone(),
        Arc::new(InMemoryLedger::new()),
        fees.clone(),
    ));
    let dispatcher = Dispatcher::new(
        &config,
        DispatcherParts {
            users,
            notifier: Arc::new(if config.reveal_codes {
                LogNotifier::revealing()
            } else {
                LogNotifier::new()
            }),
            fees,
            engine,
        },
    );

    match ingestion.refresh().await {
        Ok(loaded) => info!(count = loaded.len(), "Initial rates loaded"),
        Err(e) => warn!(error = %e, "Initial rate refresh failed, retrying on demand"),
    }

    info!(feed_url = %config.feed_url, "Kursbot running");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let Some(update) = parse_line(&line) else {
            warn!(line = %line, "Malformed input line");
            continue;
        };
        let chat_id = update.chat_id;
        let reply = dispatcher.dispatch(update).await;
        let output = Output {
            chat_id,
            text: reply.message.to_string(),
            reply: &reply,
        };
        println!("{}", serde_json::to_string(&output)?);
    }

    info!("Kursbot shutdown complete");
    Ok(())
}
