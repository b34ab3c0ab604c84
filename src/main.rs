use anyhow::{bail, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use pitchside::config::Config;
use pitchside::engine::Reconciler;
use pitchside::feed::FifaFeed;
use pitchside::ledger::ValkeyLedger;
use pitchside::notify::{Channel, WebhookNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Load config
    let config = if Path::new("pitchside.toml").exists() {
        Config::load(Path::new("pitchside.toml"))?
    } else {
        info!("no pitchside.toml found, using env-only config");
        Config::from_env()
    };

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }

    info!("pitchside v{} starting", env!("CARGO_PKG_VERSION"));

    if !config.has_webhook() {
        bail!("no webhook configured (set PITCHSIDE_WEBHOOK_URL)");
    }

    // --- Valkey Event Ledger ---
    // The ledger is the only memory between polls; without it every pass
    // would re-report every event, so a dead store is fatal at startup.
    let ledger = ValkeyLedger::connect(&config.valkey.url, &config.valkey.prefix).await?;
    ledger.ping().await?;
    info!(url = %config.valkey.url, prefix = %config.valkey.prefix, "Valkey event ledger connected");

    // --- Feed + Webhook ---
    let request_timeout = Duration::from_secs(config.feed.request_timeout_secs);
    let feed = FifaFeed::new(
        config.feed.base_url.clone(),
        config.feed.competition_id.clone(),
        request_timeout,
    )?;
    if let Some(competition) = &config.feed.competition_id {
        info!(competition = %competition, "reporting restricted to one competition");
    }

    let notifier = Arc::new(WebhookNotifier::new(
        config.webhook.url.clone(),
        config.webhook.debug_url.clone(),
        request_timeout,
    )?);

    // --- Heartbeat ---
    // Announce startup and keep pinging the operator channel so a silent
    // webhook can be told apart from a quiet matchday.
    if config.webhook.debug_url.is_some() {
        if let Err(e) = notifier.post(Channel::Debug, "Coming up").await {
            warn!(error = %e, "startup announcement failed");
        }
        let heartbeat = notifier.clone();
        let heartbeat_interval = Duration::from_secs(config.webhook.heartbeat_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(heartbeat_interval);
            interval.tick().await; // first tick fires immediately, skip it
            loop {
                interval.tick().await;
                if let Err(e) = heartbeat.post(Channel::Debug, "Health ping").await {
                    warn!(error = %e, "heartbeat delivery failed");
                }
            }
        });
    }

    // --- Reconciliation Loop ---
    let engine = Reconciler::new(
        feed,
        ledger,
        notifier.clone(),
        config.poller.max_concurrent_matches,
    );

    info!(
        interval_secs = config.poller.interval_secs,
        max_concurrent = config.poller.max_concurrent_matches,
        "polling for live match events"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.poller.interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine.reconcile().await {
                    Ok(notifications) if notifications.is_empty() => {}
                    Ok(notifications) => {
                        info!(sent = notifications.len(), "notifications delivered");
                    }
                    // Ledger outage: skip this pass, the next one retries
                    // from persisted truth.
                    Err(e) => error!(error = %e, "reconcile pass failed"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("shutting down...");
                break;
            }
        }
    }

    Ok(())
}
