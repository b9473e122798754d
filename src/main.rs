use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};

use kite_dip_buyer::config::Config;
use kite_dip_buyer::event::FeedEvent;
use kite_dip_buyer::kite::rest::KiteRestClient;
use kite_dip_buyer::kite::ticker::KiteTickerClient;
use kite_dip_buyer::lifecycle::MarketClose;
use kite_dip_buyer::logging;
use kite_dip_buyer::model::order::session_tag;
use kite_dip_buyer::session::{SessionParams, TradingSession};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Make sure API_KEY, API_SECRET and REFRESH_TOKEN are set (or present in .env)");
            std::process::exit(1);
        }
    };

    logging::init(&config.logging.level);

    let market_close =
        MarketClose::from_config(&config.session).context("invalid session config")?;

    tracing::info!(
        symbol = %config.instrument.symbol,
        exchange = %config.instrument.exchange,
        instrument_token = config.instrument.instrument_token,
        budget = config.strategy.investment_amount,
        threshold_pct = config.strategy.threshold_pct,
        market_close = %market_close.cutoff(),
        "Starting kite-dip-buyer"
    );

    let mut rest = KiteRestClient::new(
        &config.kite.api_base_url,
        &config.kite.api_key,
        &config.kite.api_secret,
        Duration::from_secs(config.kite.request_timeout_secs),
    )?;

    let tokens = match rest.renew_access_token(&config.kite.refresh_token).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "Token renewal failed");
            std::process::exit(1);
        }
    };
    rest.set_access_token(tokens.access_token.clone());
    tracing::info!("Token renewed. Bot active for this session");

    let (feed_tx, feed_rx) = mpsc::channel::<FeedEvent>(config.strategy.tick_channel_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ticker = KiteTickerClient::new(
        &config.kite.ws_base_url,
        &config.kite.api_key,
        &tokens.access_token,
    )?;
    let instrument_token = config.instrument.instrument_token;
    let ticker_shutdown = shutdown_rx.clone();
    let ticker_handle = tokio::spawn(async move {
        if let Err(e) = ticker
            .connect_and_run(instrument_token, feed_tx, ticker_shutdown)
            .await
        {
            tracing::error!(error = %e, "Ticker stopped");
        }
    });

    let params = SessionParams {
        exchange: config.instrument.exchange.clone(),
        symbol: config.instrument.symbol.clone(),
        investment_amount: config.strategy.investment_amount,
        threshold_pct: config.strategy.threshold_pct,
        order_tag: Some(session_tag()),
        display_offset: market_close.offset(),
    };
    let session = TradingSession::new(rest, params);
    let session_handle = tokio::spawn(session.run(feed_rx, shutdown_rx));

    tracing::info!(
        threshold_pct = config.strategy.threshold_pct,
        "Bot running. Monitoring for drop"
    );

    market_close.wait().await;
    tracing::info!("Market closed. Bot shutting down");
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(SHUTDOWN_GRACE, session_handle).await {
        Ok(Ok(summary)) => {
            tracing::info!(
                reference_price = ?summary.reference_price,
                order_id = ?summary.order_id,
                order_attempts = summary.order_attempts,
                tick_batches = summary.tick_batches,
                "Session summary"
            );
        }
        Ok(Err(e)) => tracing::warn!(error = %e, "Session task failed"),
        Err(_) => tracing::warn!("Session did not stop within grace period"),
    }
    ticker_handle.abort();

    Ok(())
}
