use async_trait::async_trait;
use chrono::FixedOffset;
use tokio::sync::{mpsc, watch};

use crate::error::KiteResult;
use crate::event::{FeedEvent, WsConnectionStatus};
use crate::kite::rest::KiteRestClient;
use crate::model::order::{OrderAck, OrderRequest};
use crate::model::tick::Tick;
use crate::monitor::{affordable_quantity, Evaluation, ThresholdMonitor, TickDecision};

/// Order placement seam between the monitor and the brokerage.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn place_order(&self, request: &OrderRequest) -> KiteResult<OrderAck>;
}

#[async_trait]
impl OrderGateway for KiteRestClient {
    async fn place_order(&self, request: &OrderRequest) -> KiteResult<OrderAck> {
        KiteRestClient::place_order(self, request).await
    }
}

#[derive(Debug, Clone)]
pub struct SessionParams {
    pub exchange: String,
    pub symbol: String,
    pub investment_amount: f64,
    pub threshold_pct: f64,
    pub order_tag: Option<String>,
    /// Zone used when printing wall-clock times.
    pub display_offset: FixedOffset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Ignored,
    Hold { ltp: f64, change_pct: f64 },
    QuantityTooSmall { ltp: f64 },
    Bought { order_id: String, quantity: u64, ltp: f64 },
    OrderFailed { reason: String, retryable: bool },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub reference_price: Option<f64>,
    pub order_id: Option<String>,
    pub order_attempts: u32,
    pub tick_batches: u64,
}

pub struct TradingSession<G> {
    monitor: ThresholdMonitor,
    gateway: G,
    params: SessionParams,
    summary: SessionSummary,
}

impl<G: OrderGateway> TradingSession<G> {
    pub fn new(gateway: G, params: SessionParams) -> Self {
        Self {
            monitor: ThresholdMonitor::new(params.threshold_pct),
            gateway,
            params,
            summary: SessionSummary::default(),
        }
    }

    pub fn monitor(&self) -> &ThresholdMonitor {
        &self.monitor
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    pub async fn on_ticks(&mut self, ticks: &[Tick]) -> TickOutcome {
        self.summary.tick_batches += 1;
        let eval = match self.monitor.evaluate(ticks) {
            TickDecision::Evaluated(e) => e,
            TickDecision::AlreadyBought | TickDecision::NoPrice => return TickOutcome::Ignored,
        };
        self.report(&eval);

        if !eval.triggered {
            return TickOutcome::Hold {
                ltp: eval.ltp,
                change_pct: eval.change_pct,
            };
        }
        self.submit(eval.ltp).await
    }

    fn report(&mut self, eval: &Evaluation) {
        if eval.first_tick {
            self.summary.reference_price = Some(eval.reference_price);
            let local = chrono::Utc::now().with_timezone(&self.params.display_offset);
            tracing::info!(
                symbol = %self.params.symbol,
                reference_price = %format!("{:.2}", eval.reference_price),
                at = %local.format("%H:%M:%S"),
                "Reference price set"
            );
        }
        tracing::info!(
            ltp = %format!("{:.2}", eval.ltp),
            change_pct = %format!("{:.2}", eval.change_pct),
            "LTP update"
        );
    }

    async fn submit(&mut self, ltp: f64) -> TickOutcome {
        let quantity = affordable_quantity(self.params.investment_amount, ltp);
        if quantity < 1 {
            tracing::warn!(
                ltp,
                budget = self.params.investment_amount,
                "Quantity < 1, skipping order"
            );
            return TickOutcome::QuantityTooSmall { ltp };
        }

        let mut request =
            OrderRequest::market_buy_cnc(&self.params.exchange, &self.params.symbol, quantity);
        if let Some(tag) = &self.params.order_tag {
            request = request.with_tag(tag.clone());
        }

        self.summary.order_attempts += 1;
        match self.gateway.place_order(&request).await {
            Ok(ack) => {
                self.monitor.mark_bought();
                self.summary.order_id = Some(ack.order_id.clone());
                tracing::info!(
                    symbol = %self.params.symbol,
                    quantity,
                    ltp = %format!("{:.2}", ltp),
                    notional = %format!("{:.0}", ltp * quantity as f64),
                    order_id = %ack.order_id,
                    "Bought"
                );
                TickOutcome::Bought {
                    order_id: ack.order_id,
                    quantity,
                    ltp,
                }
            }
            Err(e) => {
                let retryable = e.is_retryable();
                if retryable {
                    tracing::error!(error = %e, "Order failed; next qualifying tick will retry");
                } else {
                    tracing::error!(error = %e, "Order failed with a non-retryable error");
                }
                TickOutcome::OrderFailed {
                    reason: e.to_string(),
                    retryable,
                }
            }
        }
    }

    /// Consume feed events serially until shutdown or the feed closes.
    pub async fn run(
        mut self,
        mut feed_rx: mpsc::Receiver<FeedEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> SessionSummary {
        loop {
            tokio::select! {
                event = feed_rx.recv() => {
                    match event {
                        Some(FeedEvent::Ticks(ticks)) => {
                            self.on_ticks(&ticks).await;
                        }
                        Some(FeedEvent::Status(WsConnectionStatus::Connected)) => {
                            tracing::info!("Market data feed connected");
                        }
                        Some(FeedEvent::Status(WsConnectionStatus::Disconnected { reason })) => {
                            tracing::warn!(%reason, "Market data feed disconnected");
                        }
                        None => break,
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        self.summary
    }
}
