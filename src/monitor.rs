use crate::model::tick::Tick;

/// Percentage change of `price` relative to `reference`.
pub fn pct_change(reference: f64, price: f64) -> f64 {
    ((price - reference) / reference) * 100.0
}

/// Largest quantity the order API accepts.
pub const MAX_ORDER_QUANTITY: u64 = i32::MAX as u64;

/// Whole shares affordable with `budget` at `price`. Zero when the inputs
/// are unusable or the result exceeds [`MAX_ORDER_QUANTITY`].
pub fn affordable_quantity(budget: f64, price: f64) -> u64 {
    if !price.is_finite() || price <= 0.0 || !budget.is_finite() || budget <= 0.0 {
        return 0;
    }
    let quantity = (budget / price).floor();
    if !quantity.is_finite() || quantity > MAX_ORDER_QUANTITY as f64 {
        return 0;
    }
    quantity as u64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub ltp: f64,
    pub reference_price: f64,
    pub change_pct: f64,
    /// This tick established the reference price.
    pub first_tick: bool,
    pub triggered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickDecision {
    AlreadyBought,
    /// Empty batch or an unusable price.
    NoPrice,
    Evaluated(Evaluation),
}

/// Reference-price latch plus the one-shot purchase flag.
#[derive(Debug, Clone)]
pub struct ThresholdMonitor {
    threshold_pct: f64,
    reference_price: Option<f64>,
    bought: bool,
}

impl ThresholdMonitor {
    pub fn new(threshold_pct: f64) -> Self {
        Self {
            threshold_pct,
            reference_price: None,
            bought: false,
        }
    }

    pub fn reference_price(&self) -> Option<f64> {
        self.reference_price
    }

    pub fn is_bought(&self) -> bool {
        self.bought
    }

    /// Only the first tick of the batch is considered.
    pub fn evaluate(&mut self, ticks: &[Tick]) -> TickDecision {
        if self.bought {
            return TickDecision::AlreadyBought;
        }
        let Some(tick) = ticks.first() else {
            return TickDecision::NoPrice;
        };
        let ltp = tick.last_price;
        if !ltp.is_finite() || ltp <= 0.0 {
            return TickDecision::NoPrice;
        }

        let first_tick = self.reference_price.is_none();
        let reference_price = *self.reference_price.get_or_insert(ltp);
        let change_pct = pct_change(reference_price, ltp);

        TickDecision::Evaluated(Evaluation {
            ltp,
            reference_price,
            change_pct,
            first_tick,
            triggered: change_pct <= self.threshold_pct,
        })
    }

    /// Latch after a successful order. Irreversible for the run.
    pub fn mark_bought(&mut self) {
        self.bought = true;
    }
}
