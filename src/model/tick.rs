#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub instrument_token: u32,
    pub last_price: f64,
    pub received_at_ms: u64,
}

impl Tick {
    /// Create a tick stamped with the current wall clock.
    pub fn now(instrument_token: u32, last_price: f64) -> Self {
        Self {
            instrument_token,
            last_price,
            received_at_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
        }
    }
}
