use kite_dip_buyer::model::tick::Tick;
use kite_dip_buyer::monitor::{affordable_quantity, pct_change, ThresholdMonitor, TickDecision};

fn tick(price: f64) -> Tick {
    Tick {
        instrument_token: 256_788,
        last_price: price,
        received_at_ms: 0,
    }
}

/// Deterministic pseudo-random walk so the sequence is reproducible.
fn walk(seed: u64, start: f64, len: usize) -> Vec<f64> {
    let mut state = seed;
    let mut price = start;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let step = ((state >> 33) % 201) as f64 / 100.0 - 1.0;
            price = (price + step).max(1.0);
            price
        })
        .collect()
}

#[test]
/// Verifies the trigger rule over many walks: a tick triggers iff its change
/// from the first-ever price is at or below the threshold, and the reference
/// never moves.
fn trigger_iff_change_from_first_tick_crosses_threshold() {
    for seed in 1..50u64 {
        let prices = walk(seed, 100.0, 200);
        let first = prices[0];
        let mut monitor = ThresholdMonitor::new(-1.0);
        for &p in &prices {
            match monitor.evaluate(&[tick(p)]) {
                TickDecision::Evaluated(e) => {
                    assert_eq!(e.reference_price, first);
                    assert_eq!(e.triggered, pct_change(first, p) <= -1.0);
                }
                other => panic!("unexpected decision {:?}", other),
            }
        }
    }
}

#[test]
/// Verifies the latch: once marked bought, no later tick is evaluated, so a
/// caller can submit at most once.
fn latch_allows_at_most_one_submission() {
    for seed in 1..50u64 {
        let mut monitor = ThresholdMonitor::new(-1.0);
        let mut submissions = 0;
        for p in walk(seed, 100.0, 300) {
            if let TickDecision::Evaluated(e) = monitor.evaluate(&[tick(p)]) {
                if e.triggered {
                    submissions += 1;
                    monitor.mark_bought();
                }
            }
        }
        assert!(submissions <= 1);
    }
}

#[test]
fn documented_examples() {
    assert_eq!(pct_change(100.0, 99.0), -1.0);
    assert!(pct_change(100.0, 99.01) > -1.0);
    assert_eq!(affordable_quantity(10_000.0, 3334.0), 2);
    assert_eq!(affordable_quantity(10_000.0, 11_000.0), 0);
}
