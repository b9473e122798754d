use std::time::Duration;

use chrono::{FixedOffset, NaiveTime, TimeZone, Utc};

use kite_dip_buyer::config::SessionConfig;
use kite_dip_buyer::lifecycle::MarketClose;

fn ist() -> FixedOffset {
    FixedOffset::east_opt(19_800).unwrap()
}

#[test]
/// Verifies the shipped session closes at 15:30:00 IST, inclusive, and stays
/// closed for the rest of the day.
fn default_session_closes_at_1530_ist() {
    let mc = MarketClose::from_config(&SessionConfig::default()).unwrap();
    let at = |h, m, s| {
        ist()
            .with_ymd_and_hms(2026, 10, 14, h, m, s)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    };
    assert!(!mc.is_closed_at(at(9, 15, 0)));
    assert!(!mc.is_closed_at(at(15, 29, 59)));
    assert!(mc.is_closed_at(at(15, 30, 0)));
    assert!(mc.is_closed_at(at(15, 31, 0)));
    assert!(mc.is_closed_at(at(16, 5, 0)));
    assert!(mc.is_closed_at(at(23, 59, 59)));
}

#[test]
/// Verifies the wait never sleeps past the cutoff: within the last second it
/// wakes exactly at the deadline.
fn wait_resolves_at_deadline_not_after() {
    let mc = MarketClose::from_config(&SessionConfig::default()).unwrap();
    let now = ist()
        .with_ymd_and_hms(2026, 10, 14, 15, 29, 59)
        .single()
        .unwrap()
        .with_timezone(&Utc);
    assert_eq!(mc.next_wait(now), Duration::from_secs(1));
    assert!(mc.is_closed_at(now + chrono::Duration::seconds(1)));
}

#[tokio::test]
/// Verifies wait() returns immediately once the cutoff has passed.
async fn wait_returns_immediately_after_cutoff() {
    let mc = MarketClose::new(NaiveTime::MIN, ist(), Duration::from_secs(60));
    tokio::time::timeout(Duration::from_millis(500), mc.wait())
        .await
        .expect("closed session should not wait");
}

#[tokio::test]
/// Verifies wait() resolves shortly after a cutoff a moment in the future.
async fn wait_resolves_shortly_after_near_cutoff() {
    let offset = FixedOffset::east_opt(0).unwrap();
    let now = Utc::now();
    let cutoff = now.time() + chrono::Duration::milliseconds(300);
    // skip when the cutoff would wrap past midnight
    if cutoff < now.time() {
        return;
    }
    let mc = MarketClose::new(cutoff, offset, Duration::from_secs(60));
    tokio::time::timeout(Duration::from_secs(3), mc.wait())
        .await
        .expect("wait should end at the cutoff");
    assert!(mc.is_closed_at(Utc::now()));
}
