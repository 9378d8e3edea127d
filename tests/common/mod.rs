//! Shared synthetic fixtures for integration tests.
//!
//! Distributions loosely follow the production workload: categorical weights
//! for kinds/devices/quality, bandwidth tied to quality tier, timestamps
//! roughly time-ordered like a real append-only log.

use chrono::{DateTime, Duration, TimeZone, Utc};
use eventpart::{DeviceKind, EventKind, EventRecord, QualityTier};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Fixed "now" every test anchors windows to.
pub fn reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap()
}

/// `n` events with ascending ids spread over the `days` ending at
/// [`reference`]. Deterministic per seed.
pub fn synthetic_events(n: usize, days: i64, seed: u64) -> Vec<EventRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let span_minutes = days * 24 * 60;
    let start = reference() - Duration::days(days);

    (0..n)
        .map(|i| {
            let base = if n > 1 {
                span_minutes * i as i64 / (n as i64 - 1)
            } else {
                0
            };
            let jitter = rng.random_range(0..30);
            let at = start + Duration::minutes((base + jitter).clamp(0, span_minutes - 1));

            let kind = match rng.random_range(0..100) {
                0..40 => EventKind::Start,
                40..60 => EventKind::Pause,
                60..80 => EventKind::Resume,
                80..95 => EventKind::Complete,
                _ => EventKind::Skip,
            };
            let device = match rng.random_range(0..100) {
                0..40 => DeviceKind::Mobile,
                40..70 => DeviceKind::Tv,
                70..90 => DeviceKind::Web,
                _ => DeviceKind::Tablet,
            };
            let quality = match rng.random_range(0..100) {
                0..15 => QualityTier::Uhd4k,
                15..70 => QualityTier::Hd,
                _ => QualityTier::Sd,
            };
            let bandwidth_mbps = match quality {
                QualityTier::Uhd4k => rng.random_range(15.0..45.0),
                QualityTier::Hd => rng.random_range(5.0..15.0),
                QualityTier::Sd => rng.random_range(0.8..5.0),
            };
            let watch_duration_secs = match kind {
                EventKind::Start => rng.random_range(30..600),
                EventKind::Pause | EventKind::Resume => rng.random_range(5..120),
                EventKind::Complete => rng.random_range(1200..7200),
                EventKind::Skip => rng.random_range(1..60),
            };

            EventRecord {
                event_id: i as u64 + 1,
                user_id: rng.random_range(1..997),
                content_id: rng.random_range(1..397),
                event_timestamp: at,
                kind,
                watch_duration_secs,
                device,
                country_code: ["US", "UK", "CA", "AU", "DE"][rng.random_range(0..5)].to_string(),
                quality,
                bandwidth_mbps,
            }
        })
        .collect()
}
