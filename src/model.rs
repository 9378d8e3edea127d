//! Viewing event data model.
//!
//! Events are immutable facts produced upstream; this crate only ever reads
//! them from a source store and writes them unchanged into a destination
//! layout. `event_id` is unique, monotonically increasing and never reused,
//! which is what makes keyset pagination safe during migration.

use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

/// Playback lifecycle event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Pause,
    Resume,
    Complete,
    Skip,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Pause => "pause",
            EventKind::Resume => "resume",
            EventKind::Complete => "complete",
            EventKind::Skip => "skip",
        }
    }
}

/// Device category the event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Mobile,
    Tv,
    Web,
    Tablet,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Mobile => "mobile",
            DeviceKind::Tv => "tv",
            DeviceKind::Web => "web",
            DeviceKind::Tablet => "tablet",
        }
    }
}

/// Stream quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    #[serde(rename = "4K")]
    Uhd4k,
    #[serde(rename = "HD")]
    Hd,
    #[serde(rename = "SD")]
    Sd,
}

/// One row of the viewing event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique, monotonically increasing identifier. Total order for
    /// pagination; never reused.
    pub event_id: u64,

    pub user_id: u32,

    pub content_id: u32,

    pub event_timestamp: DateTime<Utc>,

    pub kind: EventKind,

    /// Watched duration attributed to this event, in seconds.
    pub watch_duration_secs: u32,

    pub device: DeviceKind,

    /// ISO-3166 alpha-2 country code.
    pub country_code: String,

    pub quality: QualityTier,

    pub bandwidth_mbps: f64,
}

impl EventRecord {
    /// Feed a canonical byte encoding of this record into a CRC32 hasher.
    ///
    /// The encoding is fixed little-endian field order, independent of any
    /// serde representation, so source and destination digests are comparable
    /// regardless of how either store lays rows out internally.
    pub fn digest_into(&self, hasher: &mut Hasher) {
        hasher.update(&self.event_id.to_le_bytes());
        hasher.update(&self.user_id.to_le_bytes());
        hasher.update(&self.content_id.to_le_bytes());
        hasher.update(&self.event_timestamp.timestamp_micros().to_le_bytes());
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update(&self.watch_duration_secs.to_le_bytes());
        hasher.update(self.device.as_str().as_bytes());
        hasher.update(&(self.country_code.len() as u32).to_le_bytes());
        hasher.update(self.country_code.as_bytes());
        hasher.update(&(self.quality as u8).to_le_bytes());
        hasher.update(&self.bandwidth_mbps.to_bits().to_le_bytes());
    }

    /// Rough in-memory footprint of one row, used for storage estimates.
    pub fn approx_size_bytes(&self) -> u64 {
        // fixed-width fields + string payload; close enough for relative
        // layout comparisons, which is all the report needs
        (8 + 4 + 4 + 8 + 1 + 4 + 1 + self.country_code.len() + 1 + 8) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: u64) -> EventRecord {
        EventRecord {
            event_id: id,
            user_id: 42,
            content_id: 7,
            event_timestamp: Utc.with_ymd_and_hms(2026, 8, 1, 20, 15, 0).unwrap(),
            kind: EventKind::Start,
            watch_duration_secs: 300,
            device: DeviceKind::Tv,
            country_code: "US".to_string(),
            quality: QualityTier::Hd,
            bandwidth_mbps: 12.5,
        }
    }

    #[test]
    fn digest_is_deterministic() {
        let mut a = Hasher::new();
        let mut b = Hasher::new();
        record(1).digest_into(&mut a);
        record(1).digest_into(&mut b);
        assert_eq!(a.finalize(), b.finalize());
    }

    #[test]
    fn digest_distinguishes_rows() {
        let mut a = Hasher::new();
        let mut b = Hasher::new();
        record(1).digest_into(&mut a);
        record(2).digest_into(&mut b);
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&EventKind::Complete).unwrap();
        assert_eq!(json, "\"complete\"");
    }

    #[test]
    fn quality_uses_wire_names() {
        let json = serde_json::to_string(&QualityTier::Uhd4k).unwrap();
        assert_eq!(json, "\"4K\"");
    }
}
