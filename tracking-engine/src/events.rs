//! Outbound event stream.
//!
//! At-least-once from the core; de-duplication is a downstream concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracking_core::{ThreatLevel, TrackID};

const EVENT_VERSION: u32 = 1;

/// A single tracking or intelligence event emitted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    TrackCreated {
        occurred_at: DateTime<Utc>,
        track_id: TrackID,
        version: u32,
    },
    TrackUpdated {
        occurred_at: DateTime<Utc>,
        track_id: TrackID,
        version: u32,
    },
    TrackDeleted {
        occurred_at: DateTime<Utc>,
        track_id: TrackID,
        version: u32,
    },
    ThreatDetected {
        occurred_at: DateTime<Utc>,
        track_id: TrackID,
        severity: ThreatLevel,
        version: u32,
    },
    CollisionWarning {
        occurred_at: DateTime<Utc>,
        track_ids: (TrackID, TrackID),
        ttc: f64,
        probability: f64,
        version: u32,
    },
}

impl Event {
    pub fn track_created(occurred_at: DateTime<Utc>, track_id: TrackID) -> Self {
        Event::TrackCreated {
            occurred_at,
            track_id,
            version: EVENT_VERSION,
        }
    }

    pub fn track_updated(occurred_at: DateTime<Utc>, track_id: TrackID) -> Self {
        Event::TrackUpdated {
            occurred_at,
            track_id,
            version: EVENT_VERSION,
        }
    }

    pub fn track_deleted(occurred_at: DateTime<Utc>, track_id: TrackID) -> Self {
        Event::TrackDeleted {
            occurred_at,
            track_id,
            version: EVENT_VERSION,
        }
    }

    pub fn threat_detected(occurred_at: DateTime<Utc>, track_id: TrackID, severity: ThreatLevel) -> Self {
        Event::ThreatDetected {
            occurred_at,
            track_id,
            severity,
            version: EVENT_VERSION,
        }
    }

    pub fn collision_warning(
        occurred_at: DateTime<Utc>,
        track_ids: (TrackID, TrackID),
        ttc: f64,
        probability: f64,
    ) -> Self {
        Event::CollisionWarning {
            occurred_at,
            track_ids,
            ttc,
            probability,
            version: EVENT_VERSION,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
