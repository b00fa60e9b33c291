//! Tunables for the coordinator and pipeline, following the same explicit
//! struct-with-`Default` convention as `tracking_core::config`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracking_core::ThreatLevel;

/// `coordinator.*` options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Minimum threat level that advances to collision analysis (default MEDIUM).
    pub assessment_threshold: ThreatLevel,
    /// Meters; closest-approach distance below which a collision is reported.
    pub collision_threshold_m: f64,
    /// Seconds; closest-approach times beyond this are ignored.
    pub time_horizon_s: f64,
    /// Drop history entries for tracks no longer in the active set.
    pub prune_history: bool,
    /// Trail points kept per track in the rolling history.
    pub history_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            assessment_threshold: ThreatLevel::Medium,
            collision_threshold_m: 10.0,
            time_horizon_s: 30.0,
            prune_history: true,
            history_capacity: 64,
        }
    }
}

/// `pipeline.*` options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(with = "duration_millis")]
    pub batch_timeout: Duration,
    pub max_batch_size: usize,
    /// Per-sensor ingest queue depth before the oldest entry is dropped.
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            batch_timeout: Duration::from_millis(100),
            max_batch_size: 256,
            queue_capacity: 1024,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = CoordinatorConfig::default();
        assert_eq!(c.assessment_threshold, ThreatLevel::Medium);
        assert_eq!(c.collision_threshold_m, 10.0);
        assert_eq!(c.time_horizon_s, 30.0);

        let p = PipelineConfig::default();
        assert_eq!(p.batch_timeout, Duration::from_millis(100));
        assert_eq!(p.max_batch_size, 256);
    }
}
