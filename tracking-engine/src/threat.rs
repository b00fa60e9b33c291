//! Threat assessment policy.
//!
//! The default policy is a confidence-band assessment composed with
//! `Track::assess_threat`'s speed thresholds, taking the higher of the two.

use serde::{Deserialize, Serialize};
use tracking_core::{Confidence, Track, TrackID, ThreatLevel};

/// A track judged worthy of further (collision) analysis this frame.
///
/// Holds a minimal projection of the track rather than a live reference,
/// breaking the Track<->Threat<->TacticalAlert cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub track_id: TrackID,
    pub threat_level: ThreatLevel,
    pub confidence: f64,
}

/// Pluggable per-track threat policy.
///
/// Synchronous and side-effect free: the coordinator is responsible for
/// scheduling independent calls across tracks concurrently.
pub trait ThreatAnalyzer: Send + Sync {
    fn analyze(&self, track: &Track) -> ThreatLevel;
}

/// Confidence-band thresholds composed with `Track::assess_threat`'s speed
/// bands.
#[derive(Debug, Clone, Copy)]
pub struct RuleBasedThreatAnalyzer {
    pub high_confidence: f64,
    pub medium_confidence: f64,
}

impl Default for RuleBasedThreatAnalyzer {
    fn default() -> Self {
        RuleBasedThreatAnalyzer {
            high_confidence: 0.90,
            medium_confidence: 0.70,
        }
    }
}

impl RuleBasedThreatAnalyzer {
    fn confidence_band(&self, confidence: Confidence) -> ThreatLevel {
        let c = confidence.value();
        if c >= self.high_confidence {
            ThreatLevel::High
        } else if c >= self.medium_confidence {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        }
    }
}

impl ThreatAnalyzer for RuleBasedThreatAnalyzer {
    fn analyze(&self, track: &Track) -> ThreatLevel {
        let by_confidence = self.confidence_band(track.confidence);
        let by_speed = track.assess_threat();
        by_confidence.max(by_speed)
    }
}

/// LOW threats are not reported.
pub fn assess(analyzer: &dyn ThreatAnalyzer, track: &Track) -> Option<Threat> {
    let level = analyzer.analyze(track);
    if level == ThreatLevel::Low {
        return None;
    }
    Some(Threat {
        track_id: track.id,
        threat_level: level,
        confidence: track.confidence.value(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tracking_core::{Detection, Position3D, SensorID, Velocity3D};

    fn track_with(confidence: f64, speed: f64) -> Track {
        let det = Detection::new(
            Utc::now(),
            Position3D::new(0.0, 0.0, 0.0),
            Confidence::new(confidence).unwrap(),
            SensorID::new("s0"),
        );
        let mut t = Track::spawn(TrackID::from_raw(0), &det);
        t.state.velocity = Velocity3D::new(speed, 0.0, 0.0);
        t
    }

    #[test]
    fn high_confidence_outranks_low_speed() {
        let analyzer = RuleBasedThreatAnalyzer::default();
        let t = track_with(0.95, 0.0);
        assert_eq!(analyzer.analyze(&t), ThreatLevel::High);
    }

    #[test]
    fn medium_confidence_band() {
        let analyzer = RuleBasedThreatAnalyzer::default();
        let t = track_with(0.75, 0.0);
        assert_eq!(analyzer.analyze(&t), ThreatLevel::Medium);
    }

    #[test]
    fn high_speed_outranks_low_confidence() {
        let analyzer = RuleBasedThreatAnalyzer::default();
        let t = track_with(0.1, 60.0);
        assert_eq!(analyzer.analyze(&t), ThreatLevel::Critical);
    }

    #[test]
    fn low_threat_is_not_reported() {
        let analyzer = RuleBasedThreatAnalyzer::default();
        let t = track_with(0.1, 0.0);
        assert!(assess(&analyzer, &t).is_none());
    }
}
