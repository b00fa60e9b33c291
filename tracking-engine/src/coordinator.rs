//! Post-processing intelligence layer consuming each frame's active tracks.
//!
//! History update + prune, concurrent per-track threat assessment via
//! `tokio::task::JoinSet`, a priority filter by `ThreatLevel` ordinal,
//! collision prediction restricted to the priority subset, and a fusion
//! step producing ranked `TacticalAlert`s.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracking_core::{Metrics, ThreatLevel, Track, TrackID};

use crate::collision::{Collision, CollisionPredictor};
use crate::config::CoordinatorConfig;
use crate::history::HistoryStore;
use crate::threat::{self, Threat, ThreatAnalyzer};

/// A fused `(threat, optional collision, urgency)` in descending-urgency
/// rank order; alerts hold copies of the minimal projection of their
/// sources, never live track references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TacticalAlert {
    pub threat: Threat,
    pub collision: Option<Collision>,
    pub urgency: f64,
}

pub struct IntelligenceCoordinator {
    config: CoordinatorConfig,
    threat_analyzer: Arc<dyn ThreatAnalyzer>,
    collision_predictor: Arc<dyn CollisionPredictor>,
    history: HistoryStore,
    metrics: Arc<Metrics>,
}

impl IntelligenceCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        threat_analyzer: Arc<dyn ThreatAnalyzer>,
        collision_predictor: Arc<dyn CollisionPredictor>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let history = HistoryStore::new(config.history_capacity);
        IntelligenceCoordinator {
            config,
            threat_analyzer,
            collision_predictor,
            history,
            metrics,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Asynchronously assesses threats, predicts collisions for the
    /// priority subset, and returns a fused, ranked list of alerts.
    pub async fn process(&mut self, tracks: &[Track]) -> Vec<TacticalAlert> {
        log::debug!("coordinator processing {} tracks", tracks.len());

        let active_ids: Vec<TrackID> = tracks.iter().map(|t| t.id).collect();
        self.history.update(tracks);
        if self.config.prune_history {
            self.history.prune(&active_ids);
        }

        let assessed = self.assess_all(tracks).await;

        let priority: Vec<Threat> = assessed
            .into_iter()
            .filter(|t| t.threat_level >= self.config.assessment_threshold)
            .collect();

        if priority.is_empty() {
            log::debug!("no priority threats identified");
            return Vec::new();
        }
        log::info!("{} priority threats for collision analysis", priority.len());

        let by_id: HashMap<TrackID, &Track> = tracks.iter().map(|t| (t.id, t)).collect();
        let priority_tracks: Vec<&Track> = priority
            .iter()
            .filter_map(|t| by_id.get(&t.track_id).copied())
            .collect();

        let collisions = self.collision_predictor.predict(&priority_tracks);

        let mut alerts = fuse_intelligence(&priority, &collisions, self.config.time_horizon_s);
        alerts.sort_by(|a, b| {
            b.urgency
                .partial_cmp(&a.urgency)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.threat.track_id.cmp(&b.threat.track_id))
        });

        log::info!("generated {} tactical alerts", alerts.len());
        alerts
    }

    /// Per-track analyses have no shared mutable state; a panic in one task
    /// is isolated and contributes no alert this frame.
    async fn assess_all(&self, tracks: &[Track]) -> Vec<Threat> {
        let mut set = JoinSet::new();
        for track in tracks.iter().cloned() {
            let analyzer = Arc::clone(&self.threat_analyzer);
            set.spawn(async move { threat::assess(analyzer.as_ref(), &track) });
        }

        let mut assessed = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(t)) => assessed.push(t),
                Ok(None) => {}
                Err(_panicked) => {
                    self.metrics.incr_coordinator_threat_error();
                }
            }
        }
        assessed.sort_by_key(|t| t.track_id);
        assessed
    }
}

/// `level / L_max` uses the highest ordinal (`CRITICAL` = 3), not the
/// variant count.
const L_MAX: f64 = (ThreatLevel::COUNT - 1) as f64;

fn fuse_intelligence(threats: &[Threat], collisions: &[Collision], time_horizon_s: f64) -> Vec<TacticalAlert> {
    let mut by_track: HashMap<TrackID, Collision> = HashMap::new();
    for c in collisions {
        by_track.entry(c.track1).or_insert(*c);
        by_track.entry(c.track2).or_insert(*c);
    }

    threats
        .iter()
        .map(|threat| {
            let related = by_track.get(&threat.track_id).copied();
            let proximity_bonus = related
                .map(|c| 1.0 - c.time_to_collision / time_horizon_s)
                .unwrap_or(0.0);
            let level = threat.threat_level.ordinal() as f64;
            let urgency = ((level / L_MAX) + threat.confidence + proximity_bonus) / 2.0;
            TacticalAlert {
                threat: threat.clone(),
                collision: related,
                urgency: urgency.clamp(0.0, 1.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_coupled_alert_ranks_above_lone_threat() {
        let threats = vec![
            Threat { track_id: TrackID::from_raw(0), threat_level: ThreatLevel::Medium, confidence: 0.9 },
            Threat { track_id: TrackID::from_raw(1), threat_level: ThreatLevel::Medium, confidence: 0.9 },
        ];
        let collisions = vec![Collision {
            track1: TrackID::from_raw(0),
            track2: TrackID::from_raw(2),
            time_to_collision: 5.0,
            probability: 0.8,
        }];
        let mut alerts = fuse_intelligence(&threats, &collisions, 30.0);
        alerts.sort_by(|a, b| b.urgency.partial_cmp(&a.urgency).unwrap());
        assert_eq!(alerts[0].threat.track_id, TrackID::from_raw(0));
        assert!(alerts[0].urgency > alerts[1].urgency);
    }

    #[test]
    fn equal_urgency_ties_break_by_ascending_track_id() {
        let threats = vec![
            Threat { track_id: TrackID::from_raw(5), threat_level: ThreatLevel::High, confidence: 0.8 },
            Threat { track_id: TrackID::from_raw(2), threat_level: ThreatLevel::High, confidence: 0.8 },
        ];
        let mut alerts = fuse_intelligence(&threats, &[], 30.0);
        alerts.sort_by(|a, b| {
            b.urgency
                .partial_cmp(&a.urgency)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.threat.track_id.cmp(&b.threat.track_id))
        });
        assert_eq!(alerts[0].threat.track_id, TrackID::from_raw(2));
        assert_eq!(alerts[1].threat.track_id, TrackID::from_raw(5));
    }
}
