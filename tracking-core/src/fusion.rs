//! Multi-sensor measurement fusion.
//!
//! Clusters co-located detections and combines each cluster into one
//! representative measurement, weighted by per-sensor accuracy and
//! confidence. Pairs a small `Default`-able config struct
//! ([`crate::config::FusionConfig`]) with a stateless function over
//! `&[Detection]`.

use crate::config::FusionConfig;
use crate::detection::{Detection, SensorCharacteristics};
use crate::geometry::{Confidence, Position3D};
use crate::ids::SensorID;
use std::collections::HashMap;

/// Cluster co-located detections (pairwise distance <= `cluster_threshold_m`)
/// and replace each cluster with one fused detection. Singleton clusters
/// pass through unchanged; an empty input returns an empty output.
///
/// `characteristics` looks up per-sensor accuracy/detection-probability; a
/// sensor absent from the map falls back to [`SensorCharacteristics::default`].
pub fn fuse_detections(
    detections: &[Detection],
    config: &FusionConfig,
    characteristics: &HashMap<SensorID, SensorCharacteristics>,
) -> Vec<Detection> {
    if detections.is_empty() {
        return Vec::new();
    }

    let clusters = cluster_by_distance(detections, config.cluster_threshold_m);
    clusters
        .into_iter()
        .map(|members| fuse_cluster(detections, &members, characteristics))
        .collect()
}

/// Single-linkage clustering: two detections are in the same cluster if
/// connected by a chain of pairwise distances each `<= threshold`.
fn cluster_by_distance(detections: &[Detection], threshold: f64) -> Vec<Vec<usize>> {
    let n = detections.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], i: usize) -> usize {
        if parent[i] != i {
            parent[i] = find(parent, parent[i]);
        }
        parent[i]
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if detections[i].position.distance_to(&detections[j].position) <= threshold {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri] = rj;
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(i);
    }
    let mut clusters: Vec<Vec<usize>> = groups.into_values().collect();
    clusters.sort_by_key(|members| members[0]);
    clusters
}

fn fuse_cluster(
    detections: &[Detection],
    members: &[usize],
    characteristics: &HashMap<SensorID, SensorCharacteristics>,
) -> Detection {
    if members.len() == 1 {
        let mut d = detections[members[0]].clone();
        d.attributes.insert("cluster_size".into(), 1.0);
        return d;
    }

    let mut weight_sum = 0.0;
    let mut weighted_pos = (0.0, 0.0, 0.0);
    let mut earliest = detections[members[0]].timestamp;
    let mut no_detection_prob = 1.0;

    for &idx in members {
        let det = &detections[idx];
        let chars = det
            .sensor_id
            .as_ref()
            .and_then(|id| characteristics.get(id))
            .cloned()
            .unwrap_or_default();

        let accuracy = chars.accuracy.max(1e-6);
        let weight = (1.0 / accuracy) * det.confidence.value();
        weight_sum += weight;
        weighted_pos.0 += weight * det.position.x;
        weighted_pos.1 += weight * det.position.y;
        weighted_pos.2 += weight * det.position.z;

        if det.timestamp < earliest {
            earliest = det.timestamp;
        }

        let p_true_detection =
            chars.detection_probability * (1.0 - chars.false_alarm_rate) * det.confidence.value();
        no_detection_prob *= 1.0 - p_true_detection.clamp(0.0, 1.0);
    }

    let position = if weight_sum > 0.0 {
        Position3D::new(
            weighted_pos.0 / weight_sum,
            weighted_pos.1 / weight_sum,
            weighted_pos.2 / weight_sum,
        )
    } else {
        // Degenerate weights (all-zero confidence): fall back to the plain
        // centroid rather than dividing by zero.
        let n = members.len() as f64;
        Position3D::new(
            weighted_pos.0 / n.max(1.0),
            weighted_pos.1 / n.max(1.0),
            weighted_pos.2 / n.max(1.0),
        )
    };

    let confidence = Confidence::clamped((1.0 - no_detection_prob).min(0.99));

    let mut fused = Detection::new(earliest, position, confidence, SensorID::new("fused"));
    fused
        .attributes
        .insert("cluster_size".into(), members.len() as f64);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn det(x: f64, sensor: &str, confidence: f64, ts_offset_ms: i64) -> Detection {
        Detection::new(
            Utc::now() + Duration::milliseconds(ts_offset_ms),
            Position3D::new(x, 0.0, 0.0),
            Confidence::new(confidence).unwrap(),
            SensorID::new(sensor),
        )
    }

    #[test]
    fn empty_input_returns_empty_output() {
        let out = fuse_detections(&[], &FusionConfig::default(), &HashMap::new());
        assert!(out.is_empty());
    }

    #[test]
    fn singleton_cluster_passes_through_unchanged() {
        let d = det(1.0, "radar-0", 0.9, 0);
        let out = fuse_detections(&[d.clone()], &FusionConfig::default(), &HashMap::new());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].position, d.position);
        assert_eq!(out[0].attributes.get("cluster_size"), Some(&1.0));
    }

    #[test]
    fn far_apart_detections_stay_in_separate_clusters() {
        let a = det(0.0, "radar-0", 0.9, 0);
        let b = det(1000.0, "lidar-0", 0.9, 0);
        let out = fuse_detections(&[a, b], &FusionConfig::default(), &HashMap::new());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn fuses_colocated_detections_weighted_toward_more_accurate_sensor() {
        let radar = det(10.0, "radar-0", 0.9, 0);
        let lidar = Detection::new(
            radar.timestamp,
            Position3D::new(10.0, 0.0, 0.0),
            Confidence::new(0.9).unwrap(),
            SensorID::new("lidar-0"),
        );

        let mut chars = HashMap::new();
        chars.insert(
            SensorID::new("radar-0"),
            SensorCharacteristics {
                accuracy: 2.0,
                ..SensorCharacteristics::default()
            },
        );
        chars.insert(
            SensorID::new("lidar-0"),
            SensorCharacteristics {
                accuracy: 0.2,
                ..SensorCharacteristics::default()
            },
        );

        let out = fuse_detections(&[radar, lidar], &FusionConfig::default(), &chars);
        assert_eq!(out.len(), 1);
        assert!(out[0].position.x > 9.5 && out[0].position.x <= 10.0);
        assert_eq!(out[0].attributes.get("cluster_size"), Some(&2.0));
        assert!(out[0].confidence.value() <= 0.99);
    }

    #[test]
    fn fused_timestamp_is_earliest_in_cluster() {
        let a = det(10.0, "radar-0", 0.9, 500);
        let b = det(10.1, "lidar-0", 0.9, 0);
        let out = fuse_detections(&[a.clone(), b.clone()], &FusionConfig::default(), &HashMap::new());
        assert_eq!(out[0].timestamp, b.timestamp.min(a.timestamp));
    }
}
