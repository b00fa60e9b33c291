//! Sensor detections, the tracker's only input type.

use crate::geometry::{Confidence, Covariance, Position3D, Velocity3D};
use crate::ids::SensorID;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single sensor observation at a point in time.
///
/// A frozen timestamp/position/confidence triple, an optional sensor id,
/// and a free-form attributes bag for adapter-specific metadata (bounding
/// box extents for IoU cost, radar cross-section, etc.) that the kernel
/// passes through without interpreting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub timestamp: DateTime<Utc>,
    pub position: Position3D,
    pub confidence: Confidence,
    pub sensor_id: Option<SensorID>,
    pub velocity: Option<Velocity3D>,
    pub covariance: Option<Covariance>,
    #[serde(default)]
    pub attributes: HashMap<String, f64>,
}

impl Detection {
    pub fn new(
        timestamp: DateTime<Utc>,
        position: Position3D,
        confidence: Confidence,
        sensor_id: SensorID,
    ) -> Self {
        Detection {
            timestamp,
            position,
            confidence,
            sensor_id: Some(sensor_id),
            velocity: None,
            covariance: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_velocity(mut self, velocity: Velocity3D) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_covariance(mut self, covariance: Covariance) -> Self {
        self.covariance = Some(covariance);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Per-sensor characteristics used by the fusion subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorCharacteristics {
    /// Lower is more accurate; used as an inverse weight in fusion.
    pub accuracy: f64,
    pub update_rate_hz: f64,
    pub detection_probability: f64,
    pub false_alarm_rate: f64,
    pub measurement_covariance: Covariance,
}

impl Default for SensorCharacteristics {
    fn default() -> Self {
        SensorCharacteristics {
            accuracy: 1.0,
            update_rate_hz: 10.0,
            detection_probability: 0.9,
            false_alarm_rate: 0.01,
            measurement_covariance: Covariance::from_diagonal([1.0, 1.0, 1.0, 0.0, 0.0, 0.0]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_builder_chain() {
        let d = Detection::new(
            Utc::now(),
            Position3D::new(1.0, 2.0, 3.0),
            Confidence::new(0.8).unwrap(),
            SensorID::new("radar-0"),
        )
        .with_velocity(Velocity3D::zero())
        .with_attribute("rcs", 12.5);

        assert_eq!(d.attributes.get("rcs"), Some(&12.5));
        assert_eq!(d.velocity, Some(Velocity3D::zero()));
    }
}
