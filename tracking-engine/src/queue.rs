//! Bounded per-sensor ingest queue with drop-oldest back-pressure.
//!
//! Built on `crossbeam::channel::bounded`; a full queue pops and discards
//! the oldest pending detection rather than blocking the producer.

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::sync::Arc;
use tracking_core::{Detection, Metrics};

/// A single-producer, single-consumer queue that drops the oldest entry
/// instead of blocking when full.
pub struct DropOldestQueue {
    tx: Sender<Detection>,
    rx: Receiver<Detection>,
    metrics: Arc<Metrics>,
}

impl DropOldestQueue {
    pub fn new(capacity: usize, metrics: Arc<Metrics>) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        DropOldestQueue { tx, rx, metrics }
    }

    /// Push a detection, discarding the oldest queued one on overflow.
    pub fn push(&self, detection: Detection) {
        match self.tx.try_send(detection) {
            Ok(()) => {}
            Err(TrySendError::Full(detection)) => {
                if self.rx.try_recv().is_ok() {
                    self.metrics.incr_pipeline_dropped_detections();
                }
                // Space freed (or the queue drained underneath us); retry
                // once. A second failure means the consumer is also
                // racing us, so drop this detection too rather than spin.
                if self.tx.try_send(detection).is_err() {
                    self.metrics.incr_pipeline_dropped_detections();
                }
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Drain everything currently queued, preserving arrival order.
    pub fn drain(&self) -> Vec<Detection> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(d) => out.push(d),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tracking_core::{Confidence, Position3D, SensorID};

    fn det(x: f64) -> Detection {
        Detection::new(
            Utc::now(),
            Position3D::new(x, 0.0, 0.0),
            Confidence::new(0.9).unwrap(),
            SensorID::new("s0"),
        )
    }

    #[test]
    fn overflow_drops_oldest_and_increments_metric() {
        let metrics = Arc::new(Metrics::new());
        let q = DropOldestQueue::new(2, Arc::clone(&metrics));
        q.push(det(0.0));
        q.push(det(1.0));
        q.push(det(2.0));
        let drained = q.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].position.x, 1.0);
        assert_eq!(drained[1].position.x, 2.0);
        assert_eq!(metrics.snapshot().pipeline_dropped_detections, 1);
    }

    #[test]
    fn drain_preserves_arrival_order() {
        let metrics = Arc::new(Metrics::new());
        let q = DropOldestQueue::new(8, metrics);
        for i in 0..4 {
            q.push(det(i as f64));
        }
        let drained = q.drain();
        let xs: Vec<f64> = drained.iter().map(|d| d.position.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
    }
}
