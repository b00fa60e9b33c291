//! Ingest-to-alert pipeline.
//!
//! An ingest task per sensor stream feeds a shared bounded queue, a batching
//! loop accumulates until `max_batch_size` or a timeout elapses, a
//! tracker-call stage runs the frame, and a result-handling stage fans
//! results out to event emission. Each sensor's ingest task, and the
//! batching loop itself, watches a single `tokio_util::sync::CancellationToken`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracking_core::{
    Detection, Metrics, SensorCharacteristics, SensorID, Track, TrackID, Tracker, TrackingResult,
};

use crate::config::PipelineConfig;
use crate::coordinator::IntelligenceCoordinator;
use crate::error::PipelineError;
use crate::events::Event;
use crate::queue::DropOldestQueue;

/// Produces ordered batches of `Detection` for one sensor with bounded
/// latency.
#[async_trait]
pub trait DetectionStream: Send + Sync {
    fn sensor_id(&self) -> &SensorID;
    async fn next(&mut self) -> Option<Detection>;
}

/// Persistence boundary the pipeline hands finished tracks to; the tracker
/// itself never depends on this.
#[async_trait]
pub trait TrackRepository: Send + Sync {
    async fn save(&self, track: &Track) -> Result<(), PipelineError>;
    async fn get_by_id(&self, id: TrackID) -> Result<Option<Track>, PipelineError>;
    async fn list(&self) -> Result<Vec<Track>, PipelineError>;
    async fn delete(&self, id: TrackID) -> Result<(), PipelineError>;
    async fn delete_all(&self) -> Result<(), PipelineError>;
}

/// Per-sensor accuracy/rate/covariance lookup used by fusion.
pub trait SensorCharacteristicsLookup: Send + Sync {
    fn characteristics(&self, sensor_id: &SensorID) -> Option<SensorCharacteristics>;
}

/// Runs detection streams through the tracker and coordinator, emitting
/// events downstream.
pub struct Pipeline {
    tracker: Tracker,
    coordinator: IntelligenceCoordinator,
    config: PipelineConfig,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(
        tracker: Tracker,
        coordinator: IntelligenceCoordinator,
        config: PipelineConfig,
        metrics: Arc<Metrics>,
        cancel: CancellationToken,
    ) -> Self {
        Pipeline {
            tracker,
            coordinator,
            config,
            metrics,
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawns one ingest task per stream, each feeding a per-sensor
    /// drop-oldest queue, then drives the batching loop until cancelled.
    /// Drains in-flight batches and emits a final partial `TrackingResult`
    /// on cancellation.
    pub async fn run<R: TrackRepository>(
        &mut self,
        streams: Vec<Box<dyn DetectionStream>>,
        repository: Arc<R>,
        events_tx: mpsc::Sender<Event>,
    ) -> Result<(), PipelineError> {
        let mut queues: HashMap<SensorID, Arc<DropOldestQueue>> = HashMap::new();
        let mut ingest_handles = Vec::new();

        for mut stream in streams {
            let sensor_id = stream.sensor_id().clone();
            let queue = Arc::new(DropOldestQueue::new(self.config.queue_capacity, Arc::clone(&self.metrics)));
            queues.insert(sensor_id.clone(), Arc::clone(&queue));

            let cancel = self.cancel.clone();
            ingest_handles.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        detection = stream.next() => match detection {
                            Some(d) => queue.push(d),
                            None => break,
                        },
                    }
                }
                log::debug!("ingest task for {} stopped", sensor_id);
            }));
        }

        loop {
            if self.cancel.is_cancelled() {
                log::info!("pipeline cancelled, draining in-flight batches");
                let batch = self.drain_all(&queues);
                if !batch.is_empty() {
                    self.process_batch(batch, &repository, &events_tx).await?;
                }
                break;
            }

            let batch = self.collect_batch(&queues).await;
            if batch.is_empty() {
                continue;
            }
            self.process_batch(batch, &repository, &events_tx).await?;
        }

        for handle in ingest_handles {
            let _ = handle.await;
        }
        Ok(())
    }

    fn drain_all(&self, queues: &HashMap<SensorID, Arc<DropOldestQueue>>) -> Vec<Detection> {
        let mut out = Vec::new();
        for queue in queues.values() {
            out.extend(queue.drain());
        }
        out
    }

    /// Accumulates detections for up to `batch_timeout` or until
    /// `max_batch_size` is reached, whichever happens first.
    async fn collect_batch(&self, queues: &HashMap<SensorID, Arc<DropOldestQueue>>) -> Vec<Detection> {
        let mut batch = Vec::new();
        let deadline = tokio::time::sleep(self.config.batch_timeout);
        tokio::pin!(deadline);
        let mut poll = tokio::time::interval(std::time::Duration::from_millis(1));

        loop {
            for queue in queues.values() {
                if batch.len() >= self.config.max_batch_size {
                    break;
                }
                batch.extend(queue.drain());
            }
            if batch.len() >= self.config.max_batch_size || self.cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = &mut deadline => break,
                _ = poll.tick() => {}
            }
        }
        batch.truncate(self.config.max_batch_size);
        batch
    }

    async fn process_batch<R: TrackRepository>(
        &mut self,
        batch: Vec<Detection>,
        repository: &Arc<R>,
        events_tx: &mpsc::Sender<Event>,
    ) -> Result<(), PipelineError> {
        let frame_ts = batch.iter().map(|d| d.timestamp).max().unwrap_or_else(chrono::Utc::now);
        log::debug!("processing batch of {} detections at {}", batch.len(), frame_ts);

        let result = self.tracker.update(&batch, frame_ts)?;
        let alerts = self.coordinator.process(&result.active_tracks).await;

        for track in &result.new_tracks {
            if repository.save(track).await.is_err() {
                log::warn!("failed to persist new track {}", track.id);
            }
            self.emit(events_tx, Event::track_created(frame_ts, track.id)).await?;
        }

        let new_ids: std::collections::HashSet<TrackID> = result.new_tracks.iter().map(|t| t.id).collect();
        for track in &result.active_tracks {
            if new_ids.contains(&track.id) {
                continue;
            }
            if repository.save(track).await.is_err() {
                log::warn!("failed to persist updated track {}", track.id);
            }
            self.emit(events_tx, Event::track_updated(frame_ts, track.id)).await?;
        }

        for &id in &result.deleted_tracks {
            if repository.delete(id).await.is_err() {
                log::warn!("failed to delete persisted track {}", id);
            }
            self.emit(events_tx, Event::track_deleted(frame_ts, id)).await?;
        }

        for alert in &alerts {
            self.emit(
                events_tx,
                Event::threat_detected(frame_ts, alert.threat.track_id, alert.threat.threat_level),
            )
            .await?;
            if let Some(collision) = &alert.collision {
                self.emit(
                    events_tx,
                    Event::collision_warning(
                        frame_ts,
                        (collision.track1, collision.track2),
                        collision.time_to_collision,
                        collision.probability,
                    ),
                )
                .await?;
            }
        }

        if result.processing_time_ms > 50.0 {
            self.metrics.incr_max_latency_overruns();
        }

        Ok(())
    }

    async fn emit(&self, events_tx: &mpsc::Sender<Event>, event: Event) -> Result<(), PipelineError> {
        if events_tx.send(event).await.is_err() {
            self.cancel.cancel();
            return Err(PipelineError::SinkUnrecoverable);
        }
        Ok(())
    }
}

/// A lookup with no registered sensors; useful as a default/test double.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSensorCharacteristics;

impl SensorCharacteristicsLookup for NullSensorCharacteristics {
    fn characteristics(&self, _sensor_id: &SensorID) -> Option<SensorCharacteristics> {
        None
    }
}
