//! Error taxonomy for the coordinator and pipeline.

use thiserror::Error;

/// Errors raised while turning active tracks into tactical alerts.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("threat analysis failed for one or more tracks")]
    ThreatAnalysisFailed,
}

/// Errors raised by the ingest-to-alert pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("downstream sink is unrecoverable")]
    SinkUnrecoverable,
    #[error(transparent)]
    Tracker(#[from] tracking_core::TrackerError),
}
