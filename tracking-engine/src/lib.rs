//! # Tracking Engine
//!
//! Async intelligence coordinator and ingest pipeline built on
//! [`tracking_core`]'s pure tracking kernel.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  tracking-engine (tokio)                                     │
//! │  ├── pipeline      (batching, back-pressure, cancellation)  │
//! │  ├── coordinator   (threat assessment, collision prediction)│
//! │  ├── threat        (pluggable ThreatAnalyzer policy)        │
//! │  ├── collision     (pluggable CollisionPredictor policy)    │
//! │  ├── history       (rolling per-track snapshot history)     │
//! │  └── events        (TrackCreated / ThreatDetected / ...)    │
//! └──────────────────────────────────────────────────────────────┘
//!                 │ depends on
//!                 ▼
//!    tracking-core::{Tracker, Track, Detection, ...}
//! ```
//!
//! Sensor I/O, persistence, and the outward-facing wire surface are all
//! external collaborators implementing [`pipeline::DetectionStream`],
//! [`pipeline::TrackRepository`], and [`pipeline::SensorCharacteristicsLookup`].

pub mod collision;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod history;
pub mod pipeline;
pub mod queue;
pub mod threat;

pub use collision::{ClosestApproachPredictor, Collision, CollisionPredictor};
pub use config::{CoordinatorConfig, PipelineConfig};
pub use coordinator::{IntelligenceCoordinator, TacticalAlert};
pub use error::{CoordinatorError, PipelineError};
pub use events::Event;
pub use history::HistoryStore;
pub use pipeline::{DetectionStream, NullSensorCharacteristics, Pipeline, SensorCharacteristicsLookup, TrackRepository};
pub use threat::{RuleBasedThreatAnalyzer, Threat, ThreatAnalyzer};
