//! # Tracking Core
//!
//! Sensor-agnostic multi-object tracking kernel with **zero I/O dependencies**,
//! making it suitable for any platform including WebAssembly (WASM).
//!
//! ## Architecture
//!
//! `tracking-core` is designed to be the shared foundation between:
//! - **`tracking-engine`**: async coordinator and ingest pipeline
//! - any other host (batch replay tool, simulator, WASM embedding)
//!
//! All persistence, sensor I/O and transport are external collaborators; this
//! crate only turns `Detection`s into `Track`s.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  tracking-core (pure, no tokio/async deps)                  │
//! │  ├── filter/     (Kalman / UKF state estimation)            │
//! │  ├── assoc/      (cost construction & solvers)              │
//! │  ├── fusion      (multi-sensor measurement fusion)          │
//! │  ├── tracker     (per-frame lifecycle kernel)                │
//! │  └── config      (tunables, all with sensible defaults)      │
//! └──────────────────────────────────────────────────────────────┘
//!                 ▲
//!    ┌────────────┴────────────┐
//!    │  tracking-engine        │
//!    │  (coordinator, pipeline)│
//!    └─────────────────────────┘
//! ```
//!
//! ## Key Modules
//!
//! - [`filter`] - Kalman filter and unscented Kalman filter state estimators
//! - [`assoc`] - Cost matrix construction and greedy / Hungarian / k-best solvers
//! - [`fusion`] - Multi-sensor detection clustering and weighted fusion
//! - [`tracker`] - The per-frame tracking kernel ([`Tracker`])
//! - [`track`] - Track, TrackState, TrackStatus, ThreatLevel, TrackingResult
//! - [`config`] - Tunable configuration structs with `Default` impls
//!
//! ## Example: Running one frame through the tracker
//!
//! ```rust
//! use tracking_core::{Tracker, TrackerConfig};
//! use tracking_core::{Detection, Position3D, Confidence, SensorID};
//! use chrono::Utc;
//!
//! let mut tracker = Tracker::new(TrackerConfig::default());
//! let now = Utc::now();
//! let detections = vec![Detection::new(
//!     now,
//!     Position3D::new(0.0, 0.0, 0.0),
//!     Confidence::new(0.9).unwrap(),
//!     SensorID::new("radar-0"),
//! )];
//! let result = tracker.update(&detections, now).unwrap();
//! assert_eq!(result.new_tracks.len(), 1);
//! ```

pub mod assoc;
pub mod config;
pub mod detection;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod geometry;
pub mod ids;
pub mod metrics;
pub mod track;
pub mod tracker;

// Re-export commonly used types
pub use config::{
    AssociationConfig, AssociationWeights, FilterKind, FusionConfig, Solver, TrackerConfig,
};
pub use detection::{Detection, SensorCharacteristics};
pub use error::{AssociationError, FilterError, TrackerError};
pub use geometry::{Confidence, Covariance, Position3D, Velocity3D};
pub use ids::{SensorID, TrackID};
pub use metrics::{Metrics, MetricsSnapshot};
pub use track::{Track, TrackState, TrackStatus, ThreatLevel, TrackingResult};
pub use tracker::Tracker;
