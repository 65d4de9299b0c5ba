//! velotrack-algorithms: Reconstruction stages for the straight-line toy detector.
//!
//! This crate provides the stages that turn hits into tracks and vertices:
//! - **Theta clustering** - 1-D single-linkage chaining on azimuth
//! - **Tolerance estimation** - adaptive theta and clone tolerances
//! - **Track building** - beam-line validated tracks from one cluster
//! - **Clone splitting** - direction-cosine separation of merged tracks
//! - **Vertex aggregation** - z clustering of beam-line intersections
//! - **Reconciliation** - filter, complete and extend a solved activation vector
//!
#![warn(missing_docs)]

mod clone;
pub mod intersect;
mod reconcile;
mod resolver;
mod segments;
mod theta;
pub mod tolerance;
mod track;
mod vertex;

pub use clone::CloneSplitter;
pub use intersect::VertexIntersector;
pub use reconcile::{discretize, ReconciliationContext, ReconciliationOutcome, Reconciler};
pub use resolver::{ClusterResolver, Reconstruction};
pub use segments::{find_segments, gen_indices, SegmentEnumeration, SegmentEnumerator};
pub use theta::ThetaClusterer;
pub use tolerance::{CloneToleranceParams, ThetaSpreadParams, ToleranceEstimate};
pub use track::{TrackBuilder, TrackOutcome};
pub use vertex::analyze_primary_vertices;

// Re-export core reconstruction types
pub use velotrack_core::{ReconstructionConfig, ReconstructionState};
