//! velotrack-core: Core types for straight-line track reconstruction.
//!
//! This crate provides the data model shared by the reconstruction
//! algorithms: hits on detector planes, segments between planes, tracks,
//! primary vertices, the reconstructed event, and the immutable run
//! configuration together with its mutable run state.
//!

pub mod clustering;
pub mod config;
pub mod error;
pub mod event;
pub mod hit;
pub mod segment;
pub mod state;
pub mod vertex;

pub use clustering::{Cluster, ClusterClass};
pub use config::ReconstructionConfig;
pub use error::{Error, ReconcileError, Result};
pub use event::{DetectorGeometry, Event, Module, ModuleGeometry};
pub use hit::{assign_indices, Hit, Point3};
pub use segment::{Segment, Track};
pub use state::ReconstructionState;
pub use vertex::PrimaryVertex;
