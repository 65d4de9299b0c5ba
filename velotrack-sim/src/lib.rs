//! velotrack-sim: Toy event generator for a stack of parallel detector planes.
//!
//! Particles leave their primary vertex on straight lines, with no magnetic
//! field. Each plane records one hit per crossing particle, optionally
//! smeared by measurement error, kicked by multiple scattering, dropped, or
//! accompanied by uniformly distributed ghost hits.

mod error;
mod generator;

pub use error::{Error, Result};
pub use generator::{EventGenerator, GeneratedEvent, GeneratorConfig, ParticleState};
