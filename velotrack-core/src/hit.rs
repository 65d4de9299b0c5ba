//! Hit types for detector-plane position observations.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point or vector in detector coordinates (mm).
pub type Point3 = [f64; 3];

/// A single position observation on one detector module.
///
/// `theta` is the azimuth of the hit's XY projection and is computed once by
/// the constructor. `index` is the stable surrogate key assigned by the
/// pipeline when a hit list is ingested (see [`assign_indices`]); every
/// deduplication in the reconstruction keys on it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    /// Identifier from the producer of the hit (not necessarily unique).
    pub hit_id: u64,
    /// X coordinate (mm).
    pub x: f64,
    /// Y coordinate (mm).
    pub y: f64,
    /// Z coordinate (mm).
    pub z: f64,
    /// Module (detector plane) hosting the hit.
    pub module_id: u32,
    /// Azimuth `atan2(y, x)`.
    pub theta: f64,
    /// Position of the hit in the ingested hit list.
    pub index: usize,
}

impl Hit {
    /// Creates a new hit; `index` starts at zero until ingestion.
    #[must_use]
    pub fn new(hit_id: u64, x: f64, y: f64, z: f64, module_id: u32) -> Self {
        Self {
            hit_id,
            x,
            y,
            z,
            module_id,
            theta: y.atan2(x),
            index: 0,
        }
    }

    /// Returns the hit with its surrogate key set.
    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Returns the hit position.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Point3 {
        [self.x, self.y, self.z]
    }
}

/// Assigns sequential surrogate keys to an ingested hit list.
pub fn assign_indices(hits: &mut [Hit]) {
    for (i, hit) in hits.iter_mut().enumerate() {
        hit.index = i;
    }
}
