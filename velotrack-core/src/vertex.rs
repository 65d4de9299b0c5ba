//! Primary vertex types.

use crate::hit::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An estimated collision point, averaged over nearby intersection candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrimaryVertex {
    /// Mean x of the candidates (mm).
    pub x: f64,
    /// Mean y of the candidates (mm).
    pub y: f64,
    /// Mean z of the candidates (mm).
    pub z: f64,
    /// Number of candidates averaged into this vertex.
    pub n_candidates: usize,
}

impl PrimaryVertex {
    /// Averages a non-empty set of candidate points.
    ///
    /// Returns `None` for an empty set.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_candidates<'a, I>(candidates: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3>,
    {
        let mut sum = [0.0; 3];
        let mut n = 0usize;
        for p in candidates {
            sum[0] += p[0];
            sum[1] += p[1];
            sum[2] += p[2];
            n += 1;
        }
        if n == 0 {
            return None;
        }
        let scale = n as f64;
        Some(Self {
            x: sum[0] / scale,
            y: sum[1] / scale,
            z: sum[2] / scale,
            n_candidates: n,
        })
    }

    /// Vertex position.
    #[must_use]
    pub fn position(&self) -> Point3 {
        [self.x, self.y, self.z]
    }
}
