//! Segments between detector modules and the tracks built from them.

use nalgebra::Vector3;

use crate::hit::{Hit, Point3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered pair of hits on two modules defining a directed line.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// Unique identifier within its producing pass.
    pub segment_id: usize,
    /// Inner and outer hit, ascending by module.
    pub hits: [Hit; 2],
    /// Azimuth of the XY displacement `atan2(Δy, Δx)`.
    pub theta: f64,
    /// Module of the outer hit.
    pub module_id: u32,
    /// Track the segment was committed to, if any.
    pub track_id: Option<usize>,
}

impl Segment {
    /// Creates a segment, ordering the two hits inner to outer by module.
    #[must_use]
    pub fn new(segment_id: usize, a: Hit, b: Hit) -> Self {
        let (inner, outer) = if b.module_id < a.module_id {
            (b, a)
        } else {
            (a, b)
        };
        Self {
            segment_id,
            hits: [inner, outer],
            theta: (outer.y - inner.y).atan2(outer.x - inner.x),
            module_id: outer.module_id,
            track_id: None,
        }
    }

    /// Position of the first hit.
    #[inline]
    #[must_use]
    pub fn p0(&self) -> Point3 {
        self.hits[0].position()
    }

    /// Position of the second hit.
    #[inline]
    #[must_use]
    pub fn p1(&self) -> Point3 {
        self.hits[1].position()
    }

    /// Direction vector from the first hit to the second.
    #[must_use]
    pub fn direction(&self) -> Point3 {
        let [a, b] = &self.hits;
        [b.x - a.x, b.y - a.y, b.z - a.z]
    }

    /// Cosine of the angle between the directions of two segments.
    ///
    /// Returns 0 when either direction has zero length.
    #[must_use]
    pub fn cosine(&self, other: &Segment) -> f64 {
        let u = Vector3::from(self.direction());
        let v = Vector3::from(other.direction());
        let (nu, nv) = (u.norm(), v.norm());
        if nu == 0.0 || nv == 0.0 {
            return 0.0;
        }
        u.dot(&v) / (nu * nv)
    }
}

/// An ordered chain of hits attributed to one trajectory.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    /// Track identifier.
    pub track_id: usize,
    /// Hits in ascending module order.
    pub hits: Vec<Hit>,
    /// Segments joining consecutive hits.
    pub segments: Vec<Segment>,
}

impl Track {
    /// Creates a track from hits and the segments joining them.
    #[must_use]
    pub fn new(track_id: usize, hits: Vec<Hit>, segments: Vec<Segment>) -> Self {
        Self {
            track_id,
            hits,
            segments,
        }
    }

    /// Number of hits on the track.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the track has no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Surrogate keys of the track's hits, in module order.
    pub fn hit_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.hits.iter().map(|h| h.index)
    }
}
