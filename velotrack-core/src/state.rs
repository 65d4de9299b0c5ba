//! Mutable run state threaded through the reconstruction stages.

use crate::clustering::Cluster;
use crate::hit::Point3;
use crate::segment::{Segment, Track};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Accumulators and id counters for one reconstruction run.
///
/// Every stage appends to these lists; nothing is removed until the run
/// ends. Track and segment ids are handed out sequentially in traversal
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructionState {
    /// Clusters that produced an accepted track.
    pub found_clusters: Vec<Cluster>,
    /// Accepted tracks.
    pub found_tracks: Vec<Track>,
    /// Every segment built, whether its track was accepted or not.
    pub found_segments: Vec<Segment>,
    /// Raw z-axis intersection points, one per accepted first segment.
    pub vertex_candidates: Vec<Point3>,
    /// Tracks whose first segment misses the beam line.
    pub false_tracks: Vec<Track>,
    /// Clusters rejected as too small or as carrying a false track.
    pub false_clusters: Vec<Cluster>,
    /// Single-hit clusters.
    pub ghost_clusters: Vec<Cluster>,
    next_track_id: usize,
    next_segment_id: usize,
}

impl ReconstructionState {
    /// Creates an empty run state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next committed track will receive.
    #[must_use]
    pub fn peek_track_id(&self) -> usize {
        self.next_track_id
    }

    /// Takes the next track id.
    pub fn take_track_id(&mut self) -> usize {
        let id = self.next_track_id;
        self.next_track_id += 1;
        id
    }

    /// Takes the next segment id.
    pub fn take_segment_id(&mut self) -> usize {
        let id = self.next_segment_id;
        self.next_segment_id += 1;
        id
    }

    /// Appends another state produced independently, as if its work had run
    /// after everything already recorded here.
    ///
    /// Track and segment ids of `other` are shifted past the ids already
    /// handed out, so merging per-cluster states in cluster order reproduces
    /// sequential traversal exactly.
    pub fn merge(&mut self, other: ReconstructionState) {
        let track_offset = self.next_track_id;
        let segment_offset = self.next_segment_id;

        let shift_segment = |mut s: Segment| {
            s.segment_id += segment_offset;
            s.track_id = s.track_id.map(|id| id + track_offset);
            s
        };
        let shift_track = |mut t: Track| {
            t.track_id += track_offset;
            t.segments = t.segments.into_iter().map(&shift_segment).collect();
            t
        };

        self.found_clusters.extend(other.found_clusters);
        self.found_tracks
            .extend(other.found_tracks.into_iter().map(&shift_track));
        self.found_segments
            .extend(other.found_segments.into_iter().map(&shift_segment));
        self.vertex_candidates.extend(other.vertex_candidates);
        self.false_tracks
            .extend(other.false_tracks.into_iter().map(&shift_track));
        self.false_clusters.extend(other.false_clusters);
        self.ghost_clusters.extend(other.ghost_clusters);

        self.next_track_id += other.next_track_id;
        self.next_segment_id += other.next_segment_id;
    }
}
