//! Track building from a single cluster of hits.

use std::collections::HashSet;

use velotrack_core::{Cluster, Hit, ReconstructionState, Segment, Track};

use crate::intersect::VertexIntersector;

/// What happened to a cluster handed to [`TrackBuilder::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Fewer than two distinct hits: nothing was recorded.
    Skipped,
    /// The track was committed under this id.
    Accepted(usize),
    /// The track failed the beam-line test and was filed as false.
    Rejected,
}

/// Builds one straight track per cluster and validates it against the beam line.
///
/// Only the first segment of a candidate track is tested. Later segments are
/// recorded but never re-checked.
#[derive(Clone, Copy, Debug)]
pub struct TrackBuilder<'a> {
    hits: &'a [Hit],
    intersector: VertexIntersector,
}

impl<'a> TrackBuilder<'a> {
    /// Creates a builder that resolves cluster members against `hits`.
    #[must_use]
    pub fn new(hits: &'a [Hit], intersector: VertexIntersector) -> Self {
        Self { hits, intersector }
    }

    /// Hit lookup used by this builder.
    #[must_use]
    pub fn hits(&self) -> &'a [Hit] {
        self.hits
    }

    /// Intersector used for validation.
    #[must_use]
    pub fn intersector(&self) -> &VertexIntersector {
        &self.intersector
    }

    /// Builds a track from `cluster` and records the result in `state`.
    ///
    /// Indices are deduplicated keeping the first occurrence and unknown
    /// indices are dropped. Every segment built is appended to
    /// `state.found_segments`, whether or not the track is accepted.
    pub fn build(&self, cluster: &Cluster, state: &mut ReconstructionState) -> TrackOutcome {
        let mut seen = HashSet::with_capacity(cluster.len());
        let mut hits: Vec<Hit> = cluster
            .iter()
            .filter(|&&i| seen.insert(i))
            .filter_map(|&i| self.hits.get(i).copied())
            .collect();
        hits.sort_by_key(|h| h.module_id);

        if hits.len() < 2 {
            return TrackOutcome::Skipped;
        }

        let mut segments: Vec<Segment> = hits
            .windows(2)
            .map(|pair| Segment::new(state.take_segment_id(), pair[0], pair[1]))
            .collect();

        let accepted = self
            .intersector
            .segment_intersects_z_axis(&segments[0], &mut state.vertex_candidates);

        if accepted {
            let track_id = state.take_track_id();
            for segment in &mut segments {
                segment.track_id = Some(track_id);
            }
            state.found_segments.extend(segments.iter().cloned());
            state.found_tracks.push(Track::new(track_id, hits, segments));
            state.found_clusters.push(cluster.clone());
            TrackOutcome::Accepted(track_id)
        } else {
            let track_id = state.peek_track_id();
            state.found_segments.extend(segments.iter().cloned());
            state.false_tracks.push(Track::new(track_id, hits, segments));
            state.false_clusters.push(cluster.clone());
            TrackOutcome::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use velotrack_core::assign_indices;

    /// Three hits on a line through `(0, 0, zv)` on planes at 20, 40 and 60.
    fn line_hits(zv: f64, tx: f64, ty: f64) -> Vec<Hit> {
        let mut hits: Vec<Hit> = (1..=3u32)
            .map(|m| {
                let z = 20.0 * f64::from(m);
                Hit::new(u64::from(m), tx * (z - zv), ty * (z - zv), z, m)
            })
            .collect();
        assign_indices(&mut hits);
        hits
    }

    fn all(hits: &[Hit]) -> Cluster {
        hits.iter().map(|h| h.index).collect()
    }

    #[test]
    fn test_accepts_track_from_inside_range() {
        let hits = line_hits(10.0, 0.1, 0.05);
        let builder = TrackBuilder::new(&hits, VertexIntersector::new(1e-6, 20.0));
        let mut state = ReconstructionState::new();

        assert_eq!(builder.build(&all(&hits), &mut state), TrackOutcome::Accepted(0));
        assert_eq!(state.found_tracks.len(), 1);
        assert_eq!(state.found_tracks[0].len(), 3);
        assert_eq!(state.found_segments.len(), 2);
        assert!(state.found_segments.iter().all(|s| s.track_id == Some(0)));
        assert_eq!(state.vertex_candidates.len(), 1);
        assert!((state.vertex_candidates[0][2] - 10.0).abs() < 1e-9);
        assert_eq!(state.found_clusters.len(), 1);
    }

    #[test]
    fn test_rejects_intercept_on_first_plane() {
        let hits = line_hits(20.0, 0.1, 0.05);
        let builder = TrackBuilder::new(&hits, VertexIntersector::new(1e-6, 20.0));
        let mut state = ReconstructionState::new();

        assert_eq!(builder.build(&all(&hits), &mut state), TrackOutcome::Rejected);
        assert!(state.found_tracks.is_empty());
        assert_eq!(state.false_tracks.len(), 1);
        assert_eq!(state.false_clusters.len(), 1);
        // segments are still recorded, untagged
        assert_eq!(state.found_segments.len(), 2);
        assert!(state.found_segments.iter().all(|s| s.track_id.is_none()));
        assert_eq!(state.peek_track_id(), 0);
    }

    #[test]
    fn test_rejects_intercept_within_boundary_tolerance() {
        let hits = line_hits(19.999, 0.1, 0.05);
        let builder = TrackBuilder::new(&hits, VertexIntersector::new(1e-3, 20.0));
        let mut state = ReconstructionState::new();
        assert_eq!(builder.build(&all(&hits), &mut state), TrackOutcome::Rejected);
    }

    #[test]
    fn test_single_hit_is_noop() {
        let hits = line_hits(10.0, 0.1, 0.05);
        let builder = TrackBuilder::new(&hits, VertexIntersector::new(1e-6, 20.0));
        let mut state = ReconstructionState::new();

        let cluster = Cluster::from_iter([1, 1, 1]);
        assert_eq!(builder.build(&cluster, &mut state), TrackOutcome::Skipped);
        assert_eq!(state, ReconstructionState::new());
    }

    #[test]
    fn test_duplicates_and_order_are_normalized() {
        let hits = line_hits(10.0, 0.1, 0.05);
        let builder = TrackBuilder::new(&hits, VertexIntersector::new(1e-6, 20.0));
        let mut state = ReconstructionState::new();

        let cluster = Cluster::from_iter([2, 0, 2, 1, 0]);
        assert_eq!(builder.build(&cluster, &mut state), TrackOutcome::Accepted(0));
        let modules: Vec<u32> = state.found_tracks[0].hits.iter().map(|h| h.module_id).collect();
        assert_eq!(modules, vec![1, 2, 3]);
    }

    #[test]
    fn test_only_first_segment_is_validated() {
        let mut hits = line_hits(10.0, 0.1, 0.05);
        // bend the last hit far off the line
        hits[2] = Hit::new(3, -5.0, 7.0, 60.0, 3).with_index(2);
        let builder = TrackBuilder::new(&hits, VertexIntersector::new(1e-6, 20.0));
        let mut state = ReconstructionState::new();
        assert_eq!(builder.build(&all(&hits), &mut state), TrackOutcome::Accepted(0));
    }

    #[test]
    fn test_ids_are_sequential_across_builds() {
        let hits_a = line_hits(10.0, 0.1, 0.05);
        let mut state = ReconstructionState::new();
        let builder = TrackBuilder::new(&hits_a, VertexIntersector::new(1e-6, 20.0));
        builder.build(&all(&hits_a), &mut state);
        builder.build(&all(&hits_a), &mut state);

        let ids: Vec<usize> = state.found_tracks.iter().map(|t| t.track_id).collect();
        assert_eq!(ids, vec![0, 1]);
        let segment_ids: Vec<usize> = state.found_segments.iter().map(|s| s.segment_id).collect();
        assert_eq!(segment_ids, vec![0, 1, 2, 3]);
    }
}
