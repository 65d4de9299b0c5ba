//! Splitting of clone clusters by 3-D direction.
//!
//! A clone cluster holds hits of several tracks that share an azimuth. Their
//! XY projections coincide, but a straight track keeps one 3-D slope across
//! all planes, so clustering segment direction cosines separates them.

use std::collections::HashSet;

use log::debug;
use velotrack_core::{Cluster, Hit, ReconstructionState, Segment};

use crate::theta::ThetaClusterer;
use crate::track::{TrackBuilder, TrackOutcome};

/// Splits oversized clusters into per-track sub-clusters.
#[derive(Clone, Copy, Debug)]
pub struct CloneSplitter<'a> {
    builder: TrackBuilder<'a>,
}

impl<'a> CloneSplitter<'a> {
    /// Creates a splitter that hands accepted sub-clusters to `builder`.
    #[must_use]
    pub fn new(builder: TrackBuilder<'a>) -> Self {
        Self { builder }
    }

    /// Candidate segments joining every hit of one module to every hit of the
    /// next module present in `track_hits`.
    ///
    /// `track_hits` must be sorted by module. Segments are ordered by module
    /// pair, then inner hit, then outer hit, and numbered from zero.
    #[must_use]
    pub fn candidate_segments(track_hits: &[Hit]) -> Vec<Segment> {
        let groups: Vec<&[Hit]> = track_hits
            .chunk_by(|a, b| a.module_id == b.module_id)
            .collect();

        let mut segments = Vec::new();
        for pair in groups.windows(2) {
            for inner in pair[0] {
                for outer in pair[1] {
                    segments.push(Segment::new(segments.len(), *inner, *outer));
                }
            }
        }
        segments
    }

    /// Splits a module-sorted clone cluster and builds one track per
    /// direction sub-cluster. Returns the number of accepted tracks.
    ///
    /// Every hit ends up in `state.found_clusters` or `state.false_clusters`:
    /// sub-clusters that cannot form a track (fewer than two modules or a
    /// repeated module) are filed as false, and a cluster without any
    /// candidate segment is filed as false whole.
    pub fn split(
        &self,
        track_hits: &[Hit],
        tol_clone: f64,
        state: &mut ReconstructionState,
    ) -> usize {
        let segments = Self::candidate_segments(track_hits);
        let Some(reference) = segments.first() else {
            debug!(
                "clone split: {} hits on a single module, filed as false",
                track_hits.len()
            );
            state
                .false_clusters
                .push(track_hits.iter().map(|h| h.index).collect());
            return 0;
        };

        let cosines: Vec<f64> = segments.iter().map(|s| s.cosine(reference)).collect();
        let groups = ThetaClusterer::new(tol_clone).cluster_values(&cosines);
        debug!(
            "clone split: {} hits, {} segments, {} direction groups (tol {:.3e})",
            track_hits.len(),
            segments.len(),
            groups.len(),
            tol_clone
        );

        let mut seen: HashSet<Vec<(u32, usize)>> = HashSet::new();
        let mut accepted = 0;
        for group in groups {
            let mut unique = HashSet::new();
            let mut hits: Vec<Hit> = group
                .iter()
                .flat_map(|&i| segments[i].hits)
                .filter(|h| unique.insert(h.index))
                .collect();
            hits.sort_by_key(|h| h.module_id);

            let modules: HashSet<u32> = hits.iter().map(|h| h.module_id).collect();
            if modules.len() < 2 || modules.len() != hits.len() {
                debug!(
                    "clone split: group of {} hits over {} modules rejected",
                    hits.len(),
                    modules.len()
                );
                state
                    .false_clusters
                    .push(hits.iter().map(|h| h.index).collect());
                continue;
            }

            let signature: Vec<(u32, usize)> =
                hits.iter().map(|h| (h.module_id, h.index)).collect();
            if !seen.insert(signature) {
                continue;
            }

            let cluster: Cluster = hits.iter().map(|h| h.index).collect();
            if matches!(self.builder.build(&cluster, state), TrackOutcome::Accepted(_)) {
                accepted += 1;
            }
        }
        accepted
    }
}
