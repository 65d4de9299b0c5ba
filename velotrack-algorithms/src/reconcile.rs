//! Reconciliation of a solved segment-activation vector.
//!
//! A solver assigns one real value to each candidate segment of the
//! reconciliation window. The values are discretized against their minimum,
//! filtered with the beam-line test, completed with in-window segments the
//! solver missed, and finally extended outward with the segments a full
//! reconstruction found beyond the window.

use std::collections::HashMap;

use log::{debug, info, warn};
use velotrack_core::{
    Event, Point3, PrimaryVertex, ReconcileError, ReconstructionConfig, Segment, Track,
};

use crate::intersect::VertexIntersector;
use crate::resolver::Reconstruction;
use crate::segments::SegmentEnumeration;
use crate::vertex::analyze_primary_vertices;

/// Detector and earlier-pass context a solution is reconciled against.
#[derive(Debug, Clone, Copy)]
pub struct ReconciliationContext<'a> {
    /// Event supplying hits, modules and geometry.
    pub event: &'a Event,
    /// Tracks found by a full reconstruction.
    pub found_tracks: &'a [Track],
    /// Segments found by a full reconstruction.
    pub found_segments: &'a [Segment],
    /// In-window segments eligible for completion.
    pub in_window_segments: &'a [Segment],
    /// Number of segments expected to be active inside the window.
    pub expected_active: usize,
}

impl<'a> ReconciliationContext<'a> {
    /// Context from a full reconstruction and the enumerated window.
    ///
    /// The expected active count is the number of azimuth-compatible
    /// candidates.
    #[must_use]
    pub fn new(reconstruction: &'a Reconstruction, enumeration: &'a SegmentEnumeration) -> Self {
        Self {
            event: &reconstruction.event,
            found_tracks: &reconstruction.state.found_tracks,
            found_segments: &reconstruction.state.found_segments,
            in_window_segments: &enumeration.in_window,
            expected_active: enumeration.in_window.len(),
        }
    }
}

/// Result of reconciling one solution.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationOutcome {
    /// Event carrying the full-detector tracks and segments.
    pub event: Event,
    /// Full-detector tracks, empty when nothing survived filtering.
    pub tracks: Vec<Track>,
    /// Ids of the active window segments before outward extension.
    pub good_segment_ids: Vec<usize>,
    /// Active window segments followed by the outward extension.
    pub active_segments: Vec<Segment>,
    /// Completed activation per decision segment.
    pub solution: Vec<bool>,
    /// Primary vertices from every recorded intersection.
    pub primary_vertices: Vec<PrimaryVertex>,
    /// Ids of provisionally active segments dropped by the filter.
    pub removed: Vec<usize>,
    /// Ids of segments activated by completion.
    pub added: Vec<usize>,
}

impl ReconciliationOutcome {
    /// Number of active decision segments after completion.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.solution.iter().filter(|&&on| on).count()
    }
}

/// Splits a solution into on and off against its strict minimum.
///
/// Entries equal to the minimum are off, every strictly greater one is on.
/// An empty solution gives an empty vector.
#[must_use]
pub fn discretize(solution: &[f64]) -> Vec<bool> {
    let min = solution.iter().copied().fold(f64::INFINITY, f64::min);
    solution.iter().map(|&v| v > min).collect()
}

/// Reconciles solved activations with detector geometry.
#[derive(Clone, Copy, Debug)]
pub struct Reconciler {
    intersector: VertexIntersector,
    tol_vertices: f64,
    window_modules: u32,
}

impl Reconciler {
    /// Creates a reconciler.
    #[must_use]
    pub fn new(intersector: VertexIntersector, tol_vertices: f64, window_modules: u32) -> Self {
        Self {
            intersector,
            tol_vertices,
            window_modules,
        }
    }

    /// Creates a reconciler from the run configuration.
    #[must_use]
    pub fn from_config(config: &ReconstructionConfig) -> Self {
        Self::new(
            VertexIntersector::new(config.tol_intersects, config.dz),
            config.tol_vertices,
            config.window_modules,
        )
    }

    /// Reconciles `solution`, aligned to `segments`, against `ctx`.
    ///
    /// # Errors
    /// Returns [`ReconcileError::LengthMismatch`] if the two inputs differ in
    /// length and [`ReconcileError::NonFinite`] for a NaN or infinite entry.
    pub fn reconcile(
        &self,
        segments: &[Segment],
        solution: &[f64],
        ctx: &ReconciliationContext<'_>,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        if segments.len() != solution.len() {
            return Err(ReconcileError::LengthMismatch {
                segments: segments.len(),
                solution: solution.len(),
            });
        }
        if let Some(i) = solution.iter().position(|v| !v.is_finite()) {
            return Err(ReconcileError::NonFinite(i));
        }

        let mut candidates: Vec<Point3> = Vec::new();

        // geometric filter over the provisionally active segments
        let provisional = discretize(solution);
        let mut active = vec![false; segments.len()];
        let mut removed = Vec::new();
        for (pos, segment) in segments.iter().enumerate() {
            if !provisional[pos] {
                continue;
            }
            if self
                .intersector
                .segment_intersects_z_axis(segment, &mut candidates)
            {
                active[pos] = true;
            } else {
                debug!(
                    "removed segment {} ({} -> {}, module {})",
                    segment.segment_id,
                    segment.hits[0].hit_id,
                    segment.hits[1].hit_id,
                    segment.module_id
                );
                removed.push(segment.segment_id);
            }
        }

        // completion with in-window segments the solver missed
        let mut added = Vec::new();
        if count(&active) < ctx.expected_active {
            let positions: HashMap<usize, usize> = segments
                .iter()
                .enumerate()
                .map(|(pos, s)| (s.segment_id, pos))
                .collect();
            for segment in ctx.in_window_segments {
                let Some(&pos) = positions.get(&segment.segment_id) else {
                    warn!(
                        "in-window segment {} is not a decision segment, skipped",
                        segment.segment_id
                    );
                    continue;
                };
                if active[pos] {
                    continue;
                }
                if self
                    .intersector
                    .segment_intersects_z_axis(segment, &mut candidates)
                {
                    active[pos] = true;
                    debug!("added segment {}", segment.segment_id);
                    added.push(segment.segment_id);
                }
            }
        }

        let primary_vertices = analyze_primary_vertices(&candidates, self.tol_vertices);

        let mut event = ctx.event.without_reconstruction();
        event.tracks = ctx.found_tracks.to_vec();
        event.segments = ctx.found_segments.to_vec();

        let mut active_segments: Vec<Segment> = segments
            .iter()
            .zip(&active)
            .filter(|&(_, &on)| on)
            .map(|(s, _)| s.clone())
            .collect();

        info!(
            "reconcile: {} active, {} removed, {} added, {} primary vertices",
            active_segments.len(),
            removed.len(),
            added.len(),
            primary_vertices.len()
        );

        if active_segments.is_empty() {
            return Ok(ReconciliationOutcome {
                event,
                tracks: Vec::new(),
                good_segment_ids: Vec::new(),
                active_segments,
                solution: active,
                primary_vertices,
                removed,
                added,
            });
        }

        let good_segment_ids: Vec<usize> = active_segments.iter().map(|s| s.segment_id).collect();

        // outward extension, without further geometric checks
        for module in ctx
            .event
            .modules
            .iter()
            .filter(|m| m.module_id > self.window_modules)
        {
            active_segments.extend(
                ctx.found_segments
                    .iter()
                    .filter(|s| s.module_id == module.module_id)
                    .cloned(),
            );
        }

        Ok(ReconciliationOutcome {
            event,
            tracks: ctx.found_tracks.to_vec(),
            good_segment_ids,
            active_segments,
            solution: active,
            primary_vertices,
            removed,
            added,
        })
    }
}

fn count(flags: &[bool]) -> usize {
    flags.iter().filter(|&&on| on).count()
}
