//! Candidate segment enumeration over the reconciliation window.
//!
//! Every hit on a module is paired with every hit on the next module, for
//! the modules up to `window_modules`. The resulting list is the ordered set
//! of decision variables a segment-activation solver works on.

use std::f64::consts::{PI, TAU};

use velotrack_core::{Event, Segment};

/// Enumerated candidate segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentEnumeration {
    /// All candidates, ids equal to positions.
    pub segments: Vec<Segment>,
    /// Candidates whose azimuth matches both endpoint hits, the ones
    /// compatible with a track radiating from the beam line.
    pub in_window: Vec<Segment>,
}

impl SegmentEnumeration {
    /// Ids of the azimuth-compatible candidates.
    #[must_use]
    pub fn in_window_ids(&self) -> Vec<usize> {
        self.in_window.iter().map(|s| s.segment_id).collect()
    }
}

/// Builds fully combinatorial segments between adjacent modules.
#[derive(Clone, Copy, Debug)]
pub struct SegmentEnumerator {
    window_modules: u32,
    theta_tol: f64,
}

impl SegmentEnumerator {
    /// Creates an enumerator over modules `1..=window_modules`.
    #[must_use]
    pub fn new(window_modules: u32, theta_tol: f64) -> Self {
        Self {
            window_modules,
            theta_tol,
        }
    }

    /// Enumerates candidates in (module pair, inner hit, outer hit) order.
    #[must_use]
    pub fn enumerate(&self, event: &Event) -> SegmentEnumeration {
        let modules: Vec<_> = event
            .modules
            .iter()
            .filter(|m| m.module_id <= self.window_modules)
            .collect();

        let mut result = SegmentEnumeration::default();
        for pair in modules.windows(2) {
            for inner in pair[0].hits.iter().filter_map(|&i| event.hit(i)) {
                for outer in pair[1].hits.iter().filter_map(|&i| event.hit(i)) {
                    let segment = Segment::new(result.segments.len(), *inner, *outer);
                    if angle_between(segment.theta, inner.theta) <= self.theta_tol
                        && angle_between(inner.theta, outer.theta) <= self.theta_tol
                    {
                        result.in_window.push(segment.clone());
                    }
                    result.segments.push(segment);
                }
            }
        }
        result
    }
}

/// Smallest absolute difference between two azimuths.
fn angle_between(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % TAU;
    if d > PI {
        TAU - d
    } else {
        d
    }
}

/// Ideal active positions for `npart` particles over `layers` planes when
/// every module lists its hits in particle order.
///
/// Particle `i` between planes `j` and `j + 1` sits at
/// `i * (npart + 1) + j * npart^2`.
#[must_use]
pub fn gen_indices(npart: usize, layers: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity(npart * layers.saturating_sub(1));
    for j in 0..layers.saturating_sub(1) {
        for i in 0..npart {
            indices.push(i * (npart + 1) + j * npart * npart);
        }
    }
    indices
}

/// Segments of `active` that continue `s0` outward or lead into it.
#[must_use]
pub fn find_segments<'a>(s0: &Segment, active: &'a [Segment]) -> Vec<&'a Segment> {
    active
        .iter()
        .filter(|s1| {
            s0.hits[0].index == s1.hits[1].index || s1.hits[0].index == s0.hits[1].index
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use velotrack_core::{DetectorGeometry, Hit};

    /// `npart` radial tracks from the origin, hits listed in particle order
    /// on every module.
    fn ordered_event(npart: usize, layers: u32) -> Event {
        let mut hits = Vec::new();
        for m in 1..=layers {
            let z = 20.0 * f64::from(m);
            for i in 0..npart {
                let phi = 0.4 + 0.9 * i as f64;
                let (x, y) = (0.1 * z * phi.cos(), 0.1 * z * phi.sin());
                hits.push(Hit::new(hits.len() as u64, x, y, z, m));
            }
        }
        Event::new(DetectorGeometry::planes(layers as usize, 20.0, 33.0), hits)
    }

    #[test]
    fn test_gen_indices() {
        assert_eq!(gen_indices(2, 3), vec![0, 3, 4, 7]);
        assert_eq!(gen_indices(3, 2), vec![0, 4, 8]);
        assert!(gen_indices(4, 1).is_empty());
    }

    #[test]
    fn test_enumeration_is_fully_combinatorial() {
        let event = ordered_event(3, 4);
        let enumeration = SegmentEnumerator::new(3, 1e-6).enumerate(&event);
        // two module pairs inside the window, 3 x 3 each
        assert_eq!(enumeration.segments.len(), 18);
        assert!(enumeration
            .segments
            .iter()
            .enumerate()
            .all(|(i, s)| s.segment_id == i && s.module_id <= 3));
    }

    #[test]
    fn test_in_window_matches_ideal_indices() {
        let event = ordered_event(3, 3);
        let enumeration = SegmentEnumerator::new(3, 1e-6).enumerate(&event);
        assert_eq!(enumeration.in_window_ids(), gen_indices(3, 3));
        for s in &enumeration.in_window {
            assert_eq!(s.hits[0].hit_id % 3, s.hits[1].hit_id % 3);
        }
    }

    #[test]
    fn test_angle_between_wraps() {
        assert!((angle_between(PI - 0.01, -PI + 0.01) - 0.02).abs() < 1e-12);
        assert!((angle_between(0.3, 0.1) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_find_segments_links_neighbours() {
        let event = ordered_event(2, 3);
        let enumeration = SegmentEnumerator::new(3, 1e-6).enumerate(&event);
        let active: Vec<Segment> = gen_indices(2, 3)
            .into_iter()
            .map(|i| enumeration.segments[i].clone())
            .collect();

        // particle 0, first module pair, continues into particle 0's next segment only
        let linked = find_segments(&active[0], &active);
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].segment_id, active[2].segment_id);
    }
}
