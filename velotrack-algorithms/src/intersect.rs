//! Line intersection tests against the beam (z) axis.
//!
//! In the toy detector there is no magnetic field, so a genuine segment
//! extrapolates back to the beam line at a z between the origin and the
//! first detector plane. These tests are the acceptance criterion for
//! tracks and the filter applied to solved segment activations.

use nalgebra::{Matrix3x2, Vector3};
use velotrack_core::{Point3, Segment};

/// Relative tolerance used for boundary proximity, matching the usual
/// `allclose` convention of `|a - b| <= atol + rtol * |b|`.
const REL_TOL: f64 = 1.0e-5;

/// Singular values below this fraction of the largest one count as zero.
const RANK_RTOL: f64 = 1.0e-8;

/// Solution of `p + t d = 0` along one axis.
#[derive(Clone, Copy, Debug, PartialEq)]
enum AxisSolution {
    /// Unique parameter.
    At(f64),
    /// The line stays on this axis' zero plane for every parameter.
    Always,
}

fn solve_axis(p: f64, d: f64, tol: f64) -> Option<AxisSolution> {
    if d.abs() > tol {
        Some(AxisSolution::At(-p / d))
    } else if p.abs() < tol {
        Some(AxisSolution::Always)
    } else {
        None
    }
}

fn is_close(a: f64, b: f64, atol: f64) -> bool {
    (a - b).abs() <= atol + REL_TOL * b.abs()
}

/// Intersects the line `point + t * direction` with the z axis.
///
/// The parameters zeroing x and y are solved independently. A direction
/// component within `tol` of zero only passes if the point already sits on
/// that axis' zero plane. When both parameters are determined they must agree
/// within `tol` and are averaged. Returns `(0, 0, z)` on success.
#[must_use]
pub fn intersects_z_axis(point: &Point3, direction: &Point3, tol: f64) -> Option<Point3> {
    let tx = solve_axis(point[0], direction[0], tol)?;
    let ty = solve_axis(point[1], direction[1], tol)?;

    let t = match (tx, ty) {
        (AxisSolution::At(a), AxisSolution::At(b)) => {
            if (a - b).abs() > tol {
                return None;
            }
            (a + b) / 2.0
        }
        (AxisSolution::At(a), AxisSolution::Always) => a,
        (AxisSolution::Always, AxisSolution::At(b)) => b,
        (AxisSolution::Always, AxisSolution::Always) => 0.0,
    };

    Some([0.0, 0.0, point[2] + t * direction[2]])
}

/// Returns true if the line `point + t * direction` passes through the origin.
#[must_use]
pub fn intersects_origin(point: &Point3, direction: &Point3, tol: f64) -> bool {
    let t_values: Vec<f64> = (0..3)
        .filter(|&k| direction[k].abs() > tol)
        .map(|k| -point[k] / direction[k])
        .collect();

    match t_values.first() {
        None => point.iter().all(|c| c.abs() < tol),
        Some(&t_ref) => t_values.iter().all(|t| (t - t_ref).abs() < tol),
    }
}

/// Intersects two lines `p1 + t d1` and `p2 + s d2`.
///
/// Solves `t d1 - s d2 = p2 - p1` in the least-squares sense and accepts the
/// closest approach when the two closest points agree within `tol` on every
/// coordinate. Parallel or degenerate lines make the system rank deficient
/// and return `None`.
#[must_use]
pub fn check_intersection(
    p1: &Point3,
    d1: &Point3,
    p2: &Point3,
    d2: &Point3,
    tol: f64,
) -> Option<Point3> {
    let (p1, d1) = (Vector3::from(*p1), Vector3::from(*d1));
    let (p2, d2) = (Vector3::from(*p2), Vector3::from(*d2));

    let svd = Matrix3x2::from_columns(&[d1, -d2]).svd(true, true);
    let eps = RANK_RTOL * svd.singular_values.max();
    if svd.rank(eps) < 2 {
        return None;
    }
    let params = svd.solve(&(p2 - p1), eps).ok()?;

    let q1 = p1 + d1 * params[0];
    let q2 = p2 + d2 * params[1];
    if (0..3).all(|k| is_close(q1[k], q2[k], tol)) {
        Some([q1.x, q1.y, q1.z])
    } else {
        None
    }
}

/// Beam-line acceptance test for segments.
#[derive(Clone, Copy, Debug)]
pub struct VertexIntersector {
    tolerance: f64,
    first_layer_spacing: f64,
}

impl VertexIntersector {
    /// Creates an intersector for a detector whose first plane sits at
    /// `first_layer_spacing`.
    #[must_use]
    pub fn new(tolerance: f64, first_layer_spacing: f64) -> Self {
        Self {
            tolerance,
            first_layer_spacing,
        }
    }

    /// Intersection tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Tests a segment against the z axis and records its vertex candidate.
    ///
    /// Both endpoints are extrapolated along the segment direction and must
    /// reach the axis. The resulting z must lie strictly between the origin
    /// and the first plane, away from both boundaries. On success the point
    /// is appended to `candidates` (no deduplication) and `true` is returned.
    pub fn segment_intersects_z_axis(
        &self,
        segment: &Segment,
        candidates: &mut Vec<Point3>,
    ) -> bool {
        let Some(point) = self.segment_vertex(segment) else {
            return false;
        };
        candidates.push(point);
        true
    }

    /// Computes the accepted z-axis crossing of a segment without recording it.
    #[must_use]
    pub fn segment_vertex(&self, segment: &Segment) -> Option<Point3> {
        let tol = self.tolerance;
        let d = segment.direction();

        intersects_z_axis(&segment.p0(), &d, tol)?;
        let point = intersects_z_axis(&segment.p1(), &d, tol)?;

        let z = point[2];
        let dz = self.first_layer_spacing;
        if z <= 0.0 || z >= dz || is_close(z, 0.0, tol) || is_close(z, dz, tol) {
            return None;
        }
        Some(point)
    }
}
