//! Primary vertex aggregation.

use velotrack_core::{Point3, PrimaryVertex};

use crate::theta::ThetaClusterer;

/// Clusters raw vertex candidates by z and averages each cluster.
///
/// Candidates are chained along z with `tol_vertices`, so many near-duplicate
/// per-track intersections collapse into a few collision points. Vertices are
/// returned in ascending z.
#[must_use]
pub fn analyze_primary_vertices(candidates: &[Point3], tol_vertices: f64) -> Vec<PrimaryVertex> {
    ThetaClusterer::new(tol_vertices)
        .cluster_by(candidates, |p| p[2])
        .into_iter()
        .filter_map(|members| {
            PrimaryVertex::from_candidates(members.iter().map(|&i| &candidates[i]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_two_vertices() {
        let candidates = [
            [0.0, 0.0, 10.01],
            [0.0, 0.0, 9.99],
            [0.0, 0.0, 10.02],
            [0.0, 0.0, 50.0],
        ];
        let vertices = analyze_primary_vertices(&candidates, 1.0);
        assert_eq!(vertices.len(), 2);
        assert_relative_eq!(vertices[0].z, (10.01 + 9.99 + 10.02) / 3.0, epsilon = 1e-12);
        assert_eq!(vertices[0].n_candidates, 3);
        assert_relative_eq!(vertices[1].z, 50.0);
        assert_eq!(vertices[1].n_candidates, 1);
    }

    #[test]
    fn test_averages_transverse_position() {
        let candidates = [[0.2, -0.1, 5.0], [0.0, 0.1, 5.5]];
        let vertices = analyze_primary_vertices(&candidates, 1.0);
        assert_eq!(vertices.len(), 1);
        assert_relative_eq!(vertices[0].x, 0.1);
        assert_relative_eq!(vertices[0].y, 0.0);
    }

    #[test]
    fn test_no_candidates() {
        assert!(analyze_primary_vertices(&[], 1.0).is_empty());
    }
}
