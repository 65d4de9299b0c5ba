use std::collections::HashSet;

use velotrack_algorithms::{
    CloneSplitter, ClusterResolver, ReconstructionConfig, ReconstructionState, TrackBuilder,
    VertexIntersector,
};
use velotrack_core::{assign_indices, DetectorGeometry, Hit};

/// Hit on the line through `(0, 0, 10)` with slopes `(tx, ty)`, on plane `module`.
fn hit(id: u64, tx: f64, ty: f64, module: u32) -> Hit {
    let z = 20.0 * f64::from(module);
    Hit::new(id, tx * (z - 10.0), ty * (z - 10.0), z, module)
}

/// Two tracks from the same vertex, azimuths 0 and ~1e-3, very different slopes.
fn merged_tracks() -> Vec<Hit> {
    let (a, b) = ((0.1, 0.0), (0.2, 0.0002));
    let mut hits = Vec::new();
    for module in 1..=3u32 {
        hits.push(hit(u64::from(module) - 1, a.0, a.1, module));
        hits.push(hit(10 + u64::from(module) - 1, b.0, b.1, module));
    }
    assign_indices(&mut hits);
    hits
}

#[test]
fn test_two_merged_tracks_are_separated() {
    let hits = merged_tracks();
    let builder = TrackBuilder::new(&hits, VertexIntersector::new(1e-6, 20.0));
    let mut state = ReconstructionState::new();

    let accepted = CloneSplitter::new(builder).split(&hits, 1e-4, &mut state);

    assert_eq!(accepted, 2);
    assert_eq!(state.found_tracks.len(), 2);

    let mut seen = HashSet::new();
    for track in &state.found_tracks {
        assert_eq!(track.len(), 3);
        let ids: HashSet<u64> = track.hits.iter().map(|h| h.hit_id).collect();
        let expected_a: HashSet<u64> = [0, 1, 2].into_iter().collect();
        let expected_b: HashSet<u64> = [10, 11, 12].into_iter().collect();
        assert!(
            ids == expected_a || ids == expected_b,
            "mixed track: {ids:?}"
        );
        assert!(seen.insert(ids.into_iter().min()));
    }
}

#[test]
fn test_cross_segments_are_filed_as_false() {
    let hits = merged_tracks();
    let builder = TrackBuilder::new(&hits, VertexIntersector::new(1e-6, 20.0));
    let mut state = ReconstructionState::new();

    CloneSplitter::new(builder).split(&hits, 1e-4, &mut state);

    // each of the four cross segments forms its own direction group and
    // misses the beam line
    assert_eq!(state.false_tracks.len(), 4);
    assert!(state.false_tracks.iter().all(|t| t.len() == 2));
    assert_eq!(state.vertex_candidates.len(), 2);
    for candidate in &state.vertex_candidates {
        assert!((candidate[2] - 10.0).abs() < 1e-6);
    }
}

#[test]
fn test_coarse_tolerance_keeps_tracks_merged() {
    let hits = merged_tracks();
    let builder = TrackBuilder::new(&hits, VertexIntersector::new(1e-6, 20.0));
    let mut state = ReconstructionState::new();

    // a tolerance wider than every cosine gap puts all segments in one
    // group, which repeats modules and is rejected
    let accepted = CloneSplitter::new(builder).split(&hits, 1.0, &mut state);
    assert_eq!(accepted, 0);
    assert!(state.found_tracks.is_empty());
    assert!(state.false_tracks.is_empty());

    // the rejected group is kept as a false cluster holding every hit
    assert_eq!(state.false_clusters.len(), 1);
    let mut members = state.false_clusters[0].hits.clone();
    members.sort_unstable();
    assert_eq!(members, (0..6).collect::<Vec<_>>());
}

#[test]
fn test_clone_cluster_is_fully_accounted_by_resolver() {
    let hits = merged_tracks();
    let n = hits.len();
    let config = ReconstructionConfig::default()
        .with_layers(3)
        .with_tol_clusters(1e-2)
        .with_tol_intersects(1e-6);
    let result = ClusterResolver::new(config)
        .find_tracks(hits, DetectorGeometry::planes(3, 20.0, 33.0))
        .unwrap()
        .unwrap();

    // both tracks share one azimuth cluster, too big for a single track
    assert_eq!(result.clusters.len(), 1);
    assert_eq!(result.clusters[0].len(), n);
    assert!(result.state.ghost_clusters.is_empty());

    let recorded: HashSet<usize> = result
        .state
        .found_clusters
        .iter()
        .chain(&result.state.false_clusters)
        .flat_map(|c| c.hits.iter().copied())
        .collect();
    assert_eq!(recorded, (0..n).collect::<HashSet<_>>());
}
