//! Per-event track finding.
//!
//! Hits are clustered by azimuth twice: once with the configured coarse
//! tolerance and once with a tolerance refined from the spread inside the
//! coarse clusters. Every refined cluster is then classified by size and
//! turned into tracks, false clusters or ghost hits.

use std::collections::HashSet;
use std::time::Instant;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use velotrack_core::{
    Cluster, ClusterClass, DetectorGeometry, Event, Hit, PrimaryVertex, ReconstructionConfig,
    ReconstructionState, Result,
};

use crate::clone::CloneSplitter;
use crate::intersect::VertexIntersector;
use crate::theta::ThetaClusterer;
use crate::tolerance::{
    estimate_clone_tolerance, estimate_intra_cluster_theta_std, CloneToleranceParams,
    ThetaSpreadParams,
};
use crate::track::TrackBuilder;
use crate::vertex::analyze_primary_vertices;

/// Result of one reconstruction run.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    /// Event carrying accepted tracks, every built segment and ghost hits.
    pub event: Event,
    /// Accumulated run state: accepted, false and ghost collections.
    pub state: ReconstructionState,
    /// Vertex candidates aggregated along z.
    pub primary_vertices: Vec<PrimaryVertex>,
    /// Theta tolerance used for the refined clustering pass.
    pub tol_clusters_est: f64,
    /// Refined theta clusters in processing order.
    pub clusters: Vec<Cluster>,
}

impl Reconstruction {
    /// Number of accepted tracks.
    #[must_use]
    pub fn num_tracks(&self) -> usize {
        self.state.found_tracks.len()
    }
}

/// Drives clustering, classification and track building for one event.
#[derive(Clone, Debug, Default)]
pub struct ClusterResolver {
    config: ReconstructionConfig,
}

impl ClusterResolver {
    /// Creates a resolver with the given configuration.
    #[must_use]
    pub fn new(config: ReconstructionConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// Reconstructs an event, seeding tolerance sampling from the config.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn find_tracks(
        &self,
        hits: Vec<Hit>,
        geometry: DetectorGeometry,
    ) -> Result<Option<Reconstruction>> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.find_tracks_with_rng(hits, geometry, &mut rng)
    }

    /// Reconstructs an event drawing tolerance samples from `rng`.
    ///
    /// Returns `Ok(None)` when there is nothing to reconstruct: an empty hit
    /// list or fewer than two layers.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn find_tracks_with_rng<R: Rng + ?Sized>(
        &self,
        hits: Vec<Hit>,
        geometry: DetectorGeometry,
        rng: &mut R,
    ) -> Result<Option<Reconstruction>> {
        let config = &self.config;
        config.validate()?;

        if hits.is_empty() {
            warn!("find_tracks: empty hit list, nothing to reconstruct");
            return Ok(None);
        }
        if config.layers < 2 {
            warn!(
                "find_tracks: {} layer(s) configured, at least 2 are required",
                config.layers
            );
            return Ok(None);
        }

        let start = Instant::now();
        let mut event = Event::new(geometry, hits);

        let coarse = cluster_hits(&event.hits, config.tol_clusters);
        let params = ThetaSpreadParams {
            n_sample_clusters: config.n_sample_clusters,
            alpha: config.theta_spread_alpha,
            tol_min: config.tol_clusters,
            tol_max: config.theta_spread_max,
        };
        let estimate =
            estimate_intra_cluster_theta_std(&coarse, &event.hits, config.layers, &params, rng);
        let tol_clusters_est = match estimate {
            Some(estimate) => {
                debug!(
                    "refined tol_clusters = {:.4e} (mean intra-cluster std {:.4e})",
                    estimate.tolerance, estimate.spread
                );
                estimate.tolerance
            }
            None => {
                debug!("no usable clusters for refinement, keeping tol_clusters");
                config.tol_clusters
            }
        };

        let mut clusters = cluster_hits(&event.hits, tol_clusters_est);
        for cluster in &mut clusters {
            cluster.hits.sort_by_key(|&i| event.hits[i].module_id);
        }
        clusters.sort_by_key(Cluster::first);

        let state = if config.parallel {
            clusters
                .par_iter()
                .map(|cluster| self.process_cluster(cluster, &event.hits))
                .collect::<Vec<_>>()
                .into_iter()
                .fold(ReconstructionState::new(), merged)
        } else {
            clusters
                .iter()
                .map(|cluster| self.process_cluster(cluster, &event.hits))
                .fold(ReconstructionState::new(), merged)
        };

        let primary_vertices =
            analyze_primary_vertices(&state.vertex_candidates, config.tol_vertices);

        let ghost_indices: HashSet<usize> = state
            .ghost_clusters
            .iter()
            .flat_map(|c| c.iter().copied())
            .collect();
        let mut ghost_hits: Vec<Hit> = ghost_indices
            .into_iter()
            .filter_map(|i| event.hit(i).copied())
            .collect();
        ghost_hits.sort_by_key(|h| h.index);

        event.tracks.clone_from(&state.found_tracks);
        event.segments.clone_from(&state.found_segments);
        event.ghost_hits = ghost_hits;

        info!(
            "find_tracks: {} tracks, {} ghost hits, {} false clusters, {} vertices in {:.2?}",
            state.found_tracks.len(),
            state.ghost_clusters.len(),
            state.false_clusters.len(),
            primary_vertices.len(),
            start.elapsed()
        );

        Ok(Some(Reconstruction {
            event,
            state,
            primary_vertices,
            tol_clusters_est,
            clusters,
        }))
    }

    fn intersector(&self) -> VertexIntersector {
        VertexIntersector::new(self.config.tol_intersects, self.config.dz)
    }

    /// Classifies one cluster and records its outcome in a fresh state.
    fn process_cluster(&self, cluster: &Cluster, hits: &[Hit]) -> ReconstructionState {
        let mut state = ReconstructionState::new();
        let builder = TrackBuilder::new(hits, self.intersector());

        match ClusterClass::classify(cluster.len(), self.config.layers) {
            ClusterClass::Ghost => state.ghost_clusters.push(cluster.clone()),
            ClusterClass::False => state.false_clusters.push(cluster.clone()),
            ClusterClass::Track => {
                builder.build(cluster, &mut state);
            }
            ClusterClass::Clone => {
                let mut unique = HashSet::with_capacity(cluster.len());
                let mut track_hits: Vec<Hit> = cluster
                    .iter()
                    .filter(|&&i| unique.insert(i))
                    .filter_map(|&i| hits.get(i).copied())
                    .collect();
                track_hits.sort_by_key(|h| h.module_id);

                let params = CloneToleranceParams {
                    alpha: 1.0,
                    tol_min: self.config.tol_clone,
                    tol_max: self.config.clone_tol_max,
                    dynamic_alpha: true,
                };
                let estimate = estimate_clone_tolerance(&track_hits, &params);
                debug!(
                    "clone cluster of {} hits: tol_clone = {:.4e} (segment theta std {:.4e})",
                    track_hits.len(),
                    estimate.tolerance,
                    estimate.spread
                );
                CloneSplitter::new(builder).split(&track_hits, estimate.tolerance, &mut state);
            }
        }
        state
    }
}

/// Clusters hits by azimuth, returning clusters of hit indices.
fn cluster_hits(hits: &[Hit], tol: f64) -> Vec<Cluster> {
    ThetaClusterer::new(tol)
        .cluster_by(hits, |h| h.theta)
        .into_iter()
        .map(|members| members.into_iter().map(|i| hits[i].index).collect())
        .collect()
}

fn merged(mut acc: ReconstructionState, local: ReconstructionState) -> ReconstructionState {
    acc.merge(local);
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radial_event(n: usize, layers: u32) -> Vec<Hit> {
        let mut hits = Vec::new();
        for k in 0..n {
            let phi = 2.0 * std::f64::consts::PI * k as f64 / n as f64 + 0.1;
            let (tx, ty) = (0.1 * phi.cos(), 0.1 * phi.sin());
            for m in 1..=layers {
                let z = 20.0 * f64::from(m);
                hits.push(Hit::new(hits.len() as u64, tx * (z - 10.0), ty * (z - 10.0), z, m));
            }
        }
        hits
    }

    fn config(layers: usize) -> ReconstructionConfig {
        ReconstructionConfig::default()
            .with_layers(layers)
            .with_tol_clusters(1e-4)
            .with_tol_intersects(1e-6)
    }

    #[test]
    fn test_empty_input_is_noop() {
        let resolver = ClusterResolver::new(config(3));
        let result = resolver
            .find_tracks(Vec::new(), DetectorGeometry::planes(3, 20.0, 33.0))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_single_layer_is_noop() {
        let resolver = ClusterResolver::new(config(1));
        let hits = radial_event(4, 1);
        let result = resolver
            .find_tracks(hits, DetectorGeometry::planes(1, 20.0, 33.0))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let resolver = ClusterResolver::new(config(3).with_dz(0.0));
        let hits = radial_event(2, 3);
        assert!(resolver
            .find_tracks(hits, DetectorGeometry::planes(3, 20.0, 33.0))
            .is_err());
    }

    #[test]
    fn test_reconstructs_radial_tracks() {
        let resolver = ClusterResolver::new(config(3));
        let hits = radial_event(8, 3);
        let result = resolver
            .find_tracks(hits, DetectorGeometry::planes(3, 20.0, 33.0))
            .unwrap()
            .unwrap();

        assert_eq!(result.num_tracks(), 8);
        assert!(result.state.ghost_clusters.is_empty());
        assert!(result.state.false_clusters.is_empty());
        assert_eq!(result.event.tracks.len(), 8);
        assert_eq!(result.event.segments.len(), 16);
        assert_eq!(result.primary_vertices.len(), 1);
        assert!((result.primary_vertices[0].z - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_isolated_hit_becomes_ghost() {
        let resolver = ClusterResolver::new(config(3));
        let mut hits = radial_event(4, 3);
        hits.push(Hit::new(99, -3.0, -0.5, 40.0, 2));
        let result = resolver
            .find_tracks(hits, DetectorGeometry::planes(3, 20.0, 33.0))
            .unwrap()
            .unwrap();

        assert_eq!(result.num_tracks(), 4);
        assert_eq!(result.state.ghost_clusters.len(), 1);
        assert_eq!(result.event.ghost_hits.len(), 1);
        assert_eq!(result.event.ghost_hits[0].hit_id, 99);
    }

    #[test]
    fn test_clusters_are_ordered_and_partition_hits() {
        let resolver = ClusterResolver::new(config(3));
        let hits = radial_event(5, 3);
        let n = hits.len();
        let result = resolver
            .find_tracks(hits, DetectorGeometry::planes(3, 20.0, 33.0))
            .unwrap()
            .unwrap();

        let firsts: Vec<Option<usize>> = result.clusters.iter().map(Cluster::first).collect();
        let mut sorted = firsts.clone();
        sorted.sort();
        assert_eq!(firsts, sorted);

        let mut all: Vec<usize> = result.clusters.iter().flat_map(|c| c.hits.clone()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..n).collect::<Vec<_>>());
    }
}
