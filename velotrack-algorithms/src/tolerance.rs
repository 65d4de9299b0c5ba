//! Adaptive tolerance estimation.
//!
//! Tolerances follow the noise level of the event instead of a fixed
//! constant. The theta tolerance is refined from the spread inside clusters
//! found with a coarse default, and the clone tolerance from the spread of
//! segment azimuths inside one oversized cluster.

use rand::seq::index::sample;
use rand::Rng;
use velotrack_core::{Cluster, Hit, Segment};

/// Parameters of the intra-cluster theta spread estimator.
#[derive(Clone, Debug)]
pub struct ThetaSpreadParams {
    /// Clusters sampled without replacement.
    pub n_sample_clusters: usize,
    /// Scale applied to the mean spread.
    pub alpha: f64,
    /// Lower clamp.
    pub tol_min: f64,
    /// Upper clamp.
    pub tol_max: f64,
}

impl Default for ThetaSpreadParams {
    fn default() -> Self {
        Self {
            n_sample_clusters: 5,
            alpha: 1.5,
            tol_min: 1.0e-4,
            tol_max: 1.0e-2,
        }
    }
}

/// Parameters of the clone-splitting tolerance estimator.
#[derive(Clone, Debug)]
pub struct CloneToleranceParams {
    /// Scale applied to the spread when `dynamic_alpha` is off.
    pub alpha: f64,
    /// Lower clamp.
    pub tol_min: f64,
    /// Upper clamp.
    pub tol_max: f64,
    /// Pick alpha from the magnitude of the spread.
    pub dynamic_alpha: bool,
}

impl Default for CloneToleranceParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            tol_min: 1.0e-6,
            tol_max: 1.0e-2,
            dynamic_alpha: true,
        }
    }
}

/// A clamped tolerance together with the raw spread it was derived from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToleranceEstimate {
    /// Clamped tolerance.
    pub tolerance: f64,
    /// Measured standard deviation.
    pub spread: f64,
}

/// Estimates the theta clustering tolerance from the spread inside a random
/// sample of clusters.
///
/// For each sampled cluster with at least two members, the population
/// standard deviation of the first `layers` thetas is taken; the mean over
/// clusters is scaled by `alpha` and clamped. Returns `None` when no sampled
/// cluster had two members.
pub fn estimate_intra_cluster_theta_std<R: Rng + ?Sized>(
    clusters: &[Cluster],
    hits: &[Hit],
    layers: usize,
    params: &ThetaSpreadParams,
    rng: &mut R,
) -> Option<ToleranceEstimate> {
    if clusters.is_empty() {
        return None;
    }

    let amount = params.n_sample_clusters.min(clusters.len());
    let mut spreads = Vec::with_capacity(amount);
    for ci in sample(rng, clusters.len(), amount) {
        let cluster = &clusters[ci];
        if cluster.len() < 2 {
            continue;
        }
        let thetas: Vec<f64> = cluster
            .iter()
            .take(layers)
            .filter_map(|&i| hits.get(i).map(|h| h.theta))
            .collect();
        if thetas.len() < 2 {
            continue;
        }
        spreads.push(population_std(&thetas));
    }

    if spreads.is_empty() {
        return None;
    }

    let spread = mean(&spreads);
    Some(ToleranceEstimate {
        tolerance: clamp(params.alpha * spread, params.tol_min, params.tol_max),
        spread,
    })
}

/// Estimates the clone-splitting tolerance from hits sorted by module.
///
/// One segment is built per consecutive pair whose module id strictly
/// increases. With no such pair the estimate is `(tol_min, 0.0)`.
#[must_use]
pub fn estimate_clone_tolerance(
    track_hits: &[Hit],
    params: &CloneToleranceParams,
) -> ToleranceEstimate {
    let thetas: Vec<f64> = track_hits
        .windows(2)
        .filter(|pair| pair[1].module_id > pair[0].module_id)
        .enumerate()
        .map(|(i, pair)| Segment::new(i, pair[0], pair[1]).theta)
        .collect();

    if thetas.is_empty() {
        return ToleranceEstimate {
            tolerance: params.tol_min,
            spread: 0.0,
        };
    }

    let spread = population_std(&thetas);
    let alpha = if params.dynamic_alpha {
        dynamic_alpha(spread)
    } else {
        params.alpha
    };

    ToleranceEstimate {
        tolerance: clamp(alpha * spread, params.tol_min, params.tol_max),
        spread,
    }
}

/// Number of sigmas defining a decloning boundary for a given spread.
fn dynamic_alpha(spread: f64) -> f64 {
    if spread < 1.0e-6 {
        1.0
    } else if spread > 1.0e-3 {
        1.5
    } else {
        1.2
    }
}

fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`).
#[allow(clippy::cast_precision_loss)]
pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hits_with_thetas(thetas: &[f64]) -> Vec<Hit> {
        thetas
            .iter()
            .enumerate()
            .map(|(i, t)| Hit::new(i as u64, t.cos(), t.sin(), 20.0, 1).with_index(i))
            .collect()
    }

    #[test]
    fn test_population_std() {
        assert_relative_eq!(population_std(&[1.0, 3.0]), 1.0);
        assert_relative_eq!(population_std(&[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_theta_spread_none_without_pairs() {
        let hits = hits_with_thetas(&[0.1, 0.5]);
        let clusters = vec![Cluster::from_iter([0]), Cluster::from_iter([1])];
        let mut rng = StdRng::seed_from_u64(1);
        let params = ThetaSpreadParams::default();
        assert!(estimate_intra_cluster_theta_std(&clusters, &hits, 3, &params, &mut rng).is_none());
        assert!(estimate_intra_cluster_theta_std(&[], &hits, 3, &params, &mut rng).is_none());
    }

    #[test]
    fn test_theta_spread_value() {
        // two clusters with spreads 0.001 and 0.003
        let hits = hits_with_thetas(&[0.100, 0.102, 1.000, 1.006]);
        let clusters = vec![Cluster::from_iter([0, 1]), Cluster::from_iter([2, 3])];
        let params = ThetaSpreadParams {
            n_sample_clusters: 5,
            alpha: 1.5,
            tol_min: 1.0e-6,
            tol_max: 1.0,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let estimate =
            estimate_intra_cluster_theta_std(&clusters, &hits, 3, &params, &mut rng).unwrap();
        assert_relative_eq!(estimate.spread, 0.002, epsilon = 1e-9);
        assert_relative_eq!(estimate.tolerance, 0.003, epsilon = 1e-9);
    }

    #[test]
    fn test_theta_spread_uses_first_layers_only() {
        let hits = hits_with_thetas(&[0.0, 0.0, 0.0, 2.0]);
        let clusters = vec![Cluster::from_iter([0, 1, 2, 3])];
        let params = ThetaSpreadParams {
            tol_min: 0.0,
            ..ThetaSpreadParams::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let estimate =
            estimate_intra_cluster_theta_std(&clusters, &hits, 3, &params, &mut rng).unwrap();
        assert_relative_eq!(estimate.spread, 0.0);
    }

    #[test]
    fn test_theta_spread_is_clamped() {
        let hits = hits_with_thetas(&[0.0, 1.0, 2.0, 2.0 + 1e-9]);
        let clusters = vec![Cluster::from_iter([0, 1]), Cluster::from_iter([2, 3])];
        let params = ThetaSpreadParams {
            n_sample_clusters: 1,
            ..ThetaSpreadParams::default()
        };
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let estimate =
                estimate_intra_cluster_theta_std(&clusters, &hits, 3, &params, &mut rng).unwrap();
            assert!(estimate.tolerance >= params.tol_min);
            assert!(estimate.tolerance <= params.tol_max);
        }
    }

    #[test]
    fn test_clone_tolerance_without_segments() {
        let hits = vec![
            Hit::new(0, 1.0, 0.0, 20.0, 1),
            Hit::new(1, 2.0, 0.0, 20.0, 1),
        ];
        let params = CloneToleranceParams::default();
        let estimate = estimate_clone_tolerance(&hits, &params);
        assert_relative_eq!(estimate.tolerance, params.tol_min);
        assert_relative_eq!(estimate.spread, 0.0);
        assert_relative_eq!(estimate_clone_tolerance(&[], &params).tolerance, params.tol_min);
    }

    #[test]
    fn test_clone_tolerance_skips_same_module_pairs() {
        // radial hits: both valid segments point along theta = 0
        let hits = vec![
            Hit::new(0, 1.0, 0.0, 20.0, 1),
            Hit::new(1, 2.0, 0.0, 40.0, 2),
            Hit::new(2, 3.0, 0.0, 40.0, 2),
            Hit::new(3, 4.0, 0.0, 60.0, 3),
        ];
        let estimate = estimate_clone_tolerance(&hits, &CloneToleranceParams::default());
        assert_relative_eq!(estimate.spread, 0.0);
        assert_relative_eq!(estimate.tolerance, 1.0e-6);
    }

    #[test]
    fn test_dynamic_alpha_regimes() {
        assert_relative_eq!(dynamic_alpha(1.0e-7), 1.0);
        assert_relative_eq!(dynamic_alpha(1.0e-4), 1.2);
        assert_relative_eq!(dynamic_alpha(1.0e-2), 1.5);
    }

    #[test]
    fn test_clone_tolerance_is_clamped() {
        // segment azimuths 0 and pi/2 -> spread pi/4
        let hits = vec![
            Hit::new(0, 0.0, 0.0, 20.0, 1),
            Hit::new(1, 1.0, 0.0, 40.0, 2),
            Hit::new(2, 1.0, 1.0, 60.0, 3),
        ];
        let params = CloneToleranceParams {
            tol_max: 0.5,
            ..CloneToleranceParams::default()
        };
        let estimate = estimate_clone_tolerance(&hits, &params);
        assert_relative_eq!(estimate.spread, std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
        assert_relative_eq!(estimate.tolerance, 0.5);

        let fixed = CloneToleranceParams {
            dynamic_alpha: false,
            alpha: 1.0,
            tol_max: 2.0,
            ..CloneToleranceParams::default()
        };
        let estimate = estimate_clone_tolerance(&hits, &fixed);
        assert_relative_eq!(estimate.tolerance, std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
    }
}
