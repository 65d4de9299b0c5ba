//! One-dimensional chaining clustering.
//!
//! Items are sorted by a scalar coordinate and split wherever two
//! neighbours in sorted order differ by more than the tolerance. Membership
//! is single-linkage: each item only has to be close to its predecessor, so
//! a cluster can span far more than the tolerance end to end.
//!
//! The same primitive clusters hit azimuths, segment direction cosines and
//! vertex z positions.

/// Chaining clusterer over a scalar coordinate.
#[derive(Clone, Copy, Debug)]
pub struct ThetaClusterer {
    tolerance: f64,
}

impl ThetaClusterer {
    /// Creates a clusterer that links neighbours at most `tolerance` apart.
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Linking tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Clusters `items` by `key`, returning positions into `items`.
    ///
    /// Clusters are ordered by ascending coordinate and members appear in
    /// ascending-coordinate order. The sort is stable, so items with equal
    /// coordinates keep their input order. The clusters partition the input.
    pub fn cluster_by<T, F>(&self, items: &[T], key: F) -> Vec<Vec<usize>>
    where
        F: Fn(&T) -> f64,
    {
        let keys: Vec<f64> = items.iter().map(key).collect();
        self.cluster_values(&keys)
    }

    /// Clusters raw values, returning positions into `values`.
    #[must_use]
    pub fn cluster_values(&self, values: &[f64]) -> Vec<Vec<usize>> {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

        let mut clusters = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        for idx in order {
            if let Some(&last) = current.last() {
                if (values[idx] - values[last]).abs() > self.tolerance {
                    clusters.push(std::mem::take(&mut current));
                }
            }
            current.push(idx);
        }
        if !current.is_empty() {
            clusters.push(current);
        }
        clusters
    }
}
