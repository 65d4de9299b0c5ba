//! Reconstruction configuration.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Immutable configuration for one reconstruction run.
///
/// Mutable per-run data lives in [`crate::ReconstructionState`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructionConfig {
    /// Tolerance for floating point comparison.
    pub tol: f64,
    /// Coarse theta clustering tolerance (rad); lower bound of the refined one.
    pub tol_clusters: f64,
    /// Lower bound of the clone-splitting tolerance.
    pub tol_clone: f64,
    /// Tolerance for z-axis intersection tests.
    pub tol_intersects: f64,
    /// Tolerance for clustering primary-vertex candidates by z (mm).
    pub tol_vertices: f64,
    /// Number of detector planes.
    pub layers: usize,
    /// Spacing between detector planes (mm); the first plane sits at `dz`.
    pub dz: f64,
    /// Modules with an id up to this value form the reconciliation window.
    pub window_modules: u32,
    /// Clusters sampled when refining the theta tolerance.
    pub n_sample_clusters: usize,
    /// Scale applied to the mean intra-cluster theta spread.
    pub theta_spread_alpha: f64,
    /// Upper bound of the refined theta tolerance.
    pub theta_spread_max: f64,
    /// Upper bound of the clone-splitting tolerance.
    pub clone_tol_max: f64,
    /// Seed for the tolerance sampling random source.
    pub seed: u64,
    /// Process clusters on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            tol: 1.0e-7,
            tol_clusters: 1.0e-7,
            tol_clone: 1.0e-7,
            tol_intersects: 1.0e-7,
            tol_vertices: 1.0, // PVs are reconstructed within 2 mm
            layers: 3,
            dz: 20.0,
            window_modules: 3,
            n_sample_clusters: 5,
            theta_spread_alpha: 1.5,
            theta_spread_max: 1.0e-2,
            clone_tol_max: 2.0,
            seed: 42,
            parallel: false,
        }
    }
}

impl ReconstructionConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchors the clustering, clone and intersection tolerances to the
    /// multiple-scattering noise level of the event.
    #[must_use]
    pub fn from_collision_noise(collision_noise: f64) -> Self {
        let base = Self::default();
        let noise = collision_noise.max(0.0);
        Self {
            tol_clusters: (10.0 * noise).max(base.tol),
            tol_clone: (3.0 * noise).max(base.tol),
            tol_intersects: (1.0e4 * noise).max(base.tol).min(2.0),
            ..base
        }
    }

    /// Sets the number of layers.
    #[must_use]
    pub fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    /// Sets the layer spacing.
    #[must_use]
    pub fn with_dz(mut self, dz: f64) -> Self {
        self.dz = dz;
        self
    }

    /// Sets the coarse theta clustering tolerance.
    #[must_use]
    pub fn with_tol_clusters(mut self, tol: f64) -> Self {
        self.tol_clusters = tol;
        self
    }

    /// Sets the lower bound of the clone-splitting tolerance.
    #[must_use]
    pub fn with_tol_clone(mut self, tol: f64) -> Self {
        self.tol_clone = tol;
        self
    }

    /// Sets the z-axis intersection tolerance.
    #[must_use]
    pub fn with_tol_intersects(mut self, tol: f64) -> Self {
        self.tol_intersects = tol;
        self
    }

    /// Sets the vertex clustering tolerance.
    #[must_use]
    pub fn with_tol_vertices(mut self, tol: f64) -> Self {
        self.tol_vertices = tol;
        self
    }

    /// Sets the reconciliation window.
    #[must_use]
    pub fn with_window_modules(mut self, window: u32) -> Self {
        self.window_modules = window;
        self
    }

    /// Sets the sampling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets whether clusters are processed in parallel.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks that every tolerance is finite and non-negative and that the
    /// geometry is usable.
    ///
    /// The number of layers is not checked here: too few layers makes a run a
    /// no-op rather than an error.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let tolerances = [
            ("tol", self.tol),
            ("tol_clusters", self.tol_clusters),
            ("tol_clone", self.tol_clone),
            ("tol_intersects", self.tol_intersects),
            ("tol_vertices", self.tol_vertices),
            ("theta_spread_alpha", self.theta_spread_alpha),
            ("theta_spread_max", self.theta_spread_max),
            ("clone_tol_max", self.clone_tol_max),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::ConfigError(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !self.dz.is_finite() || self.dz <= 0.0 {
            return Err(Error::ConfigError(format!(
                "dz must be positive, got {}",
                self.dz
            )));
        }
        if self.n_sample_clusters == 0 {
            return Err(Error::ConfigError(
                "n_sample_clusters must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
