//! Straight-line event generation.

use std::f64::consts::TAU;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use velotrack_core::{DetectorGeometry, Event, Hit, Point3, ReconstructionConfig};

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration of the toy event generator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeneratorConfig {
    /// Number of detector planes.
    pub layers: usize,
    /// Plane spacing (mm); plane `l` sits at `z = dz * l`.
    pub dz: f64,
    /// Half extent of every plane in x and y (mm).
    pub half_extent: f64,
    /// Particles per primary vertex.
    pub n_particles: Vec<usize>,
    /// Primary vertex positions, one per entry of `n_particles`.
    pub primary_vertices: Vec<Point3>,
    /// Gaussian smearing of recorded positions (mm).
    pub measurement_error: f64,
    /// Gaussian slope kick applied after each plane (rad).
    pub collision_noise: f64,
    /// Probability that a particle crossing leaves no hit.
    pub drop_rate: f64,
    /// Probability, per particle and plane, of an extra uniform ghost hit.
    pub ghost_rate: f64,
    /// Smallest transverse slope `sqrt(tx^2 + ty^2)`.
    pub min_slope: f64,
    /// Largest transverse slope.
    pub max_slope: f64,
    /// Random seed.
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            layers: 3,
            dz: 20.0,
            half_extent: 33.0,
            n_particles: vec![16],
            primary_vertices: vec![[0.0, 0.0, 10.0]],
            measurement_error: 0.0,
            collision_noise: 0.0,
            drop_rate: 0.0,
            ghost_rate: 0.0,
            min_slope: 0.05,
            max_slope: 0.3,
            seed: 42,
        }
    }
}

impl GeneratorConfig {
    /// Sets the number of planes.
    #[must_use]
    pub fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    /// Sets the plane spacing.
    #[must_use]
    pub fn with_dz(mut self, dz: f64) -> Self {
        self.dz = dz;
        self
    }

    /// Sets the particle counts and their primary vertices.
    #[must_use]
    pub fn with_particles(mut self, n_particles: Vec<usize>, vertices: Vec<Point3>) -> Self {
        self.n_particles = n_particles;
        self.primary_vertices = vertices;
        self
    }

    /// Sets the measurement error.
    #[must_use]
    pub fn with_measurement_error(mut self, sigma: f64) -> Self {
        self.measurement_error = sigma;
        self
    }

    /// Sets the multiple-scattering noise.
    #[must_use]
    pub fn with_collision_noise(mut self, sigma: f64) -> Self {
        self.collision_noise = sigma;
        self
    }

    /// Sets the hit drop probability.
    #[must_use]
    pub fn with_drop_rate(mut self, rate: f64) -> Self {
        self.drop_rate = rate;
        self
    }

    /// Sets the ghost hit probability.
    #[must_use]
    pub fn with_ghost_rate(mut self, rate: f64) -> Self {
        self.ghost_rate = rate;
        self
    }

    /// Sets the transverse slope range.
    #[must_use]
    pub fn with_slopes(mut self, min: f64, max: f64) -> Self {
        self.min_slope = min;
        self.max_slope = max;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Total number of particles over all vertices.
    #[must_use]
    pub fn total_particles(&self) -> usize {
        self.n_particles.iter().sum()
    }

    /// Detector planes described by this configuration.
    #[must_use]
    pub fn geometry(&self) -> DetectorGeometry {
        DetectorGeometry::planes(self.layers, self.dz, self.half_extent)
    }

    /// Reconstruction settings matched to this detector and noise level.
    #[must_use]
    pub fn reconstruction_config(&self) -> ReconstructionConfig {
        ReconstructionConfig::from_collision_noise(self.collision_noise)
            .with_layers(self.layers)
            .with_dz(self.dz)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if vertices and particle counts are not paired or a
    /// parameter is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.n_particles.len() != self.primary_vertices.len() {
            return Err(Error::VertexCountMismatch {
                particles: self.n_particles.len(),
                vertices: self.primary_vertices.len(),
            });
        }
        if self.layers == 0 {
            return Err(Error::InvalidParameter("layers must be at least 1".into()));
        }
        if !self.dz.is_finite() || self.dz <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "dz must be positive, got {}",
                self.dz
            )));
        }
        for (name, rate) in [("drop_rate", self.drop_rate), ("ghost_rate", self.ghost_rate)] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(Error::InvalidParameter(format!(
                    "{name} must lie in [0, 1], got {rate}"
                )));
            }
        }
        for (name, sigma) in [
            ("measurement_error", self.measurement_error),
            ("collision_noise", self.collision_noise),
            ("half_extent", self.half_extent),
        ] {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(Error::InvalidParameter(format!(
                    "{name} must be finite and non-negative, got {sigma}"
                )));
            }
        }
        let slopes_ok = self.min_slope >= 0.0
            && self.min_slope <= self.max_slope
            && self.max_slope.is_finite();
        if !slopes_ok {
            return Err(Error::InvalidParameter(format!(
                "slope range [{}, {}] is invalid",
                self.min_slope, self.max_slope
            )));
        }
        Ok(())
    }
}

/// Initial state of one generated particle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParticleState {
    /// Production vertex.
    pub vertex: Point3,
    /// Slope dx/dz.
    pub tx: f64,
    /// Slope dy/dz.
    pub ty: f64,
}

impl ParticleState {
    /// Transverse position at `z` without scattering.
    #[must_use]
    pub fn position_at(&self, z: f64) -> (f64, f64) {
        let dz = z - self.vertex[2];
        (self.vertex[0] + self.tx * dz, self.vertex[1] + self.ty * dz)
    }
}

/// A generated event together with its truth.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeneratedEvent {
    /// The event as a reconstruction would see it.
    pub event: Event,
    /// Particles that produced the true hits.
    pub particles: Vec<ParticleState>,
    /// Hit indices left by each particle, in plane order.
    pub true_tracks: Vec<Vec<usize>>,
    /// Indices of ghost hits.
    pub ghost_hits: Vec<usize>,
}

impl GeneratedEvent {
    /// Plain hit list, as handed to a reconstruction.
    #[must_use]
    pub fn hits(&self) -> Vec<Hit> {
        self.event.hits.clone()
    }
}

/// Seeded generator of straight-track events.
#[derive(Debug, Clone)]
pub struct EventGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl EventGenerator {
    /// Creates a generator.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self { config, rng })
    }

    /// Generator configuration.
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Draws particle directions: uniform azimuth and uniform transverse
    /// slope, grouped by vertex in configuration order.
    pub fn generate_particles(&mut self) -> Vec<ParticleState> {
        let mut particles = Vec::with_capacity(self.config.total_particles());
        for (&n, &vertex) in self
            .config
            .n_particles
            .iter()
            .zip(&self.config.primary_vertices)
        {
            for _ in 0..n {
                let phi = self.rng.gen_range(0.0..TAU);
                let slope = if self.config.max_slope > self.config.min_slope {
                    self.rng
                        .gen_range(self.config.min_slope..self.config.max_slope)
                } else {
                    self.config.min_slope
                };
                particles.push(ParticleState {
                    vertex,
                    tx: slope * phi.cos(),
                    ty: slope * phi.sin(),
                });
            }
        }
        particles
    }

    /// Generates one event from freshly drawn particles.
    pub fn generate(&mut self) -> GeneratedEvent {
        let particles = self.generate_particles();
        self.generate_from_particles(particles)
    }

    /// Propagates `particles` through the planes and records their hits.
    ///
    /// Hits are listed plane by plane, in particle order within a plane,
    /// followed by the ghost hits. A particle leaving a plane's acceptance
    /// records no hit there but keeps propagating.
    pub fn generate_from_particles(&mut self, particles: Vec<ParticleState>) -> GeneratedEvent {
        let geometry = self.config.geometry();
        let mut hits: Vec<Hit> = Vec::new();
        let mut true_tracks = vec![Vec::new(); particles.len()];

        // (x, y, z, tx, ty) of every particle at its last plane
        let mut tracks: Vec<[f64; 5]> = particles
            .iter()
            .map(|p| [p.vertex[0], p.vertex[1], p.vertex[2], p.tx, p.ty])
            .collect();

        for module in &geometry.modules {
            for (i, t) in tracks.iter_mut().enumerate() {
                let step = module.z - t[2];
                t[0] += t[3] * step;
                t[1] += t[4] * step;
                t[2] = module.z;

                let x = t[0] + gaussian(&mut self.rng, self.config.measurement_error);
                let y = t[1] + gaussian(&mut self.rng, self.config.measurement_error);
                let dropped =
                    self.config.drop_rate > 0.0 && self.rng.gen::<f64>() < self.config.drop_rate;
                if module.contains(x, y) && !dropped {
                    true_tracks[i].push(hits.len());
                    hits.push(Hit::new(hits.len() as u64, x, y, module.z, module.module_id));
                }

                t[3] += gaussian(&mut self.rng, self.config.collision_noise);
                t[4] += gaussian(&mut self.rng, self.config.collision_noise);
            }
        }

        let mut ghost_hits = Vec::new();
        if self.config.ghost_rate > 0.0 {
            for module in &geometry.modules {
                for _ in 0..particles.len() {
                    if self.rng.gen::<f64>() < self.config.ghost_rate {
                        let x = self.rng.gen_range(-module.lx..=module.lx);
                        let y = self.rng.gen_range(-module.ly..=module.ly);
                        ghost_hits.push(hits.len());
                        hits.push(Hit::new(hits.len() as u64, x, y, module.z, module.module_id));
                    }
                }
            }
        }

        debug!(
            "generated {} particles, {} hits ({} ghosts) on {} planes",
            particles.len(),
            hits.len(),
            ghost_hits.len(),
            geometry.layers()
        );

        GeneratedEvent {
            event: Event::new(geometry, hits),
            particles,
            true_tracks,
            ghost_hits,
        }
    }
}

/// Zero-mean gaussian draw (Box-Muller). Consumes no randomness for `sigma <= 0`.
fn gaussian<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return 0.0;
    }
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    sigma * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}
