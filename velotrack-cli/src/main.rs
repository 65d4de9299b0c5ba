//! velotrack CLI - Command-line interface for VELO toy events.
//!
//! Simulates straight-track events, reconstructs tracks and primary vertices
//! from a JSON hit list, enumerates the decision segments of the
//! reconciliation window and reconciles a solver's activation vector.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use velotrack_algorithms::{
    ClusterResolver, ReconciliationContext, Reconciler, Reconstruction, SegmentEnumerator,
    VertexIntersector,
};
use velotrack_core::{DetectorGeometry, Hit, PrimaryVertex, ReconstructionConfig, Segment, Track};
use velotrack_sim::{EventGenerator, GeneratorConfig, ParticleState};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] velotrack_core::Error),

    #[error("Simulation error: {0}")]
    Sim(#[from] velotrack_sim::Error),

    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] velotrack_core::ReconcileError),

    #[error("nothing to reconstruct in {0}")]
    NothingToReconstruct(PathBuf),
}

/// Track and vertex reconstruction for the VELO toy detector.
#[derive(Parser, Debug)]
#[command(name = "velotrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a toy event and write its hits and truth as JSON
    Simulate {
        /// Particles per primary vertex
        #[arg(long, value_delimiter = ',', default_value = "16")]
        particles: Vec<usize>,

        /// Primary vertex z positions (mm), one per particle count
        #[arg(long, value_delimiter = ',', default_value = "10.0")]
        vertex_z: Vec<f64>,

        /// Number of detector planes
        #[arg(long, default_value = "3")]
        layers: usize,

        /// Plane spacing (mm)
        #[arg(long, default_value = "20.0")]
        dz: f64,

        /// Gaussian smearing of recorded positions (mm)
        #[arg(long, default_value = "0.0")]
        measurement_error: f64,

        /// Gaussian slope kick after each plane (rad)
        #[arg(long, default_value = "0.0")]
        noise: f64,

        /// Probability that a crossing leaves no hit
        #[arg(long, default_value = "0.0")]
        drop_rate: f64,

        /// Ghost hits per particle and plane
        #[arg(long, default_value = "0.0")]
        ghost_rate: f64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reconstruct tracks and primary vertices from a JSON hit list
    Reconstruct {
        /// Input hits: an array of hits or an object with a `hits` array
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the decision segments of the reconciliation window
    Segments {
        /// Input hits
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Azimuth tolerance for in-window candidates (defaults to the
        /// refined clustering tolerance)
        #[arg(long)]
        theta_tol: Option<f64>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reconcile a solver's activation vector with the detector geometry
    Reconcile {
        /// Input hits
        #[arg(long)]
        hits: PathBuf,

        /// JSON array with one real value per decision segment
        #[arg(long)]
        solution: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Azimuth tolerance for in-window candidates (defaults to the
        /// refined clustering tolerance)
        #[arg(long)]
        theta_tol: Option<f64>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Detector and reconstruction settings shared by the hit-consuming commands.
#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Number of detector planes (defaults to the highest module id)
    #[arg(long)]
    layers: Option<usize>,

    /// Plane spacing (mm)
    #[arg(long, default_value = "20.0")]
    dz: f64,

    /// Half extent of every plane (mm)
    #[arg(long, default_value = "33.0")]
    half_extent: f64,

    /// Coarse azimuth clustering tolerance (rad)
    #[arg(long, default_value = "1e-7")]
    tol_clusters: f64,

    /// Lower bound of the clone-splitting tolerance
    #[arg(long, default_value = "1e-7")]
    tol_clone: f64,

    /// Tolerance of the z-axis intersection test
    #[arg(long, default_value = "1e-7")]
    tol_intersects: f64,

    /// Tolerance for grouping vertex candidates along z (mm)
    #[arg(long, default_value = "1.0")]
    tol_vertices: f64,

    /// Highest module id of the reconciliation window
    #[arg(long, default_value = "3")]
    window_modules: u32,

    /// Seed for tolerance sampling
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Process clusters in parallel
    #[arg(long)]
    parallel: bool,
}

impl RunArgs {
    fn config(&self, hits: &[Hit]) -> ReconstructionConfig {
        let layers = self
            .layers
            .unwrap_or_else(|| hits.iter().map(|h| h.module_id as usize).max().unwrap_or(0));
        ReconstructionConfig::default()
            .with_layers(layers)
            .with_dz(self.dz)
            .with_tol_clusters(self.tol_clusters)
            .with_tol_clone(self.tol_clone)
            .with_tol_intersects(self.tol_intersects)
            .with_tol_vertices(self.tol_vertices)
            .with_window_modules(self.window_modules)
            .with_seed(self.seed)
            .with_parallel(self.parallel)
    }

    fn geometry(&self, config: &ReconstructionConfig) -> DetectorGeometry {
        DetectorGeometry::planes(config.layers, config.dz, self.half_extent)
    }
}

/// One hit as read from or written to JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct HitRecord {
    hit_id: u64,
    x: f64,
    y: f64,
    z: f64,
    module_id: u32,
}

impl From<&Hit> for HitRecord {
    fn from(hit: &Hit) -> Self {
        Self {
            hit_id: hit.hit_id,
            x: hit.x,
            y: hit.y,
            z: hit.z,
            module_id: hit.module_id,
        }
    }
}

impl From<HitRecord> for Hit {
    fn from(r: HitRecord) -> Self {
        Hit::new(r.hit_id, r.x, r.y, r.z, r.module_id)
    }
}

/// Accepted hit inputs: a bare array or any object carrying `hits`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HitInput {
    Bare(Vec<HitRecord>),
    Wrapped { hits: Vec<HitRecord> },
}

#[derive(Debug, Serialize)]
struct SimulationOutput {
    hits: Vec<HitRecord>,
    particles: Vec<ParticleState>,
    /// Hit ids left by each particle, in plane order.
    true_tracks: Vec<Vec<u64>>,
    ghost_hit_ids: Vec<u64>,
}

#[derive(Debug, Serialize)]
struct TrackRecord {
    track_id: usize,
    hit_ids: Vec<u64>,
}

impl From<&Track> for TrackRecord {
    fn from(track: &Track) -> Self {
        Self {
            track_id: track.track_id,
            hit_ids: track.hits.iter().map(|h| h.hit_id).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReconstructionReport {
    tol_clusters_est: f64,
    tracks: Vec<TrackRecord>,
    false_tracks: Vec<TrackRecord>,
    ghost_hit_ids: Vec<u64>,
    primary_vertices: Vec<PrimaryVertex>,
}

impl From<&Reconstruction> for ReconstructionReport {
    fn from(r: &Reconstruction) -> Self {
        Self {
            tol_clusters_est: r.tol_clusters_est,
            tracks: r.state.found_tracks.iter().map(TrackRecord::from).collect(),
            false_tracks: r.state.false_tracks.iter().map(TrackRecord::from).collect(),
            ghost_hit_ids: r.event.ghost_hits.iter().map(|h| h.hit_id).collect(),
            primary_vertices: r.primary_vertices.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SegmentRecord {
    segment_id: usize,
    module_id: u32,
    hit_ids: [u64; 2],
    in_window: bool,
}

/// An active segment after outward extension. Window segments carry their
/// decision id, extension segments the id of the reconstruction pass.
#[derive(Debug, Serialize)]
struct ActiveSegmentRecord {
    segment_id: usize,
    module_id: u32,
    hit_ids: [u64; 2],
}

impl From<&Segment> for ActiveSegmentRecord {
    fn from(s: &Segment) -> Self {
        Self {
            segment_id: s.segment_id,
            module_id: s.module_id,
            hit_ids: [s.hits[0].hit_id, s.hits[1].hit_id],
        }
    }
}

#[derive(Debug, Serialize)]
struct ReconciliationReport {
    solution: Vec<bool>,
    good_segment_ids: Vec<usize>,
    active_segments: Vec<ActiveSegmentRecord>,
    removed: Vec<usize>,
    added: Vec<usize>,
    tracks: Vec<TrackRecord>,
    primary_vertices: Vec<PrimaryVertex>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Simulate {
            particles,
            vertex_z,
            layers,
            dz,
            measurement_error,
            noise,
            drop_rate,
            ghost_rate,
            seed,
            output,
        } => {
            let vertices = vertex_z.iter().map(|&z| [0.0, 0.0, z]).collect();
            let config = GeneratorConfig::default()
                .with_particles(particles, vertices)
                .with_layers(layers)
                .with_dz(dz)
                .with_measurement_error(measurement_error)
                .with_collision_noise(noise)
                .with_drop_rate(drop_rate)
                .with_ghost_rate(ghost_rate)
                .with_seed(seed);
            let mut generator = EventGenerator::new(config)?;
            let generated = generator.generate();

            let hit_id = |i: &usize| generated.event.hit(*i).map(|h| h.hit_id);
            let result = SimulationOutput {
                hits: generated.event.hits.iter().map(HitRecord::from).collect(),
                particles: generated.particles.clone(),
                true_tracks: generated
                    .true_tracks
                    .iter()
                    .map(|t| t.iter().filter_map(hit_id).collect())
                    .collect(),
                ghost_hit_ids: generated.ghost_hits.iter().filter_map(hit_id).collect(),
            };
            info!(
                "simulated {} particles, {} hits ({} ghost)",
                result.particles.len(),
                result.hits.len(),
                result.ghost_hit_ids.len()
            );
            write_json(output.as_deref(), &result)?;
        }

        Commands::Reconstruct { input, run, output } => {
            let (reconstruction, _) = reconstruct(&input, &run)?;
            print_summary(&reconstruction);
            write_json(output.as_deref(), &ReconstructionReport::from(&reconstruction))?;
        }

        Commands::Segments {
            input,
            run,
            theta_tol,
            output,
        } => {
            let (reconstruction, config) = reconstruct(&input, &run)?;
            let enumeration = SegmentEnumerator::new(
                config.window_modules,
                theta_tol.unwrap_or(reconstruction.tol_clusters_est),
            )
            .enumerate(&reconstruction.event);
            let in_window: HashSet<usize> = enumeration.in_window_ids().into_iter().collect();
            let records: Vec<SegmentRecord> = enumeration
                .segments
                .iter()
                .map(|s| SegmentRecord {
                    segment_id: s.segment_id,
                    module_id: s.module_id,
                    hit_ids: [s.hits[0].hit_id, s.hits[1].hit_id],
                    in_window: in_window.contains(&s.segment_id),
                })
                .collect();
            info!(
                "{} decision segments, {} in window",
                records.len(),
                in_window.len()
            );
            write_json(output.as_deref(), &records)?;
        }

        Commands::Reconcile {
            hits,
            solution,
            run,
            theta_tol,
            output,
        } => {
            let (reconstruction, config) = reconstruct(&hits, &run)?;
            let values: Vec<f64> = read_json(&solution)?;
            let enumeration = SegmentEnumerator::new(
                config.window_modules,
                theta_tol.unwrap_or(reconstruction.tol_clusters_est),
            )
            .enumerate(&reconstruction.event);

            let first_layer = reconstruction
                .event
                .detector_geometry
                .first_layer_spacing()
                .unwrap_or(config.dz);
            let reconciler = Reconciler::new(
                VertexIntersector::new(config.tol_intersects, first_layer),
                config.tol_vertices,
                config.window_modules,
            );
            let ctx = ReconciliationContext::new(&reconstruction, &enumeration);
            let outcome = reconciler.reconcile(&enumeration.segments, &values, &ctx)?;

            eprintln!(
                "Active segments: {} of {} ({} removed, {} added)",
                outcome.active_count(),
                outcome.solution.len(),
                outcome.removed.len(),
                outcome.added.len()
            );
            eprintln!("Tracks: {}", outcome.tracks.len());
            eprintln!("Primary vertices: {}", outcome.primary_vertices.len());

            let report = ReconciliationReport {
                solution: outcome.solution.clone(),
                good_segment_ids: outcome.good_segment_ids.clone(),
                active_segments: outcome
                    .active_segments
                    .iter()
                    .map(ActiveSegmentRecord::from)
                    .collect(),
                removed: outcome.removed.clone(),
                added: outcome.added.clone(),
                tracks: outcome.tracks.iter().map(TrackRecord::from).collect(),
                primary_vertices: outcome.primary_vertices.clone(),
            };
            write_json(output.as_deref(), &report)?;
        }
    }

    Ok(())
}

fn reconstruct(input: &Path, run: &RunArgs) -> Result<(Reconstruction, ReconstructionConfig)> {
    let hits = read_hits(input)?;
    let config = run.config(&hits);
    let geometry = run.geometry(&config);
    debug!(
        "reconstructing {} hits over {} layers from {}",
        hits.len(),
        config.layers,
        input.display()
    );
    let resolver = ClusterResolver::new(config.clone());
    match resolver.find_tracks(hits, geometry)? {
        Some(reconstruction) => Ok((reconstruction, config)),
        None => Err(CliError::NothingToReconstruct(input.to_path_buf())),
    }
}

fn read_hits(path: &Path) -> Result<Vec<Hit>> {
    let records = match read_json::<HitInput>(path)? {
        HitInput::Bare(hits) | HitInput::Wrapped { hits } => hits,
    };
    Ok(records.into_iter().map(Hit::from).collect())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, value)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn print_summary(r: &Reconstruction) {
    eprintln!("Tracks: {}", r.num_tracks());
    eprintln!("False tracks: {}", r.state.false_tracks.len());
    eprintln!("Ghost hits: {}", r.event.ghost_hits.len());
    eprintln!("Primary vertices: {}", r.primary_vertices.len());
    for pv in &r.primary_vertices {
        eprintln!("  z = {:.3} mm ({} candidates)", pv.z, pv.n_candidates);
    }
}
