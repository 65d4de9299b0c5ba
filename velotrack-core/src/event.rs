//! Detector geometry and the reconstructed event.

use crate::hit::{assign_indices, Hit};
use crate::segment::{Segment, Track};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geometry of one detector plane.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModuleGeometry {
    /// Module identifier (1-based, ascending with z).
    pub module_id: u32,
    /// Plane position along the beam (mm).
    pub z: f64,
    /// Half extent in x (mm).
    pub lx: f64,
    /// Half extent in y (mm).
    pub ly: f64,
}

impl ModuleGeometry {
    /// Returns true if `(x, y)` lies on the plane.
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x.abs() <= self.lx && y.abs() <= self.ly
    }
}

/// A stack of parallel detector planes.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorGeometry {
    /// Planes in ascending module order.
    pub modules: Vec<ModuleGeometry>,
}

impl DetectorGeometry {
    /// Builds `layers` square planes at `z = dz * l` for `l = 1..=layers`.
    #[must_use]
    pub fn planes(layers: usize, dz: f64, half_extent: f64) -> Self {
        let modules = (1..=layers)
            .map(|l| {
                let module_id = u32::try_from(l).unwrap_or(u32::MAX);
                ModuleGeometry {
                    module_id,
                    z: dz * f64::from(module_id),
                    lx: half_extent,
                    ly: half_extent,
                }
            })
            .collect();
        Self { modules }
    }

    /// Number of planes.
    #[must_use]
    pub fn layers(&self) -> usize {
        self.modules.len()
    }

    /// Position of the innermost plane, the upper bound for vertex z.
    #[must_use]
    pub fn first_layer_spacing(&self) -> Option<f64> {
        self.modules.iter().map(|m| m.z).min_by(f64::total_cmp)
    }

    /// Looks up a plane by module id.
    #[must_use]
    pub fn module(&self, module_id: u32) -> Option<&ModuleGeometry> {
        self.modules.iter().find(|m| m.module_id == module_id)
    }
}

/// A detector plane together with the hits recorded on it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Module {
    /// Module identifier.
    pub module_id: u32,
    /// Plane position along the beam (mm).
    pub z: f64,
    /// Indices of the hits on this module.
    pub hits: Vec<usize>,
}

impl Module {
    /// Groups hits by module, one entry per module id present in either the
    /// geometry or the hits, in ascending module order.
    #[must_use]
    pub fn collect(geometry: &DetectorGeometry, hits: &[Hit]) -> Vec<Module> {
        let mut modules: Vec<Module> = geometry
            .modules
            .iter()
            .map(|g| Module {
                module_id: g.module_id,
                z: g.z,
                hits: Vec::new(),
            })
            .collect();

        for hit in hits {
            match modules.iter_mut().find(|m| m.module_id == hit.module_id) {
                Some(module) => module.hits.push(hit.index),
                None => modules.push(Module {
                    module_id: hit.module_id,
                    z: hit.z,
                    hits: vec![hit.index],
                }),
            }
        }
        modules.sort_by_key(|m| m.module_id);
        modules
    }
}

/// The reconstruction result for one event.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Detector planes the hits were recorded on.
    pub detector_geometry: DetectorGeometry,
    /// Hits grouped per module.
    pub modules: Vec<Module>,
    /// All hits, indexed by their surrogate key.
    pub hits: Vec<Hit>,
    /// Segments produced by the reconstruction.
    pub segments: Vec<Segment>,
    /// Reconstructed tracks.
    pub tracks: Vec<Track>,
    /// Hits not attributed to any track.
    pub ghost_hits: Vec<Hit>,
}

impl Event {
    /// Ingests a hit list: assigns surrogate keys and groups hits per module.
    #[must_use]
    pub fn new(detector_geometry: DetectorGeometry, mut hits: Vec<Hit>) -> Self {
        assign_indices(&mut hits);
        let modules = Module::collect(&detector_geometry, &hits);
        Self {
            detector_geometry,
            modules,
            hits,
            segments: Vec::new(),
            tracks: Vec::new(),
            ghost_hits: Vec::new(),
        }
    }

    /// Looks up a hit by surrogate key.
    #[must_use]
    pub fn hit(&self, index: usize) -> Option<&Hit> {
        self.hits.get(index)
    }

    /// Returns a copy of this event with no segments, tracks or ghost hits.
    #[must_use]
    pub fn without_reconstruction(&self) -> Self {
        Self {
            detector_geometry: self.detector_geometry.clone(),
            modules: self.modules.clone(),
            hits: self.hits.clone(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_planes() {
        let geometry = DetectorGeometry::planes(3, 20.0, 33.0);
        assert_eq!(geometry.layers(), 3);
        assert_relative_eq!(geometry.modules[0].z, 20.0);
        assert_relative_eq!(geometry.modules[2].z, 60.0);
        assert!(geometry.module(2).is_some_and(|m| m.contains(10.0, -33.0)));
        assert!(geometry.module(4).is_none());
        assert_eq!(geometry.first_layer_spacing(), Some(20.0));
        assert_eq!(DetectorGeometry::default().first_layer_spacing(), None);
    }

    #[test]
    fn test_event_ingestion_groups_by_module() {
        let geometry = DetectorGeometry::planes(2, 20.0, 33.0);
        let hits = vec![
            Hit::new(0, 1.0, 0.0, 40.0, 2),
            Hit::new(1, 0.5, 0.0, 20.0, 1),
            Hit::new(2, 2.0, 0.0, 40.0, 2),
        ];
        let event = Event::new(geometry, hits);

        assert_eq!(event.hits[2].index, 2);
        assert_eq!(event.modules.len(), 2);
        assert_eq!(event.modules[0].hits, vec![1]);
        assert_eq!(event.modules[1].hits, vec![0, 2]);
    }

    #[test]
    fn test_hits_outside_geometry_get_their_own_module() {
        let geometry = DetectorGeometry::planes(1, 20.0, 33.0);
        let event = Event::new(geometry, vec![Hit::new(0, 1.0, 1.0, 80.0, 4)]);
        assert_eq!(event.modules.len(), 2);
        assert_eq!(event.modules[1].module_id, 4);
        assert_relative_eq!(event.modules[1].z, 80.0);
    }
}
