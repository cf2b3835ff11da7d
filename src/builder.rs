//! Declaration store and sweep driver.
//!
//! A [`ModelBuilder`] collects material definitions and extruded conductor
//! and dielectric volumes, then [`ModelBuilder::generate`] replays them as
//! start/end events over all distinct z levels and drives the sweep engine.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::info;

use crate::error::{ConfigError, Result};
use crate::region::Region;
use crate::sweep::{LayerKey, ModelGenerator};
use crate::triangulate::TriangulationParams;

/// One extruded volume declaration: region, bottom and top z in DBU.
#[derive(Debug, Clone)]
struct Volume {
    region: Region,
    z_bottom: i64,
    z_top: i64,
}

/// Collects the layout description of one extraction problem.
///
/// All vertical coordinates are physical (same unit as `dbu`); they are
/// quantized onto the DBU grid on entry. Declaration order matters: earlier
/// conductors and earlier-registered dielectrics win overlaps against later
/// ones, and conductors always win against dielectrics.
#[derive(Debug)]
pub struct ModelBuilder {
    pub(crate) dbu: f64,
    k_void: f64,
    params: TriangulationParams,
    materials: IndexMap<String, f64>,
    conductors: IndexMap<String, Vec<Volume>>,
    dielectrics: IndexMap<String, Vec<Volume>>,
}

impl ModelBuilder {
    /// Creates a builder for a layout with the given database unit (in the
    /// physical length unit of all coordinates) and the permittivity of the
    /// surrounding void.
    #[must_use]
    pub fn new(dbu: f64, k_void: f64) -> Self {
        info!(dbu, k_void, "new model builder");
        Self {
            dbu,
            k_void,
            params: TriangulationParams::default(),
            materials: IndexMap::new(),
            conductors: IndexMap::new(),
            dielectrics: IndexMap::new(),
        }
    }

    /// Sets the triangulation quality parameters.
    #[must_use]
    pub fn with_triangulation(mut self, params: TriangulationParams) -> Self {
        self.params = params;
        self
    }

    /// Registers a dielectric material with relative permittivity `k`.
    ///
    /// Registration order is the dielectric priority order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateMaterial`] if the name is taken.
    pub fn add_material(&mut self, name: &str, k: f64) -> Result<()> {
        if self.materials.contains_key(name) {
            return Err(ConfigError::DuplicateMaterial(name.to_owned()).into());
        }
        info!(name, k, "material");
        self.materials.insert(name.to_owned(), k);
        Ok(())
    }

    /// Declares a conductor volume on net `net`: `region` extruded from `z`
    /// to `z + height`.
    ///
    /// The first declaration of a net fixes its priority rank.
    pub fn add_conductor(&mut self, net: &str, region: Region, z: f64, height: f64) {
        info!(net, z, height, "conductor volume");
        let volume = self.volume(region, z, height);
        self.conductors.entry(net.to_owned()).or_default().push(volume);
    }

    /// Declares a dielectric volume of `material`: `region` extruded from
    /// `z` to `z + height`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownMaterial`] if the material has not been
    /// registered.
    pub fn add_dielectric(&mut self, material: &str, region: Region, z: f64, height: f64) -> Result<()> {
        if !self.materials.contains_key(material) {
            return Err(ConfigError::UnknownMaterial(material.to_owned()).into());
        }
        info!(material, z, height, "dielectric volume");
        let volume = self.volume(region, z, height);
        self.dielectrics
            .entry(material.to_owned())
            .or_default()
            .push(volume);
        Ok(())
    }

    fn volume(&self, region: Region, z: f64, height: f64) -> Volume {
        Volume {
            region,
            z_bottom: self.z_to_grid(z),
            z_top: self.z_to_grid(z + height),
        }
    }

    /// Quantizes a physical z coordinate onto the DBU grid.
    ///
    /// The epsilon absorbs accumulated float error in stacked layer heights
    /// so that abutting layers land on the same grid level.
    #[allow(clippy::cast_possible_truncation)]
    fn z_to_grid(&self, z: f64) -> i64 {
        (z / self.dbu + 1e-6).floor() as i64
    }

    /// Runs the z sweep over all declarations and returns the finished
    /// generator, or `None` if nothing was declared.
    ///
    /// # Errors
    ///
    /// Fails if a surface cannot be triangulated.
    pub fn generate(self) -> Result<Option<ModelGenerator>> {
        let mut z_levels: BTreeSet<i64> = BTreeSet::new();
        for volumes in self.conductors.values().chain(self.dielectrics.values()) {
            for v in volumes {
                z_levels.insert(v.z_bottom);
                z_levels.insert(v.z_top);
            }
        }
        if z_levels.is_empty() {
            return Ok(None);
        }
        info!(levels = z_levels.len(), "generating 3d model");

        let mut gen = ModelGenerator::new(
            self.dbu,
            self.k_void,
            self.params,
            self.materials.clone(),
            self.conductors.keys().cloned().collect(),
        );

        for &z in &z_levels {
            gen.next_z(z);
            // conductors first: they take precedence at every level
            for (net, volumes) in &self.conductors {
                for v in volumes {
                    if v.z_bottom <= z && z < v.z_top {
                        gen.add_in(LayerKey::Conductor(net.clone()), &v.region);
                    }
                    if v.z_bottom < z && z <= v.z_top {
                        gen.add_out(LayerKey::Conductor(net.clone()), &v.region);
                    }
                }
            }
            for (material, volumes) in &self.dielectrics {
                for v in volumes {
                    if v.z_bottom <= z && z < v.z_top {
                        gen.add_in(LayerKey::Dielectric(material.clone()), &v.region);
                    }
                    if v.z_bottom < z && z <= v.z_top {
                        gen.add_out(LayerKey::Dielectric(material.clone()), &v.region);
                    }
                }
            }
            gen.finish_z()?;
        }
        gen.finalize()?;
        Ok(Some(gen))
    }
}
