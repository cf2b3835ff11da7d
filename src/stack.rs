//! Process-stack dielectric descriptions.
//!
//! Translates the three dielectric kinds found in process technology files
//! into plain material registrations and volume declarations: a simple bulk
//! dielectric, a conformal coating following metal contours, and a sidewall
//! spacer hugging metal flanks.

use crate::builder::ModelBuilder;
use crate::error::{ConfigError, Result};
use crate::region::Region;

/// A dielectric layer kind from a process description.
///
/// All thicknesses and heights are physical lengths in the same unit as the
/// builder's database unit.
#[derive(Debug, Clone, PartialEq)]
pub enum DielectricSpec {
    /// Bulk dielectric filling its declared volume.
    Simple { k: f64 },
    /// Coating that follows the metal: `thickness_over_metal` above the top
    /// surface, `thickness_sidewall` outward from the flanks.
    Conformal {
        k: f64,
        thickness_over_metal: f64,
        thickness_sidewall: f64,
    },
    /// Spacer hugging the metal flanks: grown `width_outside_sidewall`
    /// outward, reaching `height_above_metal` above the metal top (the metal
    /// thickness if zero).
    Sidewall {
        k: f64,
        width_outside_sidewall: f64,
        height_above_metal: f64,
    },
}

impl DielectricSpec {
    /// Relative permittivity of the material.
    #[must_use]
    pub fn k(&self) -> f64 {
        match self {
            Self::Simple { k }
            | Self::Conformal { k, .. }
            | Self::Sidewall { k, .. } => *k,
        }
    }
}

impl ModelBuilder {
    /// Registers the material of a stack dielectric under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateMaterial`] if the name is taken.
    pub fn register_dielectric(&mut self, name: &str, spec: &DielectricSpec) -> Result<()> {
        self.add_material(name, spec.k())
    }

    /// Declares a conductor together with its coating chain.
    ///
    /// The conductor occupies `region` from `z` to `z + thickness`. Each
    /// coating wraps the result of the previous one: its region is the
    /// accumulated region grown by the coating's lateral extent, its height
    /// the accumulated height plus the coating's vertical extent. Coating
    /// dielectrics must already be registered.
    ///
    /// # Errors
    ///
    /// Fails if a coating material is unregistered, a coating is a bulk
    /// dielectric, or a lateral extent is negative.
    pub fn coat_conductor(
        &mut self,
        net: &str,
        region: &Region,
        z: f64,
        thickness: f64,
        coatings: &[(&str, DielectricSpec)],
    ) -> Result<()> {
        self.add_conductor(net, region.clone(), z, thickness);

        let mut coat_region = region.clone();
        let mut coat_height = 0.0;
        for (name, spec) in coatings {
            match spec {
                DielectricSpec::Simple { .. } => {
                    return Err(ConfigError::InvalidParameter(format!(
                        "coating '{name}': bulk dielectrics cannot wrap a conductor"
                    ))
                    .into());
                }
                DielectricSpec::Sidewall {
                    width_outside_sidewall,
                    height_above_metal,
                    ..
                } => {
                    coat_region = coat_region.sized(self.to_grid(*width_outside_sidewall))?;
                    coat_height += if *height_above_metal > 0.0 {
                        *height_above_metal
                    } else {
                        thickness
                    };
                    self.add_dielectric(name, coat_region.clone(), z, coat_height)?;
                }
                DielectricSpec::Conformal {
                    thickness_over_metal,
                    thickness_sidewall,
                    ..
                } => {
                    coat_region = coat_region.sized(self.to_grid(*thickness_sidewall))?;
                    coat_height = thickness + thickness_over_metal;
                    self.add_dielectric(name, coat_region.clone(), z, coat_height)?;
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn to_grid(&self, length: f64) -> i64 {
        (length / self.dbu + 1e-6).floor() as i64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::triangulate::TriangulationParams;

    fn flat_builder() -> ModelBuilder {
        ModelBuilder::new(0.001, 1.0).with_triangulation(TriangulationParams {
            max_area: 0.0,
            b: 0.0,
        })
    }

    #[test]
    fn spec_exposes_its_permittivity() {
        assert!((DielectricSpec::Simple { k: 3.9 }.k() - 3.9).abs() < 1e-12);
        let conformal = DielectricSpec::Conformal {
            k: 7.0,
            thickness_over_metal: 0.05,
            thickness_sidewall: 0.02,
        };
        assert!((conformal.k() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn bulk_dielectric_cannot_coat() {
        let mut b = flat_builder();
        b.add_material("ox", 3.9).unwrap();
        let err = b.coat_conductor(
            "net1",
            &Region::from_rect(0, 0, 1000, 1000),
            0.0,
            0.2,
            &[("ox", DielectricSpec::Simple { k: 3.9 })],
        );
        assert!(err.is_err());
    }

    #[test]
    fn conformal_coating_wraps_the_conductor() {
        let mut b = flat_builder();
        let nitride = DielectricSpec::Conformal {
            k: 7.0,
            thickness_over_metal: 0.1,
            thickness_sidewall: 0.05,
        };
        b.register_dielectric("nitride", &nitride).unwrap();
        b.coat_conductor(
            "net1",
            &Region::from_rect(0, 0, 1000, 1000),
            0.0,
            0.2,
            &[("nitride", nitride)],
        )
        .unwrap();
        let gen = b.generate().unwrap().unwrap();

        assert_eq!(gen.check(), 0);
        // every conductor face except the bottom borders the coating
        let outsides: Vec<_> = gen
            .conductor_surfaces()
            .map(|(_, outside, _)| outside.map(str::to_owned))
            .collect();
        assert!(outsides.contains(&Some("nitride".to_owned())));
    }

    #[test]
    fn sidewall_height_defaults_to_metal_thickness() {
        let mut b = flat_builder();
        let spacer = DielectricSpec::Sidewall {
            k: 5.0,
            width_outside_sidewall: 0.05,
            height_above_metal: 0.0,
        };
        b.register_dielectric("spacer", &spacer).unwrap();
        b.coat_conductor(
            "net1",
            &Region::from_rect(0, 0, 1000, 1000),
            0.0,
            0.2,
            &[("spacer", spacer)],
        )
        .unwrap();
        let gen = b.generate().unwrap().unwrap();
        assert_eq!(gen.check(), 0);
    }

    #[test]
    fn coating_chain_accumulates_extents() {
        let mut b = flat_builder();
        let inner = DielectricSpec::Sidewall {
            k: 5.0,
            width_outside_sidewall: 0.05,
            height_above_metal: 0.1,
        };
        let outer = DielectricSpec::Conformal {
            k: 7.0,
            thickness_over_metal: 0.2,
            thickness_sidewall: 0.1,
        };
        b.register_dielectric("spacer", &inner).unwrap();
        b.register_dielectric("liner", &outer).unwrap();
        b.coat_conductor(
            "net1",
            &Region::from_rect(0, 0, 1000, 1000),
            0.0,
            0.2,
            &[("spacer", inner), ("liner", outer)],
        )
        .unwrap();
        let gen = b.generate().unwrap().unwrap();
        assert_eq!(gen.check(), 0);

        // the spacer sits between conductor and liner
        let has_spacer_liner_interface = gen.dielectric_interfaces().any(|(a, b, _)| {
            matches!(
                (a, b),
                (Some("spacer"), Some("liner")) | (Some("liner"), Some("spacer"))
            )
        });
        assert!(has_spacer_liner_interface);
    }
}
