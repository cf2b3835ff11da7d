//! ASCII STL debug dump of the generated bodies.
//!
//! One file per material and per net, each containing the body's outward
//! hull. Meant for visual inspection in a mesh viewer, not for solving.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::math::Triangle3;
use crate::sweep::ModelGenerator;

impl ModelGenerator {
    /// Writes `diel_<material>.stl` and `cond_<net>.stl` files into
    /// `output_dir`, skipping bodies without any surface.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    pub fn dump_stl(&self, output_dir: &Path) -> Result<()> {
        for name in self.materials.keys() {
            let triangles = self.collect_dielectric_tris(name);
            write_stl(&output_dir.join(format!("diel_{name}.stl")), &triangles)?;
        }
        for net in &self.net_names {
            let triangles = self.collect_conductor_tris(net);
            write_stl(&output_dir.join(format!("cond_{net}.stl")), &triangles)?;
        }
        Ok(())
    }
}

fn write_stl(path: &Path, triangles: &[Triangle3]) -> Result<()> {
    if triangles.is_empty() {
        return Ok(());
    }
    info!(path = %path.display(), triangles = triangles.len(), "writing STL dump");
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "solid stl")?;
    for t in triangles {
        writeln!(out, "  facet normal 0 0 0")?;
        writeln!(out, "    outer loop")?;
        // STL viewers expect clockwise-from-outside ordering
        for p in t.iter().rev() {
            writeln!(out, "      vertex {} {} {}", p.x, p.y, p.z)?;
        }
        writeln!(out, "    endloop")?;
        writeln!(out, "  endfacet")?;
    }
    writeln!(out, "endsolid stl")?;
    out.flush()?;
    Ok(())
}
