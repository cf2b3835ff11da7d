//! Solver input file writer.
//!
//! Emits one list file naming every surface plus one geometry file per
//! surface, in the format consumed by boundary-element field solvers of the
//! FastCap family. Output is deterministic: surface order follows the
//! generator's insertion order and floats are printed with a fixed shortest
//! round-trip representation.

pub mod stl;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::math::{Point3, Triangle3, Vector3};
use crate::sweep::ModelGenerator;

/// One emitted conductor geometry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConductorInfo {
    /// 1-based geometry file index, matching the solver's conductor
    /// numbering.
    pub index: usize,
    pub net: String,
    /// Dielectric the surface borders; `None` is the surrounding void.
    pub outside_dielectric: Option<String>,
}

/// Maps solver conductor indices back to net names, for reattributing the
/// solver's capacitance matrix.
#[derive(Debug, Clone, Default)]
pub struct ConductorMap {
    conductors: Vec<ConductorInfo>,
}

impl ConductorMap {
    /// Number of conductor geometry files written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conductors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conductors.is_empty()
    }

    /// Looks up a conductor by its geometry file index.
    #[must_use]
    pub fn conductor_by_index(&self, index: usize) -> Option<&ConductorInfo> {
        self.conductors.iter().find(|c| c.index == index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConductorInfo> {
        self.conductors.iter()
    }
}

impl ModelGenerator {
    /// Writes the solver list file `<prefix>.lst` plus one geometry file per
    /// surface into `output_dir`, and returns the list file path and the
    /// conductor index map.
    ///
    /// Dielectric interfaces come first, then conductor surfaces grouped by
    /// net; all surfaces of one net form a single continuation chain so the
    /// solver treats them as one conductor.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors; already written files are left behind.
    pub fn write_solver_input(&self, output_dir: &Path, prefix: &str) -> Result<(PathBuf, ConductorMap)> {
        let lst_path = output_dir.join(format!("{prefix}.lst"));
        let mut lines: Vec<String> = vec![format!("* k_void={}", fmt_g(self.k_void))];
        let mut map = ConductorMap::default();
        let mut file_index = 0_usize;

        for (key, data) in &self.diel_data {
            if data.is_empty() {
                continue;
            }
            file_index += 1;
            let k_outside = self.permittivity(key.below.as_deref());
            let k_inside = self.permittivity(key.above.as_deref());
            let outside = key.below.as_deref().unwrap_or("(void)");
            let inside = key.above.as_deref().unwrap_or("(void)");
            lines.push(format!(
                "* Dielectric interface: outside={outside}, inside={inside}"
            ));
            let geo_name = format!("{prefix}_{file_index}_outside={outside}_inside={inside}.geo");
            write_geo(&output_dir.join(&geo_name), file_index, data, None)?;
            // reference point on the "outside" side of the first triangle
            let rp = reference_point(&data[0]);
            lines.push(format!(
                "D {geo_name}  {}  {}  0 0 0  {} {} {}",
                fmt_g(k_outside),
                fmt_g(k_inside),
                fmt_g(rp.x),
                fmt_g(rp.y),
                fmt_g(rp.z)
            ));
        }

        let nets = self.net_names.clone();
        for net in &nets {
            let surfaces: Vec<_> = self
                .cond_data
                .iter()
                .filter(|(key, data)| key.net == *net && !data.is_empty())
                .collect();
            let count = surfaces.len();
            for (i, (key, data)) in surfaces.into_iter().enumerate() {
                file_index += 1;
                let k_outside = self.permittivity(key.outside.as_deref());
                let outside = key.outside.as_deref().unwrap_or("(void)");
                map.conductors.push(ConductorInfo {
                    index: file_index,
                    net: net.clone(),
                    outside_dielectric: key.outside.clone(),
                });
                lines.push(format!(
                    "* Conductor interface: outside={outside}, net={net}"
                ));
                let geo_name = format!("{prefix}_{file_index}_outside={outside}_net={net}.geo");
                write_geo(&output_dir.join(&geo_name), file_index, data, Some(net))?;
                let continuation = if i + 1 < count { "  +" } else { "" };
                lines.push(format!(
                    "C {geo_name}  {}  0 0 0{continuation}",
                    fmt_g(k_outside)
                ));
            }
        }

        info!(path = %lst_path.display(), surfaces = file_index, "writing solver list file");
        let mut out = BufWriter::new(File::create(&lst_path)?);
        for line in &lines {
            writeln!(out, "{line}")?;
        }
        out.flush()?;

        Ok((lst_path, map))
    }

    fn permittivity(&self, material: Option<&str>) -> f64 {
        material
            .and_then(|m| self.materials.get(m))
            .copied()
            .unwrap_or(self.k_void)
    }
}

fn write_geo(path: &Path, file_index: usize, data: &[Triangle3], net: Option<&str>) -> Result<()> {
    info!(path = %path.display(), triangles = data.len(), "writing geometry file");
    let mut out = BufWriter::new(File::create(path)?);
    match net {
        // the unbalanced parenthesis is part of the format
        Some(net) => writeln!(out, "0 file #{file_index} (net {net}")?,
        None => writeln!(out, "0 file #{file_index}")?,
    }
    for t in data {
        write!(out, "T {file_index}")?;
        for p in t {
            write!(out, " {} {} {}", fmt_g(p.x), fmt_g(p.y), fmt_g(p.z))?;
        }
        writeln!(out)?;
    }
    if let Some(net) = net {
        writeln!(out, "N {file_index} {net}")?;
    }
    out.flush()?;
    Ok(())
}

/// A point slightly on the normal side of a triangle, identifying the
/// "outside" medium of a dielectric interface for the solver.
fn reference_point(t: &Triangle3) -> Point3 {
    let n = (t[1] - t[0]).cross(&(t[2] - t[0]));
    let len = n.norm();
    let offset = if len > 0.0 { n / len } else { Vector3::zeros() };
    t[0] + offset
}

/// Shortest round-trip decimal representation, with integral values printed
/// without a fractional part.
fn fmt_g(x: f64) -> String {
    format!("{x}")
}
