//! Parallel-plate capacitor demo: generates solver input for two metal
//! plates buried in oxide.
//!
//! Usage:
//! ```text
//! cargo run --example plate_capacitor              # writes to ./plate_capacitor_out
//! cargo run --example plate_capacitor -- /tmp/out  # custom output directory
//! ```
//!
//! The output directory receives `plates.lst` plus one `.geo` file per
//! surface (FasterCap input) and STL dumps of every body for inspection.

use std::path::PathBuf;

use capmesh::{CapmeshError, ModelBuilder, Region, TriangulationParams};

fn main() -> Result<(), CapmeshError> {
    // Default: INFO for capmesh. Override with RUST_LOG.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("capmesh=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let out_dir: PathBuf = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("plate_capacitor_out"), PathBuf::from);
    std::fs::create_dir_all(&out_dir)?;

    // 1 nm database unit, coordinates in micrometers
    let mut builder = ModelBuilder::new(0.001, 1.0).with_triangulation(TriangulationParams {
        max_area: 100_000.0,
        b: 0.5,
    });
    builder.add_material("ox", 3.9)?;

    // two 2 x 2 um plates, 0.3 um thick, separated by 0.5 um of oxide
    let plate = Region::from_rect(0, 0, 2000, 2000);
    builder.add_conductor("bottom", plate.clone(), 0.2, 0.3);
    builder.add_conductor("top", plate, 1.0, 0.3);
    builder.add_dielectric("ox", Region::from_rect(-500, -500, 2500, 2500), 0.0, 1.7)?;

    let Some(model) = builder.generate()? else {
        eprintln!("nothing declared, nothing generated");
        return Ok(());
    };

    let errors = model.check();
    if errors > 0 {
        eprintln!("surface model has {errors} closure error(s), solving it is unreliable");
    }

    let (lst_path, conductors) = model.write_solver_input(&out_dir, "plates")?;
    model.dump_stl(&out_dir)?;

    println!("solver list file: {}", lst_path.display());
    println!("triangles: {}", model.triangle_count());
    for info in conductors.iter() {
        println!(
            "conductor {} -> net {} (outside: {})",
            info.index,
            info.net,
            info.outside_dielectric.as_deref().unwrap_or("void")
        );
    }
    Ok(())
}
