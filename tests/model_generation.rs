//! End-to-end model generation over a small two-metal process stack.

#![allow(clippy::unwrap_used)]

use std::sync::Once;

use approx::assert_relative_eq;
use capmesh::{DielectricSpec, ModelBuilder, ModelGenerator, Region, TriangulationParams};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Two crossing metal lines on different layers, buried in oxide, with a
/// conformal nitride liner around the lower metal.
fn build_cross_model() -> ModelGenerator {
    init_tracing();
    let mut b = ModelBuilder::new(0.001, 1.0).with_triangulation(TriangulationParams {
        max_area: 0.0,
        b: 0.0,
    });
    // registration order is priority order: the liner must outrank the
    // bulk oxide fill or the fill would displace it
    let liner = DielectricSpec::Conformal {
        k: 7.0,
        thickness_over_metal: 0.05,
        thickness_sidewall: 0.05,
    };
    b.register_dielectric("nitride", &liner).unwrap();
    b.add_material("ox", 3.9).unwrap();

    // lower metal runs east-west, wrapped in the liner; both metals stay
    // inset from the oxide hull so no flank reaches the void
    b.coat_conductor(
        "bot",
        &Region::from_rect(100, 1200, 2900, 1800),
        0.2,
        0.3,
        &[("nitride", liner)],
    )
    .unwrap();
    // upper metal runs north-south
    b.add_conductor("top", Region::from_rect(1200, 100, 1800, 2900), 0.8, 0.3);
    // bulk oxide fill over the whole area
    b.add_dielectric("ox", Region::from_rect(0, 0, 3000, 3000), 0.0, 1.5)
        .unwrap();

    b.generate().unwrap().unwrap()
}

#[test]
fn cross_model_is_closed() {
    let gen = build_cross_model();
    assert_eq!(gen.check(), 0);
    assert!(gen.triangle_count() > 0);
}

#[test]
fn cross_model_surfaces_name_expected_media() {
    let gen = build_cross_model();

    // the lower metal touches its liner on the sides and top and the
    // oxide below its foot; the upper metal is buried in oxide only
    let mut bot_media: Vec<Option<&str>> = Vec::new();
    for (net, outside, _) in gen.conductor_surfaces() {
        if net == "bot" {
            bot_media.push(outside);
        } else {
            assert_eq!(net, "top");
            assert_eq!(outside, Some("ox"));
        }
    }
    assert!(bot_media.contains(&Some("nitride")));
    assert!(bot_media.contains(&Some("ox")));
    assert!(!bot_media.contains(&None));

    // liner and oxide meet, and each appears against the void at the hull
    let pairs: Vec<_> = gen
        .dielectric_interfaces()
        .map(|(a, b, _)| (a.map(str::to_owned), b.map(str::to_owned)))
        .collect();
    let has = |x: Option<&str>, y: Option<&str>| {
        pairs.iter().any(|(a, b)| {
            (a.as_deref() == x && b.as_deref() == y) || (a.as_deref() == y && b.as_deref() == x)
        })
    };
    assert!(has(Some("nitride"), Some("ox")));
    assert!(has(None, Some("ox")));

    // mirrored orientations were folded: no pair appears both ways
    for (a, b) in &pairs {
        let mirrored = pairs
            .iter()
            .filter(|(c, d)| c == b && d == a)
            .count();
        assert_eq!(mirrored, 0, "unfolded mirror pair {a:?}/{b:?}");
    }
}

#[test]
fn solver_files_are_reproducible() {
    let gen = build_cross_model();
    let dir1 = tempfile::tempdir().unwrap();
    let dir2 = tempfile::tempdir().unwrap();
    let (lst1, map1) = gen.write_solver_input(dir1.path(), "cross").unwrap();
    let (lst2, map2) = gen.write_solver_input(dir2.path(), "cross").unwrap();

    assert_eq!(
        std::fs::read_to_string(&lst1).unwrap(),
        std::fs::read_to_string(&lst2).unwrap()
    );
    assert_eq!(map1.len(), map2.len());
    // bot spans two surfaces (oxide foot, nitride liner), top one
    assert_eq!(map1.len(), 3);

    let mut nets: Vec<&str> = map1.iter().map(|c| c.net.as_str()).collect();
    nets.sort_unstable();
    nets.dedup();
    assert_eq!(nets, vec!["bot", "top"]);
}

#[test]
fn refined_mesh_preserves_surface_area() {
    init_tracing();
    let build = |params: TriangulationParams| {
        let mut b = ModelBuilder::new(0.001, 1.0).with_triangulation(params);
        b.add_conductor("net1", Region::from_rect(0, 0, 2000, 1000), 0.0, 0.5);
        b.generate().unwrap().unwrap()
    };

    let coarse = build(TriangulationParams {
        max_area: 0.0,
        b: 0.0,
    });
    let fine = build(TriangulationParams {
        max_area: 50_000.0,
        b: 0.5,
    });
    assert!(fine.triangle_count() > coarse.triangle_count());
    assert_eq!(fine.check(), 0);

    let expected = 2.0 * (2.0 * 1.0) + 2.0 * (2.0 * 0.5) + 2.0 * (1.0 * 0.5);
    assert_relative_eq!(surface_area(&coarse, "net1"), expected, max_relative = 1e-9);
    assert_relative_eq!(
        surface_area(&coarse, "net1"),
        surface_area(&fine, "net1"),
        max_relative = 1e-9
    );
}

/// Total conductor surface area in physical units, summed over triangles.
fn surface_area(gen: &ModelGenerator, net: &str) -> f64 {
    gen.conductor_hull(net)
        .iter()
        .map(|t| 0.5 * (t[1] - t[0]).cross(&(t[2] - t[0])).norm())
        .sum()
}
