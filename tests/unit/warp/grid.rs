use super::*;
use crate::foundation::core::SkyCoord;

/// Pixel == (ra, dec), with an optional hole in the domain.
#[derive(Debug)]
struct PlaneProjection {
    hole: Option<(f64, f64)>,
}

impl SkyProjection for PlaneProjection {
    fn pixel_to_sky(&self, pixel: Point) -> Option<SkyCoord> {
        Some(SkyCoord::new(pixel.x, pixel.y))
    }

    fn sky_to_pixel(&self, sky: SkyCoord) -> Option<Point> {
        if self.hole == Some((sky.ra_deg, sky.dec_deg)) {
            return None;
        }
        Some(Point::new(sky.ra_deg, sky.dec_deg))
    }
}

const IDENTITY: PlaneProjection = PlaneProjection { hole: None };

#[test]
fn spacing_must_be_positive() {
    assert!(GridSpacing::new(0).unwrap_err().is_config());
    assert_eq!(GridSpacing::new(1).unwrap().get(), 1);
    assert_eq!(GridSpacing::default().get(), DEFAULT_GRID_SPACING);
    assert_eq!(GridSpacing::parse(" 25 ").unwrap().get(), 25);
    assert!(GridSpacing::parse("-3").is_err());
    assert!(GridSpacing::parse("ten").is_err());
    assert!(GridSpacing::parse("0").is_err());
}

#[test]
fn dims_are_ceil_and_last_node_is_clamped_to_extent() {
    for (w, h, s) in [
        (100u32, 100u32, 50u32),
        (120, 75, 50),
        (7, 13, 3),
        (1, 1, 1),
        (64, 10, 1),
        (49, 101, 50),
    ] {
        let spacing = GridSpacing::new(s).unwrap();
        let lattice = Lattice::build(w, h, spacing, &IDENTITY, &IDENTITY);
        let (nx, ny) = (w.div_ceil(s) as usize, h.div_ceil(s) as usize);
        assert_eq!((lattice.nx(), lattice.ny()), (nx, ny), "{w}x{h}/{s}");
        assert_eq!(lattice.nodes().len(), nx * ny);
        for j in 0..ny {
            assert_eq!(lattice.node(nx - 1, j).unwrap().source.x, f64::from(w));
        }
        for i in 0..nx {
            assert_eq!(lattice.node(i, ny - 1).unwrap().source.y, f64::from(h));
        }
    }
}

#[test]
fn interior_nodes_sit_on_multiples_of_spacing() {
    let spacing = GridSpacing::new(50).unwrap();
    let lattice = Lattice::build(120, 75, spacing, &IDENTITY, &IDENTITY);
    let xs: Vec<f64> = (0..lattice.nx())
        .map(|i| lattice.node(i, 0).unwrap().source.x)
        .collect();
    assert_eq!(xs, vec![0.0, 50.0, 120.0]);
    assert_eq!(lattice.node(0, 0).unwrap().source.y, 0.0);
    assert_eq!(lattice.node(0, 1).unwrap().source.y, 75.0);
    assert!(lattice.node(3, 0).is_none());
}

#[test]
fn identity_projection_maps_nodes_onto_themselves() {
    let lattice = Lattice::build(130, 90, GridSpacing::new(20).unwrap(), &IDENTITY, &IDENTITY);
    assert_eq!(lattice.valid_count(), lattice.nodes().len());
    for n in lattice.nodes() {
        assert_eq!(n.target, Some(n.source));
    }
}

#[test]
fn hundred_square_at_fifty_has_one_quad() {
    let lattice = Lattice::build(100, 100, GridSpacing::new(50).unwrap(), &IDENTITY, &IDENTITY);
    assert_eq!((lattice.nx(), lattice.ny()), (2, 2));
    assert_eq!(lattice.quad_count(), 1);
    let quads: Vec<_> = lattice.quads().collect();
    assert_eq!(quads.len(), 1);
    assert_eq!(
        quads[0].source,
        [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0)
        ]
    );
    assert!(quads[0].is_usable());
}

#[test]
fn invalid_node_poisons_every_quad_touching_it() {
    // 3x3 nodes at 0, 10, 25; the center node fails.
    let target = PlaneProjection {
        hole: Some((10.0, 10.0)),
    };
    let lattice = Lattice::build(25, 25, GridSpacing::new(10).unwrap(), &IDENTITY, &target);
    assert_eq!((lattice.nx(), lattice.ny()), (3, 3));
    assert!(!lattice.node(1, 1).unwrap().is_valid());
    assert_eq!(lattice.valid_count(), 8);
    let quads: Vec<_> = lattice.quads().collect();
    assert_eq!(quads.len(), 4);
    assert!(quads.iter().all(|q| !q.is_usable()));
}

#[test]
fn quads_iterate_row_major() {
    let lattice = Lattice::build(30, 20, GridSpacing::new(10).unwrap(), &IDENTITY, &IDENTITY);
    let order: Vec<(usize, usize)> = lattice.quads().map(|q| (q.j, q.i)).collect();
    assert_eq!(order, vec![(0, 0), (0, 1)]);
    let q = lattice.quads().nth(1).unwrap();
    assert_eq!(q.source[AA], Point::new(10.0, 0.0));
    assert_eq!(q.source[AB], Point::new(30.0, 0.0));
    assert_eq!(q.source[BA], Point::new(10.0, 20.0));
    assert_eq!(q.source[BB], Point::new(30.0, 20.0));
}

#[test]
fn single_cell_images_have_no_quads() {
    let lattice = Lattice::build(40, 40, GridSpacing::new(50).unwrap(), &IDENTITY, &IDENTITY);
    assert_eq!((lattice.nx(), lattice.ny()), (1, 1));
    assert_eq!(lattice.quads().count(), 0);
}

#[test]
fn non_finite_targets_are_invalid() {
    let lattice = Lattice::build_with(20, 20, GridSpacing::new(10).unwrap(), |p| {
        (p.x > 0.0).then(|| Point::new(f64::NAN, p.y))
    });
    assert_eq!(lattice.valid_count(), 0);
}
