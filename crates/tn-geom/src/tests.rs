//! Unit tests for tn-geom.
//!
//! Fixtures sit near the equator, where 0.001° ≈ 111 m on both axes —
//! large enough that the default metre tolerances stay out of the way.

#[cfg(test)]
mod helpers {
    use tn_core::{GeoPoint3, Line3};

    pub fn line(pts: &[(f64, f64, f64)]) -> Line3 {
        Line3::new(
            pts.iter()
                .map(|&(lng, lat, elev)| GeoPoint3::new(lng, lat, elev))
                .collect(),
        )
    }

    pub fn p(lng: f64, lat: f64) -> GeoPoint3 {
        GeoPoint3::new(lng, lat, 0.0)
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod convert {
    use super::helpers::line;
    use crate::convert::{force_2d, force_3d};

    #[test]
    fn roundtrip_preserves_vertices_and_elevation() {
        let l = line(&[(0.0, 0.0, 100.0), (0.001, 0.0, 150.0), (0.002, 0.0, 125.0)]);
        let shadow = force_2d(&l);
        assert_eq!(shadow.0.len(), 3);
        let lifted = force_3d(&shadow, &l);
        assert_eq!(lifted, l);
    }

    #[test]
    fn lifting_uses_nearest_source_vertex() {
        let source = line(&[(0.0, 0.0, 100.0), (0.002, 0.0, 200.0)]);
        // A 2-D point nearer the second vertex takes its elevation.
        let shadow = force_2d(&line(&[(0.0015, 0.0, 0.0), (0.0, 0.0, 0.0)]));
        let lifted = force_3d(&shadow, &source);
        assert_eq!(lifted.points()[0].elev, 200.0);
        assert_eq!(lifted.points()[1].elev, 100.0);
    }
}

// ── Kernel ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod kernel {
    use super::helpers::{line, p};
    use crate::error::GeomError;
    use crate::kernel::*;
    use tn_core::GeoPoint3;

    #[test]
    fn validate_rejects_bad_input() {
        assert!(matches!(
            validate(&line(&[(0.0, 0.0, 0.0)])),
            Err(GeomError::InvalidGeometry(_))
        ));
        assert!(matches!(
            validate(&line(&[(0.0, 0.0, 0.0), (f64::NAN, 0.0, 0.0)])),
            Err(GeomError::InvalidGeometry(_))
        ));
        assert!(matches!(
            validate(&line(&[(1.0, 1.0, 0.0), (1.0, 1.0, 0.0)])),
            Err(GeomError::InvalidGeometry(_))
        ));
        assert!(validate(&line(&[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0)])).is_ok());
    }

    #[test]
    fn locate_projects_onto_the_interior() {
        let l = line(&[(0.0, 0.0, 100.0), (0.002, 0.0, 200.0)]);
        // Query sits above the midpoint.
        let pos = locate(&l, p(0.001, 0.0005)).unwrap();
        assert_eq!(pos.seg, 0);
        assert!((pos.t - 0.5).abs() < 1e-9);
        assert!((pos.point.lng - 0.001).abs() < 1e-12);
        assert_eq!(pos.point.lat, 0.0);
        assert!((pos.point.elev - 150.0).abs() < 1e-9);
        // ~55.6 m off the line
        assert!((pos.dist_m - 55.6).abs() < 0.1, "dist {}", pos.dist_m);
    }

    #[test]
    fn locate_clamps_beyond_the_ends() {
        let l = line(&[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0)]);
        let pos = locate(&l, p(-0.001, 0.0)).unwrap();
        assert_eq!(pos.t, 0.0);
        assert_eq!(pos.arc_m, 0.0);
    }

    #[test]
    fn line_locate_point_is_a_fraction() {
        let l = line(&[(0.0, 0.0, 0.0), (0.002, 0.0, 0.0)]);
        let f = line_locate_point(&l, p(0.0005, 0.0001)).unwrap();
        assert!((f - 0.25).abs() < 1e-6, "fraction {f}");
    }

    #[test]
    fn snap_moves_only_vertices_within_tolerance() {
        let target = line(&[(0.0, 0.0, 0.0), (0.002, 0.0, 0.0)]);
        // First vertex 1e-7° off the target's start; second far away.
        let noisy = line(&[(1e-7, 1e-7, 5.0), (0.002, 0.001, 6.0)]);
        let snapped = snap(&noisy, &target, 1e-6).unwrap();
        assert_eq!(snapped.points()[0].lng, 0.0);
        assert_eq!(snapped.points()[0].lat, 0.0);
        assert_eq!(snapped.points()[0].elev, 5.0); // elevation kept
        assert_eq!(snapped.points()[1], noisy.points()[1]);
    }

    #[test]
    fn snap_prefers_target_vertices_over_interiors() {
        let target = line(&[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0), (0.002, 0.0, 0.0)]);
        // Near the interior vertex, slightly off both axes.
        let noisy = line(&[(0.001_000_3, 1e-7, 0.0), (0.002, 0.001, 0.0)]);
        let snapped = snap(&noisy, &target, 1e-6).unwrap();
        assert_eq!(snapped.points()[0].lng, 0.001);
        assert_eq!(snapped.points()[0].lat, 0.0);
    }

    #[test]
    fn simplify_drops_collinear_interior_vertices() {
        let l = line(&[
            (0.0, 0.0, 100.0),
            (0.001, 1e-9, 150.0), // within epsilon of the chord
            (0.002, 0.0, 200.0),
        ]);
        let s = simplify_preserve_topology(&l, 1e-6).unwrap();
        assert_eq!(s.num_points(), 2);
        assert_eq!(s.first().unwrap().elev, 100.0);
        assert_eq!(s.last().unwrap().elev, 200.0);
    }

    #[test]
    fn closest_point_interpolates_elevation() {
        let l = line(&[(0.0, 0.0, 0.0), (0.001, 0.0, 100.0)]);
        let c = closest_point(&l, GeoPoint3::new(0.00025, 0.0002, 0.0)).unwrap();
        assert!((c.elev - 25.0).abs() < 1e-6);
    }
}

// ── Intersections ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod intersect {
    use super::helpers::line;
    use crate::intersect::*;

    #[test]
    fn x_crossing_yields_one_point() {
        let a = line(&[(0.0, 0.0, 10.0), (0.002, 0.002, 20.0)]);
        let b = line(&[(0.0, 0.002, 0.0), (0.002, 0.0, 0.0)]);
        let found = intersections(&a, &b, 0.01).unwrap();
        assert_eq!(found.points.len(), 1);
        assert!(found.overlaps.is_empty());
        let p = found.points[0];
        assert!((p.lng - 0.001).abs() < 1e-9);
        assert!((p.lat - 0.001).abs() < 1e-9);
        assert!((p.elev - 15.0).abs() < 1e-6); // interpolated on `a`
    }

    #[test]
    fn shared_endpoint_is_a_touch_point() {
        let a = line(&[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0)]);
        let b = line(&[(0.001, 0.0, 0.0), (0.001, 0.001, 0.0)]);
        let found = intersections(&a, &b, 0.01).unwrap();
        assert_eq!(found.points.len(), 1);
        assert!((found.points[0].lng - 0.001).abs() < 1e-12);
    }

    #[test]
    fn collinear_overlap_is_reported_not_pointized() {
        let a = line(&[(0.0, 0.0, 0.0), (0.002, 0.0, 0.0)]);
        let b = line(&[(0.001, 0.0, 0.0), (0.003, 0.0, 0.0)]);
        let found = intersections(&a, &b, 0.01).unwrap();
        assert!(!found.overlaps.is_empty());
        let (s, e) = found.overlaps[0];
        assert!((s.distance_m(e) - 111.19).abs() < 1.0); // ~0.001° overlap
    }

    #[test]
    fn near_coincident_crossings_merge() {
        let a = line(&[(0.0, 0.0, 0.0), (0.002, 0.0, 0.0)]);
        // Two hairpin crossings through `a` within centimetres of each other.
        let b = line(&[
            (0.000_999_9, -0.001, 0.0),
            (0.000_999_95, 0.001, 0.0),
            (0.001, -0.001, 0.0),
        ]);
        let found = intersections(&a, &b, 0.05).unwrap();
        assert_eq!(found.points.len(), 1, "{:?}", found.points);
    }

    #[test]
    fn bowtie_self_touch_detected() {
        let bowtie = line(&[
            (0.0, 0.0, 0.0),
            (0.002, 0.002, 0.0),
            (0.002, 0.0, 0.0),
            (0.0, 0.002, 0.0),
        ]);
        let touches = self_touch_points(&bowtie, 6);
        assert_eq!(touches.len(), 1);
        assert!((touches[0].lng - 0.001).abs() < 1e-9);
        assert!(!is_simple(&bowtie, 6));
    }

    #[test]
    fn revisited_vertex_is_a_self_touch() {
        let lasso = line(&[
            (0.0, 0.0, 0.0),
            (0.001, 0.0, 0.0),
            (0.002, 0.001, 0.0),
            (0.001, 0.002, 0.0),
            (0.001, 0.0, 0.0), // back through the same vertex
            (0.002, -0.001, 0.0),
        ]);
        assert!(!is_simple(&lasso, 6));
        assert_eq!(self_touch_points(&lasso, 6).len(), 1);
    }

    #[test]
    fn straight_line_is_simple() {
        let l = line(&[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0), (0.002, 0.0005, 0.0)]);
        assert!(is_simple(&l, 6));
    }
}

// ── Splitting ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod split {
    use super::helpers::{line, p};
    use crate::error::GeomError;
    use crate::split::*;

    #[test]
    fn midpoint_split_preserves_length() {
        let l = line(&[(0.0, 0.0, 0.0), (0.002, 0.0, 0.0)]); // ~222 m
        let (a, b) = split_at_point(&l, p(0.001, 0.0), 1e-6, 1.0).unwrap();
        assert!((a.length_m() + b.length_m() - l.length_m()).abs() < 1e-6);
        assert_eq!(a.last().unwrap().lng, 0.001);
        assert_eq!(b.first().unwrap().lng, 0.001);
    }

    #[test]
    fn off_line_point_within_buffer_still_splits() {
        let l = line(&[(0.0, 0.0, 0.0), (0.002, 0.0, 0.0)]);
        // 5e-7° above the line — inside a 1e-6 buffer.
        let (a, b) = split_at_point(&l, p(0.001, 5e-7), 1e-6, 1.0).unwrap();
        // Cut lands on the projection, on the line itself.
        assert_eq!(a.last().unwrap().lat, 0.0);
        assert!((a.length_m() + b.length_m() - l.length_m()).abs() < 0.2);
    }

    #[test]
    fn far_point_is_rejected() {
        let l = line(&[(0.0, 0.0, 0.0), (0.002, 0.0, 0.0)]);
        let err = split_at_point(&l, p(0.001, 0.001), 1e-6, 1.0).unwrap_err();
        assert!(matches!(err, GeomError::InvalidGeometry(_)));
    }

    #[test]
    fn cut_near_an_end_is_degenerate() {
        let l = line(&[(0.0, 0.0, 0.0), (0.002, 0.0, 0.0)]);
        let err = split_at_point(&l, p(0.000_001, 0.0), 1e-6, 1.0).unwrap_err();
        assert!(matches!(err, GeomError::DegenerateSplit(_)));
    }

    #[test]
    fn multi_point_split_orders_and_merges() {
        let l = line(&[(0.0, 0.0, 0.0), (0.004, 0.0, 0.0)]); // ~445 m
        let pieces = split_at_points(
            &l,
            // Out of order, with a near-duplicate of the first cut.
            &[p(0.003, 0.0), p(0.001, 0.0), p(0.001_000_01, 0.0)],
            1e-6,
            1.0,
            0.01,
        )
        .unwrap();
        assert_eq!(pieces.len(), 3);
        let total: f64 = pieces.iter().map(|x| x.length_m()).sum();
        assert!((total - l.length_m()).abs() < 1e-6);
        assert!(pieces[0].length_m() < pieces[1].length_m());
    }

    #[test]
    fn split_at_existing_vertex_does_not_duplicate_it() {
        let l = line(&[(0.0, 0.0, 0.0), (0.001, 0.0, 50.0), (0.002, 0.0, 0.0)]);
        let pieces = split_at_points(&l, &[p(0.001, 0.0)], 1e-6, 1.0, 0.01).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].num_points(), 2);
        assert_eq!(pieces[1].num_points(), 2);
        assert_eq!(pieces[0].last().unwrap().elev, 50.0);
    }

    #[test]
    fn no_surviving_cut_returns_the_input() {
        let l = line(&[(0.0, 0.0, 0.0), (0.002, 0.0, 0.0)]);
        let pieces = split_at_points(&l, &[p(0.001, 0.5)], 1e-6, 1.0, 0.01).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0], l);
    }

    #[test]
    fn ring_splits_into_two_arcs() {
        let ring = line(&[
            (0.0, 0.0, 0.0),
            (0.001, 0.0, 0.0),
            (0.001, 0.001, 0.0),
            (0.0, 0.001, 0.0),
            (0.0, 0.0, 0.0),
        ]);
        let (a, b) = split_ring(&ring).unwrap();
        assert!((a.length_m() + b.length_m() - ring.length_m()).abs() < 1e-6);
        // Arcs share both endpoints.
        assert_eq!(a.last().unwrap(), b.first().unwrap());
        assert_eq!(a.first().unwrap(), b.last().unwrap());
        // Neither arc is itself closed.
        assert!(!a.is_closed(6));
        assert!(!b.is_closed(6));
    }

    #[test]
    fn tiny_ring_is_rejected() {
        let triangle = line(&[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0), (0.0, 0.0, 0.0)]);
        assert!(split_ring(&triangle).is_err());
    }
}
