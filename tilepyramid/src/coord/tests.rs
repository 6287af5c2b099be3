//! Tests for projection and tile enumeration.

use super::*;
use std::collections::HashSet;

/// Sample box over Dubai Marina, the CLI default.
fn dubai_bbox() -> BoundingBox {
    BoundingBox::new(55.397945, 25.291090, 55.402741, 25.292889).unwrap()
}

// ----------------------------------------------------------------------------
// Rounding and clamping
// ----------------------------------------------------------------------------

#[test]
fn test_round_half_away_from_zero() {
    assert_eq!(round_half_away_from_zero(2.5), 3.0);
    assert_eq!(round_half_away_from_zero(-2.5), -3.0);
    assert_eq!(round_half_away_from_zero(2.4), 2.0);
    assert_eq!(round_half_away_from_zero(-2.4), -2.0);
    assert_eq!(round_half_away_from_zero(0.5), 1.0);
    assert_eq!(round_half_away_from_zero(-0.5), -1.0);
    assert_eq!(round_half_away_from_zero(0.0), 0.0);
}

#[test]
fn test_min_max_within_bounds() {
    assert_eq!(min_max(0.5, -0.9999, 0.9999), 0.5);
}

#[test]
fn test_min_max_clamps_both_sides() {
    assert_eq!(min_max(1.0, -0.9999, 0.9999), 0.9999);
    assert_eq!(min_max(-1.0, -0.9999, 0.9999), -0.9999);
}

#[test]
fn test_min_max_nan_takes_lower_bound() {
    // max(NaN, b) == b, then min(b, c) == b
    assert_eq!(min_max(f64::NAN, -0.9999, 0.9999), -0.9999);
}

// ----------------------------------------------------------------------------
// Projector
// ----------------------------------------------------------------------------

#[test]
fn test_zoom_constants() {
    let projector = Projector::new(TileGrid::default());

    let z0 = projector.constants(0).unwrap();
    assert_eq!(z0.tile_span, 256.0);
    assert_eq!(z0.origin, 128.0);
    assert_eq!(z0.lon_scale, 256.0 / 360.0);

    let z2 = projector.constants(2).unwrap();
    assert_eq!(z2.tile_span, 1024.0);
    assert_eq!(z2.origin, 512.0);
    assert_eq!(z2.lat_scale, 1024.0 / (2.0 * std::f64::consts::PI));

    assert!(projector.constants(19).is_some());
    assert!(projector.constants(20).is_none());
}

#[test]
fn test_world_center_at_zoom_2() {
    let projector = Projector::new(TileGrid::default());
    let px = projector.project_pixels(0.0, 0.0, 2).unwrap();

    assert_eq!(px, PixelCoord { x: 512.0, y: 512.0 });
    assert_eq!((px.x / 256.0).floor() as u32, 2);
    assert_eq!((px.y / 256.0).floor() as u32, 2);
}

#[test]
fn test_project_world_corners() {
    let projector = Projector::new(TileGrid::default());

    let nw = projector.project_pixels(MIN_LON, MAX_LAT, 1).unwrap();
    assert_eq!(nw, PixelCoord { x: 0.0, y: 0.0 });

    let se = projector.project_pixels(MAX_LON, MIN_LAT, 1).unwrap();
    assert_eq!(se, PixelCoord { x: 512.0, y: 512.0 });
}

#[test]
fn test_project_dubai_at_zoom_19() {
    let projector = Projector::new(TileGrid::default());
    let px = projector.project_pixels(55.397945, 25.292889, 19).unwrap();
    assert_eq!(px, PixelCoord { x: 87762715.0, y: 57356899.0 });
}

#[test]
fn test_project_rejects_zoom_beyond_grid() {
    let projector = Projector::new(TileGrid::default());
    let result = projector.project_pixels(0.0, 0.0, 20);
    assert!(matches!(
        result,
        Err(CoordError::InvalidZoom {
            zoom: 20,
            max_zoom: 19
        })
    ));
}

#[test]
fn test_project_sin_clamp_near_pole() {
    // Beyond ~89.19 degrees sin(lat) exceeds 0.9999 and is clamped, so the
    // projected y stops moving.
    let projector = Projector::new(TileGrid::default());
    let a = projector.project_pixels(0.0, 89.5, 4).unwrap();
    let b = projector.project_pixels(0.0, 89.9, 4).unwrap();
    assert_eq!(a.y, b.y);
}

#[test]
fn test_custom_tile_size() {
    let grid = TileGrid::new(512, 4).unwrap();
    let projector = Projector::new(grid);
    let px = projector.project_pixels(0.0, 0.0, 1).unwrap();
    assert_eq!(px, PixelCoord { x: 512.0, y: 512.0 });
}

// ----------------------------------------------------------------------------
// Input validation
// ----------------------------------------------------------------------------

#[test]
fn test_bbox_rejects_out_of_range_latitude() {
    let result = BoundingBox::new(0.0, -86.0, 1.0, 1.0);
    assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));

    let result = BoundingBox::new(0.0, 0.0, 1.0, 90.0);
    assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
}

#[test]
fn test_bbox_rejects_out_of_range_longitude() {
    let result = BoundingBox::new(-181.0, 0.0, 1.0, 1.0);
    assert!(matches!(result, Err(CoordError::InvalidLongitude(_))));
}

#[test]
fn test_bbox_rejects_nan() {
    let result = BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0);
    assert!(matches!(result, Err(CoordError::InvalidLongitude(_))));
}

#[test]
fn test_bbox_rejects_inverted_edges() {
    assert!(matches!(
        BoundingBox::new(2.0, 0.0, 1.0, 1.0),
        Err(CoordError::InvalidBoundingBox { .. })
    ));
    assert!(matches!(
        BoundingBox::new(0.0, 1.0, 1.0, 1.0),
        Err(CoordError::InvalidBoundingBox { .. })
    ));
}

#[test]
fn test_bbox_display_is_mbtiles_bounds() {
    let bbox = BoundingBox::new(-1.5, -2.0, 3.0, 4.25).unwrap();
    assert_eq!(bbox.to_string(), "-1.5,-2,3,4.25");
}

#[test]
fn test_zoom_range_from_zoom_runs_to_max() {
    let range = ZoomRange::from_zoom(15, &TileGrid::default()).unwrap();
    assert_eq!(range.min(), 15);
    assert_eq!(range.max(), 19);
    assert_eq!(range.levels().collect::<Vec<_>>(), vec![15, 16, 17, 18, 19]);
    assert_eq!(range.len(), 5);
}

#[test]
fn test_zoom_range_rejects_zoom_beyond_grid() {
    let result = ZoomRange::from_zoom(20, &TileGrid::default());
    assert!(matches!(result, Err(CoordError::InvalidZoom { .. })));
}

#[test]
fn test_zoom_range_rejects_inverted() {
    assert!(ZoomRange::new(5, 4).is_err());
}

#[test]
fn test_grid_validation() {
    assert!(TileGrid::new(0, 19).is_err());
    assert!(TileGrid::new(256, GRID_ZOOM_LIMIT + 1).is_err());
    assert!(TileGrid::new(256, GRID_ZOOM_LIMIT).is_ok());
}

// ----------------------------------------------------------------------------
// Enumerator
// ----------------------------------------------------------------------------

#[test]
fn test_box_inside_single_tile_yields_one_tile() {
    let enumerator = TileEnumerator::new(TileGrid::default());
    let bbox = BoundingBox::new(10.0, 10.0, 20.0, 20.0).unwrap();

    let tiles = enumerator
        .tiles(&bbox, ZoomRange::new(2, 2).unwrap())
        .unwrap();

    assert_eq!(tiles, vec![TileId::new(2, 2, 1)]);
}

#[test]
fn test_dubai_at_max_zoom_only_fetches_zoom_19() {
    let grid = TileGrid::default();
    let enumerator = TileEnumerator::new(grid);
    let zooms = ZoomRange::from_zoom(19, &grid).unwrap();

    let ranges = enumerator.ranges(&dubai_bbox(), zooms).unwrap();
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].zoom, 19);
    assert_eq!(ranges[0].cols, Some((342823, 342830)));
    assert_eq!(ranges[0].rows, Some((224050, 224053)));

    let tiles = enumerator.tiles(&dubai_bbox(), zooms).unwrap();
    assert_eq!(tiles.len(), (342830 - 342823 + 1) * (224053 - 224050 + 1));
    assert_eq!(tiles.len(), 32);
    assert!(tiles.iter().all(|t| t.zoom == 19));
}

#[test]
fn test_dubai_pyramid_from_zoom_17() {
    let grid = TileGrid::default();
    let enumerator = TileEnumerator::new(grid);
    let zooms = ZoomRange::from_zoom(17, &grid).unwrap();

    let counts: Vec<_> = enumerator
        .ranges(&dubai_bbox(), zooms)
        .unwrap()
        .iter()
        .map(|r| (r.zoom, r.tile_count()))
        .collect();

    assert_eq!(counts, vec![(17, 6), (18, 10), (19, 32)]);
    assert_eq!(enumerator.count(&dubai_bbox(), zooms).unwrap(), 48);
}

#[test]
fn test_tiles_are_ordered_zoom_col_row() {
    let grid = TileGrid::default();
    let enumerator = TileEnumerator::new(grid);
    let tiles = enumerator
        .tiles(&dubai_bbox(), ZoomRange::from_zoom(17, &grid).unwrap())
        .unwrap();

    let mut sorted = tiles.clone();
    sorted.sort();
    assert_eq!(tiles, sorted);

    assert_eq!(tiles[0], TileId::new(17, 85705, 56012));
    assert_eq!(tiles[1], TileId::new(17, 85705, 56013));
    assert_eq!(tiles[2], TileId::new(17, 85706, 56012));
}

#[test]
fn test_world_exact_clip_stays_inside_grid() {
    let enumerator = TileEnumerator::new(TileGrid::default());
    let world = BoundingBox::world();

    let z0 = enumerator.tiles(&world, ZoomRange::new(0, 0).unwrap()).unwrap();
    assert_eq!(z0, vec![TileId::new(0, 0, 0)]);

    let z1 = enumerator.tiles(&world, ZoomRange::new(1, 1).unwrap()).unwrap();
    assert_eq!(z1.len(), 4);
    assert!(z1.iter().all(|t| t.col < 2 && t.row < 2));
}

#[test]
fn test_world_inclusive_clip_admits_one_past_edge() {
    let enumerator =
        TileEnumerator::new(TileGrid::default()).with_edge_clip(EdgeClip::Inclusive);
    let world = BoundingBox::world();

    let z0 = enumerator.tiles(&world, ZoomRange::new(0, 0).unwrap()).unwrap();
    assert_eq!(z0.len(), 4);

    let z1 = enumerator.tiles(&world, ZoomRange::new(1, 1).unwrap()).unwrap();
    assert_eq!(z1.len(), 9);
    assert!(z1.contains(&TileId::new(1, 2, 2)));
    assert!(z1.iter().all(|t| t.col <= 2 && t.row <= 2));
}

#[test]
fn test_edge_clip_does_not_matter_away_from_edges() {
    let grid = TileGrid::default();
    let zooms = ZoomRange::from_zoom(17, &grid).unwrap();
    let exact = TileEnumerator::new(grid).tiles(&dubai_bbox(), zooms).unwrap();
    let inclusive = TileEnumerator::new(grid)
        .with_edge_clip(EdgeClip::Inclusive)
        .tiles(&dubai_bbox(), zooms)
        .unwrap();
    assert_eq!(exact, inclusive);
}

#[test]
fn test_edge_clip_parsing() {
    assert_eq!(EdgeClip::from_config_str("exact"), Some(EdgeClip::Exact));
    assert_eq!(
        EdgeClip::from_config_str(" Inclusive "),
        Some(EdgeClip::Inclusive)
    );
    assert_eq!(EdgeClip::from_config_str("strict"), None);
    assert_eq!(EdgeClip::default(), EdgeClip::Exact);
}

#[test]
fn test_zoom_range_outside_grid_is_error() {
    let grid = TileGrid::new(256, 3).unwrap();
    let enumerator = TileEnumerator::new(grid);
    let result = enumerator.tiles(&dubai_bbox(), ZoomRange::new(2, 4).unwrap());
    assert!(matches!(result, Err(CoordError::InvalidZoom { zoom: 4, .. })));
}

#[test]
fn test_fully_clipped_range_counts_zero() {
    let range = ZoomTileRange {
        zoom: 3,
        cols: None,
        rows: Some((0, 2)),
    };
    assert_eq!(range.tile_count(), 0);
    assert_eq!(range.tiles().count(), 0);
}

#[test]
fn test_tile_id_display() {
    assert_eq!(TileId::new(19, 342823, 224050).to_string(), "19/342823/224050");
}

#[test]
fn test_tile_to_lat_lon_at_equator() {
    let (lat, lon) = tile_to_lat_lon(&TileId::new(10, 512, 512));
    assert!(lat.abs() < 1e-9);
    assert!(lon.abs() < 1e-9);
}

#[test]
fn test_enumerated_tiles_cover_their_box() {
    // The north-west corner of each tile sits west/north of the box's
    // south-east corner.
    let grid = TileGrid::default();
    let bbox = dubai_bbox();
    let tiles = TileEnumerator::new(grid)
        .tiles(&bbox, ZoomRange::from_zoom(17, &grid).unwrap())
        .unwrap();

    for tile in tiles {
        let (lat, lon) = tile_to_lat_lon(&tile);
        assert!(lon <= bbox.xmax(), "{} starts east of the box", tile);
        assert!(lat >= bbox.ymin(), "{} starts south of the box", tile);
    }
}

// ----------------------------------------------------------------------------
// Property-based tests
// ----------------------------------------------------------------------------

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn bbox_strategy() -> impl Strategy<Value = BoundingBox> {
        (
            -180.0..179.0_f64,
            0.0001..1.0_f64,
            -85.0..84.0_f64,
            0.0001..1.0_f64,
        )
            .prop_map(|(x, dx, y, dy)| {
                BoundingBox::new(x, y, (x + dx).min(MAX_LON), (y + dy).min(MAX_LAT)).unwrap()
            })
    }

    proptest! {
        #[test]
        fn test_exact_tiles_inside_grid(
            bbox in bbox_strategy(),
            zoom in 0u8..=14
        ) {
            let enumerator = TileEnumerator::new(TileGrid::default());
            let tiles = enumerator.tiles(&bbox, ZoomRange::new(zoom, zoom).unwrap())?;
            let n = 1u64 << zoom;

            for tile in tiles {
                prop_assert!((tile.col as u64) < n, "col {} >= {} at zoom {}", tile.col, n, zoom);
                prop_assert!((tile.row as u64) < n, "row {} >= {} at zoom {}", tile.row, n, zoom);
            }
        }

        #[test]
        fn test_inclusive_tiles_at_most_one_past_grid(
            bbox in bbox_strategy(),
            zoom in 0u8..=14
        ) {
            let enumerator = TileEnumerator::new(TileGrid::default())
                .with_edge_clip(EdgeClip::Inclusive);
            let tiles = enumerator.tiles(&bbox, ZoomRange::new(zoom, zoom).unwrap())?;
            let n = 1u64 << zoom;

            for tile in tiles {
                prop_assert!((tile.col as u64) <= n);
                prop_assert!((tile.row as u64) <= n);
            }
        }

        #[test]
        fn test_no_duplicates_across_pyramid(
            bbox in bbox_strategy(),
            zoom in 0u8..=10
        ) {
            let grid = TileGrid::new(256, 12).unwrap();
            let enumerator = TileEnumerator::new(grid);
            let tiles = enumerator.tiles(&bbox, ZoomRange::from_zoom(zoom, &grid)?)?;

            let unique: HashSet<_> = tiles.iter().copied().collect();
            prop_assert_eq!(unique.len(), tiles.len());
        }

        #[test]
        fn test_count_matches_tiles(
            bbox in bbox_strategy(),
            zoom in 0u8..=12
        ) {
            let grid = TileGrid::new(256, 12).unwrap();
            let enumerator = TileEnumerator::new(grid);
            let zooms = ZoomRange::from_zoom(zoom, &grid)?;

            prop_assert_eq!(
                enumerator.count(&bbox, zooms)?,
                enumerator.tiles(&bbox, zooms)?.len()
            );
        }

        #[test]
        fn test_every_level_contributes(
            bbox in bbox_strategy(),
            zoom in 0u8..=12
        ) {
            // A valid box always touches at least one tile on each level.
            let enumerator = TileEnumerator::new(TileGrid::default());
            let tiles = enumerator.tiles(&bbox, ZoomRange::new(zoom, zoom).unwrap())?;
            prop_assert!(!tiles.is_empty());
        }

        #[test]
        fn test_longitude_monotonic(
            lat in -80.0..80.0_f64,
            lon1 in -180.0..-1.0_f64,
            lon2 in 0.0..180.0_f64,
            zoom in 0u8..=19
        ) {
            let projector = Projector::new(TileGrid::default());
            let a = projector.project_pixels(lon1, lat, zoom)?;
            let b = projector.project_pixels(lon2, lat, zoom)?;
            prop_assert!(a.x <= b.x);
        }

        #[test]
        fn test_latitude_monotonic(
            lon in -180.0..180.0_f64,
            lat1 in 0.0..85.0_f64,
            lat2 in -85.0..0.0_f64,
            zoom in 0u8..=19
        ) {
            // North is up: larger latitude means smaller pixel y.
            let projector = Projector::new(TileGrid::default());
            let north = projector.project_pixels(lon, lat1, zoom)?;
            let south = projector.project_pixels(lon, lat2, zoom)?;
            prop_assert!(north.y <= south.y);
        }
    }
}
