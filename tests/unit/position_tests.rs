// Position resolution unit tests

use markit::watermark::{
    calculate_position, calculate_tiled_positions, Adjustment, CanvasDimensions,
    PlacementPosition, PositionResolver, WatermarkDimensions, WatermarkPosition,
};
use rstest::rstest;

#[rstest]
#[case(WatermarkPosition::TopLeft, 0.0, 0.0)]
#[case(WatermarkPosition::TopCenter, 450.0, 0.0)]
#[case(WatermarkPosition::TopRight, 900.0, 0.0)]
#[case(WatermarkPosition::CenterLeft, 0.0, 475.0)]
#[case(WatermarkPosition::Center, 450.0, 475.0)]
#[case(WatermarkPosition::CenterRight, 900.0, 475.0)]
#[case(WatermarkPosition::BottomLeft, 0.0, 950.0)]
#[case(WatermarkPosition::BottomCenter, 450.0, 950.0)]
#[case(WatermarkPosition::BottomRight, 900.0, 950.0)]
fn test_grid_anchors(#[case] position: WatermarkPosition, #[case] x: f32, #[case] y: f32) {
    let canvas = CanvasDimensions::new(1000.0, 1000.0);
    let watermark = WatermarkDimensions::new(100.0, 50.0);
    assert_eq!(
        calculate_position(position, &canvas, &watermark, Adjustment::default()),
        PlacementPosition::new(x, y)
    );
}

#[test]
fn test_top_right_with_adjustment() {
    let canvas = CanvasDimensions::new(1000.0, 1000.0);
    let watermark = WatermarkDimensions::new(100.0, 50.0);
    assert_eq!(
        calculate_position(
            WatermarkPosition::TopRight,
            &canvas,
            &watermark,
            Adjustment::new(-10, 5)
        ),
        PlacementPosition::new(890.0, 5.0)
    );
}

#[test]
fn test_tiles_are_restartable_and_cover_canvas() {
    let canvas = CanvasDimensions::new(100.0, 100.0);
    let watermark = WatermarkDimensions::new(20.0, 20.0);
    let tiles = calculate_tiled_positions(&canvas, &watermark, Adjustment::default(), 5, 5);

    let first: Vec<_> = tiles.clone().collect();
    let second: Vec<_> = tiles.collect();
    assert_eq!(first, second);
    assert_eq!(first[0], PlacementPosition::new(0.0, 0.0));
    assert!(first.contains(&PlacementPosition::new(25.0, 25.0)));
    assert!(first.iter().all(|p| p.x < 100.0 && p.y < 100.0));
}

#[test]
fn test_resolver_single_vs_tiled() {
    let resolver = PositionResolver::new(CanvasDimensions::new(200.0, 100.0));
    let watermark = WatermarkDimensions::new(50.0, 50.0);

    let single: Vec<_> = resolver
        .resolve(WatermarkPosition::Center, Adjustment::default(), 10, 10, &watermark)
        .collect();
    assert_eq!(single, vec![PlacementPosition::new(75.0, 25.0)]);

    let tiled = resolver
        .resolve(WatermarkPosition::Tiled, Adjustment::default(), 0, 0, &watermark)
        .count();
    assert_eq!(tiled, 8);
}
