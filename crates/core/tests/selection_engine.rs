use geoselect_core::analysis::{AnalysisRequest, AnalysisSink};
use geoselect_core::projector::project_terrain;
use geoselect_core::scene::fixture::{NadirCamera, Viewport};
use geoselect_core::{
    Config, DeletedFeatureRegistry, FeatureId, FixtureScene, GeoPoint, Method, Mode, Operation, Outcome, PixelRect,
    PointerEvent, ScreenPoint, SceneEngine, SelectionEngine,
};
use proptest::prelude::*;

#[derive(Default)]
struct RecordingSink {
    submitted: Vec<(u64, AnalysisRequest)>,
    discarded: Vec<u64>,
}

impl AnalysisSink for RecordingSink {
    fn submit(&mut self, generation: u64, request: AnalysisRequest) {
        self.submitted.push((generation, request));
    }

    fn discard(&mut self, generation: u64) {
        self.discarded.push(generation);
    }
}

fn pt(x: f64, y: f64) -> ScreenPoint {
    ScreenPoint::new(x, y)
}

fn camera_over(center: GeoPoint) -> NadirCamera {
    NadirCamera {
        center,
        altitude_m: 3_000.0,
        viewport: Viewport { width: 800.0, height: 600.0 },
        fov_y_deg: 60.0,
    }
}

fn engine(scene: FixtureScene) -> SelectionEngine<FixtureScene, RecordingSink> {
    SelectionEngine::new(scene, RecordingSink::default(), Config::default()).unwrap()
}

fn drag(engine: &mut SelectionEngine<FixtureScene, RecordingSink>, from: ScreenPoint, to: ScreenPoint) -> Outcome {
    engine.handle_pointer(PointerEvent::Down(from));
    engine.handle_pointer(PointerEvent::Move(to));
    engine.handle_pointer(PointerEvent::Up(to))
}

#[test]
fn drag_over_terrain_commits_and_dispatches_once() {
    let mut engine = engine(FixtureScene::new(camera_over(GeoPoint::new(12.9716, 77.5946))));
    engine.enter_interactive();

    let Outcome::SelectionCommitted(rect) = drag(&mut engine, pt(100.0, 100.0), pt(300.0, 250.0)) else {
        panic!("drag over terrain should commit");
    };

    let session = engine.session();
    assert_eq!(session.active_selection(), Some(rect));
    assert_eq!(session.mode(), Mode::View);
    assert!(rect.min_lat() < rect.max_lat());
    assert!(rect.min_lon() < rect.max_lon());

    let submitted = &engine.analysis().submitted;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].1.bbox, rect);
    assert!(rect.contains(engine.scene().flights[0].target));
}

#[test]
fn depth_pick_miss_falls_back_to_ellipsoid() {
    let scene = FixtureScene::new(camera_over(GeoPoint::new(12.9716, 77.5946)))
        .with_depth_coverage(PixelRect::from_corners(pt(0.0, 0.0), pt(200.0, 200.0)));
    let mut engine = engine(scene);
    engine.enter_interactive();

    assert!(matches!(
        drag(&mut engine, pt(100.0, 100.0), pt(300.0, 250.0)),
        Outcome::SelectionCommitted(_)
    ));
}

#[test]
fn click_restore_takes_nearest_record() {
    let mut scene = FixtureScene::new(camera_over(GeoPoint::new(12.91, 77.51)))
        .with_feature(7, PixelRect::from_corners(pt(10.0, 10.0), pt(30.0, 30.0)));
    let mut registry = DeletedFeatureRegistry::new();
    registry.hide(&mut scene, FeatureId(7), GeoPoint::new(12.90, 77.50));

    let clicked = project_terrain(&scene, pt(400.0, 300.0)).unwrap();
    assert!((clicked.lat - 12.91).abs() < 1e-6);
    assert!((clicked.lon - 77.51).abs() < 1e-6);

    assert!(registry.restore_nearest(&mut scene, clicked));
    assert!(registry.is_empty());
    assert!(scene.is_feature_visible(FeatureId(7)));
}

#[test]
fn click_restore_through_engine() {
    let scene = FixtureScene::new(camera_over(GeoPoint::new(12.91, 77.51)))
        .with_feature(1, PixelRect::from_corners(pt(200.0, 480.0), pt(230.0, 500.0)))
        .with_feature(2, PixelRect::from_corners(pt(600.0, 100.0), pt(630.0, 120.0)));
    let mut engine = engine(scene);
    engine.enter_interactive();
    drag(&mut engine, pt(50.0, 50.0), pt(750.0, 550.0));

    assert!(engine.arm(Operation::Delete, Method::Click));
    assert_eq!(
        engine.handle_pointer(PointerEvent::Click(pt(215.0, 490.0))),
        Outcome::FeatureHidden(FeatureId(1))
    );
    assert_eq!(
        engine.handle_pointer(PointerEvent::Click(pt(615.0, 110.0))),
        Outcome::FeatureHidden(FeatureId(2))
    );

    assert!(engine.arm(Operation::Restore, Method::Click));
    // Closer to feature 1 (south-west) than to feature 2 (north-east).
    assert_eq!(
        engine.handle_pointer(PointerEvent::Click(pt(300.0, 400.0))),
        Outcome::FeatureRestored
    );
    assert!(engine.scene().is_feature_visible(FeatureId(1)));
    assert!(!engine.scene().is_feature_visible(FeatureId(2)));
    assert_eq!(engine.registry().len(), 1);
}

#[test]
fn area_delete_counts_each_feature_once() {
    let scene = FixtureScene::new(camera_over(GeoPoint::new(12.9716, 77.5946)))
        .with_feature(1, PixelRect::from_corners(pt(150.0, 150.0), pt(250.0, 250.0)));
    let mut engine = engine(scene);
    engine.enter_interactive();
    drag(&mut engine, pt(100.0, 100.0), pt(500.0, 400.0));

    assert!(engine.arm(Operation::Delete, Method::Area));
    let before = engine.registry().len();
    engine.handle_pointer(PointerEvent::Down(pt(160.0, 160.0)));
    let Outcome::AreaApplied(summary) = engine.handle_pointer(PointerEvent::Up(pt(240.0, 240.0))) else {
        panic!("expected an area pick");
    };

    assert_eq!(summary.samples, 25);
    assert_eq!(summary.affected, 1);
    assert_eq!(engine.registry().len(), before + 1);
}

#[test]
fn area_restore_after_area_delete() {
    let scene = FixtureScene::new(camera_over(GeoPoint::new(12.9716, 77.5946)))
        .with_feature(1, PixelRect::from_corners(pt(150.0, 150.0), pt(190.0, 190.0)))
        .with_feature(2, PixelRect::from_corners(pt(300.0, 150.0), pt(340.0, 190.0)));
    let mut engine = engine(scene);
    engine.enter_interactive();
    drag(&mut engine, pt(100.0, 100.0), pt(500.0, 400.0));

    engine.arm(Operation::Delete, Method::Area);
    engine.handle_pointer(PointerEvent::Down(pt(140.0, 140.0)));
    engine.handle_pointer(PointerEvent::Up(pt(360.0, 200.0)));
    assert_eq!(engine.scene().hidden_features(), vec![FeatureId(1), FeatureId(2)]);

    assert!(engine.arm(Operation::Restore, Method::Area));
    engine.handle_pointer(PointerEvent::Down(pt(140.0, 140.0)));
    engine.handle_pointer(PointerEvent::Up(pt(200.0, 200.0)));
    assert_eq!(engine.scene().hidden_features(), vec![FeatureId(2)]);
    assert_eq!(engine.registry().len(), 1);
}

#[test]
fn clearing_selection_discards_pending_analysis() {
    let mut engine = engine(FixtureScene::new(camera_over(GeoPoint::new(12.9716, 77.5946))));
    engine.enter_interactive();
    drag(&mut engine, pt(100.0, 100.0), pt(300.0, 250.0));
    engine.clear_selection();

    engine.enter_interactive();
    drag(&mut engine, pt(400.0, 300.0), pt(600.0, 500.0));

    let sink = engine.analysis();
    let generations: Vec<u64> = sink.submitted.iter().map(|(g, _)| *g).collect();
    assert_eq!(generations, vec![1, 3]);
    assert_eq!(sink.discarded, vec![2]);
}

proptest! {
    #[test]
    fn committed_rectangle_is_ordered(
        x0 in 0.0f64..800.0, y0 in 0.0f64..600.0,
        x1 in 0.0f64..800.0, y1 in 0.0f64..600.0,
    ) {
        let mut engine = engine(FixtureScene::new(camera_over(GeoPoint::new(-33.86, 151.21))));
        engine.enter_interactive();

        let outcome = drag(&mut engine, pt(x0, y0), pt(x1, y1));
        let Outcome::SelectionCommitted(rect) = outcome else {
            return Err(TestCaseError::fail(format!("no commit: {outcome:?}")));
        };
        prop_assert!(rect.min_lat() <= rect.max_lat());
        prop_assert!(rect.min_lon() <= rect.max_lon());
        prop_assert_eq!(engine.analysis().submitted.len(), 1);
    }
}

#[test]
fn demo_scene_delete_and_restore() {
    let scene = FixtureScene::from_json(include_str!("../../../demos/bengaluru_scene.json")).unwrap();
    let mut engine = engine(scene);
    engine.enter_interactive();
    assert!(matches!(
        drag(&mut engine, pt(100.0, 100.0), pt(500.0, 420.0)),
        Outcome::SelectionCommitted(_)
    ));

    engine.arm(Operation::Delete, Method::Click);
    assert_eq!(
        engine.handle_pointer(PointerEvent::Click(pt(440.0, 350.0))),
        Outcome::FeatureHidden(FeatureId(103))
    );
    // The status bar overlay is pickable but not a feature.
    assert_eq!(engine.handle_pointer(PointerEvent::Click(pt(400.0, 580.0))), Outcome::Miss);

    engine.arm(Operation::Delete, Method::Area);
    engine.handle_pointer(PointerEvent::Down(pt(140.0, 140.0)));
    let Outcome::AreaApplied(summary) = engine.handle_pointer(PointerEvent::Up(pt(300.0, 240.0))) else {
        panic!("expected an area pick");
    };
    assert_eq!(summary.affected, 2);
    assert_eq!(engine.registry().len(), 3);

    engine.arm(Operation::Restore, Method::Click);
    assert_eq!(
        engine.handle_pointer(PointerEvent::Click(pt(450.0, 360.0))),
        Outcome::FeatureRestored
    );
    assert_eq!(engine.scene().hidden_features(), vec![FeatureId(101), FeatureId(102)]);
}
