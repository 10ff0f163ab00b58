//! End-to-end measurement loop scenarios with injected frames, regions and keys.

use facegauge::{
    open_display, DisplayMode, EndReason, Frame, HeadlessDisplay, MeasurementLoop,
    MeasurementSettings, OverlayItem, Region, ScriptedSource, SourceConfig, StepOutcome,
    StubDetector, SyntheticSource, CALIBRATE_PROMPT,
};

fn labels(display: &HeadlessDisplay) -> Vec<String> {
    display
        .last_overlay()
        .iter()
        .filter_map(OverlayItem::text)
        .map(str::to_string)
        .collect()
}

fn face(width: i32) -> Region {
    Region::new(40, 60, width, width)
}

#[test]
fn calibrate_then_measure_closer_and_farther() {
    let frames = (1..=4).map(|seq| Frame::filled(320, 240, [20, 20, 20], seq));
    let mut session = MeasurementLoop::new(
        ScriptedSource::new(frames),
        StubDetector::scripted(vec![
            vec![face(140)],
            vec![face(140)],
            vec![face(70)],
            vec![face(280)],
        ]),
        HeadlessDisplay::from_script(".c.."),
        MeasurementSettings::default(),
    );

    assert!(matches!(session.step().unwrap(), StepOutcome::Continue));
    assert!(labels(session.display()).contains(&CALIBRATE_PROMPT.to_string()));

    session.step().unwrap();
    assert_eq!(session.calibration().focal_length(), Some(500.0));

    session.step().unwrap();
    assert!(labels(session.display()).contains(&"Distance: 100.00 cm".to_string()));

    session.step().unwrap();
    assert!(labels(session.display()).contains(&"Distance: 25.00 cm".to_string()));

    assert!(matches!(
        session.step().unwrap(),
        StepOutcome::SourceEnded(_)
    ));
}

#[test]
fn prompt_shown_on_every_face_until_calibrated() {
    let mut session = MeasurementLoop::new(
        ScriptedSource::blank(3, 64, 48),
        StubDetector::scripted(vec![
            vec![face(80), face(120)],
            vec![face(60)],
            vec![face(90), face(100), face(110)],
        ]),
        HeadlessDisplay::new(),
        MeasurementSettings::default(),
    );

    for expected in [2, 1, 3] {
        session.step().unwrap();
        let shown = labels(session.display());
        assert_eq!(
            shown.iter().filter(|l| l.as_str() == CALIBRATE_PROMPT).count(),
            expected
        );
        assert!(shown.iter().all(|l| !l.starts_with("Distance")));
    }
}

#[test]
fn quit_wins_over_pending_frames() {
    let report = MeasurementLoop::new(
        ScriptedSource::blank(10, 64, 48),
        StubDetector::scripted(vec![vec![face(100)]; 10]),
        HeadlessDisplay::from_script("..q"),
        MeasurementSettings::default(),
    )
    .run()
    .unwrap();

    assert_eq!(report.end, EndReason::Quit);
    assert_eq!(report.stats.frames, 3);
    assert_eq!(report.focal_length, None);
}

#[test]
fn synthetic_session_calibrates_from_the_bright_patch() {
    let source = SyntheticSource::new(SourceConfig {
        uri: "stub://e2e".to_string(),
        width: 320,
        height: 240,
        frames: 61,
    });
    let mut keys = String::from("c");
    keys.push_str(&".".repeat(60));

    let report = MeasurementLoop::new(
        source,
        StubDetector::threshold(),
        HeadlessDisplay::from_script(&keys),
        MeasurementSettings::default(),
    )
    .run()
    .unwrap();

    assert_eq!(report.end, EndReason::SourceEnded);
    assert_eq!(report.stats.frames, 61);
    assert_eq!(report.stats.calibrations, 1);
    // First synthetic face plateau is 56 px wide: 56 * 50 / 14.
    assert_eq!(report.focal_length, Some(200.0));
}

#[test]
fn key_script_drives_an_opened_headless_display() {
    let display = open_display(DisplayMode::Headless, "facegauge", Some("..c.q")).unwrap();
    let report = MeasurementLoop::new(
        ScriptedSource::blank(10, 64, 48),
        StubDetector::scripted(vec![vec![face(100)], vec![face(100)], vec![face(140)]]),
        display,
        MeasurementSettings::default(),
    )
    .run()
    .unwrap();

    assert_eq!(report.end, EndReason::Quit);
    assert_eq!(report.stats.frames, 5);
    assert_eq!(report.stats.faces, 3);
    assert_eq!(report.stats.calibrations, 1);
    assert_eq!(report.focal_length, Some(500.0));
}
