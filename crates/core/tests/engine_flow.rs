use spiral_rhythm_core::{
    create_axis_rotation_context, rotate_point_around_axis_on_plane, AppConfig, CountsUpdate,
    ManualClock, Point2D, PulseRecorder, RhythmEngine, TierId,
};

fn drive(engine: &mut RhythmEngine<ManualClock, PulseRecorder>, clock: &ManualClock, steps: usize) {
    for _ in 0..steps {
        clock.advance(0.025);
        engine.tick();
    }
}

#[test]
fn live_session_survives_retuning() {
    let clock = ManualClock::new(12.0);
    let mut config = AppConfig::default();
    config.engine.tempo_bpm = 60.0;
    config.engine.muted[TierId::Div3] = true;
    let mut engine = RhythmEngine::from_config(clock.clone(), PulseRecorder::new(), &config);

    engine.start();
    drive(&mut engine, &clock, 40);

    let before = engine.elapsed();
    engine.set_tempo(144.0);
    engine.set_counts(CountsUpdate {
        div1: Some(5),
        div2: Some(0),
        div3: None,
    });
    assert!((engine.elapsed() - before).abs() < 1e-9);
    assert_eq!(engine.counts().div2, 1);

    drive(&mut engine, &clock, 80);
    engine.stop();
    let stopped_at = engine.elapsed();
    drive(&mut engine, &clock, 40);
    assert_eq!(engine.elapsed(), stopped_at);

    let pulses = engine.voices().pulses();
    assert!(pulses.iter().all(|p| p.tier != TierId::Div3));
    assert!(pulses.iter().all(|p| p.time >= 12.0));
    let base_gain = engine.gain(TierId::Base);
    assert!(pulses
        .iter()
        .filter(|p| p.tier == TierId::Base)
        .all(|p| p.gain == base_gain));

    for tier in TierId::ALL {
        let times: Vec<f64> = engine.voices().tier(tier).iter().map(|p| p.time).collect();
        assert!(times.windows(2).all(|w| w[1] > w[0]), "{tier} out of order");
    }
}

#[test]
fn pivot_is_fixed_for_every_copy() {
    let anchor = Point2D::new(-7.0, 2.5);
    let centers = [
        Point2D::new(0.0, 0.0),
        Point2D::new(-7.0, 9.0),
        Point2D::new(12.0, -3.0),
    ];
    for center in centers {
        let context = create_axis_rotation_context(Some(anchor), Some(center));
        for angle in [0.3, 1.0, 2.9, -1.7, 6.0] {
            let rotated = rotate_point_around_axis_on_plane(anchor, &context, angle);
            assert_eq!(rotated.position(), anchor);
            assert_eq!(rotated.height, 0.0);
        }
    }
}
