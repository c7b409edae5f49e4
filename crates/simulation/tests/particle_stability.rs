use glam::Vec3;
use simulation::{BlackHoleGeometry, Engine, EngineSettings, NullBackend, SimulationConfig, Surface};

#[test]
fn thousand_updates_stay_finite_and_outside_horizon() {
    let geometry = BlackHoleGeometry::new(1.0, 1.5, 6.0, 8.0).unwrap();
    let mut field = simulation::ParticleField::with_seed(100, geometry, 2024);
    for frame in 0..1000 {
        field.update(0.016, Vec3::ZERO);
        for (i, position) in field.positions().iter().enumerate() {
            assert!(position.is_finite(), "frame {frame} particle {i} position");
            assert!(field.velocities()[i].is_finite(), "frame {frame} particle {i} velocity");
            assert!(
                position.length() >= 1.0,
                "frame {frame} particle {i} inside horizon at {position:?}"
            );
        }
    }
    assert_eq!(field.len(), 100);
    for color in field.colors() {
        assert!(color.min_element() >= 0.0 && color.max_element() <= 1.0);
    }
}

#[test]
fn headless_engine_runs_a_thousand_ticks() {
    let settings = EngineSettings {
        seed: Some(7),
        star_count: 64,
        ..EngineSettings::default()
    };
    let config = SimulationConfig {
        particle_count: 100,
        ..SimulationConfig::default()
    };
    let mut engine = Engine::initialize(
        Some(Surface::new(NullBackend::new(), 1280, 720)),
        config,
        settings,
    )
    .unwrap();
    engine.start().unwrap();
    let camera = Vec3::new(0.0, 6.0, 20.0);
    for _ in 0..1000 {
        engine.tick(0.016, camera);
    }
    let stats = engine.stats();
    assert_eq!(stats.frames, 1000);
    assert_eq!(engine.backend().frames(), 1000);
    assert!((stats.performance.fps - 62.5).abs() < 0.1);
    assert!(!stats.performance.degraded);
    assert_eq!(stats.particle_count, 100);
    let summary = engine.field_summary().unwrap();
    assert!(summary.min_distance >= 1.0);
}
