mod test_utils;

use eigenfit::*;
pub use test_utils::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const CONFIG: &str = "(
    sim: (time_step: 0.01, execution: Parallel(num_workers: 2)),
    eigenfit: (
        num_modes: 3,
        constraint: Some((axis: 2, tolerance: 0.2)),
    ),
    material: (youngs_modulus: 2e5, poisson_ratio: 0.45, density: 1000.0),
)";

#[test]
fn scene_from_config() -> Result<(), Error> {
    init_logger();
    let config = SceneConfig::from_ron_str(CONFIG)?;
    let (coarse, fine) = make_nested_box_meshes([1, 1, 2], [0.5, 0.5, 1.0], 2)?;
    let mut scene = Scene::from_meshes(coarse, fine, &config)?;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    scene.set_pre_step_callback(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    for i in 0..3 {
        let result = scene.step()?;
        assert_eq!(calls.load(Ordering::SeqCst), i + 1);
        assert!(matches!(result.path, SolvePath::Woodbury { .. }));
    }

    let fit = scene.eigenfit().map(|f| f.correction().generation());
    assert_eq!(fit, Some(1));
    assert_eq!(scene.q().len(), 3 * 12);
    assert!(scene.q().iter().any(|&q| q != 0.0));
    assert!(scene.q().iter().all(|q| q.is_finite()));
    Ok(())
}

/// A callback can impose an initial velocity that the step then integrates.
#[test]
fn callback_sees_and_modifies_state() -> Result<(), Error> {
    init_logger();
    let config = SceneConfig {
        sim: SEQUENTIAL_PARAMS,
        material: SOLID_MATERIAL.with_gravity([0.0; 3]),
        ..SceneConfig::default()
    };
    let (coarse, fine) = make_nested_box_meshes([1, 1, 2], [0.5, 0.5, 1.0], 2)?;
    let mut scene = Scene::from_meshes(coarse, fine, &config)?;
    let fixed: Vec<usize> = scene.world().constrained_dofs().to_vec();

    scene.set_pre_step_callback(move |world| {
        let n = world.q_dot().len();
        let mut kick = vec![0.0; n];
        for i in (0..n).step_by(3) {
            if !fixed.contains(&i) {
                kick[i] = 0.1;
            }
        }
        let q = world.q().to_vec();
        let _ = world.set_state(q, kick);
    });
    scene.step()?;
    scene.clear_pre_step_callback();
    scene.step()?;

    // The kick pushes free vertices along +x.
    let dx: f64 = scene.q().chunks(3).map(|q| q[0]).sum();
    assert!(dx > 0.0);
    Ok(())
}
