mod test_utils;

use approx::*;
use eigenfit::*;
pub use test_utils::*;

/// One step of a free tetrahedron released from rest under gravity.
#[test]
fn gravity_step() -> Result<(), Error> {
    init_logger();
    let mut world = single_system_world(make_one_tet_mesh()?, &SOLID_MATERIAL, None)?;
    let mut stepper = TimeStepper::new(SEQUENTIAL_PARAMS, world.projection().clone())?;
    let result = stepper.step(&mut world, None)?;
    assert_eq!(result.path, SolvePath::Base);
    assert_relative_eq!(result.time, 0.01);

    assert!(world.q().iter().chain(world.q_dot().iter()).all(|x| x.is_finite()));

    // Velocity points along gravity.
    let g = na::Vector3::from(SOLID_MATERIAL.gravity).normalize();
    for v in world.q_dot().chunks(3) {
        let v = na::Vector3::new(v[0], v[1], v[2]);
        assert!(v.dot(&g) > 0.0);
    }

    // The tet falls without deforming.
    let y: Vec<f64> = world.q().chunks(3).map(|q| q[1]).collect();
    for &yi in &y[1..] {
        assert_relative_eq!(yi, y[0], max_relative = 1e-8);
    }
    Ok(())
}

/// A tet pinned at its base vertices sags and the energy stays bounded.
#[test]
fn pinned_tet_sags() -> Result<(), Error> {
    init_logger();
    let mut builder = WorldBuilder::new();
    let id = builder.add_system(Box::new(LinearTetSystem::with_material(
        make_one_tet_mesh()?,
        &SOLID_MATERIAL,
    )?));
    builder.fix_vertices(id, &[0, 1, 3])?;
    let mut world = builder.finalize()?;
    let mut stepper = TimeStepper::new(SEQUENTIAL_PARAMS, world.projection().clone())?;

    for _ in 0..10 {
        stepper.step(&mut world, None)?;
    }

    let fixed = world.constrained_dofs().to_vec();
    assert_eq!(fixed.len(), 9);
    for &i in &fixed {
        assert_eq!(world.q()[i], 0.0);
        assert_eq!(world.q_dot()[i], 0.0);
    }
    // Vertex 2 is the only free vertex and hangs below its rest position.
    let p = world.vertex_position(id, 2)?;
    assert!(p[1] < 1.0);
    assert!(world.energy()?.is_finite());
    Ok(())
}
