mod test_utils;

use eigenfit::*;
pub use test_utils::*;

/// Fixing the minimum z layer of a column removes its degrees of freedom from the system.
#[test]
fn min_z_boundary_layer() -> Result<(), Error> {
    init_logger();
    let mesh = make_box_mesh([1, 1, 4], [0.5, 0.5, 2.0])?;
    let n = 3 * mesh.num_vertices();
    let world = single_system_world(
        mesh,
        &SOLID_MATERIAL,
        Some(BoundaryCondition {
            axis: 2,
            tolerance: 2e-1,
        }),
    )?;

    let fixed = world.constrained_dofs();
    assert!(!fixed.is_empty());
    assert_eq!(fixed.len(), 3 * 4);

    let assembled = Assembler::new(ExecutionPolicy::Sequential)?.assemble(&world)?;
    let projection = world.projection();
    let reduced = projection.restrict_matrix(&assembled.stiffness)?;
    assert_eq!(reduced.rows(), reduced.cols());
    assert!(reduced.rows() < n);
    assert_eq!(reduced.rows(), n - fixed.len());

    // The constrained stiffness is definite once rigid motions are removed.
    let dense = -projection.restrict_dense(&assembled.stiffness)?;
    assert!(na::Cholesky::new(dense).is_some());
    Ok(())
}

#[test]
fn constraint_axis_out_of_range() -> Result<(), Error> {
    let mut builder = WorldBuilder::new();
    let id = builder.add_system(Box::new(LinearTetSystem::with_material(
        make_one_tet_mesh()?,
        &SOLID_MATERIAL,
    )?));
    assert!(matches!(
        builder.fix_displacement_min(id, 3, 0.2),
        Err(Error::InvalidParameter { .. })
    ));
    Ok(())
}
