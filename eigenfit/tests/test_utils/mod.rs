use eigenfit::*;
pub use eigenfit::test_utils::*;

pub fn init_logger() {
    let _ = env_logger::Builder::from_env("EIGENFIT_LOG")
        .is_test(true)
        .try_init();
}

/// Sequential parameters so that tests don't compete for threads.
#[allow(dead_code)]
pub const SEQUENTIAL_PARAMS: SimParams = SimParams {
    time_step: 0.01,
    execution: ExecutionPolicy::Sequential,
    direct_solve_rank: None,
};

/// A world with a single linear elastic system built from `mesh`.
#[allow(dead_code)]
pub fn single_system_world(
    mesh: TetMesh,
    material: &Material,
    constraint: Option<BoundaryCondition>,
) -> Result<World, Error> {
    let mut builder = WorldBuilder::new();
    let id = builder.add_system(Box::new(LinearTetSystem::with_material(mesh, material)?));
    if let Some(bc) = constraint {
        builder.fix_displacement_min(id, bc.axis, bc.tolerance)?;
    }
    builder.finalize()
}
