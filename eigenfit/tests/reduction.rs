mod test_utils;

use approx::*;
use eigenfit::*;
pub use test_utils::*;

fn fit_params(num_modes: usize) -> EigenFitParams {
    EigenFitParams {
        num_modes,
        ..EigenFitParams::default()
    }
}

/// The corrected column is softer, so gravity does more work on it during a step from rest.
#[test]
fn corrected_column_is_softer() -> Result<(), Error> {
    init_logger();
    let (coarse, fine) = make_nested_box_meshes([1, 1, 2], [0.5, 0.5, 1.0], 2)?;
    let params = fit_params(4);
    let bc = params.constraint;

    let mut plain = single_system_world(coarse.clone(), &SOLID_MATERIAL, bc)?;
    let mut corrected = single_system_world(coarse.clone(), &SOLID_MATERIAL, bc)?;
    let mut fit = EigenFit::new(&coarse, fine, &SOLID_MATERIAL, params)?;

    // At rest the force is gravity alone.
    let gravity = Assembler::new(ExecutionPolicy::Sequential)?
        .assemble(&plain)?
        .force;
    let work = |world: &World| -> f64 {
        world.q().iter().zip(gravity.iter()).map(|(q, f)| q * f).sum()
    };

    let mut plain_stepper = TimeStepper::new(SEQUENTIAL_PARAMS, plain.projection().clone())?;
    let mut corrected_stepper =
        TimeStepper::new(SEQUENTIAL_PARAMS, corrected.projection().clone())?;
    plain_stepper.step(&mut plain, None)?;
    let result = corrected_stepper.step(&mut corrected, Some(&mut fit))?;
    assert_eq!(result.correction_generation, Some(1));
    assert!(matches!(result.path, SolvePath::Woodbury { .. }));

    assert!(work(&plain) > 0.0);
    assert!(work(&corrected) > work(&plain));
    assert!(corrected.q().iter().all(|x| x.is_finite()));

    let report = fit.correction().report();
    assert_eq!(report.ratios.len(), 4);
    for &r in report.ratios.iter() {
        assert!(r > 0.0 && r <= 1.0 + 1e-9);
    }
    Ok(())
}

/// Refitting with unchanged inputs reproduces the same correction.
#[test]
fn recalculate_is_idempotent() -> Result<(), Error> {
    init_logger();
    let (coarse, fine) = make_nested_box_meshes([1, 1, 2], [0.5, 0.5, 1.0], 2)?;
    let params = EigenFitParams {
        recalculate: true,
        ..fit_params(3)
    };
    let mut world = single_system_world(coarse.clone(), &SOLID_MATERIAL, params.constraint)?;
    let mut fit = EigenFit::new(&coarse, fine, &SOLID_MATERIAL, params)?;
    let mut stepper = TimeStepper::new(SEQUENTIAL_PARAMS, world.projection().clone())?;

    let mut corrections = Vec::new();
    for step in 0..3 {
        let result = stepper.step(&mut world, Some(&mut fit))?;
        assert_eq!(result.correction_generation, Some(step + 1));
        corrections.push(fit.correction().clone());
    }
    for c in corrections[1..].iter() {
        assert_relative_eq!(c.to_dense(), corrections[0].to_dense(), epsilon = 1e-9);
        assert_eq!(c.ratios(), corrections[0].ratios());
    }
    Ok(())
}

#[test]
fn coarse_outside_fine_is_rejected() -> Result<(), Error> {
    let coarse = make_box_mesh([1, 1, 1], [1.0, 1.0, 1.0])?;
    let fine = make_box_mesh([2, 2, 2], [1.0, 1.0, 0.9])?;
    assert!(matches!(
        EigenFit::new(&coarse, fine, &SOLID_MATERIAL, fit_params(2)),
        Err(Error::GeometryMismatch { .. })
    ));
    Ok(())
}

#[test]
fn mode_budget_is_checked() -> Result<(), Error> {
    let (coarse, fine) = make_nested_box_meshes([1, 1, 1], [1.0, 1.0, 1.0], 2)?;
    assert!(matches!(
        EigenFit::new(&coarse, fine, &SOLID_MATERIAL, fit_params(100)),
        Err(Error::TooManyModes { requested: 100, .. })
    ));
    Ok(())
}
