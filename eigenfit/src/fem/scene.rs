//! A ready to step simulation owning the world, the time stepper and the optional reduced model
//! correction.

use log::info;

use crate::config::SceneConfig;
use crate::fem::{StepResult, TimeStepper, World, WorldBuilder};
use crate::mesh::TetMesh;
use crate::objects::LinearTetSystem;
use crate::reduction::EigenFit;
use crate::Error;

/// Called with mutable access to the world before every step.
pub type PreStepCallback = Box<dyn FnMut(&mut World) + Send + 'static>;

pub struct Scene {
    world: World,
    stepper: TimeStepper,
    eigenfit: Option<EigenFit>,
    pre_step: Option<PreStepCallback>,
    steps: usize,
}

impl Scene {
    pub fn new(world: World, stepper: TimeStepper) -> Self {
        Scene {
            world,
            stepper,
            eigenfit: None,
            pre_step: None,
            steps: 0,
        }
    }

    pub fn with_eigenfit(mut self, eigenfit: EigenFit) -> Self {
        self.eigenfit = Some(eigenfit);
        self
    }

    /// Build the reference setup: a linear elastic coarse mesh fixed at its minimum along the
    /// configured axis and corrected by the fine mesh.
    pub fn from_meshes(coarse: TetMesh, fine: TetMesh, config: &SceneConfig) -> Result<Self, Error> {
        config.validate()?;
        let eigenfit = EigenFit::new(&coarse, fine, &config.material, config.eigenfit)?;

        let mut builder = WorldBuilder::new();
        let id = builder.add_system(Box::new(LinearTetSystem::with_material(
            coarse,
            &config.material,
        )?));
        if let Some(bc) = config.eigenfit.constraint {
            let count = builder.fix_displacement_min(id, bc.axis, bc.tolerance)?;
            info!("Fixed {} vertices along axis {}", count, bc.axis);
        }
        let world = builder.finalize()?;
        let stepper = TimeStepper::new(config.sim, world.projection().clone())?;
        Ok(Scene::new(world, stepper).with_eigenfit(eigenfit))
    }

    pub fn set_pre_step_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut World) + Send + 'static,
    {
        self.pre_step = Some(Box::new(callback));
    }

    pub fn clear_pre_step_callback(&mut self) {
        self.pre_step = None;
    }

    /// Run the pre-step callback and advance the simulation by one step.
    pub fn step(&mut self) -> Result<StepResult, Error> {
        if let Some(callback) = self.pre_step.as_mut() {
            callback(&mut self.world);
        }
        let result = self.stepper.step(&mut self.world, self.eigenfit.as_mut())?;
        self.steps += 1;
        Ok(result)
    }

    /// Current generalized coordinates for display.
    #[inline]
    pub fn q(&self) -> &[f64] {
        self.world.q()
    }

    #[inline]
    pub fn num_steps(&self) -> usize {
        self.steps
    }

    #[inline]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[inline]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[inline]
    pub fn stepper(&self) -> &TimeStepper {
        &self.stepper
    }

    #[inline]
    pub fn stepper_mut(&mut self) -> &mut TimeStepper {
        &mut self.stepper
    }

    #[inline]
    pub fn eigenfit(&self) -> Option<&EigenFit> {
        self.eigenfit.as_ref()
    }

    #[inline]
    pub fn eigenfit_mut(&mut self) -> Option<&mut EigenFit> {
        self.eigenfit.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimParams;
    use crate::fem::ExecutionPolicy;
    use crate::test_utils::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn callback_runs_before_each_step() -> Result<(), Error> {
        let mut builder = WorldBuilder::new();
        builder.add_system(Box::new(LinearTetSystem::with_material(
            make_one_tet_mesh()?,
            &SOLID_MATERIAL,
        )?));
        let world = builder.finalize()?;
        let params = SimParams {
            execution: ExecutionPolicy::Sequential,
            ..SimParams::default()
        };
        let stepper = TimeStepper::new(params, world.projection().clone())?;
        let mut scene = Scene::new(world, stepper);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        scene.set_pre_step_callback(move |world| {
            // Record the vertical velocity the step starts from, then cancel it.
            if let Ok(mut log) = log.lock() {
                log.push(world.q_dot()[1]);
            }
            for v in world.q_dot_mut() {
                *v = 0.0;
            }
        });

        for _ in 0..3 {
            scene.step()?;
        }
        assert_eq!(scene.num_steps(), 3);
        let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], 0.0);
        assert!(seen[1] < 0.0);
        // Velocity is reset each step so every step starts from the same speed.
        approx::assert_relative_eq!(seen[1], seen[2], epsilon = 1e-12);
        Ok(())
    }
}
