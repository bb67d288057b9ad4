//! Linearly implicit backward Euler stepping of the constrained system.
//!
//! With reduced mass `M`, stiffness `S` and correction `Δ`, each step solves
//!
//! ```verbatim
//! (M + dt²(S + Δ)) v₁ = M v₀ + dt (f − Δ q₀)
//! q₁ = q₀ + dt P v₁
//! ```
//!
//! The base matrix `A = M + dt²S` is factorized once and the correction is applied with the
//! Woodbury identity, so a refit only costs a few solves against the cached factorization.

use log::debug;
use na::{DMatrix, DVector};

use crate::config::SimParams;
use crate::fem::linsolve::{BaseFactorization, WoodburySolver};
use crate::fem::{Assembler, Projection, World};
use crate::reduction::{Correction, EigenFit, ReducedSystem};
use crate::Error;

/// Which linear solve produced the velocity update.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolvePath {
    /// No correction was applied.
    Base,
    Woodbury { rank: usize },
    /// The corrected matrix was factorized directly.
    Direct { rank: usize },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepResult {
    /// Simulated time at the end of the step.
    pub time: f64,
    pub path: SolvePath,
    /// Whether the base matrix was factorized during this step.
    pub refactorized: bool,
    pub correction_generation: Option<u64>,
}

struct CachedBase {
    time_step: f64,
    dim: usize,
    factorization: BaseFactorization,
}

enum CorrectionSolver {
    Woodbury(WoodburySolver),
    Direct(BaseFactorization),
}

struct CachedCorrection {
    fit_id: u64,
    generation: u64,
    dim: usize,
    solver: CorrectionSolver,
}

pub struct TimeStepper {
    params: SimParams,
    projection: Projection,
    assembler: Assembler,
    base: Option<CachedBase>,
    correction: Option<CachedCorrection>,
    time: f64,
}

impl TimeStepper {
    /// Create a stepper for worlds constrained by `projection`. Assembly follows
    /// `params.execution`.
    pub fn new(params: SimParams, projection: Projection) -> Result<Self, Error> {
        params.validate()?;
        Ok(TimeStepper {
            assembler: Assembler::new(params.execution)?,
            params,
            projection,
            base: None,
            correction: None,
            time: 0.0,
        })
    }

    #[inline]
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    #[inline]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time_step(&mut self, time_step: f64) -> Result<(), Error> {
        let params = SimParams {
            time_step,
            ..self.params
        };
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Drop the cached factorizations. Needed when the base system changes, for instance after
    /// a material update.
    pub fn invalidate_factorization(&mut self) {
        self.base = None;
        self.correction = None;
    }

    /// Advance the world by one time step.
    ///
    /// On error the world state is left untouched.
    pub fn step(
        &mut self,
        world: &mut World,
        eigenfit: Option<&mut EigenFit>,
    ) -> Result<StepResult, Error> {
        let dt = self.params.time_step;
        if self.projection.full_dim() != world.dof_map().total_dof_count() {
            return Err(Error::SizeMismatch);
        }

        let assembled = self.assembler.assemble(world)?;
        let mass = self.projection.restrict_dense(&assembled.mass)?;
        let stiffness = -self.projection.restrict_dense(&assembled.stiffness)?;
        let mut force = DVector::from_vec(self.projection.restrict_vector(&assembled.force)?);
        let q = DVector::from_vec(self.projection.restrict_vector(world.q())?);
        let v0 = DVector::from_vec(self.projection.restrict_vector(world.q_dot())?);

        let correction = match eigenfit {
            Some(fit) => Some(fit.correction_for_step(&ReducedSystem {
                mass: &mass,
                stiffness: &stiffness,
                projection: &self.projection,
            })?),
            None => None,
        };
        if let Some(correction) = correction {
            force -= correction.apply(&q)?;
        }
        let rhs = &mass * &v0 + force * dt;

        let refactorized = self
            .base
            .as_ref()
            .map_or(true, |b| b.time_step != dt || b.dim != mass.nrows());
        let base = update_base(&mut self.base, &mut self.correction, dt, &mass, &stiffness)?;

        let (v1, path) = match correction.filter(|c| c.rank() > 0) {
            None => (base.solve(&rhs), SolvePath::Base),
            Some(correction) => {
                let rank = correction.rank();
                let direct = self.params.direct_solve_rank.map_or(false, |r| rank >= r);
                match update_correction(
                    &mut self.correction,
                    base,
                    correction,
                    direct,
                    dt,
                    &mass,
                    &stiffness,
                )? {
                    CorrectionSolver::Woodbury(solver) => {
                        (solver.solve(base, &rhs)?, SolvePath::Woodbury { rank })
                    }
                    CorrectionSolver::Direct(factorization) => {
                        (factorization.solve(&rhs), SolvePath::Direct { rank })
                    }
                }
            }
        };

        let v1 = self.projection.prolong(v1.as_slice())?;
        debug!(
            "Step at t = {}: {:?}, refactorized: {}",
            self.time, path, refactorized
        );

        for (q, &v) in world.q_mut().iter_mut().zip(v1.iter()) {
            *q += dt * v;
        }
        world.q_dot_mut().copy_from_slice(&v1);
        self.time += dt;

        Ok(StepResult {
            time: self.time,
            path,
            refactorized,
            correction_generation: correction.map(|c| c.generation()),
        })
    }
}

fn update_base<'a>(
    cache: &'a mut Option<CachedBase>,
    correction: &mut Option<CachedCorrection>,
    dt: f64,
    mass: &DMatrix<f64>,
    stiffness: &DMatrix<f64>,
) -> Result<&'a BaseFactorization, Error> {
    let n = mass.nrows();
    let base = match cache.take() {
        Some(cached) if cached.time_step == dt && cached.dim == n => cached,
        _ => {
            *correction = None;
            CachedBase {
                time_step: dt,
                dim: n,
                factorization: BaseFactorization::new(mass + stiffness * (dt * dt))?,
            }
        }
    };
    Ok(&cache.insert(base).factorization)
}

fn update_correction<'a>(
    cache: &'a mut Option<CachedCorrection>,
    base: &BaseFactorization,
    correction: &Correction,
    direct: bool,
    dt: f64,
    mass: &DMatrix<f64>,
    stiffness: &DMatrix<f64>,
) -> Result<&'a CorrectionSolver, Error> {
    let fit_id = correction.fit_id();
    let generation = correction.generation();
    let n = mass.nrows();
    let cached = match cache.take() {
        Some(cached)
            if cached.fit_id == fit_id
                && cached.generation == generation
                && cached.dim == n
                && matches!(cached.solver, CorrectionSolver::Direct(_)) == direct =>
        {
            cached
        }
        _ => {
            let solver = if direct {
                let corrected = mass + (stiffness + correction.to_dense()) * (dt * dt);
                CorrectionSolver::Direct(BaseFactorization::new(corrected)?)
            } else {
                let update = correction.low_rank_update()?.scaled(dt * dt);
                CorrectionSolver::Woodbury(WoodburySolver::new(base, &update)?)
            };
            CachedCorrection {
                fit_id,
                generation,
                dim: n,
                solver,
            }
        }
    };
    Ok(&cache.insert(cached).solver)
}
