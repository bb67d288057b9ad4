//! Low rank stiffness correction fitting the low frequency spectrum of a coarse mesh to that of
//! a fine reference mesh.
//!
//! The lowest `m` modes of both meshes are computed from generalized eigenproblems
//! `S w = γ M w` on the constrained subspace. Pairing coarse mode `w_i` with a fine eigenvalue
//! `λ_i`, the correction
//!
//! ```verbatim
//! Δ = M W C Wᵗ M,    C = diag((λ_i / γ_i − 1) γ_i)
//! ```
//!
//! shifts each fitted coarse eigenvalue onto its fine counterpart while leaving the remaining
//! coarse modes untouched, since the coarse modes are mass orthonormal.

mod embedding;
mod modes;

pub use embedding::*;
pub use modes::*;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{info, warn};
use na::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::config::{BoundaryCondition, EigenFitParams};
use crate::fem::{min_vertices, Assembler, ExecutionPolicy, LowRankUpdate, Projection};
use crate::mesh::TetMesh;
use crate::objects::{LinearTetSystem, Material, PhysicalSystem};
use crate::Error;

/// Source of `EigenFit` ids. Zero is reserved for the empty correction.
static NEXT_FIT_ID: AtomicU64 = AtomicU64::new(1);

/// How coarse modes are matched with fine modes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModePairing {
    /// The i-th coarse mode is paired with the i-th fine mode.
    ByIndex,
    /// Each coarse mode is paired with the remaining fine mode of largest mass weighted modal
    /// assurance criterion, taken in order of increasing coarse eigenvalue.
    ByShape,
}

impl Default for ModePairing {
    fn default() -> Self {
        ModePairing::ByIndex
    }
}

/// Coarse reduced quantities the correction is fitted against.
#[derive(Copy, Clone, Debug)]
pub struct ReducedSystem<'a> {
    /// `PᵗMP`
    pub mass: &'a DMatrix<f64>,
    /// Physical stiffness `-PᵗKP`, positive semi-definite.
    pub stiffness: &'a DMatrix<f64>,
    pub projection: &'a Projection,
}

/// Summary of a single fit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitReport {
    pub generation: u64,
    pub coarse_eigenvalues: Vec<f64>,
    /// Fine eigenvalue paired with each coarse mode.
    pub fine_eigenvalues: Vec<f64>,
    pub ratios: Vec<f64>,
    /// Mass weighted modal assurance criterion of each pair, 1 for identical shapes.
    pub alignment: Vec<f64>,
    /// Number of modes left uncorrected because their coarse eigenvalue vanishes.
    pub rigid_modes: usize,
}

impl fmt::Display for FitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EigenFit generation {}:", self.generation)?;
        for i in 0..self.ratios.len() {
            writeln!(
                f,
                "  mode {}: coarse {:.6e} fine {:.6e} ratio {:.6} alignment {:.4}",
                i,
                self.coarse_eigenvalues[i],
                self.fine_eigenvalues[i],
                self.ratios[i],
                self.alignment[i]
            )?;
        }
        write!(f, "  rigid modes skipped: {}", self.rigid_modes)
    }
}

/// A fitted correction `Δ = U diag(c) Uᵗ` on the coarse reduced coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Correction {
    fit_id: u64,
    /// Mass weighted coarse modes `U = M W`.
    basis: DMatrix<f64>,
    coefficients: Vec<f64>,
    /// Mass orthonormal coarse modes `W`.
    modes: DMatrix<f64>,
    report: FitReport,
}

impl Correction {
    /// A correction that changes nothing.
    pub fn empty(dim: usize) -> Self {
        Correction {
            fit_id: 0,
            basis: DMatrix::zeros(dim, 0),
            coefficients: Vec::new(),
            modes: DMatrix::zeros(dim, 0),
            report: FitReport::default(),
        }
    }

    /// Counts the refits of the producing `EigenFit`. Zero before the first fit.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.report.generation
    }

    /// Unique to the `EigenFit` this correction was produced by. Together with `generation`
    /// it identifies the correction.
    #[inline]
    pub fn fit_id(&self) -> u64 {
        self.fit_id
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.basis.nrows()
    }

    /// Number of nonzero coefficients.
    pub fn rank(&self) -> usize {
        self.coefficients.iter().filter(|&&c| c != 0.0).count()
    }

    #[inline]
    pub fn basis(&self) -> &DMatrix<f64> {
        &self.basis
    }

    #[inline]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    #[inline]
    pub fn modes(&self) -> &DMatrix<f64> {
        &self.modes
    }

    #[inline]
    pub fn ratios(&self) -> &[f64] {
        &self.report.ratios
    }

    #[inline]
    pub fn report(&self) -> &FitReport {
        &self.report
    }

    /// `Δx`
    pub fn apply(&self, x: &DVector<f64>) -> Result<DVector<f64>, Error> {
        if x.len() != self.dim() {
            return Err(Error::SizeMismatch);
        }
        let c = DVector::from_column_slice(&self.coefficients);
        Ok(&self.basis * self.basis.tr_mul(x).component_mul(&c))
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut scaled = self.basis.clone();
        for (mut col, &c) in scaled.column_iter_mut().zip(self.coefficients.iter()) {
            col *= c;
        }
        scaled * self.basis.transpose()
    }

    /// The correction as a low rank update with zero coefficients dropped.
    pub fn low_rank_update(&self) -> Result<LowRankUpdate, Error> {
        LowRankUpdate::new(&self.basis, &self.coefficients)
    }
}

/// Fits and caches the stiffness correction of a coarse linear elastic mesh.
#[derive(Debug)]
pub struct EigenFit {
    id: u64,
    params: EigenFitParams,
    fine: LinearTetSystem,
    fine_projection: Projection,
    embedding: Embedding,
    coarse_num_dofs: usize,
    /// Fine modes on the fine reduced coordinates. The fine system is linear so they are
    /// computed once.
    fine_modes: Option<Modes>,
    assembler: Assembler,
    correction: Correction,
    generation: u64,
    stale: bool,
}

fn boundary_projection(mesh: &TetMesh, constraint: Option<BoundaryCondition>) -> Result<Projection, Error> {
    let n = 3 * mesh.num_vertices();
    match constraint {
        None => Ok(Projection::identity(n)),
        Some(bc) => {
            let vertices = min_vertices(mesh, bc.axis, bc.tolerance)?;
            Projection::new(n, vertices.iter().flat_map(|&v| 3 * v..3 * v + 3))
        }
    }
}

impl EigenFit {
    /// Prepare a fit of `coarse` against the reference mesh `fine` made of the same material.
    ///
    /// The boundary condition in `params` is applied to both meshes.
    pub fn new(
        coarse: &TetMesh,
        fine: TetMesh,
        material: &Material,
        params: EigenFitParams,
    ) -> Result<Self, Error> {
        params.validate()?;
        let embedding = Embedding::new(coarse, &fine, params.embedding_tolerance)?;
        let coarse_projection = boundary_projection(coarse, params.constraint)?;
        let fine_projection = boundary_projection(&fine, params.constraint)?;

        let available = coarse_projection
            .reduced_dim()
            .min(fine_projection.reduced_dim());
        if params.num_modes > available {
            return Err(Error::TooManyModes {
                requested: params.num_modes,
                available,
            });
        }

        let fine = LinearTetSystem::with_material(fine, material)?;
        Ok(EigenFit {
            id: NEXT_FIT_ID.fetch_add(1, Ordering::Relaxed),
            params,
            fine,
            fine_projection,
            embedding,
            coarse_num_dofs: 3 * coarse.num_vertices(),
            fine_modes: None,
            assembler: Assembler::new(ExecutionPolicy::default())?,
            correction: Correction::empty(coarse_projection.reduced_dim()),
            generation: 0,
            stale: true,
        })
    }

    #[inline]
    pub fn params(&self) -> &EigenFitParams {
        &self.params
    }

    #[inline]
    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    #[inline]
    pub fn fine_system(&self) -> &LinearTetSystem {
        &self.fine
    }

    #[inline]
    pub fn fine_projection(&self) -> &Projection {
        &self.fine_projection
    }

    /// The most recent correction, possibly stale.
    #[inline]
    pub fn correction(&self) -> &Correction {
        &self.correction
    }

    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Force a refit on the next call to `ensure_fit`.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Refit if the correction is stale.
    pub fn ensure_fit(&mut self, reduced: &ReducedSystem) -> Result<&Correction, Error> {
        if self.stale {
            self.refit(reduced)?;
        }
        Ok(&self.correction)
    }

    /// Correction to use for the next time step. Always refits when `recalculate` is set.
    pub fn correction_for_step(&mut self, reduced: &ReducedSystem) -> Result<&Correction, Error> {
        if self.params.recalculate {
            self.invalidate();
        }
        self.ensure_fit(reduced)
    }

    fn fine_modes(&mut self) -> Result<&Modes, Error> {
        if self.fine_modes.is_none() {
            let n = self.fine.num_dofs();
            let zero = vec![0.0; n];
            let assembled = self.assembler.assemble_system(&self.fine, &zero, &zero)?;
            let mass = self.fine_projection.restrict_dense(&assembled.mass)?;
            let stiffness = -self.fine_projection.restrict_dense(&assembled.stiffness)?;
            self.fine_modes = Some(generalized_eigen(&stiffness, &mass, self.params.num_modes)?);
        }
        self.fine_modes.as_ref().ok_or(Error::SingularMassMatrix)
    }

    /// Compute a new correction from the given coarse reduced system.
    pub fn refit(&mut self, reduced: &ReducedSystem) -> Result<&Correction, Error> {
        let projection = reduced.projection;
        let n = projection.reduced_dim();
        if projection.full_dim() != self.coarse_num_dofs
            || reduced.mass.shape() != (n, n)
            || reduced.stiffness.shape() != (n, n)
        {
            return Err(Error::SizeMismatch);
        }
        let num_modes = self.params.num_modes;
        if num_modes > n {
            return Err(Error::TooManyModes {
                requested: num_modes,
                available: n,
            });
        }

        let coarse = generalized_eigen(reduced.stiffness, reduced.mass, num_modes)?;
        let basis = reduced.mass * &coarse.vectors;

        // Fine modes expressed on the coarse reduced coordinates.
        let fine = self.fine_modes()?.clone();
        let mut mapped = DMatrix::zeros(n, num_modes);
        for (j, v) in fine.vectors.column_iter().enumerate() {
            let v: Vec<f64> = v.iter().cloned().collect();
            let full = self.fine_projection.prolong(&v)?;
            let coarse_full = self.embedding.interpolate(&full)?;
            let u = projection.restrict_vector(&coarse_full)?;
            mapped.set_column(j, &DVector::from_vec(u));
        }

        // Mass weighted modal assurance criterion between coarse mode i and mapped fine mode j.
        let overlap = basis.tr_mul(&mapped);
        let mapped_norms = (reduced.mass * &mapped).tr_mul(&mapped).diagonal();
        let mac = |i: usize, j: usize| {
            if mapped_norms[j] > 0.0 {
                overlap[(i, j)] * overlap[(i, j)] / mapped_norms[j]
            } else {
                0.0
            }
        };

        let pairs: Vec<usize> = match self.params.pairing {
            ModePairing::ByIndex => (0..num_modes).collect(),
            ModePairing::ByShape => {
                let mut used = vec![false; num_modes];
                let mut pairs = Vec::with_capacity(num_modes);
                for i in 0..num_modes {
                    let best = (0..num_modes)
                        .filter(|&j| !used[j])
                        .max_by(|&a, &b| {
                            mac(i, a)
                                .partial_cmp(&mac(i, b))
                                .unwrap_or(std::cmp::Ordering::Equal)
                        })
                        .unwrap_or(i);
                    used[best] = true;
                    pairs.push(best);
                }
                pairs
            }
        };

        self.generation += 1;
        let mut report = FitReport {
            generation: self.generation,
            ..FitReport::default()
        };
        let mut coefficients = Vec::with_capacity(num_modes);
        for (i, &j) in pairs.iter().enumerate() {
            let gamma = coarse.values[i];
            let lambda = fine.values[j];
            let ratio = if gamma < self.params.rigid_mode_tolerance {
                warn!(
                    "Skipping coarse mode {} with eigenvalue {:e} below the rigid mode tolerance",
                    i, gamma
                );
                report.rigid_modes += 1;
                1.0
            } else {
                lambda / gamma
            };
            coefficients.push((ratio - 1.0) * gamma);
            report.coarse_eigenvalues.push(gamma);
            report.fine_eigenvalues.push(lambda);
            report.ratios.push(ratio);
            report.alignment.push(mac(i, j));
        }

        info!("{}", report);

        self.correction = Correction {
            fit_id: self.id,
            basis,
            coefficients,
            modes: coarse.vectors,
            report,
        };
        self.stale = false;
        Ok(&self.correction)
    }
}
