//! Simulation and fitting parameters.
//!
//! All parameter structs are `serde` serializable so that a whole scene configuration can be
//! loaded from RON text.

use serde::{Deserialize, Serialize};

use crate::fem::ExecutionPolicy;
use crate::objects::Material;
use crate::reduction::ModePairing;
use crate::Error;

/// Time stepping parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub time_step: f64,
    /// How global assembly is distributed across threads.
    pub execution: ExecutionPolicy,
    /// Factorize the corrected system matrix directly once the correction has at least this
    /// many nonzero coefficients. Woodbury updates are always used when this is `None`.
    pub direct_solve_rank: Option<usize>,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            time_step: 0.01,
            execution: ExecutionPolicy::default(),
            direct_solve_rank: None,
        }
    }
}

impl SimParams {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.time_step > 0.0 && self.time_step.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "time_step".to_string(),
            });
        }
        Ok(())
    }
}

/// Vertices whose rest coordinate along `axis` lies within `tolerance` of the minimum are
/// fixed.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryCondition {
    pub axis: usize,
    pub tolerance: f64,
}

impl Default for BoundaryCondition {
    fn default() -> Self {
        BoundaryCondition {
            axis: 2,
            tolerance: 0.2,
        }
    }
}

/// Parameters of the reduced model correction.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EigenFitParams {
    /// Number of low frequency modes to fit.
    pub num_modes: usize,
    /// Refit the correction before every step.
    pub recalculate: bool,
    /// Boundary condition applied to both meshes. `None` leaves them unconstrained.
    pub constraint: Option<BoundaryCondition>,
    pub pairing: ModePairing,
    /// Coarse eigenvalues below this value are treated as rigid modes and left uncorrected.
    pub rigid_mode_tolerance: f64,
    /// Barycentric slack allowed when locating coarse vertices in fine elements.
    pub embedding_tolerance: f64,
}

impl Default for EigenFitParams {
    fn default() -> Self {
        EigenFitParams {
            num_modes: 5,
            recalculate: false,
            constraint: Some(BoundaryCondition::default()),
            pairing: ModePairing::default(),
            rigid_mode_tolerance: 1e-8,
            embedding_tolerance: 1e-8,
        }
    }
}

impl EigenFitParams {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(bc) = self.constraint {
            if bc.axis > 2 {
                return Err(Error::InvalidParameter {
                    name: "constraint.axis".to_string(),
                });
            }
            if bc.tolerance < 0.0 {
                return Err(Error::InvalidParameter {
                    name: "constraint.tolerance".to_string(),
                });
            }
        }
        if self.rigid_mode_tolerance < 0.0 {
            return Err(Error::InvalidParameter {
                name: "rigid_mode_tolerance".to_string(),
            });
        }
        if self.embedding_tolerance < 0.0 {
            return Err(Error::InvalidParameter {
                name: "embedding_tolerance".to_string(),
            });
        }
        Ok(())
    }
}

/// Everything needed to set up a coarse simulation corrected by a fine reference mesh.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub sim: SimParams,
    pub eigenfit: EigenFitParams,
    pub material: Material,
}

impl SceneConfig {
    /// Parse a configuration from RON text. Missing fields take their default values.
    pub fn from_ron_str(s: &str) -> Result<Self, Error> {
        let config: SceneConfig = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.sim.validate()?;
        self.eigenfit.validate()
    }
}
