use serde::{Deserialize, Serialize};

use crate::energy_models::DEFAULT_GRAVITY;

/// Material parameters shared by all elements of a simulated solid.
///
/// Parameters are not validated. In particular a Poisson's ratio of `0.5` or more produces a
/// singular or indefinite elasticity tensor.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Young's modulus. Measured in Pa = N/m² = kg/(ms²).
    pub youngs_modulus: f64,
    /// Poisson's ratio. Dimensionless, expected in `[0, 0.5)`.
    pub poisson_ratio: f64,
    /// Density in kg/m³. Used both for inertia and for the gravitational body force.
    pub density: f64,
    /// Gravitational acceleration in m/s².
    pub gravity: [f64; 3],
}

impl Default for Material {
    fn default() -> Self {
        Material {
            youngs_modulus: 2e5,
            poisson_ratio: 0.45,
            density: 1000.0,
            gravity: DEFAULT_GRAVITY,
        }
    }
}

impl Material {
    pub fn with_elasticity(mut self, youngs_modulus: f64, poisson_ratio: f64) -> Material {
        self.youngs_modulus = youngs_modulus;
        self.poisson_ratio = poisson_ratio;
        self
    }
    pub fn with_density(mut self, density: f64) -> Material {
        self.density = density;
        self
    }
    pub fn with_gravity(mut self, gravity: [f64; 3]) -> Material {
        self.gravity = gravity;
        self
    }

    /// Lamé parameters `(λ, μ)` corresponding to the Young's modulus and Poisson's ratio.
    pub fn lame_parameters(&self) -> (f64, f64) {
        let e = self.youngs_modulus;
        let nu = self.poisson_ratio;
        let lambda = e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu));
        let mu = e / (2.0 * (1.0 + nu));
        (lambda, mu)
    }
}
