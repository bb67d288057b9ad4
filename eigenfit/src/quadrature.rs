//! Quadrature rules over the reference tetrahedron expressed in barycentric coordinates.

/// A single quadrature point. The weight is a fraction of the element volume.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QuadraturePoint {
    pub barycentric: [f64; 4],
    pub weight: f64,
}

const A: f64 = 0.585_410_196_624_968_5; // (5 + 3√5) / 20
const B: f64 = 0.138_196_601_125_010_5; // (5 - √5) / 20

/// Four point rule, exact for polynomials of degree two. This integrates the consistent mass
/// matrix of a linear tetrahedron exactly.
pub const TET_QUADRATURE_4: [QuadraturePoint; 4] = [
    QuadraturePoint {
        barycentric: [A, B, B, B],
        weight: 0.25,
    },
    QuadraturePoint {
        barycentric: [B, A, B, B],
        weight: 0.25,
    },
    QuadraturePoint {
        barycentric: [B, B, A, B],
        weight: 0.25,
    },
    QuadraturePoint {
        barycentric: [B, B, B, A],
        weight: 0.25,
    },
];

/// Single point rule at the centroid, exact for linear polynomials.
pub const TET_QUADRATURE_1: [QuadraturePoint; 1] = [QuadraturePoint {
    barycentric: [0.25; 4],
    weight: 1.0,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Integrate the monomial `λ_0 λ_1` over the unit volume tet. The exact value is
    /// `1! 1! 3! / 5! = 1/20`.
    #[test]
    fn four_point_rule_is_quadratic() {
        let weights: f64 = TET_QUADRATURE_4.iter().map(|p| p.weight).sum();
        assert_relative_eq!(weights, 1.0);

        let mixed: f64 = TET_QUADRATURE_4
            .iter()
            .map(|p| p.weight * p.barycentric[0] * p.barycentric[1])
            .sum();
        assert_relative_eq!(mixed, 1.0 / 20.0, epsilon = 1e-14);

        let square: f64 = TET_QUADRATURE_4
            .iter()
            .map(|p| p.weight * p.barycentric[2] * p.barycentric[2])
            .sum();
        assert_relative_eq!(square, 1.0 / 10.0, epsilon = 1e-14);

        for p in TET_QUADRATURE_4.iter() {
            assert_relative_eq!(p.barycentric.iter().sum::<f64>(), 1.0, epsilon = 1e-15);
        }
    }
}
