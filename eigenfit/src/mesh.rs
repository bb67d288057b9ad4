//! Tetrahedral meshes consumed by the simulation.
//!
//! Meshes are built from in-memory arrays supplied by an external loader. No file parsing is
//! done here.

use na::{DMatrix, Vector3};

use crate::Error;

/// Relative volume below which a tetrahedron is considered degenerate.
const DEGENERATE_VOLUME_TOLERANCE: f64 = 1e-12;

#[derive(Clone, Debug, PartialEq)]
pub struct TetMesh {
    vertices: Vec<Vector3<f64>>,
    tets: Vec<[usize; 4]>,
}

/// Signed volume of a tetrahedron. Positive when `p[1] - p[0]`, `p[2] - p[0]` and `p[3] - p[0]`
/// form a right handed frame.
pub fn signed_volume(p: &[Vector3<f64>; 4]) -> f64 {
    (p[1] - p[0]).dot(&(p[2] - p[0]).cross(&(p[3] - p[0]))) / 6.0
}

impl TetMesh {
    /// Build a mesh from vertex positions and tetrahedron connectivity.
    ///
    /// Fails if any index is out of bounds or if any tetrahedron is degenerate or inverted.
    pub fn new(vertices: Vec<[f64; 3]>, tets: Vec<[usize; 4]>) -> Result<Self, Error> {
        let mesh = TetMesh {
            vertices: vertices.into_iter().map(Vector3::from).collect(),
            tets,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Build a mesh from an `n×3` vertex matrix and an `m×4` element matrix.
    pub fn from_matrices(v: &DMatrix<f64>, f: &DMatrix<usize>) -> Result<Self, Error> {
        if v.ncols() != 3 || f.ncols() != 4 {
            return Err(Error::InvalidMesh {
                description: format!(
                    "expected n×3 vertices and m×4 elements, got {}×{} and {}×{}",
                    v.nrows(),
                    v.ncols(),
                    f.nrows(),
                    f.ncols()
                ),
            });
        }
        let vertices = (0..v.nrows())
            .map(|i| [v[(i, 0)], v[(i, 1)], v[(i, 2)]])
            .collect();
        let tets = (0..f.nrows())
            .map(|i| [f[(i, 0)], f[(i, 1)], f[(i, 2)], f[(i, 3)]])
            .collect();
        Self::new(vertices, tets)
    }

    fn validate(&self) -> Result<(), Error> {
        let n = self.vertices.len();
        if let Some((i, _)) = self
            .tets
            .iter()
            .enumerate()
            .find(|(_, tet)| tet.iter().any(|&v| v >= n))
        {
            return Err(Error::InvalidMesh {
                description: format!("element {} references a vertex out of range", i),
            });
        }

        let mut degens = Vec::new();
        let mut inverted = Vec::new();
        for (i, tet) in self.tets.iter().enumerate() {
            let p = self.tet_positions(tet);
            let vol = signed_volume(&p);
            let scale = max_edge_length(&p).powi(3);
            if vol.abs() <= DEGENERATE_VOLUME_TOLERANCE * scale {
                degens.push(i);
            } else if vol < 0.0 {
                inverted.push(i);
            }
        }

        if !degens.is_empty() {
            return Err(Error::DegenerateReferenceElement { degens });
        }
        if !inverted.is_empty() {
            return Err(Error::InvertedReferenceElement { inverted });
        }
        Ok(())
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn num_elements(&self) -> usize {
        self.tets.len()
    }

    #[inline]
    pub fn vertex_positions(&self) -> &[Vector3<f64>] {
        &self.vertices
    }

    #[inline]
    pub fn tets(&self) -> &[[usize; 4]] {
        &self.tets
    }

    #[inline]
    pub fn tet_positions(&self, tet: &[usize; 4]) -> [Vector3<f64>; 4] {
        [
            self.vertices[tet[0]],
            self.vertices[tet[1]],
            self.vertices[tet[2]],
            self.vertices[tet[3]],
        ]
    }

    /// Positions of the vertices of element `i`.
    pub fn element(&self, i: usize) -> [Vector3<f64>; 4] {
        self.tet_positions(&self.tets[i])
    }

    /// Axis aligned bounding box as a `(min, max)` pair.
    pub fn bounding_box(&self) -> (Vector3<f64>, Vector3<f64>) {
        let mut min = Vector3::repeat(f64::INFINITY);
        let mut max = Vector3::repeat(f64::NEG_INFINITY);
        for v in self.vertices.iter() {
            min = min.inf(v);
            max = max.sup(v);
        }
        (min, max)
    }

    /// Minimum vertex coordinate along the given axis.
    pub fn min_coordinate(&self, axis: usize) -> Option<f64> {
        self.vertices
            .iter()
            .map(|v| v[axis])
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Total rest volume.
    pub fn volume(&self) -> f64 {
        self.tets
            .iter()
            .map(|tet| signed_volume(&self.tet_positions(tet)))
            .sum()
    }
}

fn max_edge_length(p: &[Vector3<f64>; 4]) -> f64 {
    let mut max = 0.0_f64;
    for i in 0..4 {
        for j in i + 1..4 {
            max = max.max((p[i] - p[j]).norm());
        }
    }
    max
}
