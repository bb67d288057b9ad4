//! Mesh builders shared by unit tests, integration tests and benchmarks.

use crate::mesh::TetMesh;
use crate::objects::Material;
use crate::Error;

/// Material used in the reference scenarios.
pub const SOLID_MATERIAL: Material = Material {
    youngs_modulus: 2e5,
    poisson_ratio: 0.45,
    density: 1000.0,
    gravity: [0.0, -9.8, 0.0],
};

pub fn make_one_tet_mesh() -> Result<TetMesh, Error> {
    TetMesh::new(
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ],
        vec![[0, 1, 2, 3]],
    )
}

/// Axis permutations defining the six Kuhn tetrahedra of a cube.
const KUHN_PATHS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Even permutations in `KUHN_PATHS` give positively oriented tetrahedra.
const KUHN_PATH_IS_EVEN: [bool; 6] = [true, false, false, true, true, false];

/// Build a box `[0, size]` split into `cells` cubes, each cut into six tetrahedra along the
/// main diagonal.
///
/// Boxes built with a multiple of the cell count are conforming refinements of the coarser box.
pub fn make_box_mesh(cells: [usize; 3], size: [f64; 3]) -> Result<TetMesh, Error> {
    if cells.contains(&0) {
        return Err(Error::InvalidParameter {
            name: "cells".to_string(),
        });
    }
    let [nx, ny, nz] = cells;
    let vertex_index = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);

    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push([
                    size[0] * i as f64 / nx as f64,
                    size[1] * j as f64 / ny as f64,
                    size[2] * k as f64 / nz as f64,
                ]);
            }
        }
    }

    let mut tets = Vec::with_capacity(6 * nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                for (path, &even) in KUHN_PATHS.iter().zip(KUHN_PATH_IS_EVEN.iter()) {
                    let mut corner = [i, j, k];
                    let mut tet = [vertex_index(i, j, k); 4];
                    for (n, &axis) in path.iter().enumerate() {
                        corner[axis] += 1;
                        tet[n + 1] = vertex_index(corner[0], corner[1], corner[2]);
                    }
                    if !even {
                        tet.swap(1, 2);
                    }
                    tets.push(tet);
                }
            }
        }
    }

    TetMesh::new(vertices, tets)
}

/// A coarse box and a fine box refining each coarse cell `refinement` times along each axis.
pub fn make_nested_box_meshes(
    cells: [usize; 3],
    size: [f64; 3],
    refinement: usize,
) -> Result<(TetMesh, TetMesh), Error> {
    let coarse = make_box_mesh(cells, size)?;
    let fine = make_box_mesh(
        [
            cells[0] * refinement,
            cells[1] * refinement,
            cells[2] * refinement,
        ],
        size,
    )?;
    Ok((coarse, fine))
}
