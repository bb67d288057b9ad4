pub mod config;
pub mod dof;
mod energy;
pub mod energy_models;
pub mod fem;
mod matrix;
pub mod mesh;
pub mod objects;
pub mod quadrature;
pub mod reduction;
pub mod shape;

// TODO: This should be feature gated once integration tests can enable dev-only features
// without passing `--features` explicitly (https://github.com/rust-lang/cargo/issues/2911).
pub mod test_utils;

pub use self::config::*;
pub use self::dof::{DofMap, DofSystemBuilder, SystemId};
pub use self::energy::*;
pub use self::energy_models::*;
pub use self::fem::*;
pub use self::matrix::*;
pub use self::mesh::TetMesh;
pub use self::objects::*;
pub use self::reduction::{
    generalized_eigen, Correction, EigenFit, Embedding, FitReport, ModePairing, Modes, ReducedSystem,
};

use thiserror::Error;

/// Sparse matrix type used for all assembled global quantities.
pub type DSMatrix = sprs::CsMat<f64>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Size mismatch error")]
    SizeMismatch,
    #[error("Invalid mesh: {description}")]
    InvalidMesh { description: String },
    #[error("Degenerate reference element detected: {:?}", .degens[0])]
    DegenerateReferenceElement { degens: Vec<usize> },
    #[error("Inverted reference element detected: {:?}", .inverted[0])]
    InvertedReferenceElement { inverted: Vec<usize> },
    #[error("Coarse vertex {vertex} at {position:?} is not embedded in the fine mesh")]
    GeometryMismatch { vertex: usize, position: [f64; 3] },
    #[error("System matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("Woodbury core matrix is singular")]
    SingularWoodburyCore,
    #[error("Mass matrix is not positive definite")]
    SingularMassMatrix,
    #[error("Requested {requested} modes but only {available} reduced degrees of freedom are available")]
    TooManyModes { requested: usize, available: usize },
    #[error("Invalid parameter: {name:?}")]
    InvalidParameter { name: String },
    #[error("Invalid configuration: {description}")]
    InvalidConfig { description: String },
    #[error("Unknown physical system: {id}")]
    UnknownSystem { id: usize },
    #[error("Local degree of freedom {local} is out of range for system {system}")]
    DofOutOfRange { system: usize, local: usize },
    #[error("Failed to build assembly thread pool")]
    ThreadPool {
        #[from]
        source: rayon::ThreadPoolBuildError,
    },
    #[error("Failed to parse configuration")]
    ConfigParse {
        #[from]
        source: ron::error::SpannedError,
    },
}

pub(crate) fn inf_norm<I>(iter: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    iter.into_iter()
        .map(|x| x.abs())
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Less))
        .unwrap_or(0.0)
}
