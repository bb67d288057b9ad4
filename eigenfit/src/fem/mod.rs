//! Global assembly, constraints and time integration of finite element systems.

pub mod assembly;
pub mod constraints;
pub mod linsolve;
pub mod scene;
pub mod time_integration;
pub mod world;

pub use assembly::*;
pub use constraints::*;
pub use linsolve::*;
pub use scene::*;
pub use time_integration::*;
pub use world::*;
