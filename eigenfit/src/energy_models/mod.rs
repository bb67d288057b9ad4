pub mod elasticity;
pub mod gravity;
pub mod inertia;

pub use elasticity::*;
pub use gravity::*;
pub use inertia::*;
