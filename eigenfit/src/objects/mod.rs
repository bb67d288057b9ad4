pub mod element;
pub mod fem_system;
pub mod material;

pub use element::*;
pub use fem_system::*;
pub use material::*;
