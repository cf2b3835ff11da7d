pub mod builder;
pub mod check;
pub mod error;
pub mod export;
pub mod math;
pub mod region;
pub mod stack;
pub mod sweep;
pub mod triangulate;

pub use builder::ModelBuilder;
pub use error::{CapmeshError, Result};
pub use export::{ConductorInfo, ConductorMap};
pub use region::Region;
pub use stack::DielectricSpec;
pub use sweep::ModelGenerator;
pub use triangulate::TriangulationParams;
