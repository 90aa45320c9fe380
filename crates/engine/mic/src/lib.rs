//! Reader, writer and resolution tools for mic microstructure grid files.
//!
//! A mic file tessellates a 2-D slice of a crystalline sample into voxels,
//! each carrying a footprint, a crystal orientation and fit metadata. Two
//! tessellations exist: triangles from binary subdivision and uniform
//! squares. Both are held by [`GridFile`].

pub mod error;
pub mod grid;
pub mod io;
pub mod orientation;
pub mod reconstruct;
pub mod voxel;

pub use error::{MicError, Result, RowError};
pub use grid::{GridFile, GridType, ReadSummary, SquareGrid, TriangleGrid};
pub use io::{Deserializer, Serializer};
pub use orientation::Orientation;
pub use reconstruct::{
    reconstruct_in_place, ConvergenceCode, LocalOptimizer, LocalReconstructionAdaptor,
    VoxelReconstructor,
};
pub use voxel::{Direction, SquareVoxel, TriangleVoxel, Voxel};

// Re-export glam for convenience
pub use glam;
