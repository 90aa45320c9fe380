//! Mic grid files
//!
//! [`GridFile`] is the closed set of tessellations a mic file can hold. The
//! text layout does not say which one it is, so callers pick the variant with
//! a [`GridType`] before reading.
//!
//! # Example
//!
//! ```
//! use mic::{GridFile, GridType};
//!
//! let mut grid = GridFile::create(GridType::Triangular);
//! let summary = grid.parse("2.0\n0 0 0 1 0 0 30 60 90 0.95\n").unwrap();
//! assert_eq!(summary.voxels, 1);
//!
//! // Resolution changes only exist for square grids
//! assert!(grid.set_min_resolution(0.5).is_err());
//! ```

pub mod square;
pub mod triangle;

pub use square::SquareGrid;
pub use triangle::TriangleGrid;

use crate::error::{MicError, Result, RowError};
use crate::io::{Deserializer, Serializer};
use crate::voxel::Voxel;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

/// Tessellation scheme of a mic file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridType {
    Triangular,
    Square,
}

impl GridType {
    pub const ALL: [GridType; 2] = [GridType::Triangular, GridType::Square];

    pub fn name(self) -> &'static str {
        match self {
            GridType::Triangular => "triangular",
            GridType::Square => "square",
        }
    }

    /// Numeric tag: 0 = triangular, 1 = square.
    pub fn tag(self) -> i32 {
        match self {
            GridType::Triangular => 0,
            GridType::Square => 1,
        }
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for GridType {
    type Error = MicError;

    fn try_from(tag: i32) -> Result<Self> {
        match tag {
            0 => Ok(GridType::Triangular),
            1 => Ok(GridType::Square),
            other => Err(MicError::UnknownGridType(other.to_string())),
        }
    }
}

impl FromStr for GridType {
    type Err = MicError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "triangular" | "triangle" | "tri" => Ok(GridType::Triangular),
            "square" | "sq" => Ok(GridType::Square),
            _ => Err(MicError::UnknownGridType(s.to_string())),
        }
    }
}

/// Outcome of a text read that did not hit a fatal error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadSummary {
    /// Voxels now held by the grid.
    pub voxels: usize,
    /// Rows that were reported and dropped.
    pub skipped: Vec<RowError>,
}

impl ReadSummary {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub(crate) fn min_side_length<V: Voxel>(voxels: &[V]) -> Option<f64> {
    voxels.iter().map(Voxel::side_length).reduce(f64::min)
}

pub(crate) fn assign_ids<V: Voxel>(voxels: &mut [V], start: u32) -> u32 {
    let mut next = start;
    for voxel in voxels {
        voxel.set_id(next);
        next += 1;
    }
    next
}

/// A mic file of either tessellation.
#[derive(Debug, Clone, PartialEq)]
pub enum GridFile {
    Triangular(TriangleGrid),
    Square(SquareGrid),
}

impl From<TriangleGrid> for GridFile {
    fn from(grid: TriangleGrid) -> Self {
        GridFile::Triangular(grid)
    }
}

impl From<SquareGrid> for GridFile {
    fn from(grid: SquareGrid) -> Self {
        GridFile::Square(grid)
    }
}

impl GridFile {
    /// Empty grid of the requested type.
    pub fn create(grid_type: GridType) -> Self {
        tracing::debug!("created {} mic", grid_type);
        match grid_type {
            GridType::Triangular => GridFile::Triangular(TriangleGrid::new()),
            GridType::Square => GridFile::Square(SquareGrid::new()),
        }
    }

    /// Empty grid from a numeric tag. Unknown tags are a configuration error.
    pub fn from_tag(tag: i32) -> Result<Self> {
        Ok(Self::create(GridType::try_from(tag)?))
    }

    pub fn grid_type(&self) -> GridType {
        match self {
            GridFile::Triangular(_) => GridType::Triangular,
            GridFile::Square(_) => GridType::Square,
        }
    }

    pub fn as_triangular(&self) -> Option<&TriangleGrid> {
        match self {
            GridFile::Triangular(grid) => Some(grid),
            GridFile::Square(_) => None,
        }
    }

    pub fn as_triangular_mut(&mut self) -> Option<&mut TriangleGrid> {
        match self {
            GridFile::Triangular(grid) => Some(grid),
            GridFile::Square(_) => None,
        }
    }

    pub fn as_square(&self) -> Option<&SquareGrid> {
        match self {
            GridFile::Square(grid) => Some(grid),
            GridFile::Triangular(_) => None,
        }
    }

    pub fn as_square_mut(&mut self) -> Option<&mut SquareGrid> {
        match self {
            GridFile::Square(grid) => Some(grid),
            GridFile::Triangular(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            GridFile::Triangular(grid) => grid.len(),
            GridFile::Square(grid) => grid.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn min_side_length(&self) -> Option<f64> {
        match self {
            GridFile::Triangular(grid) => grid.min_side_length(),
            GridFile::Square(grid) => grid.min_side_length(),
        }
    }

    pub fn initial_side_length(&self) -> f64 {
        match self {
            GridFile::Triangular(grid) => grid.initial_side_length(),
            GridFile::Square(grid) => grid.initial_side_length(),
        }
    }

    pub fn assign_ids(&mut self, start: u32) -> u32 {
        match self {
            GridFile::Triangular(grid) => grid.assign_ids(start),
            GridFile::Square(grid) => grid.assign_ids(start),
        }
    }

    pub fn clear(&mut self) {
        match self {
            GridFile::Triangular(grid) => grid.clear(),
            GridFile::Square(grid) => grid.clear(),
        }
    }

    pub fn parse(&mut self, text: &str) -> Result<ReadSummary> {
        match self {
            GridFile::Triangular(grid) => grid.parse(text),
            GridFile::Square(grid) => grid.parse(text),
        }
    }

    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<ReadSummary> {
        match self {
            GridFile::Triangular(grid) => grid.read(path),
            GridFile::Square(grid) => grid.read(path),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            GridFile::Triangular(grid) => grid.to_text(),
            GridFile::Square(grid) => grid.to_text(),
        }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        match self {
            GridFile::Triangular(grid) => grid.write(path),
            GridFile::Square(grid) => grid.write(path),
        }
    }

    pub fn save(&self, buf: &mut Serializer) -> Result<()> {
        match self {
            GridFile::Triangular(grid) => grid.save(buf),
            GridFile::Square(grid) => grid.save(buf),
        }
    }

    pub fn restore(&mut self, buf: &mut Deserializer<'_>) -> Result<()> {
        match self {
            GridFile::Triangular(grid) => grid.restore(buf),
            GridFile::Square(grid) => grid.restore(buf),
        }
    }

    /// Save into a fresh byte buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Serializer::new();
        self.save(&mut buf)?;
        Ok(buf.into_bytes())
    }

    /// Restore from bytes written by [`GridFile::to_bytes`] for the same grid type.
    pub fn restore_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.restore(&mut Deserializer::new(bytes))
    }

    pub fn initialize_to_resolution(&mut self, resolution: f64) -> Result<()> {
        match self {
            GridFile::Triangular(_) => Err(MicError::Unsupported {
                grid_type: GridType::Triangular,
                operation: "initialize_to_resolution",
            }),
            GridFile::Square(grid) => grid.initialize_to_resolution(resolution),
        }
    }

    pub fn set_min_resolution(&mut self, resolution: f64) -> Result<()> {
        match self {
            GridFile::Triangular(_) => Err(MicError::Unsupported {
                grid_type: GridType::Triangular,
                operation: "set_min_resolution",
            }),
            GridFile::Square(grid) => grid.set_min_resolution(resolution),
        }
    }

    /// Copy grid-wide geometry from a reference grid of the same type.
    pub fn initialize_sample_limits(&mut self, other: &GridFile) -> Result<()> {
        match (self, other) {
            (GridFile::Triangular(grid), GridFile::Triangular(other)) => {
                grid.initialize_sample_limits(other);
                Ok(())
            }
            (GridFile::Square(grid), GridFile::Square(other)) => {
                grid.initialize_sample_limits(other);
                Ok(())
            }
            (this, other) => Err(MicError::GridTypeMismatch {
                expected: this.grid_type(),
                found: other.grid_type(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_factory_creates_empty_grids() {
        for grid_type in GridType::ALL {
            let grid = GridFile::create(grid_type);
            assert_eq!(grid.grid_type(), grid_type);
            assert!(grid.is_empty());
        }
    }

    #[test]
    fn test_factory_tags() {
        assert_eq!(GridFile::from_tag(0).unwrap().grid_type(), GridType::Triangular);
        assert_eq!(GridFile::from_tag(1).unwrap().grid_type(), GridType::Square);
        assert!(matches!(
            GridFile::from_tag(2),
            Err(MicError::UnknownGridType(tag)) if tag == "2"
        ));
        for grid_type in GridType::ALL {
            assert_eq!(GridType::try_from(grid_type.tag()).unwrap(), grid_type);
        }
    }

    #[test]
    fn test_grid_type_from_str() {
        assert_eq!("Square".parse::<GridType>().unwrap(), GridType::Square);
        assert_eq!("tri".parse::<GridType>().unwrap(), GridType::Triangular);
        assert!("hex".parse::<GridType>().is_err());
        assert_eq!(GridType::Square.to_string(), "square");
    }

    #[test]
    fn test_triangular_rejects_resolution_operations() {
        let mut grid = GridFile::create(GridType::Triangular);
        let err = grid.initialize_to_resolution(0.5).unwrap_err();
        assert!(matches!(
            err,
            MicError::Unsupported {
                grid_type: GridType::Triangular,
                operation: "initialize_to_resolution"
            }
        ));
        assert!(matches!(
            grid.set_min_resolution(0.5),
            Err(MicError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_sample_limits_same_variant() {
        let reference: GridFile = SquareGrid::with_limits(DVec3::new(1.0, 2.0, 0.0), 4.0, 0.5)
            .unwrap()
            .into();
        let mut grid = GridFile::create(GridType::Square);
        grid.initialize_sample_limits(&reference).unwrap();

        let square = grid.as_square().unwrap();
        assert!(square.is_initialized());
        assert_eq!(square.origin(), DVec3::new(1.0, 2.0, 0.0));
        assert_eq!(square.sample_side_length(), 4.0);
        assert_eq!(square.voxel_side_length(), 0.5);

        let reference: GridFile = TriangleGrid::with_initial_side_length(3.0).into();
        let mut grid = GridFile::create(GridType::Triangular);
        grid.initialize_sample_limits(&reference).unwrap();
        assert_eq!(grid.initial_side_length(), 3.0);
    }

    #[test]
    fn test_sample_limits_type_mismatch() {
        let reference = GridFile::create(GridType::Triangular);
        let mut grid = GridFile::create(GridType::Square);
        let err = grid.initialize_sample_limits(&reference).unwrap_err();
        assert!(matches!(
            err,
            MicError::GridTypeMismatch {
                expected: GridType::Square,
                found: GridType::Triangular
            }
        ));
    }

    #[test]
    fn test_min_side_length_empty() {
        assert_eq!(GridFile::create(GridType::Square).min_side_length(), None);
    }
}
