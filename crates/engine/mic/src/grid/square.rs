//! Square mic grid
//!
//! Text layout:
//!
//! ```text
//! sample_side_length voxel_side_length
//! origin_x origin_y origin_z
//! x y z phase euler1 euler2 euler3 confidence [cost overlap [fitting_time]]
//! ```
//!
//! Rows give the cell center directly. Euler angles are degrees on disk.

use super::{assign_ids, min_side_length, GridType, ReadSummary};
use crate::error::{MicError, Result, RowError};
use crate::io::{self, Deserializer, Line, Serializer};
use crate::orientation::{degrees_to_radians, radians_to_degrees, Orientation};
use crate::voxel::SquareVoxel;
use glam::DVec3;
use std::fmt::Write as FmtWrite;
use std::path::Path;

/// Columns every row must have.
pub const MIN_COLUMNS: usize = 8;
/// Largest voxel count a resolution change may produce.
pub const MAX_VOXELS: usize = 1 << 28;

/// Uniform square grid covering a square sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SquareGrid {
    voxels: Vec<SquareVoxel>,
    /// Only carried through save/restore.
    initial_side_length: f64,
    origin: DVec3,
    voxel_side_length: f64,
    sample_side_length: f64,
    initialized: bool,
}

impl SquareGrid {
    /// Empty grid without sample limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty grid with sample limits set.
    pub fn with_limits(
        origin: DVec3,
        sample_side_length: f64,
        voxel_side_length: f64,
    ) -> Result<Self> {
        let mut grid = Self::new();
        grid.initialize(origin, sample_side_length, voxel_side_length)?;
        Ok(grid)
    }

    /// Set the sample limits. The voxel may not be larger than the sample.
    pub fn initialize(
        &mut self,
        origin: DVec3,
        sample_side_length: f64,
        voxel_side_length: f64,
    ) -> Result<()> {
        check_resolution(sample_side_length)?;
        check_resolution(voxel_side_length)?;
        if voxel_side_length > sample_side_length {
            return Err(MicError::VoxelLargerThanSample {
                voxel: voxel_side_length,
                sample: sample_side_length,
            });
        }
        self.origin = origin;
        self.sample_side_length = sample_side_length;
        self.voxel_side_length = voxel_side_length;
        self.initialized = true;
        Ok(())
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// Nominal side length of a cell.
    pub fn voxel_side_length(&self) -> f64 {
        self.voxel_side_length
    }

    /// Extent of the whole sample.
    pub fn sample_side_length(&self) -> f64 {
        self.sample_side_length
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn initial_side_length(&self) -> f64 {
        self.initial_side_length
    }

    pub fn set_initial_side_length(&mut self, side_length: f64) {
        self.initial_side_length = side_length;
    }

    pub fn voxels(&self) -> &[SquareVoxel] {
        &self.voxels
    }

    /// Underlying sequence for in-place fitting. Callers keep centers and
    /// side lengths inside the sample limits.
    pub fn voxels_mut(&mut self) -> &mut Vec<SquareVoxel> {
        &mut self.voxels
    }

    pub fn set_voxels(&mut self, voxels: Vec<SquareVoxel>) {
        self.voxels = voxels;
    }

    pub fn add_voxel(&mut self, voxel: SquareVoxel) {
        self.voxels.push(voxel);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SquareVoxel> {
        self.voxels.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SquareVoxel> {
        self.voxels.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn clear(&mut self) {
        self.voxels.clear();
    }

    pub fn min_side_length(&self) -> Option<f64> {
        min_side_length(&self.voxels)
    }

    /// Number voxels from `start`; returns the next unused id.
    pub fn assign_ids(&mut self, start: u32) -> u32 {
        assign_ids(&mut self.voxels, start)
    }

    /// Replace the contents with a parsed square mic file.
    pub fn parse(&mut self, text: &str) -> Result<ReadSummary> {
        let lines = io::tokenize(text);
        if lines.len() < 2 || lines[0].len() != 2 || lines[1].len() != 3 {
            return Err(malformed(
                "expecting `sample_side voxel_side` then `origin_x origin_y origin_z`",
            ));
        }

        let sample_side_length = header_length(&lines[0], 0)?;
        let voxel_side_length = header_length(&lines[0], 1)?;
        let origin = DVec3::new(
            header_f64(&lines[1], 0)?,
            header_f64(&lines[1], 1)?,
            header_f64(&lines[1], 2)?,
        );
        tracing::info!(
            "reading square grid mic: sample {} voxel {} origin {}",
            sample_side_length,
            voxel_side_length,
            origin
        );

        let rows = &lines[2..];
        let mut voxels = Vec::with_capacity(rows.len());
        let mut skipped = Vec::new();
        for line in rows {
            match parse_row(line, voxel_side_length) {
                Ok(voxel) => voxels.push(voxel),
                Err(err) => {
                    tracing::warn!("skipping square mic row: {}", err);
                    skipped.push(err);
                }
            }
        }

        self.sample_side_length = sample_side_length;
        self.voxel_side_length = voxel_side_length;
        self.origin = origin;
        self.voxels = voxels;
        self.initialized = true;
        Ok(ReadSummary {
            voxels: self.voxels.len(),
            skipped,
        })
    }

    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<ReadSummary> {
        let text = io::read_text(path.as_ref())?;
        self.parse(&text)
    }

    /// Render with every optional column present.
    ///
    /// Per-voxel side lengths are not part of the layout; readers assume the
    /// grid-wide voxel side length for every row.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {}",
            self.sample_side_length, self.voxel_side_length
        );
        let _ = writeln!(out, "{} {} {}", self.origin.x, self.origin.y, self.origin.z);
        for voxel in &self.voxels {
            let euler = radians_to_degrees(voxel.orientation.euler_angles());
            let _ = writeln!(
                out,
                "{} {} {} {} {} {} {} {} {} {} {}",
                voxel.center.x,
                voxel.center.y,
                voxel.center.z,
                voxel.phase,
                euler.x,
                euler.y,
                euler.z,
                voxel.confidence,
                voxel.cost,
                voxel.pixel_overlap_ratio,
                voxel.fitting_time,
            );
        }
        out
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        io::write_text(path.as_ref(), &self.to_text())
    }

    pub fn save(&self, buf: &mut Serializer) -> Result<()> {
        buf.insert_compact_obj(&self.initial_side_length)?;
        buf.insert_compact_obj(&self.origin)?;
        buf.insert_compact_obj(&self.voxel_side_length)?;
        buf.insert_compact_obj(&self.sample_side_length)?;
        buf.insert_compact_obj(&self.initialized)?;
        buf.insert_compact_vec(&self.voxels)
    }

    pub fn restore(&mut self, buf: &mut Deserializer<'_>) -> Result<()> {
        let side_length: f64 = buf.get_compact_obj()?;
        let origin = buf.get_compact_obj()?;
        let voxel_side_length = buf.get_compact_obj()?;
        let sample_side_length = buf.get_compact_obj()?;
        let initialized = buf.get_compact_obj()?;
        let voxels = buf.get_compact_vec()?;

        self.origin = origin;
        self.voxel_side_length = voxel_side_length;
        self.sample_side_length = sample_side_length;
        self.initialized = initialized;
        self.voxels = voxels;
        self.set_initial_side_length(side_length);
        Ok(())
    }

    /// Copy origin and side lengths from another square grid.
    pub fn initialize_sample_limits(&mut self, other: &SquareGrid) {
        tracing::debug!(
            "copying square sample limits: origin {} sample {} voxel {}",
            other.origin,
            other.sample_side_length,
            other.voxel_side_length
        );
        self.origin = other.origin;
        self.sample_side_length = other.sample_side_length;
        self.voxel_side_length = other.voxel_side_length;
        self.initialized = other.initialized;
    }

    /// Discard all voxels and tile the sample with cells no larger than `resolution`.
    ///
    /// The number of cells per side is rounded up, so the last row and column
    /// may extend past the sample edge.
    pub fn initialize_to_resolution(&mut self, resolution: f64) -> Result<()> {
        check_resolution(resolution)?;
        if !self.initialized {
            return Err(MicError::Uninitialized {
                operation: "initialize_to_resolution",
            });
        }

        let side = self.voxel_side_length.min(resolution);
        if side > self.sample_side_length {
            return Err(MicError::VoxelLargerThanSample {
                voxel: side,
                sample: self.sample_side_length,
            });
        }

        let per_side = (self.sample_side_length / side).ceil();
        check_voxel_count(per_side * per_side)?;
        let per_side = per_side as usize;
        self.voxel_side_length = side;

        let shift = self.origin + DVec3::new(0.5 * side, 0.5 * side, 0.0);

        self.voxels.clear();
        self.voxels.reserve(per_side * per_side);
        for i in 0..per_side {
            for j in 0..per_side {
                let center = shift + DVec3::new(i as f64 * side, j as f64 * side, 0.0);
                self.voxels.push(SquareVoxel::new(center, side));
            }
        }

        tracing::info!(
            "initialized square mic to {}x{} voxels of side {}",
            per_side,
            per_side,
            side
        );
        Ok(())
    }

    /// Subdivide every voxel larger than `resolution`, keeping its attributes.
    ///
    /// One pass with a single grid-wide division count
    /// `k = ceil(voxel_side_length / resolution)`: the grid-wide voxel side
    /// length shrinks by `k` and each voxel larger than `resolution` becomes a
    /// `k x k` block of copies tiling its footprint. Once the grid-wide side
    /// is within `resolution`, `k` is 1 and the call changes nothing.
    pub fn set_min_resolution(&mut self, resolution: f64) -> Result<()> {
        check_resolution(resolution)?;
        if !self.initialized {
            return Err(MicError::Uninitialized {
                operation: "set_min_resolution",
            });
        }

        if self.voxel_side_length <= resolution {
            tracing::debug!(
                "set min resolution {}: voxel side {} already fine enough",
                resolution,
                self.voxel_side_length
            );
            return Ok(());
        }

        let divisions = (self.voxel_side_length / resolution).ceil();
        let oversized = self
            .voxels
            .iter()
            .filter(|v| v.side_length > resolution)
            .count();
        let kept = self.voxels.len() - oversized;
        check_voxel_count(kept as f64 + oversized as f64 * divisions * divisions)?;

        let divisions = divisions as usize;
        self.voxel_side_length /= divisions as f64;

        let before = self.voxels.len();
        let mut refined = Vec::with_capacity(kept + oversized * divisions * divisions);
        for voxel in std::mem::take(&mut self.voxels) {
            if voxel.side_length > resolution {
                subdivide(&voxel, divisions, &mut refined);
            } else {
                refined.push(voxel);
            }
        }
        self.voxels = refined;

        tracing::info!(
            "set min resolution {}: split {} of {} voxels {}x{}, {} voxels now",
            resolution,
            oversized,
            before,
            divisions,
            divisions,
            self.voxels.len()
        );
        Ok(())
    }
}

/// Replace `parent` with a `divisions x divisions` block of children.
fn subdivide(parent: &SquareVoxel, divisions: usize, out: &mut Vec<SquareVoxel>) {
    let side = parent.side_length / divisions as f64;
    let first = parent.min_corner() + DVec3::new(0.5 * side, 0.5 * side, 0.0);
    for i in 0..divisions {
        for j in 0..divisions {
            let mut child = parent.clone();
            child.set_center(
                first + DVec3::new(i as f64 * side, j as f64 * side, 0.0),
                side,
            );
            out.push(child);
        }
    }
}

fn check_voxel_count(count: f64) -> Result<()> {
    if count <= MAX_VOXELS as f64 {
        Ok(())
    } else {
        Err(MicError::TooManyVoxels {
            requested: count,
            limit: MAX_VOXELS,
        })
    }
}

fn check_resolution(value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MicError::InvalidResolution(value))
    }
}

fn malformed(reason: impl Into<String>) -> MicError {
    MicError::MalformedHeader {
        grid_type: GridType::Square,
        reason: reason.into(),
    }
}

fn header_f64(line: &Line<'_>, column: usize) -> Result<f64> {
    line.f64(column).map_err(|err| malformed(err.to_string()))
}

fn header_length(line: &Line<'_>, column: usize) -> Result<f64> {
    let value = header_f64(line, column)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(malformed(format!(
            "line {}: side length {} is not a positive number",
            line.number, value
        )))
    }
}

fn parse_row(
    line: &Line<'_>,
    voxel_side_length: f64,
) -> std::result::Result<SquareVoxel, RowError> {
    line.require(MIN_COLUMNS)?;

    let center = DVec3::new(line.f64(0)?, line.f64(1)?, line.f64(2)?);
    let mut voxel = SquareVoxel::new(center, voxel_side_length);
    voxel.phase = line.i32(3)?;

    let degrees = DVec3::new(line.f64(4)?, line.f64(5)?, line.f64(6)?);
    voxel.orientation = Orientation::from_euler_vec(degrees_to_radians(degrees));
    voxel.confidence = line.f64(7)?;

    if line.len() >= 10 {
        voxel.cost = line.f64(8)?;
        voxel.pixel_overlap_ratio = line.f64(9)?;
    }
    if let Some(fitting_time) = line.opt_f64(10)? {
        voxel.fitting_time = fitting_time;
    }

    Ok(voxel)
}
