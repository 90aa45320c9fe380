//! Triangular mic grid
//!
//! Text layout: line 1 holds the generation-0 side length, every following
//! line is one triangle:
//!
//! ```text
//! x y z direction generation phase euler1 euler2 euler3 [confidence]
//!     [cost overlap fitting_time dxx dyy dzz dxy dyz dxz]
//! ```
//!
//! `x y z` is the left vertex of the horizontal edge, `direction` is 1 for up
//! and 2 for down, and the side length is `a0 / 2^generation`. Euler angles are
//! degrees on disk.

use super::{assign_ids, min_side_length, GridType, ReadSummary};
use crate::error::{MicError, Result, RowError};
use crate::io::{self, Deserializer, Line, Serializer};
use crate::orientation::{degrees_to_radians, radians_to_degrees, Orientation};
use crate::voxel::{Direction, TriangleVoxel};
use glam::{DMat3, DVec3};
use std::fmt::Write as FmtWrite;
use std::path::Path;

/// Columns every row must have.
pub const MIN_COLUMNS: usize = 9;
/// Columns of a row that also carries fit metadata and the deformation tensor.
pub const EXTENDED_COLUMNS: usize = 19;
/// Deepest subdivision accepted from a file.
pub const MAX_GENERATION: u32 = 63;

/// Grid of equilateral triangles produced by binary subdivision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleGrid {
    voxels: Vec<TriangleVoxel>,
    initial_side_length: f64,
}

impl TriangleGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_side_length(initial_side_length: f64) -> Self {
        Self {
            voxels: Vec::new(),
            initial_side_length,
        }
    }

    /// Generation-0 side length.
    pub fn initial_side_length(&self) -> f64 {
        self.initial_side_length
    }

    pub fn set_initial_side_length(&mut self, side_length: f64) {
        self.initial_side_length = side_length;
    }

    pub fn voxels(&self) -> &[TriangleVoxel] {
        &self.voxels
    }

    /// Underlying sequence for in-place fitting. Callers keep vertices,
    /// generation and side length consistent with `initial_side_length`.
    pub fn voxels_mut(&mut self) -> &mut Vec<TriangleVoxel> {
        &mut self.voxels
    }

    pub fn set_voxels(&mut self, voxels: Vec<TriangleVoxel>) {
        self.voxels = voxels;
    }

    pub fn add_voxel(&mut self, voxel: TriangleVoxel) {
        self.voxels.push(voxel);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TriangleVoxel> {
        self.voxels.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TriangleVoxel> {
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

    /// Replace the contents with a parsed mic file.
    ///
    /// Rows with too few or unparsable columns are skipped and listed in the
    /// summary. A bad header leaves the grid untouched.
    pub fn parse(&mut self, text: &str) -> Result<ReadSummary> {
        let lines = io::tokenize(text);
        let Some((header, rows)) = lines.split_first() else {
            return Err(malformed("file is empty"));
        };
        let initial_side_length = parse_header(header)?;

        let mut voxels = Vec::with_capacity(rows.len());
        let mut skipped = Vec::new();
        for line in rows {
            match parse_row(line, initial_side_length) {
                Ok(voxel) => voxels.push(voxel),
                Err(err) => {
                    tracing::warn!("skipping triangular mic row: {}", err);
                    skipped.push(err);
                }
            }
        }

        self.initial_side_length = initial_side_length;
        self.voxels = voxels;
        Ok(ReadSummary {
            voxels: self.voxels.len(),
            skipped,
        })
    }

    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<ReadSummary> {
        let text = io::read_text(path.as_ref())?;
        self.parse(&text)
    }

    /// Render in the extended 19-column layout.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.initial_side_length);
        for voxel in &self.voxels {
            write_row(voxel, &mut out);
        }
        out
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        io::write_text(path.as_ref(), &self.to_text())
    }

    pub fn save(&self, buf: &mut Serializer) -> Result<()> {
        buf.insert_compact_obj(&self.initial_side_length)?;
        buf.insert_compact_vec(&self.voxels)
    }

    pub fn restore(&mut self, buf: &mut Deserializer<'_>) -> Result<()> {
        let side_length: f64 = buf.get_compact_obj()?;
        let voxels = buf.get_compact_vec()?;
        self.voxels = voxels;
        self.set_initial_side_length(side_length);
        Ok(())
    }

    /// A triangular grid has no origin or voxel size; only the generation-0
    /// side length is shared.
    pub fn initialize_sample_limits(&mut self, other: &TriangleGrid) {
        self.set_initial_side_length(other.initial_side_length);
    }
}

fn malformed(reason: impl Into<String>) -> MicError {
    MicError::MalformedHeader {
        grid_type: GridType::Triangular,
        reason: reason.into(),
    }
}

fn parse_header(header: &Line<'_>) -> Result<f64> {
    if header.len() != 1 {
        return Err(malformed(format!(
            "expected a single side length on line {}, found {} fields",
            header.number,
            header.len()
        )));
    }
    match header.f64(0) {
        Ok(side) if side.is_finite() && side > 0.0 => Ok(side),
        _ => Err(malformed(format!(
            "side length {:?} is not a positive number",
            header.fields[0]
        ))),
    }
}

fn parse_row(
    line: &Line<'_>,
    initial_side_length: f64,
) -> std::result::Result<TriangleVoxel, RowError> {
    line.require(MIN_COLUMNS)?;
    if line.len() == MIN_COLUMNS {
        tracing::debug!("line {}: old format mic row with only 9 columns", line.number);
    }

    let anchor = DVec3::new(line.f64(0)?, line.f64(1)?, line.f64(2)?);
    let direction = Direction::from_code(line.i32(3)?);

    let generation = line.i64(4)?;
    if !(0..=MAX_GENERATION as i64).contains(&generation) {
        return Err(RowError::GenerationOutOfRange {
            line: line.number,
            generation,
            max: MAX_GENERATION,
        });
    }

    let mut voxel =
        TriangleVoxel::from_anchor(anchor, direction, generation as u32, initial_side_length);
    voxel.phase = line.i32(5)?;

    let degrees = DVec3::new(line.f64(6)?, line.f64(7)?, line.f64(8)?);
    voxel.orientation = Orientation::from_euler_vec(degrees_to_radians(degrees));
    voxel.confidence = line.opt_f64(9)?.unwrap_or(0.0);

    if line.len() >= EXTENDED_COLUMNS {
        voxel.cost = line.f64(10)?;
        voxel.pixel_overlap_ratio = line.f64(11)?;
        voxel.fitting_time = line.f64(12)?;

        let (dxx, dyy, dzz) = (line.f64(13)?, line.f64(14)?, line.f64(15)?);
        let (dxy, dyz, dxz) = (line.f64(16)?, line.f64(17)?, line.f64(18)?);
        voxel.deformation = DMat3::from_cols(
            DVec3::new(dxx, dxy, dxz),
            DVec3::new(dxy, dyy, dyz),
            DVec3::new(dxz, dyz, dzz),
        );
    }

    Ok(voxel)
}

fn write_row(voxel: &TriangleVoxel, out: &mut String) {
    let anchor = voxel.anchor();
    let euler = radians_to_degrees(voxel.orientation.euler_angles());
    let d = &voxel.deformation;
    let _ = writeln!(
        out,
        "{} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {}",
        anchor.x,
        anchor.y,
        anchor.z,
        voxel.direction().code(),
        voxel.generation,
        voxel.phase,
        euler.x,
        euler.y,
        euler.z,
        voxel.confidence,
        voxel.cost,
        voxel.pixel_overlap_ratio,
        voxel.fitting_time,
        d.x_axis.x,
        d.y_axis.y,
        d.z_axis.z,
        d.x_axis.y,
        d.z_axis.y,
        d.x_axis.z,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQRT_3: f64 = 1.732_050_807_568_877_2;

    #[test]
    fn test_parse_single_up_triangle() {
        let mut grid = TriangleGrid::new();
        let summary = grid.parse("2.0\n0 0 0 1 0 0 30 60 90 0.95\n").unwrap();
        assert!(summary.is_clean());
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.initial_side_length(), 2.0);

        let v = &grid.voxels()[0];
        assert_eq!(v.generation, 0);
        assert_eq!(v.side_length, 2.0);
        assert!(v.points_up);
        assert_eq!(v.vertices[0], DVec3::ZERO);
        assert_eq!(v.vertices[1], DVec3::new(2.0, 0.0, 0.0));
        assert!(v.vertices[2].abs_diff_eq(DVec3::new(1.0, SQRT_3, 0.0), 1e-12));
        assert_eq!(v.confidence, 0.95);
        assert_eq!(v.deformation, DMat3::IDENTITY);

        let expected = Orientation::from_euler(
            30.0 * (std::f64::consts::PI / 180.0),
            60.0 * (std::f64::consts::PI / 180.0),
            90.0 * (std::f64::consts::PI / 180.0),
        );
        assert_eq!(v.orientation, expected);
    }

    #[test]
    fn test_parse_old_nine_column_row() {
        let mut grid = TriangleGrid::new();
        grid.parse("4\n1 1 0 2 2 1 0 0 0").unwrap();
        let v = &grid.voxels()[0];
        assert_eq!(v.side_length, 1.0);
        assert!(!v.points_up);
        assert_eq!(v.confidence, 0.0);
        assert_eq!(v.phase, 1);
        assert_eq!(v.cost, 0.0);
    }

    #[test]
    fn test_parse_extended_row() {
        let mut grid = TriangleGrid::new();
        grid.parse(
            "1\n0 0 0 1 1 1 10 20 30 0.8 0.25 0.6 12.5 1.01 0.99 1.0 0.002 0.003 0.004\n",
        )
        .unwrap();
        let v = &grid.voxels()[0];
        assert_eq!(v.side_length, 0.5);
        assert_eq!(v.cost, 0.25);
        assert_eq!(v.pixel_overlap_ratio, 0.6);
        assert_eq!(v.fitting_time, 12.5);

        let d = v.deformation;
        assert_eq!(d.x_axis.x, 1.01);
        assert_eq!(d.y_axis.y, 0.99);
        assert_eq!(d.z_axis.z, 1.0);
        assert_eq!(d.x_axis.y, 0.002);
        assert_eq!(d.y_axis.x, 0.002);
        assert_eq!(d.z_axis.y, 0.003);
        assert_eq!(d.y_axis.z, 0.003);
        assert_eq!(d.x_axis.z, 0.004);
        assert_eq!(d.z_axis.x, 0.004);
    }

    #[test]
    fn test_partial_extension_uses_defaults() {
        let mut grid = TriangleGrid::new();
        grid.parse("1\n0 0 0 1 0 1 0 0 0 0.5 0.3 0.2").unwrap();
        let v = &grid.voxels()[0];
        assert_eq!(v.confidence, 0.5);
        assert_eq!(v.cost, 0.0);
        assert_eq!(v.deformation, DMat3::IDENTITY);
    }

    #[test]
    fn test_short_row_is_skipped() {
        let mut grid = TriangleGrid::new();
        let summary = grid
            .parse("1\n0 0 0 1 0 1 0 0 0\n0 0 0 1\n1 0 0 2 0 1 0 0 0\n")
            .unwrap();
        assert_eq!(summary.voxels, 2);
        assert_eq!(
            summary.skipped,
            vec![RowError::TooFewColumns {
                line: 3,
                expected: 9,
                found: 4
            }]
        );
    }

    #[test]
    fn test_negative_generation_is_skipped() {
        let mut grid = TriangleGrid::new();
        let summary = grid.parse("1\n0 0 0 1 -1 1 0 0 0\n").unwrap();
        assert!(grid.is_empty());
        assert!(matches!(
            summary.skipped[0],
            RowError::GenerationOutOfRange { generation: -1, .. }
        ));
    }

    #[test]
    fn test_bad_header_keeps_previous_contents() {
        let mut grid = TriangleGrid::new();
        grid.parse("1\n0 0 0 1 0 1 0 0 0\n").unwrap();

        let err = grid.parse("1 2 3\n0 0 0 1 0 1 0 0 0\n").unwrap_err();
        assert!(matches!(err, MicError::MalformedHeader { .. }));
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.initial_side_length(), 1.0);
    }

    #[test]
    fn test_write_uses_leftmost_vertex() {
        let mut v = TriangleVoxel::from_anchor(DVec3::new(3.0, 2.0, 0.0), Direction::Down, 0, 1.0);
        v.vertices.rotate_right(1);
        let mut grid = TriangleGrid::with_initial_side_length(1.0);
        grid.add_voxel(v);

        let text = grid.to_text();
        let row: Vec<&str> = text.lines().nth(1).unwrap().split_whitespace().collect();
        assert_eq!(row.len(), EXTENDED_COLUMNS);
        assert_eq!(&row[..6], &["3", "2", "0", "2", "0", "0"]);
    }

    #[test]
    fn test_text_roundtrip() {
        let mut grid = TriangleGrid::new();
        grid.parse(
            "2\n0 0 0 1 0 0 30 60 90 0.95\n1 1.7320508075688772 0 2 1 1 45 30 15 0.5\n",
        )
        .unwrap();

        let mut again = TriangleGrid::new();
        again.parse(&grid.to_text()).unwrap();

        assert_eq!(again.len(), grid.len());
        for (a, b) in grid.iter().zip(again.iter()) {
            for k in 0..3 {
                assert!(a.vertices[k].abs_diff_eq(b.vertices[k], 1e-9));
            }
            assert_eq!(a.points_up, b.points_up);
            assert_eq!(a.generation, b.generation);
            assert_eq!(a.phase, b.phase);
            assert_eq!(a.confidence, b.confidence);
            assert!(a.orientation.abs_diff_eq(&b.orientation, 1e-9));
        }
    }

    #[test]
    fn test_assign_ids_and_min_side() {
        let mut grid = TriangleGrid::new();
        grid.parse("8\n0 0 0 1 0 1 0 0 0\n0 0 0 1 2 1 0 0 0\n").unwrap();
        assert_eq!(grid.assign_ids(10), 12);
        assert_eq!(grid.voxels()[1].id, 11);
        assert_eq!(grid.min_side_length(), Some(2.0));
    }
}
