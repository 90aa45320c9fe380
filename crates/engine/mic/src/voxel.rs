//! Voxel records for the two tessellation schemes
//!
//! Both records carry the same fit attributes (phase, orientation, confidence,
//! cost, overlap, fitting time); they differ only in how the 2-D footprint is
//! stored. Triangles keep explicit vertices, squares keep a center and derive
//! their corners on demand.

use crate::orientation::Orientation;
use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

/// Common view over both voxel kinds used by grid-wide helpers.
pub trait Voxel {
    fn id(&self) -> u32;
    fn set_id(&mut self, id: u32);
    fn side_length(&self) -> f64;
}

/// Triangle orientation within the tessellation, as encoded in column 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// On-disk code: 1 = up, 2 = down.
    pub fn code(self) -> i32 {
        match self {
            Direction::Up => 1,
            Direction::Down => 2,
        }
    }

    /// Historical files only ever test for the up code; anything else is down.
    pub fn from_code(code: i32) -> Self {
        if code == 1 {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

/// Equilateral triangle cell of a triangular mic grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleVoxel {
    pub id: u32,
    /// Counter-clockwise vertices. z carries the sample height.
    pub vertices: [DVec3; 3],
    pub points_up: bool,
    pub side_length: f64,
    /// Subdivision depth: `side_length = initial_side_length / 2^generation`.
    pub generation: u32,
    pub phase: i32,
    pub orientation: Orientation,
    /// Fraction of simulated peaks matching the experiment, in [0, 1].
    pub confidence: f64,
    pub cost: f64,
    pub pixel_overlap_ratio: f64,
    pub fitting_time: f64,
    /// Symmetric deformation tensor; identity when the file has none.
    pub deformation: DMat3,
}

impl Default for TriangleVoxel {
    fn default() -> Self {
        Self {
            id: 0,
            vertices: [DVec3::ZERO; 3],
            points_up: true,
            side_length: 0.0,
            generation: 0,
            phase: 0,
            orientation: Orientation::IDENTITY,
            confidence: 0.0,
            cost: 0.0,
            pixel_overlap_ratio: 0.0,
            fitting_time: 0.0,
            deformation: DMat3::IDENTITY,
        }
    }
}

impl TriangleVoxel {
    /// Place a triangle from its anchor vertex.
    ///
    /// The anchor is the left end of the horizontal edge: bottom-left for an up
    /// triangle, top-left for a down triangle.
    pub fn from_anchor(
        anchor: DVec3,
        direction: Direction,
        generation: u32,
        initial_side_length: f64,
    ) -> Self {
        let side = side_length_for_generation(initial_side_length, generation);
        let mut voxel = Self {
            generation,
            ..Default::default()
        };
        voxel.set_geometry(anchor, direction, side);
        voxel
    }

    /// Recompute vertices from an anchor, keeping counter-clockwise winding.
    pub fn set_geometry(&mut self, anchor: DVec3, direction: Direction, side_length: f64) {
        let half = side_length / 2.0;
        let height = half * 3.0_f64.sqrt();
        self.side_length = side_length;
        self.points_up = direction == Direction::Up;
        self.vertices = match direction {
            Direction::Up => [
                anchor,
                anchor + DVec3::new(side_length, 0.0, 0.0),
                anchor + DVec3::new(half, height, 0.0),
            ],
            Direction::Down => [
                anchor,
                anchor + DVec3::new(half, -height, 0.0),
                anchor + DVec3::new(side_length, 0.0, 0.0),
            ],
        };
    }

    pub fn direction(&self) -> Direction {
        if self.points_up {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    /// Index of the vertex written as the anchor.
    ///
    /// Smallest x wins. On a tie the vertex on the horizontal edge is chosen:
    /// the lower one for up triangles, the upper one for down triangles, which
    /// is exactly the vertex [`TriangleVoxel::set_geometry`] treats as anchor.
    pub fn leftmost_vertex(&self) -> usize {
        let mut best = 0;
        for i in 1..3 {
            let candidate = &self.vertices[i];
            let current = &self.vertices[best];
            if candidate.x < current.x {
                best = i;
            } else if candidate.x == current.x {
                let on_edge = if self.points_up {
                    candidate.y < current.y
                } else {
                    candidate.y > current.y
                };
                if on_edge {
                    best = i;
                }
            }
        }
        best
    }

    pub fn anchor(&self) -> DVec3 {
        self.vertices[self.leftmost_vertex()]
    }

    pub fn centroid(&self) -> DVec3 {
        (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0
    }
}

impl Voxel for TriangleVoxel {
    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn side_length(&self) -> f64 {
        self.side_length
    }
}

/// Side length of a triangle at a given subdivision depth.
pub fn side_length_for_generation(initial_side_length: f64, generation: u32) -> f64 {
    initial_side_length / 2.0_f64.powi(generation as i32)
}

/// Axis-aligned square cell of a square mic grid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SquareVoxel {
    pub id: u32,
    pub center: DVec3,
    pub side_length: f64,
    pub phase: i32,
    pub orientation: Orientation,
    pub confidence: f64,
    pub cost: f64,
    pub pixel_overlap_ratio: f64,
    pub fitting_time: f64,
}

impl SquareVoxel {
    pub fn new(center: DVec3, side_length: f64) -> Self {
        Self {
            center,
            side_length,
            ..Default::default()
        }
    }

    pub fn set_center(&mut self, center: DVec3, side_length: f64) {
        self.center = center;
        self.side_length = side_length;
    }

    /// Corner with the smallest x and y.
    pub fn min_corner(&self) -> DVec3 {
        let half = self.side_length / 2.0;
        self.center - DVec3::new(half, half, 0.0)
    }

    /// Corners counter-clockwise, starting from [`SquareVoxel::min_corner`].
    pub fn vertices(&self) -> [DVec3; 4] {
        let min = self.min_corner();
        let s = self.side_length;
        [
            min,
            min + DVec3::new(s, 0.0, 0.0),
            min + DVec3::new(s, s, 0.0),
            min + DVec3::new(0.0, s, 0.0),
        ]
    }
}

impl Voxel for SquareVoxel {
    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn side_length(&self) -> f64 {
        self.side_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_triangle_vertices() {
        let v = TriangleVoxel::from_anchor(DVec3::ZERO, Direction::Up, 0, 2.0);
        assert_eq!(v.side_length, 2.0);
        assert!(v.points_up);
        assert_eq!(v.vertices[0], DVec3::ZERO);
        assert_eq!(v.vertices[1], DVec3::new(2.0, 0.0, 0.0));
        assert!(v.vertices[2].abs_diff_eq(DVec3::new(1.0, 3.0_f64.sqrt(), 0.0), 1e-12));
    }

    #[test]
    fn test_down_triangle_vertices() {
        let v = TriangleVoxel::from_anchor(DVec3::new(1.0, 1.0, 0.5), Direction::Down, 1, 4.0);
        assert_eq!(v.side_length, 2.0);
        assert!(!v.points_up);
        assert_eq!(v.vertices[0], DVec3::new(1.0, 1.0, 0.5));
        assert!(v.vertices[1].abs_diff_eq(DVec3::new(2.0, 1.0 - 3.0_f64.sqrt(), 0.5), 1e-12));
        assert_eq!(v.vertices[2], DVec3::new(3.0, 1.0, 0.5));
    }

    #[test]
    fn test_leftmost_vertex_after_rotation_of_indices() {
        let mut v = TriangleVoxel::from_anchor(DVec3::new(5.0, 0.0, 0.0), Direction::Up, 0, 1.0);
        v.vertices.rotate_left(1);
        assert_eq!(v.leftmost_vertex(), 2);
        assert_eq!(v.anchor(), DVec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_leftmost_vertex_tie_break() {
        let mut up = TriangleVoxel {
            vertices: [
                DVec3::new(0.0, 1.0, 0.0),
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 0.5, 0.0),
            ],
            ..Default::default()
        };
        assert_eq!(up.leftmost_vertex(), 1);

        up.points_up = false;
        assert_eq!(up.leftmost_vertex(), 0);
    }

    #[test]
    fn test_generation_side_length() {
        assert_eq!(side_length_for_generation(8.0, 0), 8.0);
        assert_eq!(side_length_for_generation(8.0, 3), 1.0);
    }

    #[test]
    fn test_direction_codes() {
        assert_eq!(Direction::from_code(1), Direction::Up);
        assert_eq!(Direction::from_code(2), Direction::Down);
        assert_eq!(Direction::from_code(0), Direction::Down);
        assert_eq!(Direction::Up.code(), 1);
        assert_eq!(Direction::Down.code(), 2);
    }

    #[test]
    fn test_square_vertices() {
        let v = SquareVoxel::new(DVec3::new(1.0, 1.0, 0.0), 2.0);
        let corners = v.vertices();
        assert_eq!(corners[0], DVec3::new(0.0, 0.0, 0.0));
        assert_eq!(corners[1], DVec3::new(2.0, 0.0, 0.0));
        assert_eq!(corners[2], DVec3::new(2.0, 2.0, 0.0));
        assert_eq!(corners[3], DVec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_default_deformation_is_identity() {
        assert_eq!(TriangleVoxel::default().deformation, DMat3::IDENTITY);
    }
}
