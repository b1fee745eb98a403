//! Vertex clouds for primitive shapes
//!
//! Only the outline matters for extent estimation, so each shape is reduced to
//! the points on its surface that bound it:
//! - Box (8 corners)
//! - Cylinder along Z (two rims)
//! - Sphere (UV grid)

use std::f32::consts::PI;

use glam::Vec3;

use crate::constants::{CYLINDER_SEGMENTS, SPHERE_LAT_SEGMENTS, SPHERE_LON_SEGMENTS};

use super::Mesh;

/// Box corners for `size` = [x, y, z]
pub fn box_vertices(size: [f32; 3]) -> Vec<Vec3> {
    let half = Vec3::from(size) / 2.0;
    let mut vertices = Vec::with_capacity(8);
    for sx in [-1.0, 1.0] {
        for sy in [-1.0, 1.0] {
            for sz in [-1.0, 1.0] {
                vertices.push(half * Vec3::new(sx, sy, sz));
            }
        }
    }
    vertices
}

/// Rim points of a cylinder along Z
pub fn cylinder_vertices(radius: f32, length: f32) -> Vec<Vec3> {
    cylinder_vertices_with_segments(radius, length, CYLINDER_SEGMENTS)
}

pub fn cylinder_vertices_with_segments(radius: f32, length: f32, segments: u32) -> Vec<Vec3> {
    let half_length = length / 2.0;
    let mut vertices = Vec::with_capacity(segments as usize * 2);

    for i in 0..segments {
        let theta = (i as f32 / segments as f32) * 2.0 * PI;
        let x = radius * theta.cos();
        let y = radius * theta.sin();
        vertices.push(Vec3::new(x, y, -half_length));
        vertices.push(Vec3::new(x, y, half_length));
    }

    vertices
}

/// UV sphere points
pub fn sphere_vertices(radius: f32) -> Vec<Vec3> {
    sphere_vertices_with_segments(radius, SPHERE_LAT_SEGMENTS, SPHERE_LON_SEGMENTS)
}

pub fn sphere_vertices_with_segments(radius: f32, lat_segments: u32, lon_segments: u32) -> Vec<Vec3> {
    let mut vertices = Vec::new();

    for lat in 0..=lat_segments {
        let theta = (lat as f32 / lat_segments as f32) * PI; // 0 to PI
        let sin_theta = theta.sin();
        let cos_theta = theta.cos();

        for lon in 0..lon_segments {
            let phi = (lon as f32 / lon_segments as f32) * 2.0 * PI;
            vertices.push(radius * Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta));
        }
    }

    vertices
}

impl Mesh {
    pub fn cuboid(name: impl Into<String>, size: [f32; 3]) -> Self {
        Mesh::new(name, box_vertices(size))
    }

    pub fn cylinder(name: impl Into<String>, radius: f32, length: f32) -> Self {
        Mesh::new(name, cylinder_vertices(radius, length))
    }

    pub fn sphere(name: impl Into<String>, radius: f32) -> Self {
        Mesh::new(name, sphere_vertices(radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(vertices: &[Vec3]) -> Vec3 {
        let min = vertices.iter().fold(Vec3::splat(f32::MAX), |a, v| a.min(*v));
        let max = vertices.iter().fold(Vec3::splat(f32::MIN), |a, v| a.max(*v));
        max - min
    }

    #[test]
    fn test_box_dimensions() {
        let vertices = box_vertices([2.0, 4.0, 6.0]);
        assert_eq!(vertices.len(), 8);
        let size = bounds(&vertices);
        assert!((size.x - 2.0).abs() < 0.001);
        assert!((size.y - 4.0).abs() < 0.001);
        assert!((size.z - 6.0).abs() < 0.001);
    }

    #[test]
    fn test_cylinder_dimensions() {
        let vertices = cylinder_vertices(0.5, 3.0);
        assert_eq!(vertices.len(), CYLINDER_SEGMENTS as usize * 2);
        let size = bounds(&vertices);
        assert!((size.x - 1.0).abs() < 0.001);
        assert!((size.z - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_sphere_dimensions() {
        let size = bounds(&sphere_vertices(1.5));
        assert!((size.x - 3.0).abs() < 0.001);
        assert!((size.z - 3.0).abs() < 0.001);
    }
}
