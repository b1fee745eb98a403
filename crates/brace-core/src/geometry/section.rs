//! Cross-section estimation from body geometry
//!
//! Extents are measured in a frame whose Y axis is aligned with the requested
//! direction; the cross-section lies in the frame's XZ plane.

use std::f32::consts::PI;

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::assembly::{Body, NodeKind};
use crate::constants::{ALIGNMENT_COSINE, VOLUME_EXPONENT};

/// Estimated silhouette of a body across a connection
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CrossSection {
    pub radius: f32,
    pub area: f32,
    pub moment_of_inertia: f32,
}

impl CrossSection {
    pub const ZERO: CrossSection = CrossSection {
        radius: 0.0,
        area: 0.0,
        moment_of_inertia: 0.0,
    };

    /// Solid cylinder of the given radius
    pub fn circular(radius: f32) -> Self {
        let area = PI * radius * radius;
        Self {
            radius,
            area,
            moment_of_inertia: area * radius * radius / 4.0,
        }
    }

    /// Thin rectangle bending along its longer side
    pub fn rectangular(height: f32, width: f32) -> Self {
        let area = height * width;
        let radius = height.max(width);
        Self {
            radius,
            area,
            moment_of_inertia: area * radius / 12.0,
        }
    }

    /// Rectangle for a side-by-side connection between two bodies.
    ///
    /// Extents have Y along the connection normal and X/Z along the surface;
    /// the lateral sides are averaged and the larger face wins.
    pub fn from_side_extents(a: Vec3, b: Vec3) -> Self {
        let width_a = (a.x + a.z) / 2.0;
        let width_b = (b.x + b.z) / 2.0;
        if a.y * width_a > b.y * width_b {
            Self::rectangular(a.y, width_a)
        } else {
            Self::rectangular(b.y, width_b)
        }
    }

    /// Scale area and moment of inertia like a volume
    pub fn volumetric(self) -> Self {
        Self {
            radius: self.radius,
            area: self.area.powf(VOLUME_EXPONENT),
            moment_of_inertia: self.moment_of_inertia.powf(VOLUME_EXPONENT),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.area == 0.0 && self.moment_of_inertia == 0.0
    }
}

fn unit_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let n = v.normalize_or_zero();
    if n == Vec3::ZERO { fallback } else { n }
}

/// Size of the body's geometry in the frame given by `alignment`
pub fn extents(body: &Body, alignment: Quat) -> Vec3 {
    let to_frame = Mat4::from_quat(alignment.inverse());

    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    let mut any = false;
    for mesh in &body.meshes {
        for v in mesh.transformed_vertices(to_frame) {
            min = min.min(v);
            max = max.max(v);
            any = true;
        }
    }

    if !any {
        tracing::warn!("Extents could not be built for body '{}'", body.name);
        return Vec3::ZERO;
    }

    tracing::trace!("Extents of '{}': {} .. {}", body.name, min, max);
    max - min
}

/// Extents with Y aligned to `up`
pub fn extents_along(body: &Body, up: Vec3) -> Vec3 {
    let up = unit_or(up, Vec3::Y);
    if up.y.abs() < ALIGNMENT_COSINE {
        extents(body, Quat::from_rotation_arc(Vec3::Y, up))
    } else {
        extents(body, Quat::IDENTITY)
    }
}

/// Extents with Y aligned to `up` and Z to `forward` (made orthogonal to `up`)
pub fn extents_oriented(body: &Body, up: Vec3, forward: Vec3) -> Vec3 {
    let up = unit_or(up, Vec3::Y);
    let forward = (forward - up * forward.dot(up)).normalize_or_zero();
    if forward == Vec3::ZERO {
        return extents_along(body, up);
    }
    let frame = Mat3::from_cols(up.cross(forward), up, forward);
    extents(body, Quat::from_mat3(&frame))
}

/// Radius of the ellipse inscribed in the cross-section normal to `axis`
pub fn radius_along(body: &Body, axis: Vec3) -> f32 {
    let size = extents_along(body, axis);
    (size.x * size.z).sqrt() / 2.0
}

/// Best guess of a body's main axis in local coordinates
pub fn guess_up_vector(body: &Body) -> Vec3 {
    if let Some(direction) = body.intake_direction() {
        return unit_or(direction, Vec3::Y);
    }

    let surface_up = body
        .surface_node
        .as_ref()
        .is_some_and(|node| unit_or(node.orientation, Vec3::ZERO).y.abs() > ALIGNMENT_COSINE);

    if body.surface_attachable && surface_up {
        // Node normal straight up: the body is oriented forward along the parent
        let mut dir = Vec3::Z;
        let mut first = true;
        for node in body.attach_nodes.iter().filter(|n| n.kind != NodeKind::Surface) {
            let orientation = unit_or(node.orientation, Vec3::Y);
            if first {
                first = false;
                dir = orientation;
            } else if dir.dot(orientation).abs() < ALIGNMENT_COSINE {
                return Vec3::Y;
            }
        }
        tracing::debug!("'{}': choosing axis {} for surface attach", body.name, dir);
        return dir;
    }

    Vec3::Y
}

/// Circular cross-section of `body` normal to `axis` (guessed when `None`)
pub fn estimate_cross_section(body: &Body, axis: Option<Vec3>, use_volume: bool) -> CrossSection {
    let axis = axis.unwrap_or_else(|| guess_up_vector(body));
    let section = CrossSection::circular(radius_along(body, axis));
    if use_volume {
        section.volumetric()
    } else {
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::AttachNode;
    use crate::geometry::Mesh;
    use approx::assert_relative_eq;

    fn boxed(size: [f32; 3]) -> Body {
        Body::new("box", 1.0).with_mesh(Mesh::cuboid("box", size))
    }

    #[test]
    fn test_circular_section() {
        let section = CrossSection::circular(1.0);
        assert_relative_eq!(section.area, PI);
        assert_relative_eq!(section.moment_of_inertia, PI / 4.0);
    }

    #[test]
    fn test_side_extents_pick_larger_face() {
        let section = CrossSection::from_side_extents(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(section.area, 4.0);
        assert_relative_eq!(section.radius, 2.0);
        assert_relative_eq!(section.moment_of_inertia, 4.0 * 2.0 / 12.0);
    }

    #[test]
    fn test_volumetric_scaling() {
        let section = CrossSection::rectangular(4.0, 1.0).volumetric();
        assert_relative_eq!(section.area, 8.0);
        assert_relative_eq!(section.radius, 4.0);
    }

    #[test]
    fn test_extents_along_axes() {
        let body = boxed([2.0, 4.0, 6.0]);
        let up = extents_along(&body, Vec3::Y);
        assert_relative_eq!(up.y, 4.0, epsilon = 1e-5);

        let side = extents_along(&body, Vec3::X);
        assert_relative_eq!(side.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(side.x * side.z, 24.0, epsilon = 1e-4);
    }

    #[test]
    fn test_extents_oriented() {
        let body = boxed([2.0, 4.0, 6.0]);
        let size = extents_oriented(&body, Vec3::X, Vec3::Y);
        assert_relative_eq!(size.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(size.z, 4.0, epsilon = 1e-5);
        assert_relative_eq!(size.x, 6.0, epsilon = 1e-5);
    }

    #[test]
    fn test_radius_along() {
        let body = boxed([2.0, 4.0, 2.0]);
        assert_relative_eq!(radius_along(&body, Vec3::Y), 1.0, epsilon = 1e-5);
        assert_relative_eq!(radius_along(&body, Vec3::X), 8.0_f32.sqrt() / 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_missing_geometry_gives_zero_section() {
        let body = Body::new("bare", 1.0);
        let section = estimate_cross_section(&body, Some(Vec3::Y), true);
        assert_eq!(section, CrossSection::ZERO);
        assert!(section.is_zero());
    }

    #[test]
    fn test_guess_up_vector_intake() {
        let body = Body::new("intake", 0.1).with_capability(crate::assembly::Capability::Intake {
            direction: Vec3::new(0.0, 0.0, 2.0),
        });
        assert_eq!(guess_up_vector(&body), Vec3::Z);
    }

    #[test]
    fn test_guess_up_vector_surface_nodes() {
        let body = Body::new("adapter", 0.1)
            .surface_attached(AttachNode::surface("srf", Vec3::ZERO, Vec3::Y))
            .with_node(AttachNode::stack("a", Vec3::X, Vec3::X, 1.0))
            .with_node(AttachNode::stack("b", -Vec3::X, -Vec3::X, 1.0));
        assert_eq!(guess_up_vector(&body), Vec3::X);

        let conflicting = Body::new("adapter", 0.1)
            .surface_attached(AttachNode::surface("srf", Vec3::ZERO, Vec3::Y))
            .with_node(AttachNode::stack("a", Vec3::X, Vec3::X, 1.0))
            .with_node(AttachNode::stack("b", Vec3::Z, Vec3::Z, 1.0));
        assert_eq!(guess_up_vector(&conflicting), Vec3::Y);

        let no_nodes = Body::new("plate", 0.1)
            .surface_attached(AttachNode::surface("srf", Vec3::ZERO, -Vec3::Y));
        assert_eq!(guess_up_vector(&no_nodes), Vec3::Z);
    }

    #[test]
    fn test_guess_up_vector_default() {
        let body = Body::new("tank", 1.0)
            .surface_attached(AttachNode::surface("srf", Vec3::ZERO, Vec3::X));
        assert_eq!(guess_up_vector(&body), Vec3::Y);
    }
}
