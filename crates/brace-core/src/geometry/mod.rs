//! Body geometry: meshes, primitive shapes and cross-section estimation

mod mesh;
mod primitive;
mod section;

pub use mesh::{load_mesh, load_obj, load_stl, Mesh, MeshError, MeshFormat, MeshUnit};
pub use primitive::{
    box_vertices, cylinder_vertices, cylinder_vertices_with_segments, sphere_vertices,
    sphere_vertices_with_segments,
};
pub use section::{
    estimate_cross_section, extents, extents_along, extents_oriented, guess_up_vector,
    radius_along, CrossSection,
};
