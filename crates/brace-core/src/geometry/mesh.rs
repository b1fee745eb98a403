//! Body geometry and mesh file loading (STL, OBJ)

use std::collections::HashSet;
use std::io::BufReader;
use std::path::Path;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::assembly::Pose;
use crate::constants::STL_VERTEX_PRECISION;

/// Vertex cloud attached to a body, placed by `origin` in the body frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vec3>,
    #[serde(default)]
    pub origin: Pose,
}

impl Mesh {
    pub fn new(name: impl Into<String>, vertices: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            vertices,
            origin: Pose::default(),
        }
    }

    /// Place the mesh in the body frame
    pub fn with_origin(mut self, origin: Pose) -> Self {
        self.origin = origin;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertices mapped through `to_frame * origin`
    pub fn transformed_vertices(&self, to_frame: Mat4) -> impl Iterator<Item = Vec3> + '_ {
        let matrix = to_frame * self.origin.to_mat4();
        self.vertices.iter().map(move |v| matrix.transform_point3(*v))
    }
}

/// Mesh import scale unit
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MeshUnit {
    /// Meters (no scaling)
    #[default]
    Meters,
    /// Millimeters (scale by 0.001)
    Millimeters,
    /// Centimeters (scale by 0.01)
    Centimeters,
    /// Inches (scale by 0.0254)
    Inches,
}

impl MeshUnit {
    pub fn scale_factor(&self) -> f32 {
        match self {
            MeshUnit::Meters => 1.0,
            MeshUnit::Millimeters => 0.001,
            MeshUnit::Centimeters => 0.01,
            MeshUnit::Inches => 0.0254,
        }
    }
}

/// Detect mesh format from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
    Unknown,
}

impl MeshFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Some("stl") => MeshFormat::Stl,
            Some("obj") => MeshFormat::Obj,
            _ => MeshFormat::Unknown,
        }
    }
}

fn mesh_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed")
        .to_string()
}

/// Load an STL file
pub fn load_stl(path: impl AsRef<Path>, unit: MeshUnit) -> Result<Mesh, MeshError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| MeshError::Io(e.to_string()))?;
    let mut reader = BufReader::new(file);

    let stl = stl_io::read_stl(&mut reader).map_err(|e| MeshError::Parse(e.to_string()))?;
    if stl.vertices.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    let scale = unit.scale_factor();

    // Quantize for deduplication; only the vertex cloud is kept
    let mut seen: HashSet<[i32; 3]> = HashSet::new();
    let mut vertices = Vec::with_capacity(stl.vertices.len());
    for vertex in &stl.vertices {
        let v = Vec3::new(vertex[0], vertex[1], vertex[2]) * scale;
        let key = [
            (v.x * STL_VERTEX_PRECISION) as i32,
            (v.y * STL_VERTEX_PRECISION) as i32,
            (v.z * STL_VERTEX_PRECISION) as i32,
        ];
        if seen.insert(key) {
            vertices.push(v);
        }
    }

    Ok(Mesh::new(mesh_name(path), vertices))
}

/// Load an OBJ file, combining all models
pub fn load_obj(path: impl AsRef<Path>, unit: MeshUnit) -> Result<Mesh, MeshError> {
    let path = path.as_ref();

    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| MeshError::Parse(e.to_string()))?;

    let scale = unit.scale_factor();
    let vertices: Vec<Vec3> = models
        .iter()
        .flat_map(|model| model.mesh.positions.chunks_exact(3))
        .map(|chunk| Vec3::new(chunk[0], chunk[1], chunk[2]) * scale)
        .collect();

    if vertices.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    Ok(Mesh::new(mesh_name(path), vertices))
}

/// Load any supported mesh format
pub fn load_mesh(path: impl AsRef<Path>, unit: MeshUnit) -> Result<Mesh, MeshError> {
    let path = path.as_ref();
    match MeshFormat::from_path(path) {
        MeshFormat::Stl => load_stl(path, unit),
        MeshFormat::Obj => load_obj(path, unit),
        MeshFormat::Unknown => Err(MeshError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_string(),
        )),
    }
}

/// Mesh-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Empty mesh: no geometry found")]
    EmptyMesh,
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
