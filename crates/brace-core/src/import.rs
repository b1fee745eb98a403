//! URDF import
//!
//! Builds an [`Assembly`] from a URDF robot description. Links become bodies,
//! joints become primary joints, and every movable joint marks its child body
//! as robotic (unlocked) so the reinforcement pass leaves it alone.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::assembly::{Assembly, AssemblyError, AttachNode, Body, BodyId, Capability, Pose};
use crate::constants::DEFAULT_NODE_SIZE;
use crate::geometry::{load_mesh, Mesh, MeshFormat, MeshUnit};

/// Import options for URDF loading
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Base directory for resolving relative mesh paths (defaults to the URDF's directory)
    pub base_dir: Option<PathBuf>,
    /// Unit of mesh files referenced by the URDF
    pub mesh_unit: MeshUnit,
    /// Package name to root directory, for package:// URIs
    pub package_paths: HashMap<String, PathBuf>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            base_dir: None,
            mesh_unit: MeshUnit::Meters,
            package_paths: HashMap::new(),
        }
    }
}

impl ImportOptions {
    /// Add a package path mapping
    pub fn add_package_path(&mut self, package_name: impl Into<String>, path: impl Into<PathBuf>) {
        self.package_paths.insert(package_name.into(), path.into());
    }
}

/// Errors that can occur during URDF import
#[derive(Debug, Clone, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to parse URDF: {0}")]
    UrdfParse(String),

    #[error("Mesh file not found: {path}")]
    MeshNotFound { path: String },

    #[error("Failed to load mesh '{path}': {reason}")]
    MeshLoad { path: String, reason: String },

    #[error("Unsupported mesh format: {0}")]
    UnsupportedMeshFormat(String),

    #[error("Package not found: {package} (from URI: {uri})")]
    PackageNotFound { package: String, uri: String },

    #[error("Link not found: {0}")]
    LinkNotFound(String),

    #[error("Empty URDF: no links defined")]
    EmptyUrdf,

    #[error("Invalid joint '{joint}': {source}")]
    Joint {
        joint: String,
        #[source]
        source: AssemblyError,
    },
}

/// Import a URDF file
pub fn import_urdf(urdf_path: impl AsRef<Path>, options: &ImportOptions) -> Result<Assembly, ImportError> {
    let urdf_path = urdf_path.as_ref();
    let robot = urdf_rs::read_file(urdf_path).map_err(|e| ImportError::UrdfParse(e.to_string()))?;

    let base_dir = options.base_dir.clone().unwrap_or_else(|| {
        urdf_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let assembly = build_assembly(&robot, &base_dir, options)?;
    tracing::info!(
        "Imported '{}' from {}: {} bodies",
        assembly.name,
        urdf_path.display(),
        assembly.body_count()
    );
    Ok(assembly)
}

/// Import a URDF document held in memory
pub fn import_urdf_str(xml: &str, options: &ImportOptions) -> Result<Assembly, ImportError> {
    let robot = urdf_rs::read_from_string(xml).map_err(|e| ImportError::UrdfParse(e.to_string()))?;
    let base_dir = options.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    build_assembly(&robot, &base_dir, options)
}

fn build_assembly(
    robot: &urdf_rs::Robot,
    base_dir: &Path,
    options: &ImportOptions,
) -> Result<Assembly, ImportError> {
    if robot.links.is_empty() {
        return Err(ImportError::EmptyUrdf);
    }

    let mut assembly = Assembly::new(robot.name.clone());
    let mut link_to_body: HashMap<&str, BodyId> = HashMap::new();

    for link in &robot.links {
        let mut body = Body::new(link.name.clone(), link.inertial.mass.value as f32);
        for (i, visual) in link.visual.iter().enumerate() {
            let name = visual
                .name
                .clone()
                .unwrap_or_else(|| format!("{}_visual_{}", link.name, i));
            let mesh = visual_mesh(&visual.geometry, &name, base_dir, options)?;
            body.meshes.push(mesh.with_origin(Pose::from(&visual.origin)));
        }
        link_to_body.insert(link.name.as_str(), assembly.add_body(body));
    }

    for joint in &robot.joints {
        let parent = *link_to_body
            .get(joint.parent.link.as_str())
            .ok_or_else(|| ImportError::LinkNotFound(joint.parent.link.clone()))?;
        let child = *link_to_body
            .get(joint.child.link.as_str())
            .ok_or_else(|| ImportError::LinkNotFound(joint.child.link.clone()))?;

        // The primary joint's connected anchor is taken from the offset
        let origin = Pose::from(&joint.origin);
        if let Some(body) = assembly.body_mut(child) {
            body.local_offset = origin;
        }

        let joint_id = assembly
            .connect(parent, child)
            .map_err(|source| ImportError::Joint {
                joint: joint.name.clone(),
                source,
            })?;

        let axis = Vec3::new(
            joint.axis.xyz.0[0] as f32,
            joint.axis.xyz.0[1] as f32,
            joint.axis.xyz.0[2] as f32,
        );
        if let Some(primary) = assembly.joint_mut(joint_id) {
            primary.axis = axis.normalize_or_zero();
        }

        // Parent origin seen from the child frame
        let towards_parent = -(origin.to_quat().inverse() * origin.position());
        let towards_parent = if towards_parent.length_squared() > 0.0 {
            towards_parent.normalize()
        } else {
            -Vec3::Y
        };

        if let Some(body) = assembly.body_mut(child) {
            body.attach_nodes.push(
                AttachNode::stack(joint.name.clone(), Vec3::ZERO, towards_parent, DEFAULT_NODE_SIZE)
                    .attached_to(parent),
            );
            if !matches!(joint.joint_type, urdf_rs::JointType::Fixed) {
                body.capabilities.push(Capability::Robotic { locked: false });
            }
        }
    }

    assembly.update_world_transforms();
    Ok(assembly)
}

/// Vertex cloud for one visual geometry element
fn visual_mesh(
    geometry: &urdf_rs::Geometry,
    name: &str,
    base_dir: &Path,
    options: &ImportOptions,
) -> Result<Mesh, ImportError> {
    let mesh = match geometry {
        urdf_rs::Geometry::Mesh { filename, scale } => {
            let path = resolve_mesh_path(filename, base_dir, &options.package_paths)?;
            let mut mesh = load_mesh(&path, options.mesh_unit).map_err(|e| ImportError::MeshLoad {
                path: filename.clone(),
                reason: e.to_string(),
            })?;
            if let Some(s) = scale {
                let factor = Vec3::new(s.0[0] as f32, s.0[1] as f32, s.0[2] as f32);
                for vertex in &mut mesh.vertices {
                    *vertex *= factor;
                }
            }
            mesh.name = name.to_string();
            mesh
        }
        urdf_rs::Geometry::Box { size } => {
            Mesh::cuboid(name, [size.0[0] as f32, size.0[1] as f32, size.0[2] as f32])
        }
        urdf_rs::Geometry::Cylinder { radius, length } => {
            Mesh::cylinder(name, *radius as f32, *length as f32)
        }
        // Capsule approximated by its cylinder plus end caps
        urdf_rs::Geometry::Capsule { radius, length } => {
            Mesh::cylinder(name, *radius as f32, (*length + 2.0 * *radius) as f32)
        }
        urdf_rs::Geometry::Sphere { radius } => Mesh::sphere(name, *radius as f32),
    };
    Ok(mesh)
}

fn check_format(path: &str, uri: &str) -> Result<(), ImportError> {
    match MeshFormat::from_path(Path::new(path)) {
        MeshFormat::Unknown => Err(ImportError::UnsupportedMeshFormat(uri.to_string())),
        _ => Ok(()),
    }
}

/// Resolve mesh path from URDF filename reference
fn resolve_mesh_path(
    filename: &str,
    base_dir: &Path,
    package_paths: &HashMap<String, PathBuf>,
) -> Result<PathBuf, ImportError> {
    if let Some(rest) = filename.strip_prefix("package://") {
        return resolve_package_uri(rest, filename, package_paths, base_dir);
    }

    let path_str = filename.strip_prefix("file://").unwrap_or(filename);
    check_format(path_str, filename)?;

    let path = if Path::new(path_str).is_absolute() {
        PathBuf::from(path_str)
    } else {
        base_dir.join(path_str)
    };
    if !path.exists() {
        return Err(ImportError::MeshNotFound {
            path: path.to_string_lossy().to_string(),
        });
    }
    Ok(path)
}

/// Resolve a package:// URI to a filesystem path
fn resolve_package_uri(
    rest: &str,
    original_uri: &str,
    package_paths: &HashMap<String, PathBuf>,
    base_dir: &Path,
) -> Result<PathBuf, ImportError> {
    let (package_name, relative_path) = rest.split_once('/').unwrap_or((rest, ""));
    check_format(relative_path, original_uri)?;

    if let Some(root) = package_paths.get(package_name) {
        let path = root.join(relative_path);
        if path.exists() {
            return Ok(path);
        }
    }

    // URDF often lives in a urdf/ directory of its own package
    let candidates = [
        base_dir.join(relative_path),
        base_dir.join("..").join(relative_path),
        base_dir.join("..").join(package_name).join(relative_path),
    ];
    if let Some(path) = candidates.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    Err(ImportError::PackageNotFound {
        package: package_name.to_string(),
        uri: original_uri.to_string(),
    })
}
