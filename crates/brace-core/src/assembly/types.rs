//! Body types for the assembly tree

use std::fmt;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::geometry::Mesh;
use crate::settings::ReinforcementSettings;

use super::joint::JointId;

/// Stable index of a body within one assembly (never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position and orientation relative to a parent frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub xyz: [f32; 3],
    pub rpy: [f32; 3], // roll, pitch, yaw in radians
}

impl Pose {
    pub fn new(xyz: [f32; 3], rpy: [f32; 3]) -> Self {
        Self { xyz, rpy }
    }

    pub fn from_position(xyz: [f32; 3]) -> Self {
        Self { xyz, rpy: [0.0; 3] }
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.to_quat(), self.position())
    }

    pub fn to_quat(&self) -> Quat {
        Quat::from_euler(glam::EulerRot::XYZ, self.rpy[0], self.rpy[1], self.rpy[2])
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.xyz)
    }
}

impl From<&urdf_rs::Pose> for Pose {
    fn from(urdf_pose: &urdf_rs::Pose) -> Self {
        Self {
            xyz: [
                urdf_pose.xyz.0[0] as f32,
                urdf_pose.xyz.0[1] as f32,
                urdf_pose.xyz.0[2] as f32,
            ],
            rpy: [
                urdf_pose.rpy.0[0] as f32,
                urdf_pose.rpy.0[1] as f32,
                urdf_pose.rpy.0[2] as f32,
            ],
        }
    }
}

/// Kind of attach node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    Stack,
    Surface,
}

/// A connection point declared by a body, in the body's local frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachNode {
    pub id: String,
    pub kind: NodeKind,
    pub position: Vec3,
    /// Direction the node faces
    pub orientation: Vec3,
    pub offset: Vec3,
    /// Nominal connection size
    pub size: f32,
    /// Body attached through this node, if any
    pub attached_body: Option<BodyId>,
}

impl Default for AttachNode {
    fn default() -> Self {
        Self {
            id: String::new(),
            kind: NodeKind::Stack,
            position: Vec3::ZERO,
            orientation: Vec3::Y,
            offset: Vec3::ZERO,
            size: 1.0,
            attached_body: None,
        }
    }
}

impl AttachNode {
    /// Create a stack node facing `orientation`
    pub fn stack(id: impl Into<String>, position: Vec3, orientation: Vec3, size: f32) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Stack,
            position,
            orientation,
            size,
            ..Default::default()
        }
    }

    /// Create a surface node facing `orientation`
    pub fn surface(id: impl Into<String>, position: Vec3, orientation: Vec3) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Surface,
            position,
            orientation,
            ..Default::default()
        }
    }

    /// Mark the node as occupied by `body`
    pub fn attached_to(mut self, body: BodyId) -> Self {
        self.attached_body = Some(body);
        self
    }
}

/// How a body is attached to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttachMode {
    #[default]
    Stack,
    SurfaceAttach,
}

/// Joint method of the primary connection; `LockedJoint` marks a processed body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttachMethod {
    #[default]
    FixedJoint,
    LockedJoint,
}

/// Whether a body takes part in physics on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhysicalSignificance {
    #[default]
    Full,
    None,
}

/// Behaviors a body can carry that influence reinforcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Capability {
    /// Resource intake; `direction` is the intake axis in local coordinates
    Intake { direction: Vec3 },
    /// Docking port, optionally docked to another body
    DockingPort {
        docked_to: Option<BodyId>,
        reference_node: Option<String>,
    },
    /// Separates the assembly when fired
    Decoupler,
    /// Strut between two other bodies through its own joint
    Strut {
        target: Option<BodyId>,
        root: Option<BodyId>,
        joint: Option<JointId>,
    },
    /// Servo or hinge whose joint can be unlocked
    Robotic { locked: bool },
}

/// A rigid body in the assembly tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Body {
    pub name: String,
    /// Dry mass
    pub mass: f32,
    /// Mass of carried resources
    pub resource_mass: f32,
    /// Transform relative to the parent body
    pub local_offset: Pose,
    /// Transform of this body in world space (computed)
    #[serde(skip)]
    pub world_transform: Mat4,
    pub meshes: Vec<Mesh>,
    pub attach_nodes: Vec<AttachNode>,
    pub surface_node: Option<AttachNode>,
    pub surface_attachable: bool,
    pub attach_mode: AttachMode,
    pub attach_method: AttachMethod,
    pub physical_significance: PhysicalSignificance,
    pub has_rigid_body: bool,
    /// Names of the modules the body carries
    pub modules: Vec<String>,
    pub capabilities: Vec<Capability>,
    /// Default break force for joints touching this body
    pub breaking_force: f32,
    /// Default break torque for joints touching this body
    pub breaking_torque: f32,
    pub crash_tolerance: f32,
    /// Primary joint to the parent
    pub attach_joint: Option<JointId>,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            name: String::new(),
            mass: 1.0,
            resource_mass: 0.0,
            local_offset: Pose::default(),
            world_transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            attach_nodes: Vec::new(),
            surface_node: None,
            surface_attachable: false,
            attach_mode: AttachMode::Stack,
            attach_method: AttachMethod::FixedJoint,
            physical_significance: PhysicalSignificance::Full,
            has_rigid_body: true,
            modules: Vec::new(),
            capabilities: Vec::new(),
            breaking_force: 22.0,
            breaking_torque: 22.0,
            crash_tolerance: 9.0,
            attach_joint: None,
        }
    }
}

impl Body {
    /// Create a body with a name and dry mass
    pub fn new(name: impl Into<String>, mass: f32) -> Self {
        Self {
            name: name.into(),
            mass,
            ..Default::default()
        }
    }

    pub fn with_resource_mass(mut self, resource_mass: f32) -> Self {
        self.resource_mass = resource_mass;
        self
    }

    pub fn with_offset(mut self, offset: Pose) -> Self {
        self.local_offset = offset;
        self
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn with_node(mut self, node: AttachNode) -> Self {
        self.attach_nodes.push(node);
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.modules.push(module.into());
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_breaking(mut self, force: f32, torque: f32) -> Self {
        self.breaking_force = force;
        self.breaking_torque = torque;
        self
    }

    /// Attach to the parent through a surface node
    pub fn surface_attached(mut self, node: AttachNode) -> Self {
        self.surface_node = Some(node);
        self.surface_attachable = true;
        self.attach_mode = AttachMode::SurfaceAttach;
        self
    }

    /// Own mass plus carried resources
    pub fn effective_mass(&self) -> f32 {
        self.mass + self.resource_mass
    }

    /// Whether the body has been processed in this topology generation
    pub fn is_locked(&self) -> bool {
        self.attach_method == AttachMethod::LockedJoint
    }

    pub fn is_physically_significant(&self) -> bool {
        self.physical_significance == PhysicalSignificance::Full
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
    }

    /// Attach node connecting this body to `other`
    pub fn find_attach_node_by_body(&self, other: BodyId) -> Option<&AttachNode> {
        self.attach_nodes
            .iter()
            .find(|n| n.attached_body == Some(other))
    }

    /// Attach node by its id
    pub fn find_attach_node(&self, id: &str) -> Option<&AttachNode> {
        self.attach_nodes.iter().find(|n| n.id == id)
    }

    /// Intake axis in local coordinates
    pub fn intake_direction(&self) -> Option<Vec3> {
        self.capabilities.iter().find_map(|c| match c {
            Capability::Intake { direction } => Some(*direction),
            _ => None,
        })
    }

    /// Docking port state: (docked body, reference node id)
    pub fn docking_port(&self) -> Option<(Option<BodyId>, Option<&str>)> {
        self.capabilities.iter().find_map(|c| match c {
            Capability::DockingPort {
                docked_to,
                reference_node,
            } => Some((*docked_to, reference_node.as_deref())),
            _ => None,
        })
    }

    /// Strut link: (target, root, strut joint)
    pub fn strut(&self) -> Option<(Option<BodyId>, Option<BodyId>, Option<JointId>)> {
        self.capabilities.iter().find_map(|c| match c {
            Capability::Strut {
                target,
                root,
                joint,
            } => Some((*target, *root, *joint)),
            _ => None,
        })
    }

    pub fn is_decoupler(&self) -> bool {
        self.capabilities
            .iter()
            .any(|c| matches!(c, Capability::Decoupler))
    }

    /// Whether a robotic joint on this body is currently unlocked
    pub fn has_unlocked_joint(&self) -> bool {
        self.capabilities
            .iter()
            .any(|c| matches!(c, Capability::Robotic { locked: false }))
    }

    /// Set the lock state of every robotic capability
    pub fn set_robotic_lock(&mut self, locked: bool) {
        for capability in &mut self.capabilities {
            if let Capability::Robotic { locked: state } = capability {
                *state = locked;
            }
        }
    }

    /// World-space rotation of the body
    pub fn world_rotation(&self) -> Quat {
        let (_, rotation, _) = self.world_transform.to_scale_rotation_translation();
        rotation
    }

    /// World-space position of the body
    pub fn world_position(&self) -> Vec3 {
        self.world_transform.w_axis.truncate()
    }
}

/// Capability lookup for a body, resolved once per pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BodyClass {
    /// Joint may be adjusted (not exempt, no unlocked robotic joint)
    pub adjustment_valid: bool,
    pub decoupler: bool,
    /// Decoupler stiffening extends past this body
    pub stiffening_extension: bool,
    /// Carries a strut with both ends set
    pub strut: bool,
}

impl BodyClass {
    pub fn resolve(body: &Body, settings: &ReinforcementSettings) -> Self {
        let exempt = body.modules.iter().any(|m| settings.is_exempt_module(m));
        let strut = matches!(body.strut(), Some((Some(_), Some(_), _)));
        Self {
            adjustment_valid: !exempt && !body.has_unlocked_joint(),
            decoupler: body.is_decoupler(),
            stiffening_extension: body
                .modules
                .iter()
                .any(|m| settings.is_stiffening_extension(m)),
            strut,
        }
    }
}
