//! Structural joints and builder

use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::BodyId;

/// Unique joint identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointId(pub Uuid);

impl JointId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JointId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a joint in the assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointKind {
    /// Connects a body to its parent
    Primary,
    /// Skips past light intermediate bodies
    LongRange,
    /// Links leaves to each other and to the root
    Lattice,
    /// Stiffens across a decoupler
    Decoupler,
    /// Joint owned by a strut
    Strut,
}

impl JointKind {
    /// Whether the joint was created by reinforcement
    pub fn is_reinforcement(&self) -> bool {
        matches!(
            self,
            JointKind::LongRange | JointKind::Lattice | JointKind::Decoupler
        )
    }
}

/// Freedom of one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Motion {
    #[default]
    Free,
    Limited,
    Locked,
}

/// Per-axis motion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MotionLocks {
    pub x: Motion,
    pub y: Motion,
    pub z: Motion,
    pub angular_x: Motion,
    pub angular_y: Motion,
    pub angular_z: Motion,
}

impl MotionLocks {
    pub fn all_locked() -> Self {
        Self {
            x: Motion::Locked,
            y: Motion::Locked,
            z: Motion::Locked,
            angular_x: Motion::Locked,
            angular_y: Motion::Locked,
            angular_z: Motion::Locked,
        }
    }

    pub fn is_fully_locked(&self) -> bool {
        [
            self.x,
            self.y,
            self.z,
            self.angular_x,
            self.angular_y,
            self.angular_z,
        ]
        .iter()
        .all(|m| *m == Motion::Locked)
    }
}

/// Spring/damper drive
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointDrive {
    pub position_spring: f32,
    pub position_damper: f32,
    pub maximum_force: f32,
}

/// Soft limit with its spring
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SoftLimit {
    pub limit: f32,
    pub bounciness: f32,
    pub spring: f32,
    pub damper: f32,
}

/// A constraint between a host body and a connected body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralJoint {
    pub id: JointId,
    pub kind: JointKind,
    /// Body that owns the joint
    pub host: BodyId,
    /// Other end (`None` = world)
    pub connected: Option<BodyId>,
    pub anchor: Vec3,
    pub connected_anchor: Vec3,
    pub axis: Vec3,
    pub secondary_axis: Vec3,
    pub linear_drive: JointDrive,
    pub angular_drive: JointDrive,
    pub linear_limit: SoftLimit,
    pub angular_limit: SoftLimit,
    pub target_velocity: Vec3,
    pub target_angular_velocity: Vec3,
    pub target_position: Vec3,
    pub target_rotation: Quat,
    pub break_force: f32,
    pub break_torque: f32,
    pub motion: MotionLocks,
    /// Temporary override that ignores break thresholds
    #[serde(default)]
    pub unbreakable: bool,
}

impl StructuralJoint {
    /// Create a builder for a joint hosted by `host`
    pub fn builder(kind: JointKind, host: BodyId) -> JointBuilder {
        JointBuilder::new(kind, host)
    }

    /// Whether the joint connects the unordered pair {a, b}
    pub fn connects(&self, a: BodyId, b: BodyId) -> bool {
        (self.host == a && self.connected == Some(b)) || (self.host == b && self.connected == Some(a))
    }

    /// Whether either end of the joint is `body`
    pub fn touches(&self, body: BodyId) -> bool {
        self.host == body || self.connected == Some(body)
    }

    /// The end opposite to `body`
    pub fn other_end(&self, body: BodyId) -> Option<BodyId> {
        if self.host == body {
            self.connected
        } else if self.connected == Some(body) {
            Some(self.host)
        } else {
            None
        }
    }

    /// Break force taking the unbreakable override into account
    pub fn effective_break_force(&self) -> f32 {
        if self.unbreakable {
            f32::INFINITY
        } else {
            self.break_force
        }
    }

    /// Break torque taking the unbreakable override into account
    pub fn effective_break_torque(&self) -> f32 {
        if self.unbreakable {
            f32::INFINITY
        } else {
            self.break_torque
        }
    }

    pub fn lock_all(&mut self) {
        self.motion = MotionLocks::all_locked();
    }

    /// Zero soft limits and motion targets
    pub fn clear_limits_and_targets(&mut self) {
        self.linear_limit = SoftLimit::default();
        self.angular_limit = SoftLimit::default();
        self.target_velocity = Vec3::ZERO;
        self.target_angular_velocity = Vec3::ZERO;
        self.target_position = Vec3::ZERO;
        self.target_rotation = Quat::IDENTITY;
    }
}

/// Builder for creating joints with fluent API
#[derive(Debug, Clone)]
pub struct JointBuilder {
    kind: JointKind,
    host: BodyId,
    connected: Option<BodyId>,
    anchor: Vec3,
    connected_anchor: Vec3,
    axis: Vec3,
    secondary_axis: Vec3,
    linear_drive: JointDrive,
    angular_drive: JointDrive,
    break_force: f32,
    break_torque: f32,
    motion: MotionLocks,
}

impl JointBuilder {
    pub fn new(kind: JointKind, host: BodyId) -> Self {
        Self {
            kind,
            host,
            connected: None,
            anchor: Vec3::ZERO,
            connected_anchor: Vec3::ZERO,
            axis: Vec3::X,
            secondary_axis: Vec3::Z,
            linear_drive: JointDrive::default(),
            angular_drive: JointDrive::default(),
            break_force: f32::INFINITY,
            break_torque: f32::INFINITY,
            motion: MotionLocks::default(),
        }
    }

    /// Set the connected body
    pub fn connected(mut self, body: BodyId) -> Self {
        self.connected = Some(body);
        self
    }

    pub fn anchor(mut self, anchor: Vec3) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn connected_anchor(mut self, anchor: Vec3) -> Self {
        self.connected_anchor = anchor;
        self
    }

    /// Set the primary and secondary axes
    pub fn axes(mut self, axis: Vec3, secondary: Vec3) -> Self {
        self.axis = axis.normalize_or_zero();
        self.secondary_axis = secondary.normalize_or_zero();
        self
    }

    pub fn linear_drive(mut self, drive: JointDrive) -> Self {
        self.linear_drive = drive;
        self
    }

    pub fn angular_drive(mut self, drive: JointDrive) -> Self {
        self.angular_drive = drive;
        self
    }

    pub fn break_force(mut self, force: f32) -> Self {
        self.break_force = force;
        self
    }

    pub fn break_torque(mut self, torque: f32) -> Self {
        self.break_torque = torque;
        self
    }

    /// Set break force and torque to the same value
    pub fn strength(mut self, value: f32) -> Self {
        self.break_force = value;
        self.break_torque = value;
        self
    }

    /// Lock all six degrees of freedom
    pub fn locked(mut self) -> Self {
        self.motion = MotionLocks::all_locked();
        self
    }

    /// Build the joint
    pub fn build(self) -> StructuralJoint {
        StructuralJoint {
            id: JointId::new(),
            kind: self.kind,
            host: self.host,
            connected: self.connected,
            anchor: self.anchor,
            connected_anchor: self.connected_anchor,
            axis: self.axis,
            secondary_axis: self.secondary_axis,
            linear_drive: self.linear_drive,
            angular_drive: self.angular_drive,
            linear_limit: SoftLimit::default(),
            angular_limit: SoftLimit::default(),
            target_velocity: Vec3::ZERO,
            target_angular_velocity: Vec3::ZERO,
            target_position: Vec3::ZERO,
            target_rotation: Quat::IDENTITY,
            break_force: self.break_force,
            break_torque: self.break_torque,
            motion: self.motion,
            unbreakable: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_locked_joint() {
        let joint = StructuralJoint::builder(JointKind::Lattice, BodyId(1))
            .connected(BodyId(2))
            .strength(500.0)
            .locked()
            .build();

        assert_eq!(joint.break_force, 500.0);
        assert_eq!(joint.break_torque, 500.0);
        assert!(joint.motion.is_fully_locked());
        assert!(joint.connects(BodyId(2), BodyId(1)));
        assert_eq!(joint.other_end(BodyId(2)), Some(BodyId(1)));
        assert_eq!(joint.other_end(BodyId(3)), None);
    }

    #[test]
    fn test_unbreakable_override() {
        let mut joint = StructuralJoint::builder(JointKind::Primary, BodyId(1))
            .connected(BodyId(0))
            .break_force(10.0)
            .break_torque(20.0)
            .build();
        assert_eq!(joint.effective_break_force(), 10.0);

        joint.unbreakable = true;
        assert!(joint.effective_break_force().is_infinite());
        assert!(joint.effective_break_torque().is_infinite());
        assert_eq!(joint.break_torque, 20.0);
    }

    #[test]
    fn test_clear_limits_and_targets() {
        let mut joint = StructuralJoint::builder(JointKind::Primary, BodyId(1)).build();
        joint.linear_limit.limit = 0.2;
        joint.target_velocity = Vec3::ONE;
        joint.target_rotation = Quat::from_rotation_y(1.0);

        joint.clear_limits_and_targets();
        assert_eq!(joint.linear_limit, SoftLimit::default());
        assert_eq!(joint.target_velocity, Vec3::ZERO);
        assert_eq!(joint.target_rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_reinforcement_kinds() {
        assert!(JointKind::LongRange.is_reinforcement());
        assert!(JointKind::Decoupler.is_reinforcement());
        assert!(!JointKind::Primary.is_reinforcement());
        assert!(!JointKind::Strut.is_reinforcement());
    }
}
