//! Rigid-body descriptors and handles

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// How a body participates in simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyKind {
    #[default]
    Dynamic,
    /// Scenery; never moves and never receives impulses
    Fixed,
}

/// Creation parameters for a rigid body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity_scale: f32,
    /// Bounding radius used for coarse contact tests and ground rest height
    pub radius: f32,
    /// Emit collision-enter events for contacts involving this body
    pub report_contacts: bool,
    /// Spawn asleep; a sleeping body ignores gravity until woken by an impulse
    pub start_asleep: bool,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            kind: BodyKind::Dynamic,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            mass: 1.0,
            friction: 0.5,
            restitution: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            radius: 0.5,
            report_contacts: false,
            start_asleep: false,
        }
    }
}

/// Generational handle to a rigid body.
///
/// Handles outlive the bodies they point at; a stale handle resolves to
/// `None` on reads and is ignored on writes, which is exactly the "skip this
/// brick this poll" behavior the detector relies on mid-rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyHandle {
    pub index: u32,
    pub generation: u32,
}
