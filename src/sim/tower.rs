//! Tower registry and brick layout
//!
//! The registry is the authoritative demolition state: per-tower fallen-brick
//! sets, demolition percentage, destroyed flag. It is a pure state container;
//! it never touches the physics world or the timer. Consumers poll it each
//! tick (pull model).

use std::collections::HashSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::TowerTuning;
use crate::physics::{BodyDesc, BodyHandle};

pub type TowerId = usize;
pub type BrickId = u32;

/// Static description used to (re)initialize the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerSpec {
    /// World-space anchor of the brick grid
    pub position: Vec3,
    pub total_bricks: u32,
}

/// Demolition state for one tower
#[derive(Debug, Clone)]
pub struct Tower {
    pub id: TowerId,
    pub position: Vec3,
    pub total_bricks: u32,
    fallen: HashSet<BrickId>,
    demolition_percentage: u32,
    is_destroyed: bool,
}

impl Tower {
    fn new(id: TowerId, spec: &TowerSpec) -> Self {
        Self {
            id,
            position: spec.position,
            total_bricks: spec.total_bricks,
            fallen: HashSet::new(),
            demolition_percentage: 0,
            is_destroyed: false,
        }
    }

    #[inline]
    pub fn demolition_percentage(&self) -> u32 {
        self.demolition_percentage
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.is_destroyed
    }

    #[inline]
    pub fn fallen_count(&self) -> usize {
        self.fallen.len()
    }

    /// Record a fallen brick; percentage and destroyed flag update atomically
    /// with the insertion. Returns whether state changed.
    fn record_fallen(&mut self, brick: BrickId, destroy_threshold_percent: u32) -> bool {
        if self.is_destroyed || self.fallen.contains(&brick) {
            return false;
        }

        self.fallen.insert(brick);
        let percent = (self.fallen.len() as f32 / self.total_bricks.max(1) as f32 * 100.0).floor();
        self.demolition_percentage = (percent as u32).min(100);
        self.is_destroyed = self.demolition_percentage >= destroy_threshold_percent;
        true
    }

    fn reset(&mut self) {
        self.fallen.clear();
        self.demolition_percentage = 0;
        self.is_destroyed = false;
    }
}

/// Authoritative demolition state for every tower
#[derive(Debug, Default)]
pub struct TowerRegistry {
    towers: Vec<Tower>,
    destroy_threshold_percent: u32,
}

impl TowerRegistry {
    pub fn new(destroy_threshold_percent: u32) -> Self {
        Self {
            towers: Vec::new(),
            destroy_threshold_percent,
        }
    }

    /// Replace all tower state; callable repeatedly on level reload
    pub fn initialize(&mut self, specs: &[TowerSpec]) {
        self.towers = specs
            .iter()
            .enumerate()
            .map(|(id, spec)| Tower::new(id, spec))
            .collect();
        log::info!(
            "Initialized {} towers ({} bricks each)",
            self.towers.len(),
            specs.first().map(|s| s.total_bricks).unwrap_or(0)
        );
    }

    /// Idempotent; no-op if the tower is already destroyed or the brick is
    /// already recorded
    pub fn record_fallen_brick(&mut self, tower: TowerId, brick: BrickId) {
        let threshold = self.destroy_threshold_percent;
        let Some(tower) = self.towers.get_mut(tower) else {
            log::warn!("record_fallen_brick: unknown tower {tower}");
            return;
        };
        if tower.record_fallen(brick, threshold) && tower.is_destroyed {
            log::info!(
                "Tower {} destroyed at {}% demolition",
                tower.id,
                tower.demolition_percentage
            );
        }
    }

    /// Towers not yet destroyed. Recomputed on demand, never stale.
    pub fn active_tower_count(&self) -> usize {
        self.towers.iter().filter(|t| !t.is_destroyed).count()
    }

    /// Clear fallen sets and flags everywhere, keeping layout
    pub fn reset_all(&mut self) {
        for tower in &mut self.towers {
            tower.reset();
        }
    }

    /// Clear one tower's demolition state (rebuild completion path)
    pub fn reset_tower(&mut self, tower: TowerId) {
        if let Some(tower) = self.towers.get_mut(tower) {
            tower.reset();
        }
    }

    pub fn towers(&self) -> &[Tower] {
        &self.towers
    }

    pub fn get(&self, tower: TowerId) -> Option<&Tower> {
        self.towers.get(tower)
    }

    /// HUD accessor; 0 for an unknown tower
    pub fn demolition_percentage(&self, tower: TowerId) -> u32 {
        self.get(tower).map(|t| t.demolition_percentage).unwrap_or(0)
    }

    pub fn is_destroyed(&self, tower: TowerId) -> bool {
        self.get(tower).map(|t| t.is_destroyed).unwrap_or(false)
    }
}

/// One brick's live wiring: home slot plus the rigid body currently backing
/// it (`None` while the tower is in particle flight)
#[derive(Debug, Clone)]
pub struct Brick {
    pub id: BrickId,
    pub original_position: Vec3,
    pub body: Option<BodyHandle>,
}

/// Per-tower brick instances
#[derive(Debug, Clone)]
pub struct TowerBricks {
    pub tower: TowerId,
    /// Y of the tower anchor; the drop-height test measures below this
    pub base_y: f32,
    pub bricks: Vec<Brick>,
}

/// Home positions for every brick of a tower: a rows x columns x depth grid
/// centered on the anchor in X/Z and stacked up from it in Y
pub fn brick_grid_positions(tuning: &TowerTuning, anchor: Vec3) -> Vec<Vec3> {
    let s = tuning.brick_size;
    let per_layer = tuning.rows * tuning.columns;
    (0..tuning.bricks_per_tower())
        .map(|i| {
            let depth = i / per_layer;
            let row = (i % per_layer) / tuning.columns;
            let col = i % tuning.columns;
            Vec3::new(
                anchor.x + (col as f32 * s - tuning.columns as f32 * s / 2.0 + s / 2.0),
                anchor.y + (row as f32 * s + s / 2.0),
                anchor.z + (depth as f32 * s - tuning.depth as f32 * s / 2.0 + s / 2.0),
            )
        })
        .collect()
}

/// Rigid-body parameters for a brick at `position`
pub fn brick_body_desc(tuning: &TowerTuning, position: Vec3) -> BodyDesc {
    BodyDesc {
        position,
        mass: tuning.brick_mass,
        friction: tuning.friction,
        restitution: tuning.restitution,
        linear_damping: tuning.linear_damping,
        angular_damping: tuning.angular_damping,
        gravity_scale: tuning.gravity_scale,
        radius: tuning.brick_size / 2.0,
        start_asleep: true,
        ..Default::default()
    }
}
