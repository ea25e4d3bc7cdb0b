//! Gameplay tuning
//!
//! Every threshold that shapes "feel" lives here with its reference value as
//! the default. Defaults are resolved once at construction; nothing downstream
//! re-resolves fallbacks at call sites. All structs round-trip through JSON so
//! a level file can override any subset of fields.

use serde::{Deserialize, Serialize};

/// Tower geometry and per-brick rigid-body parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerTuning {
    /// Brick rows per tower (Y)
    pub rows: u32,
    /// Brick columns per tower (X)
    pub columns: u32,
    /// Brick layers per tower (Z)
    pub depth: u32,
    /// Edge length of a cubic brick
    pub brick_size: f32,
    /// Demolition percentage at or above which a tower counts as destroyed
    pub destroy_threshold_percent: u32,

    // Rigid-body parameters handed to the physics world per brick
    pub brick_mass: f32,
    pub gravity_scale: f32,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl Default for TowerTuning {
    fn default() -> Self {
        Self {
            rows: 6,
            columns: 4,
            depth: 2,
            brick_size: 2.0,
            destroy_threshold_percent: 22,
            brick_mass: 0.7,
            gravity_scale: 0.8,
            friction: 0.7,
            restitution: 0.01,
            linear_damping: 2.0,
            angular_damping: 1.0,
        }
    }
}

impl TowerTuning {
    /// Bricks per tower (rows x columns x depth)
    #[inline]
    pub fn bricks_per_tower(&self) -> u32 {
        self.rows * self.columns * self.depth
    }
}

/// Brick displacement detection thresholds and stabilization windows.
///
/// Distance/height values are empirically tuned feel constants (roughly 10x
/// and 4x brick size); they are carried as configuration, not re-derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorTuning {
    /// Seconds between displacement polls (much coarser than the physics step)
    pub poll_interval: f32,
    /// A brick farther than this from its home slot counts as fallen
    pub distance_threshold: f32,
    /// A brick below tower base minus this height counts as fallen
    pub height_drop_threshold: f32,
    /// Suppression window after level load while the stack settles
    pub warmup_after_load: f32,
    /// Suppression window after a tower finishes rebuilding
    pub warmup_after_rebuild: f32,
}

impl Default for DetectorTuning {
    fn default() -> Self {
        Self {
            poll_interval: 0.5,
            distance_threshold: 20.0,
            height_drop_threshold: 8.0,
            warmup_after_load: 5.0,
            warmup_after_rebuild: 1.0,
        }
    }
}

/// Explosion impulse propagation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionTuning {
    /// Impulse magnitude at the blast center
    pub force: f32,
    /// Blast radius; bodies beyond it are untouched
    pub radius: f32,
    /// Minimum upward Y component of the impulse direction
    pub min_upward: f32,
    /// Torque impulse magnitude as a fraction of the linear impulse
    pub torque_factor: f32,
    /// Seconds a transient explosion event is retained
    pub lifetime: f32,
    /// Cap on concurrent retained events; oldest is evicted first
    pub max_events: usize,
}

impl Default for ExplosionTuning {
    fn default() -> Self {
        Self {
            force: 400.0,
            radius: 12.0,
            min_upward: 0.35,
            torque_factor: 0.05,
            lifetime: 1.2,
            max_events: 6,
        }
    }
}

/// Rebuild animation dynamics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebuildTuning {
    /// Steering acceleration toward the home slot
    pub steering: f32,
    /// Per-update velocity damping factor (prevents overshoot oscillation)
    pub damping: f32,
    /// Snap distance; a particle inside this radius is done
    pub epsilon: f32,
    /// Horizontal scatter span for particle spawn (+/- half of this)
    pub scatter_horizontal: f32,
    /// Minimum upward spawn offset
    pub lift_min: f32,
    /// Additional random upward spawn offset on top of `lift_min`
    pub lift_range: f32,
    /// Hold after all particles converge before rigid bodies respawn
    pub settle_delay: f32,
    /// Minimum interval between rebuild triggers
    pub debounce: f32,
}

impl Default for RebuildTuning {
    fn default() -> Self {
        Self {
            steering: 20.0,
            damping: 0.95,
            epsilon: 0.2,
            scatter_horizontal: 30.0,
            lift_min: 10.0,
            lift_range: 15.0,
            settle_delay: 0.5,
            debounce: 0.5,
        }
    }
}

/// Projectile rigid-body parameters and lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    pub mass: f32,
    pub speed: f32,
    /// Projectile diameter
    pub size: f32,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    /// Seconds before an unexploded projectile despawns
    pub lifetime: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            mass: 170.0,
            speed: 200.0,
            size: 1.3,
            friction: 0.05,
            restitution: 0.5,
            linear_damping: 0.3,
            lifetime: 1.5,
        }
    }
}

/// Round countdown
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerTuning {
    /// Seconds on the clock at round start
    pub round_seconds: f32,
}

impl Default for TimerTuning {
    fn default() -> Self {
        Self { round_seconds: 45.0 }
    }
}

/// Firing energy meter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyTuning {
    pub max_energy: f32,
    /// Energy cost per projectile
    pub fire_cost: f32,
    /// Regeneration while the round is running
    pub recharge_per_second: f32,
}

impl Default for EnergyTuning {
    fn default() -> Self {
        Self {
            max_energy: 100.0,
            fire_cost: 30.0,
            recharge_per_second: 16.0,
        }
    }
}

/// Complete tuning set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub tower: TowerTuning,
    pub detector: DetectorTuning,
    pub explosion: ExplosionTuning,
    pub rebuild: RebuildTuning,
    pub projectile: ProjectileTuning,
    pub timer: TimerTuning,
    pub energy: EnergyTuning,
}

impl Tuning {
    /// Parse tuning from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tuning: Tuning = serde_json::from_str(json)?;
        log::info!(
            "Loaded tuning overrides ({} bricks/tower, {}% destroy threshold)",
            tuning.tower.bricks_per_tower(),
            tuning.tower.destroy_threshold_percent
        );
        Ok(tuning)
    }

    /// Serialize the full tuning set (for dumping an editable level file)
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_reference_values() {
        let t = Tuning::default();
        assert_eq!(t.tower.bricks_per_tower(), 48);
        assert_eq!(t.tower.destroy_threshold_percent, 22);
        assert_eq!(t.detector.distance_threshold, 20.0);
        assert_eq!(t.detector.height_drop_threshold, 8.0);
        assert_eq!(t.timer.round_seconds, 45.0);
    }

    #[test]
    fn test_partial_json_override() {
        let t = Tuning::from_json(r#"{"detector": {"poll_interval": 0.25}}"#).unwrap();
        assert_eq!(t.detector.poll_interval, 0.25);
        // Untouched fields keep defaults
        assert_eq!(t.detector.distance_threshold, 20.0);
        assert_eq!(t.tower.rows, 6);
    }

    #[test]
    fn test_json_round_trip() {
        let t = Tuning::default();
        let parsed = Tuning::from_json(&t.to_json()).unwrap();
        assert_eq!(parsed.explosion.radius, t.explosion.radius);
        assert_eq!(parsed.rebuild.debounce, t.rebuild.debounce);
    }
}
