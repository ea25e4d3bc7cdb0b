//! Explosion impulse propagation
//!
//! On projectile impact the propagator sweeps every dynamic body in range and
//! applies a falloff-weighted linear impulse (biased upward for dramatic
//! lift) plus a small randomized torque for tumbling. Malformed input is
//! rejected at the boundary with a logged warning; a dropped blast must never
//! crash gameplay.

use std::collections::VecDeque;

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::config::ExplosionTuning;
use crate::physics::{BodyHandle, PhysicsWorld};

/// Transient record of a triggered blast. Kept only to bound downstream
/// effect resources; gameplay never reads it back.
#[derive(Debug, Clone)]
pub struct ExplosionEvent {
    pub position: Vec3,
    /// Velocity inherited from the impacting projectile (effects layer hint)
    pub velocity: Vec3,
    pub force: f32,
    pub radius: f32,
    pub created_at: f64,
}

pub struct ExplosionSystem {
    tuning: ExplosionTuning,
    events: VecDeque<ExplosionEvent>,
}

impl ExplosionSystem {
    pub fn new(tuning: ExplosionTuning) -> Self {
        Self {
            tuning,
            events: VecDeque::new(),
        }
    }

    /// Trigger a blast with the configured default force/radius
    pub fn trigger(
        &mut self,
        world: &mut dyn PhysicsWorld,
        rng: &mut Pcg32,
        now: f64,
        position: Vec3,
        velocity: Vec3,
    ) -> usize {
        let force = self.tuning.force;
        let radius = self.tuning.radius;
        self.trigger_with(world, rng, now, position, velocity, force, radius)
    }

    /// Trigger a blast with explicit force and radius
    pub fn trigger_with(
        &mut self,
        world: &mut dyn PhysicsWorld,
        rng: &mut Pcg32,
        now: f64,
        position: Vec3,
        velocity: Vec3,
        force: f32,
        radius: f32,
    ) -> usize {
        if !position.is_finite() || !radius.is_finite() || radius <= 0.0 {
            log::warn!("explosion rejected: invalid position {position:?} or radius {radius}");
            return 0;
        }

        // Snapshot first: iteration borrows the world immutably, impulses
        // need it mutably
        let mut in_range: Vec<(BodyHandle, Vec3)> = Vec::new();
        world.for_each_dynamic(&mut |handle, body_pos| {
            if body_pos.distance_squared(position) < radius * radius {
                in_range.push((handle, body_pos));
            }
        });

        for (handle, body_pos) in &in_range {
            let delta = *body_pos - position;
            let distance = delta.length();

            // Near-zero separation would blow up the direction; use a random
            // unit vector instead
            let mut direction = if distance < 1e-4 {
                random_unit(rng)
            } else {
                delta / distance
            };
            direction.y = direction.y.max(self.tuning.min_upward);
            direction = direction.normalize_or_zero();

            let falloff = (1.0 - distance / radius).powi(2);
            let magnitude = force * falloff;

            world.apply_impulse(*handle, direction * magnitude, true);

            let torque = Vec3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            ) * (magnitude * self.tuning.torque_factor);
            world.apply_torque_impulse(*handle, torque, true);
        }

        self.events.push_back(ExplosionEvent {
            position,
            velocity,
            force,
            radius,
            created_at: now,
        });
        while self.events.len() > self.tuning.max_events {
            self.events.pop_front();
        }

        log::debug!(
            "explosion at {position:?}: {} bodies affected (force {force}, radius {radius})",
            in_range.len()
        );
        in_range.len()
    }

    /// Drop expired transient events
    pub fn update(&mut self, now: f64) {
        let lifetime = self.tuning.lifetime as f64;
        while let Some(front) = self.events.front() {
            if now - front.created_at < lifetime {
                break;
            }
            self.events.pop_front();
        }
    }

    /// Currently retained transient events (oldest first)
    pub fn events(&self) -> impl Iterator<Item = &ExplosionEvent> {
        self.events.iter()
    }
}

fn random_unit(rng: &mut Pcg32) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        let len = v.length();
        if len > 1e-3 && len <= 1.0 {
            return v / len;
        }
    }
}
