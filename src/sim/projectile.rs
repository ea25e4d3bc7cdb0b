//! Projectile lifecycle
//!
//! Projectiles are heavy contact-reporting rigid bodies fired along the view
//! direction. First contact turns into an impact (position + velocity handed
//! to the explosion propagator) and despawns the projectile; unexploded
//! projectiles expire after a fixed lifetime.

use glam::Vec3;

use crate::config::ProjectileTuning;
use crate::physics::{BodyDesc, BodyHandle, ContactEvent, PhysicsWorld};

/// Impact site of a projectile that hit something
#[derive(Debug, Clone, Copy)]
pub struct Impact {
    pub position: Vec3,
    pub velocity: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct Projectile {
    body: BodyHandle,
    spawned_at: f64,
}

pub struct ProjectileSet {
    tuning: ProjectileTuning,
    live: Vec<Projectile>,
}

impl ProjectileSet {
    pub fn new(tuning: ProjectileTuning) -> Self {
        Self {
            tuning,
            live: Vec::new(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Spawn a projectile at `origin` along `direction`. Rejects degenerate
    /// directions with a logged warning instead of firing off a NaN body.
    pub fn fire(
        &mut self,
        world: &mut dyn PhysicsWorld,
        now: f64,
        origin: Vec3,
        direction: Vec3,
    ) -> Option<BodyHandle> {
        if !origin.is_finite() || !direction.is_finite() {
            log::warn!("projectile rejected: non-finite origin/direction");
            return None;
        }
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            log::warn!("projectile rejected: zero direction");
            return None;
        }

        let body = world.spawn(BodyDesc {
            position: origin,
            velocity: direction * self.tuning.speed,
            mass: self.tuning.mass,
            friction: self.tuning.friction,
            restitution: self.tuning.restitution,
            linear_damping: self.tuning.linear_damping,
            radius: self.tuning.size / 2.0,
            report_contacts: true,
            ..Default::default()
        });
        self.live.push(Projectile {
            body,
            spawned_at: now,
        });
        Some(body)
    }

    /// Resolve this tick's contact events: projectiles that hit something are
    /// despawned and returned as impacts.
    pub fn impacts(
        &mut self,
        world: &mut dyn PhysicsWorld,
        contacts: &[ContactEvent],
    ) -> Vec<Impact> {
        let mut impacts = Vec::new();

        for contact in contacts {
            let Some(slot) = self
                .live
                .iter()
                .position(|p| p.body == contact.a || p.body == contact.b)
            else {
                continue;
            };
            let projectile = self.live.swap_remove(slot);

            if let Some(position) = world.translation(projectile.body) {
                impacts.push(Impact {
                    position,
                    velocity: world.linvel(projectile.body).unwrap_or(Vec3::ZERO),
                });
            }
            world.despawn(projectile.body);
        }

        impacts
    }

    /// Despawn projectiles past their lifetime without exploding
    pub fn expire(&mut self, world: &mut dyn PhysicsWorld, now: f64) {
        let lifetime = self.tuning.lifetime as f64;
        self.live.retain(|projectile| {
            if now - projectile.spawned_at < lifetime {
                return true;
            }
            world.despawn(projectile.body);
            false
        });
    }
}
