//! Physics world trait and the built-in ballistic integrator
//!
//! `BallisticWorld` is deliberately minimal: gravity, damping, a ground
//! plane, sphere-overlap contact events, and rapier-style sleeping. It has no
//! constraint solver or narrow phase; standing towers stay standing because
//! bricks spawn asleep and only wake when an impulse hits them. That is
//! enough to exercise every gameplay path headlessly.

use glam::Vec3;

use super::body::{BodyDesc, BodyHandle, BodyKind};
use crate::consts::{GRAVITY, GROUND_Y};

/// Collision-enter event, delivered once per new contact pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

/// The collaborator surface the demolition core consumes
pub trait PhysicsWorld {
    fn spawn(&mut self, desc: BodyDesc) -> BodyHandle;
    fn despawn(&mut self, handle: BodyHandle);
    fn contains(&self, handle: BodyHandle) -> bool;

    /// World-space position, or `None` for a stale handle
    fn translation(&self, handle: BodyHandle) -> Option<Vec3>;
    /// Linear velocity, or `None` for a stale handle
    fn linvel(&self, handle: BodyHandle) -> Option<Vec3>;

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3, wake: bool);
    fn apply_torque_impulse(&mut self, handle: BodyHandle, torque: Vec3, wake: bool);

    /// Visit every dynamic body (sleeping included) with its translation
    fn for_each_dynamic(&self, visit: &mut dyn FnMut(BodyHandle, Vec3));

    /// Advance the simulation by one fixed step
    fn step(&mut self, dt: f32);

    /// Take the collision-enter events accumulated since the last drain
    fn drain_contacts(&mut self) -> Vec<ContactEvent>;
}

/// Linear velocity below which a body is a sleep candidate
const SLEEP_LINVEL: f32 = 0.4;
/// Seconds of low velocity before a body falls asleep
const SLEEP_TIME: f32 = 0.5;

struct Body {
    desc: BodyDesc,
    position: Vec3,
    velocity: Vec3,
    angvel: Vec3,
    asleep: bool,
    low_speed_time: f32,
}

struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Built-in integrator implementing [`PhysicsWorld`]
#[derive(Default)]
pub struct BallisticWorld {
    slots: Vec<Slot>,
    free: Vec<u32>,
    events: Vec<ContactEvent>,
    active_pairs: std::collections::HashSet<(u32, u32)>,
}

impl BallisticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live body count (diagnostics)
    pub fn body_count(&self) -> usize {
        self.slots.iter().filter(|s| s.body.is_some()).count()
    }

    fn get(&self, handle: BodyHandle) -> Option<&Body> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.body.as_ref()
    }

    fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.body.as_mut()
    }

    fn detect_contacts(&mut self) {
        let mut current = std::collections::HashSet::new();

        for (i, si) in self.slots.iter().enumerate() {
            let Some(a) = si.body.as_ref() else { continue };
            if !a.desc.report_contacts {
                continue;
            }
            for (j, sj) in self.slots.iter().enumerate() {
                if i == j {
                    continue;
                }
                let Some(b) = sj.body.as_ref() else { continue };
                let reach = a.desc.radius + b.desc.radius;
                if a.position.distance_squared(b.position) > reach * reach {
                    continue;
                }
                let key = (i.min(j) as u32, i.max(j) as u32);
                if current.insert(key) && !self.active_pairs.contains(&key) {
                    self.events.push(ContactEvent {
                        a: BodyHandle {
                            index: i as u32,
                            generation: si.generation,
                        },
                        b: BodyHandle {
                            index: j as u32,
                            generation: sj.generation,
                        },
                    });
                }
            }
        }

        self.active_pairs = current;
    }
}

impl PhysicsWorld for BallisticWorld {
    fn spawn(&mut self, desc: BodyDesc) -> BodyHandle {
        let body = Body {
            position: desc.position,
            velocity: desc.velocity,
            angvel: Vec3::ZERO,
            asleep: desc.start_asleep,
            low_speed_time: 0.0,
            desc,
        };

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            BodyHandle {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                body: Some(body),
            });
            BodyHandle {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    fn despawn(&mut self, handle: BodyHandle) {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return;
        };
        if slot.generation != handle.generation || slot.body.is_none() {
            return;
        }
        slot.body = None;
        slot.generation += 1;
        self.free.push(handle.index);
    }

    fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    fn translation(&self, handle: BodyHandle) -> Option<Vec3> {
        self.get(handle).map(|b| b.position)
    }

    fn linvel(&self, handle: BodyHandle) -> Option<Vec3> {
        self.get(handle).map(|b| b.velocity)
    }

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3, wake: bool) {
        let Some(body) = self.get_mut(handle) else {
            return;
        };
        if body.desc.kind == BodyKind::Fixed {
            return;
        }
        body.velocity += impulse / body.desc.mass.max(f32::EPSILON);
        if wake {
            body.asleep = false;
            body.low_speed_time = 0.0;
        }
    }

    fn apply_torque_impulse(&mut self, handle: BodyHandle, torque: Vec3, wake: bool) {
        let Some(body) = self.get_mut(handle) else {
            return;
        };
        if body.desc.kind == BodyKind::Fixed {
            return;
        }
        // Solid-sphere inertia approximation
        let inertia = 0.4 * body.desc.mass * body.desc.radius * body.desc.radius;
        body.angvel += torque / inertia.max(f32::EPSILON);
        if wake {
            body.asleep = false;
            body.low_speed_time = 0.0;
        }
    }

    fn for_each_dynamic(&self, visit: &mut dyn FnMut(BodyHandle, Vec3)) {
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(body) = slot.body.as_ref() else {
                continue;
            };
            if body.desc.kind != BodyKind::Dynamic {
                continue;
            }
            visit(
                BodyHandle {
                    index: i as u32,
                    generation: slot.generation,
                },
                body.position,
            );
        }
    }

    fn step(&mut self, dt: f32) {
        for slot in &mut self.slots {
            let Some(body) = slot.body.as_mut() else {
                continue;
            };
            if body.desc.kind != BodyKind::Dynamic || body.asleep {
                continue;
            }

            body.velocity.y -= GRAVITY * body.desc.gravity_scale * dt;
            body.velocity /= 1.0 + body.desc.linear_damping * dt;
            body.angvel /= 1.0 + body.desc.angular_damping * dt;
            body.position += body.velocity * dt;

            // Ground plane
            let rest_y = GROUND_Y + body.desc.radius;
            if body.position.y < rest_y {
                body.position.y = rest_y;
                if body.velocity.y < -0.5 {
                    body.velocity.y *= -body.desc.restitution;
                } else {
                    body.velocity.y = 0.0;
                }
                let grip = (1.0 - body.desc.friction).clamp(0.0, 1.0);
                body.velocity.x *= grip;
                body.velocity.z *= grip;
            }

            // Sleep bookkeeping
            if body.velocity.length() < SLEEP_LINVEL && body.angvel.length() < SLEEP_LINVEL {
                body.low_speed_time += dt;
                if body.low_speed_time >= SLEEP_TIME {
                    body.asleep = true;
                    body.velocity = Vec3::ZERO;
                    body.angvel = Vec3::ZERO;
                }
            } else {
                body.low_speed_time = 0.0;
            }
        }

        self.detect_contacts();
    }

    fn drain_contacts(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic_at(pos: Vec3) -> BodyDesc {
        BodyDesc {
            position: pos,
            ..Default::default()
        }
    }

    #[test]
    fn test_sleeping_body_ignores_gravity() {
        let mut world = BallisticWorld::new();
        let h = world.spawn(BodyDesc {
            position: Vec3::new(0.0, 10.0, 0.0),
            start_asleep: true,
            ..Default::default()
        });

        for _ in 0..120 {
            world.step(1.0 / 60.0);
        }
        let pos = world.translation(h).unwrap();
        assert_eq!(pos.y, 10.0);
    }

    #[test]
    fn test_impulse_wakes_and_moves() {
        let mut world = BallisticWorld::new();
        let h = world.spawn(BodyDesc {
            position: Vec3::new(0.0, 10.0, 0.0),
            start_asleep: true,
            ..Default::default()
        });

        world.apply_impulse(h, Vec3::new(5.0, 0.0, 0.0), true);
        for _ in 0..30 {
            world.step(1.0 / 60.0);
        }
        let pos = world.translation(h).unwrap();
        assert!(pos.x > 1.0);
        assert!(pos.y < 10.0, "woken body should fall, got y={}", pos.y);
    }

    #[test]
    fn test_falling_body_rests_on_ground() {
        let mut world = BallisticWorld::new();
        let h = world.spawn(dynamic_at(Vec3::new(0.0, 5.0, 0.0)));

        for _ in 0..600 {
            world.step(1.0 / 60.0);
        }
        let pos = world.translation(h).unwrap();
        assert!((pos.y - 0.5).abs() < 0.01);
        // Settled body should be asleep with zero velocity
        assert_eq!(world.linvel(h).unwrap(), Vec3::ZERO);
    }

    #[test]
    fn test_stale_handle_reads_none() {
        let mut world = BallisticWorld::new();
        let h = world.spawn(dynamic_at(Vec3::ZERO));
        world.despawn(h);
        assert!(world.translation(h).is_none());
        assert!(world.linvel(h).is_none());
        assert!(!world.contains(h));

        // Slot reuse must not resurrect the old handle
        let h2 = world.spawn(dynamic_at(Vec3::ONE));
        assert_eq!(h2.index, h.index);
        assert_ne!(h2.generation, h.generation);
        assert!(world.translation(h).is_none());
    }

    #[test]
    fn test_contact_enter_fires_once() {
        let mut world = BallisticWorld::new();
        let probe = world.spawn(BodyDesc {
            position: Vec3::new(0.0, 0.5, 0.0),
            report_contacts: true,
            start_asleep: true,
            ..Default::default()
        });
        let other = world.spawn(BodyDesc {
            position: Vec3::new(0.6, 0.5, 0.0),
            start_asleep: true,
            ..Default::default()
        });

        world.step(1.0 / 60.0);
        let events = world.drain_contacts();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].a, probe);
        assert_eq!(events[0].b, other);

        // Still overlapping: no repeat event
        world.step(1.0 / 60.0);
        assert!(world.drain_contacts().is_empty());
    }

    #[test]
    fn test_for_each_dynamic_skips_fixed() {
        let mut world = BallisticWorld::new();
        world.spawn(dynamic_at(Vec3::ZERO));
        world.spawn(BodyDesc {
            kind: BodyKind::Fixed,
            position: Vec3::new(3.0, 0.0, 0.0),
            ..Default::default()
        });

        let mut seen = 0;
        world.for_each_dynamic(&mut |_, _| seen += 1);
        assert_eq!(seen, 1);
    }
}
