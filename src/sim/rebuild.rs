//! Rebuild animation
//!
//! Per-tower state machine: Settled -> Converging -> Holding -> Settled.
//! On trigger every brick's rigid body is swapped for a scripted particle
//! that steers back to its home slot; once all particles of a tower have
//! snapped, a short hold lets the convergence visually read as complete
//! before rigid bodies respawn at exactly the original positions.

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::config::{RebuildTuning, TowerTuning};
use crate::physics::PhysicsWorld;
use crate::sim::tower::{BrickId, TowerBricks, TowerId, brick_body_desc};

/// Where a tower is in the rebuild cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlightPhase {
    Settled,
    /// Particles steering toward their home slots
    Converging,
    /// All particles snapped; holding before rigid bodies respawn
    Holding { since: f64 },
}

/// One brick's scripted stand-in during flight
#[derive(Debug, Clone)]
pub struct RebuildParticle {
    pub brick: BrickId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub target: Vec3,
}

struct TowerFlight {
    phase: FlightPhase,
    particles: Vec<RebuildParticle>,
}

pub struct RebuildAnimator {
    tuning: RebuildTuning,
    tower_tuning: TowerTuning,
    flights: Vec<TowerFlight>,
    last_trigger: f64,
}

impl RebuildAnimator {
    pub fn new(tuning: RebuildTuning, tower_tuning: TowerTuning, tower_count: usize) -> Self {
        let mut animator = Self {
            tuning,
            tower_tuning,
            flights: Vec::new(),
            last_trigger: f64::NEG_INFINITY,
        };
        animator.reset(tower_count);
        animator
    }

    /// Re-initialize for a fresh level
    pub fn reset(&mut self, tower_count: usize) {
        self.flights = (0..tower_count)
            .map(|_| TowerFlight {
                phase: FlightPhase::Settled,
                particles: Vec::new(),
            })
            .collect();
        self.last_trigger = f64::NEG_INFINITY;
    }

    pub fn is_in_flight(&self, tower: TowerId) -> bool {
        self.flights
            .get(tower)
            .is_some_and(|f| f.phase != FlightPhase::Settled)
    }

    pub fn any_in_flight(&self) -> bool {
        self.flights.iter().any(|f| f.phase != FlightPhase::Settled)
    }

    /// Live particles for a tower (render-layer feed; empty when settled)
    pub fn particles(&self, tower: TowerId) -> &[RebuildParticle] {
        self.flights
            .get(tower)
            .map(|f| f.particles.as_slice())
            .unwrap_or(&[])
    }

    /// Start a rebuild of every tower. Debounced; ignored entirely while any
    /// tower is still in flight. Returns whether a rebuild actually started.
    pub fn trigger(
        &mut self,
        now: f64,
        world: &mut dyn PhysicsWorld,
        rng: &mut Pcg32,
        towers: &mut [TowerBricks],
    ) -> bool {
        if now - self.last_trigger < self.tuning.debounce as f64 {
            return false;
        }
        if self.any_in_flight() {
            return false;
        }
        self.last_trigger = now;

        for tb in towers.iter_mut() {
            let Some(flight) = self.flights.get_mut(tb.tower) else {
                continue;
            };

            flight.particles = tb
                .bricks
                .iter_mut()
                .map(|brick| {
                    // Gather from wherever the brick currently is, with an
                    // upward/outward scatter so the flight reads as a swarm
                    let current = brick
                        .body
                        .and_then(|h| world.translation(h))
                        .unwrap_or(brick.original_position);
                    if let Some(handle) = brick.body.take() {
                        world.despawn(handle);
                    }

                    let spread = self.tuning.scatter_horizontal;
                    let start = current
                        + Vec3::new(
                            (rng.random::<f32>() - 0.5) * spread,
                            rng.random::<f32>() * self.tuning.lift_range + self.tuning.lift_min,
                            (rng.random::<f32>() - 0.5) * spread,
                        );

                    RebuildParticle {
                        brick: brick.id,
                        position: start,
                        velocity: Vec3::ZERO,
                        target: brick.original_position,
                    }
                })
                .collect();
            flight.phase = FlightPhase::Converging;
        }

        log::info!("rebuild started for {} towers", towers.len());
        true
    }

    /// Advance particle flight. Returns the towers whose rebuild completed
    /// this tick (rigid bodies respawned at their home slots).
    pub fn update(
        &mut self,
        now: f64,
        dt: f32,
        world: &mut dyn PhysicsWorld,
        towers: &mut [TowerBricks],
    ) -> Vec<TowerId> {
        let mut completed = Vec::new();

        for tb in towers.iter_mut() {
            let Some(flight) = self.flights.get_mut(tb.tower) else {
                continue;
            };

            match flight.phase {
                FlightPhase::Settled => {}
                FlightPhase::Converging => {
                    let mut all_reached = true;
                    for particle in &mut flight.particles {
                        let distance = particle.position.distance(particle.target);
                        if distance > self.tuning.epsilon {
                            all_reached = false;
                            let direction =
                                (particle.target - particle.position).normalize_or_zero();
                            particle.velocity += direction * self.tuning.steering * dt;
                            particle.velocity *= self.tuning.damping;
                            particle.position += particle.velocity * dt;
                        } else {
                            particle.position = particle.target;
                            particle.velocity = Vec3::ZERO;
                        }
                    }
                    if all_reached {
                        flight.phase = FlightPhase::Holding { since: now };
                    }
                }
                FlightPhase::Holding { since } => {
                    if now - since >= self.tuning.settle_delay as f64 {
                        for brick in &mut tb.bricks {
                            brick.body = Some(world.spawn(brick_body_desc(
                                &self.tower_tuning,
                                brick.original_position,
                            )));
                        }
                        flight.particles.clear();
                        flight.phase = FlightPhase::Settled;
                        completed.push(tb.tower);
                        log::debug!("tower {} rebuilt", tb.tower);
                    }
                }
            }
        }

        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BallisticWorld, BodyDesc};
    use crate::sim::tower::{Brick, brick_grid_positions};
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    struct Fixture {
        world: BallisticWorld,
        towers: Vec<TowerBricks>,
        animator: RebuildAnimator,
        rng: Pcg32,
    }

    /// Single tower of five bricks in a row
    fn fixture() -> Fixture {
        let tower_tuning = TowerTuning {
            rows: 1,
            columns: 5,
            depth: 1,
            ..Default::default()
        };
        let mut world = BallisticWorld::new();
        let bricks: Vec<Brick> = brick_grid_positions(&tower_tuning, Vec3::ZERO)
            .into_iter()
            .enumerate()
            .map(|(i, position)| Brick {
                id: i as BrickId,
                original_position: position,
                body: Some(world.spawn(BodyDesc {
                    position,
                    start_asleep: true,
                    ..Default::default()
                })),
            })
            .collect();

        let animator = RebuildAnimator::new(RebuildTuning::default(), tower_tuning, 1);
        Fixture {
            world,
            towers: vec![TowerBricks {
                tower: 0,
                base_y: 0.0,
                bricks,
            }],
            animator,
            rng: Pcg32::seed_from_u64(7),
        }
    }

    #[test]
    fn test_trigger_swaps_bodies_for_particles() {
        let mut f = fixture();
        assert!(f
            .animator
            .trigger(0.0, &mut f.world, &mut f.rng, &mut f.towers));

        assert!(f.animator.is_in_flight(0));
        assert_eq!(f.animator.particles(0).len(), 5);
        assert!(f.towers[0].bricks.iter().all(|b| b.body.is_none()));
        assert_eq!(f.world.body_count(), 0);

        // Scatter is upward of the captured position
        for particle in f.animator.particles(0) {
            assert!(particle.position.y >= particle.target.y + 10.0);
            assert_eq!(particle.velocity, Vec3::ZERO);
        }
    }

    #[test]
    fn test_debounce_ignores_second_trigger() {
        let mut f = fixture();
        assert!(f
            .animator
            .trigger(0.0, &mut f.world, &mut f.rng, &mut f.towers));
        // 100ms later, well under the 500ms debounce window
        assert!(!f
            .animator
            .trigger(0.1, &mut f.world, &mut f.rng, &mut f.towers));
        assert_eq!(f.animator.particles(0).len(), 5);
    }

    #[test]
    fn test_retrigger_during_flight_ignored() {
        let mut f = fixture();
        assert!(f
            .animator
            .trigger(0.0, &mut f.world, &mut f.rng, &mut f.towers));
        // Past the debounce window but still converging
        assert!(!f
            .animator
            .trigger(2.0, &mut f.world, &mut f.rng, &mut f.towers));
    }

    #[test]
    fn test_convergence_all_or_nothing() {
        let mut f = fixture();
        f.animator
            .trigger(0.0, &mut f.world, &mut f.rng, &mut f.towers);

        let epsilon = RebuildTuning::default().epsilon;
        let mut now = 0.0f64;
        let mut completions = 0;

        for _ in 0..3600 {
            now += DT as f64;
            let any_far = f
                .animator
                .particles(0)
                .iter()
                .any(|p| p.position.distance(p.target) > epsilon);

            let done = f.animator.update(now, DT, &mut f.world, &mut f.towers);
            if !done.is_empty() {
                // No completion is allowed while any particle was still out
                assert!(!any_far, "completed while a particle was beyond epsilon");
                completions += done.len();
            }
            if completions > 0 {
                break;
            }
        }

        assert_eq!(completions, 1, "tower must settle exactly once");
        assert!(!f.animator.is_in_flight(0));

        // Bodies respawned at exactly the home slots
        for brick in &f.towers[0].bricks {
            let handle = brick.body.expect("body respawned");
            assert_eq!(
                f.world.translation(handle).unwrap(),
                brick.original_position
            );
        }
    }

    #[test]
    fn test_hold_delay_before_respawn() {
        let mut f = fixture();
        f.animator
            .trigger(0.0, &mut f.world, &mut f.rng, &mut f.towers);

        // Run convergence to the holding phase
        let mut now = 0.0f64;
        while f.animator.particles(0).iter().any(|p| p.position != p.target) {
            now += DT as f64;
            f.animator.update(now, DT, &mut f.world, &mut f.towers);
            assert!(now < 60.0, "convergence did not finish");
        }

        // One more update flips Converging -> Holding if not already there;
        // bodies must not exist yet
        now += DT as f64;
        let done = f.animator.update(now, DT, &mut f.world, &mut f.towers);
        assert!(done.is_empty());
        assert_eq!(f.world.body_count(), 0);

        // After the hold delay the respawn happens
        now += RebuildTuning::default().settle_delay as f64 + 0.1;
        let done = f.animator.update(now, DT, &mut f.world, &mut f.towers);
        assert_eq!(done, vec![0]);
        assert_eq!(f.world.body_count(), 5);
    }

    #[test]
    fn test_rebuild_allowed_again_after_completion() {
        let mut f = fixture();
        f.animator
            .trigger(0.0, &mut f.world, &mut f.rng, &mut f.towers);

        let mut now = 0.0f64;
        while f.animator.is_in_flight(0) {
            now += DT as f64;
            f.animator.update(now, DT, &mut f.world, &mut f.towers);
            assert!(now < 60.0);
        }

        assert!(f
            .animator
            .trigger(now + 1.0, &mut f.world, &mut f.rng, &mut f.towers));
    }
}
