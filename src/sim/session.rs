//! Session orchestration
//!
//! Everything advances inside one `tick` in a fixed order: physics step ->
//! collision events -> explosion impulses -> displacement poll (throttled) ->
//! rebuild particle integration -> energy/timer -> terminal-state evaluation.
//! There is no other thread of control; debounce and poll throttling compare
//! accumulated simulation time, never wall clock.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::config::{EnergyTuning, Tuning};
use crate::physics::{BallisticWorld, PhysicsWorld};
use crate::sim::detector::DisplacementDetector;
use crate::sim::explosion::{ExplosionEvent, ExplosionSystem};
use crate::sim::outcome::WinLoss;
use crate::sim::projectile::ProjectileSet;
use crate::sim::rebuild::{RebuildAnimator, RebuildParticle};
use crate::sim::timer::CountdownTimer;
use crate::sim::tower::{
    Brick, BrickId, TowerBricks, TowerId, TowerRegistry, TowerSpec, brick_body_desc,
    brick_grid_positions,
};

/// Fire command: projectile origin and view direction
#[derive(Debug, Clone, Copy)]
pub struct FireInput {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Fire a projectile
    pub fire: Option<FireInput>,
    /// Rebuild all towers and restart the round ("F" key)
    pub rebuild: bool,
    /// Toggle pause
    pub pause: bool,
    /// Begin the round (menu dismissed)
    pub start: bool,
}

/// Firing energy meter: each shot costs a chunk, slow recharge while running
#[derive(Debug, Clone)]
pub struct EnergyMeter {
    tuning: EnergyTuning,
    energy: f32,
}

impl EnergyMeter {
    fn new(tuning: EnergyTuning) -> Self {
        let energy = tuning.max_energy;
        Self { tuning, energy }
    }

    #[inline]
    pub fn energy(&self) -> f32 {
        self.energy
    }

    #[inline]
    pub fn has_charge(&self) -> bool {
        self.energy >= self.tuning.fire_cost
    }

    fn spend(&mut self) {
        self.energy = (self.energy - self.tuning.fire_cost).max(0.0);
    }

    fn recharge(&mut self, dt: f32) {
        self.energy = (self.energy + self.tuning.recharge_per_second * dt).min(self.tuning.max_energy);
    }
}

/// One running match: towers, physics wiring, and every gameplay subsystem
pub struct Session<W: PhysicsWorld = BallisticWorld> {
    tuning: Tuning,
    world: W,
    rng: Pcg32,
    registry: TowerRegistry,
    towers: Vec<TowerBricks>,
    detector: DisplacementDetector,
    explosions: ExplosionSystem,
    rebuilder: RebuildAnimator,
    projectiles: ProjectileSet,
    timer: CountdownTimer,
    outcome: WinLoss,
    energy: EnergyMeter,
    paused: bool,
    has_started: bool,
    elapsed: f64,
}

impl Session<BallisticWorld> {
    /// Build a session over the built-in ballistic world
    pub fn new(tuning: Tuning, tower_positions: &[Vec3], seed: u64) -> Self {
        Self::with_world(BallisticWorld::new(), tuning, tower_positions, seed)
    }
}

impl<W: PhysicsWorld> Session<W> {
    /// Build a session over a caller-provided physics world
    pub fn with_world(mut world: W, tuning: Tuning, tower_positions: &[Vec3], seed: u64) -> Self {
        let towers: Vec<TowerBricks> = tower_positions
            .iter()
            .enumerate()
            .map(|(id, &anchor)| {
                let bricks = brick_grid_positions(&tuning.tower, anchor)
                    .into_iter()
                    .enumerate()
                    .map(|(i, position)| Brick {
                        id: i as BrickId,
                        original_position: position,
                        body: Some(world.spawn(brick_body_desc(&tuning.tower, position))),
                    })
                    .collect();
                TowerBricks {
                    tower: id,
                    base_y: anchor.y,
                    bricks,
                }
            })
            .collect();

        let specs: Vec<TowerSpec> = tower_positions
            .iter()
            .map(|&position| TowerSpec {
                position,
                total_bricks: tuning.tower.bricks_per_tower(),
            })
            .collect();

        let mut registry = TowerRegistry::new(tuning.tower.destroy_threshold_percent);
        registry.initialize(&specs);

        let mut detector = DisplacementDetector::new(tuning.detector.clone());
        detector.reset(towers.len(), 0.0);

        Self {
            world,
            rng: Pcg32::seed_from_u64(seed),
            registry,
            detector,
            explosions: ExplosionSystem::new(tuning.explosion.clone()),
            rebuilder: RebuildAnimator::new(
                tuning.rebuild.clone(),
                tuning.tower.clone(),
                towers.len(),
            ),
            projectiles: ProjectileSet::new(tuning.projectile.clone()),
            timer: CountdownTimer::new(tuning.timer.clone()),
            outcome: WinLoss::new(),
            energy: EnergyMeter::new(tuning.energy.clone()),
            towers,
            tuning,
            paused: true,
            has_started: false,
            elapsed: 0.0,
        }
    }

    /// Advance the whole simulation by one fixed step
    pub fn tick(&mut self, input: &TickInput, dt: f32) {
        if input.start && !self.has_started {
            self.has_started = true;
            self.paused = false;
            self.timer.reset();
            self.timer.start();
            log::info!("round started ({}s on the clock)", self.timer.time_remaining());
        }
        if input.pause && self.has_started {
            self.paused = !self.paused;
        }
        if !self.has_started || self.paused {
            return;
        }

        self.elapsed += dt as f64;

        // User commands first: they shape what this tick simulates
        if input.rebuild
            && self
                .rebuilder
                .trigger(self.elapsed, &mut self.world, &mut self.rng, &mut self.towers)
        {
            // Rebuilding clears terminal flags; the clock restarts once the
            // towers settle
            self.outcome.reset();
            self.timer.stop();
        }
        if let Some(fire) = input.fire {
            self.try_fire(fire);
        }

        self.world.step(dt);

        let contacts = self.world.drain_contacts();
        for impact in self.projectiles.impacts(&mut self.world, &contacts) {
            self.explosions.trigger(
                &mut self.world,
                &mut self.rng,
                self.elapsed,
                impact.position,
                impact.velocity,
            );
        }
        self.projectiles.expire(&mut self.world, self.elapsed);
        self.explosions.update(self.elapsed);

        self.detector
            .poll(self.elapsed, &self.world, &self.towers, &mut self.registry);

        for tower in self
            .rebuilder
            .update(self.elapsed, dt, &mut self.world, &mut self.towers)
        {
            self.registry.reset_tower(tower);
            self.detector.rearm_tower(tower, self.elapsed);
            self.timer.reset();
            self.timer.start();
        }

        self.energy.recharge(dt);
        self.timer.tick(dt);

        // Terminal state is meaningless mid-rebuild: the registry still holds
        // pre-rebuild demolition until each tower settles
        if !self.rebuilder.any_in_flight() {
            self.outcome
                .evaluate(self.registry.active_tower_count(), &mut self.timer);
        }
    }

    fn try_fire(&mut self, fire: FireInput) {
        if !self.can_fire() {
            return;
        }
        if self
            .projectiles
            .fire(&mut self.world, self.elapsed, fire.origin, fire.direction)
            .is_some()
        {
            self.energy.spend();
        }
    }

    /// Detonate a blast directly (scripted levels, tests, demo harness)
    pub fn detonate(&mut self, position: Vec3) -> usize {
        self.explosions
            .trigger(&mut self.world, &mut self.rng, self.elapsed, position, Vec3::ZERO)
    }

    // --- Read surface for HUD/overlay consumers ---

    #[inline]
    pub fn can_fire(&self) -> bool {
        self.has_started && !self.paused && !self.outcome.is_game_over() && self.energy.has_charge()
    }

    pub fn registry(&self) -> &TowerRegistry {
        &self.registry
    }

    pub fn demolition_percentage(&self, tower: TowerId) -> u32 {
        self.registry.demolition_percentage(tower)
    }

    pub fn active_tower_count(&self) -> usize {
        self.registry.active_tower_count()
    }

    #[inline]
    pub fn time_remaining(&self) -> f32 {
        self.timer.time_remaining()
    }

    #[inline]
    pub fn has_won(&self) -> bool {
        self.outcome.has_won()
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.outcome.is_game_over()
    }

    #[inline]
    pub fn energy(&self) -> f32 {
        self.energy.energy()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn has_started(&self) -> bool {
        self.has_started
    }

    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilder.any_in_flight()
    }

    /// Rebuild particles for a tower (render feed; empty when settled)
    pub fn rebuild_particles(&self, tower: TowerId) -> &[RebuildParticle] {
        self.rebuilder.particles(tower)
    }

    /// Retained transient explosion events (effects feed)
    pub fn explosion_events(&self) -> impl Iterator<Item = &ExplosionEvent> {
        self.explosions.events()
    }

    pub fn towers(&self) -> &[TowerBricks] {
        &self.towers
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn world(&self) -> &W {
        &self.world
    }
}
