//! Brick displacement detection
//!
//! Polls live brick positions against their home slots at a coarse cadence
//! and reports confirmed falls to the tower registry. Detection is suppressed
//! during stabilization windows (after load, after rebuild) so settling
//! physics can't produce false positives.

use std::collections::HashSet;

use crate::config::DetectorTuning;
use crate::physics::PhysicsWorld;
use crate::sim::tower::{BrickId, TowerBricks, TowerId, TowerRegistry};

pub struct DisplacementDetector {
    tuning: DetectorTuning,
    last_poll: f64,
    /// Per tower: sim time at which detection becomes active
    armed_at: Vec<f64>,
    /// Per tower: bricks already reported, so repeat detections are no-ops
    tracked: Vec<HashSet<BrickId>>,
}

impl DisplacementDetector {
    pub fn new(tuning: DetectorTuning) -> Self {
        Self {
            tuning,
            last_poll: f64::NEG_INFINITY,
            armed_at: Vec::new(),
            tracked: Vec::new(),
        }
    }

    /// Re-arm for a fresh level: every tower gets the post-load warm-up
    pub fn reset(&mut self, tower_count: usize, now: f64) {
        let armed = now + self.tuning.warmup_after_load as f64;
        self.armed_at = vec![armed; tower_count];
        self.tracked = vec![HashSet::new(); tower_count];
        self.last_poll = f64::NEG_INFINITY;
    }

    /// Re-arm one tower after its rebuild completes: tracked ids are cleared
    /// and the shorter post-rebuild warm-up applies
    pub fn rearm_tower(&mut self, tower: TowerId, now: f64) {
        if let Some(armed) = self.armed_at.get_mut(tower) {
            *armed = now + self.tuning.warmup_after_rebuild as f64;
        }
        if let Some(tracked) = self.tracked.get_mut(tower) {
            tracked.clear();
        }
    }

    /// Whether a tower is currently inside a stabilization window
    pub fn is_suppressed(&self, tower: TowerId, now: f64) -> bool {
        self.armed_at.get(tower).is_some_and(|armed| now < *armed)
    }

    /// Throttled poll. Bricks without a live rigid body (mid-rebuild) are
    /// skipped for this poll, never treated as fallen.
    pub fn poll(
        &mut self,
        now: f64,
        world: &dyn PhysicsWorld,
        towers: &[TowerBricks],
        registry: &mut TowerRegistry,
    ) {
        if now - self.last_poll < self.tuning.poll_interval as f64 {
            return;
        }
        self.last_poll = now;

        for tb in towers {
            if self.is_suppressed(tb.tower, now) {
                continue;
            }
            let Some(tracked) = self.tracked.get_mut(tb.tower) else {
                continue;
            };

            for brick in &tb.bricks {
                if tracked.contains(&brick.id) {
                    continue;
                }
                let Some(handle) = brick.body else { continue };
                let Some(position) = world.translation(handle) else {
                    continue;
                };

                let displaced = position.distance(brick.original_position)
                    > self.tuning.distance_threshold
                    || position.y < tb.base_y - self.tuning.height_drop_threshold;

                if displaced {
                    tracked.insert(brick.id);
                    registry.record_fallen_brick(tb.tower, brick.id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TowerTuning;
    use crate::physics::{BallisticWorld, BodyDesc};
    use crate::sim::tower::{Brick, TowerSpec, brick_grid_positions};
    use glam::Vec3;

    struct Fixture {
        world: BallisticWorld,
        towers: Vec<TowerBricks>,
        registry: TowerRegistry,
        detector: DisplacementDetector,
    }

    fn fixture() -> Fixture {
        let tower_tuning = TowerTuning::default();
        let mut world = BallisticWorld::new();
        let anchor = Vec3::ZERO;
        let bricks = brick_grid_positions(&tower_tuning, anchor)
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

        let mut registry = TowerRegistry::new(22);
        registry.initialize(&[TowerSpec {
            position: anchor,
            total_bricks: tower_tuning.bricks_per_tower(),
        }]);

        let mut detector = DisplacementDetector::new(DetectorTuning::default());
        detector.reset(1, 0.0);

        Fixture {
            world,
            towers: vec![TowerBricks {
                tower: 0,
                base_y: anchor.y,
                bricks,
            }],
            registry,
            detector,
        }
    }

    fn displace(f: &mut Fixture, brick: usize, offset: Vec3) {
        let handle = f.towers[0].bricks[brick].body.unwrap();
        let original = f.towers[0].bricks[brick].original_position;
        f.world.despawn(handle);
        f.towers[0].bricks[brick].body = Some(f.world.spawn(BodyDesc {
            position: original + offset,
            start_asleep: true,
            ..Default::default()
        }));
    }

    #[test]
    fn test_warmup_suppresses_detection() {
        let mut f = fixture();
        displace(&mut f, 0, Vec3::new(30.0, 0.0, 0.0));

        // Inside the 5s post-load window: nothing reported
        f.detector
            .poll(1.0, &f.world, &f.towers, &mut f.registry);
        assert_eq!(f.registry.get(0).unwrap().fallen_count(), 0);

        // After the window the displaced brick registers
        f.detector
            .poll(6.0, &f.world, &f.towers, &mut f.registry);
        assert_eq!(f.registry.get(0).unwrap().fallen_count(), 1);
    }

    #[test]
    fn test_distance_threshold_path() {
        let mut f = fixture();
        displace(&mut f, 3, Vec3::new(20.5, 0.0, 0.0)); // beyond 20.0
        displace(&mut f, 4, Vec3::new(15.0, 0.0, 0.0)); // within 20.0

        f.detector
            .poll(10.0, &f.world, &f.towers, &mut f.registry);
        assert_eq!(f.registry.get(0).unwrap().fallen_count(), 1);
    }

    #[test]
    fn test_height_drop_path() {
        let mut f = fixture();
        // Brick 0 sits at y=1; move it to y=-9 (below base - 8) but keep the
        // horizontal displacement under the distance threshold
        displace(&mut f, 0, Vec3::new(0.0, -10.0, 0.0));

        f.detector
            .poll(10.0, &f.world, &f.towers, &mut f.registry);
        assert_eq!(f.registry.get(0).unwrap().fallen_count(), 1);
    }

    #[test]
    fn test_poll_is_throttled() {
        let mut f = fixture();
        displace(&mut f, 0, Vec3::new(30.0, 0.0, 0.0));

        f.detector
            .poll(10.0, &f.world, &f.towers, &mut f.registry);
        displace(&mut f, 1, Vec3::new(30.0, 0.0, 0.0));

        // 0.1s later: inside the poll interval, brick 1 not seen yet
        f.detector
            .poll(10.1, &f.world, &f.towers, &mut f.registry);
        assert_eq!(f.registry.get(0).unwrap().fallen_count(), 1);

        f.detector
            .poll(10.6, &f.world, &f.towers, &mut f.registry);
        assert_eq!(f.registry.get(0).unwrap().fallen_count(), 2);
    }

    #[test]
    fn test_dead_handle_is_skipped() {
        let mut f = fixture();
        let handle = f.towers[0].bricks[0].body.unwrap();
        f.world.despawn(handle); // handle now stale, brick still wired to it

        f.detector
            .poll(10.0, &f.world, &f.towers, &mut f.registry);
        assert_eq!(f.registry.get(0).unwrap().fallen_count(), 0);
    }

    #[test]
    fn test_rearm_clears_tracked_ids() {
        let mut f = fixture();
        displace(&mut f, 0, Vec3::new(30.0, 0.0, 0.0));
        f.detector
            .poll(10.0, &f.world, &f.towers, &mut f.registry);
        assert_eq!(f.registry.get(0).unwrap().fallen_count(), 1);

        // Rebuild completed: brick back home, registry reset, detector re-armed
        displace(&mut f, 0, Vec3::ZERO);
        f.registry.reset_tower(0);
        f.detector.rearm_tower(0, 20.0);
        assert!(f.detector.is_suppressed(0, 20.5));
        assert!(!f.detector.is_suppressed(0, 21.5));

        // Displace again after the short warm-up: detected fresh
        displace(&mut f, 0, Vec3::new(30.0, 0.0, 0.0));
        f.detector
            .poll(22.0, &f.world, &f.towers, &mut f.registry);
        assert_eq!(f.registry.get(0).unwrap().fallen_count(), 1);
    }
}
