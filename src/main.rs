//! Brickfall headless demo
//!
//! Runs a scripted demolition round against the built-in ballistic world:
//! fires at each tower until the round resolves, then rebuilds and lets the
//! towers settle. Useful for eyeballing the log output and for profiling the
//! simulation without a renderer.

use glam::Vec3;

use brickfall::consts::SIM_DT;
use brickfall::sim::{FireInput, Session, TickInput};
use brickfall::Tuning;

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(7);

    let tower_positions = [
        Vec3::new(-20.0, 0.0, -30.0),
        Vec3::new(0.0, 0.0, -30.0),
        Vec3::new(20.0, 0.0, -30.0),
    ];
    let mut session = Session::new(Tuning::default(), &tower_positions, seed);

    session.tick(
        &TickInput {
            start: true,
            ..Default::default()
        },
        SIM_DT,
    );
    log::info!("demo round started with seed {seed}");

    let player = Vec3::new(0.0, 2.0, 25.0);
    let mut last_shot = f64::NEG_INFINITY;
    let mut last_report = 0.0f64;

    // Demolition phase: shoot at the first still-active tower
    while !session.is_game_over() && session.elapsed() < 120.0 {
        let mut input = TickInput::default();

        let target = session
            .registry()
            .towers()
            .iter()
            .find(|t| !t.is_destroyed())
            .map(|t| t.position + Vec3::new(0.0, 3.0, 0.0));

        if let Some(target) = target
            && session.can_fire()
            && session.elapsed() - last_shot >= 2.0
        {
            last_shot = session.elapsed();
            input.fire = Some(FireInput {
                origin: player,
                direction: target - player,
            });
        }

        session.tick(&input, SIM_DT);

        if session.elapsed() - last_report >= 5.0 {
            last_report = session.elapsed();
            let summary: Vec<String> = session
                .registry()
                .towers()
                .iter()
                .map(|t| format!("T{} {}%", t.id, t.demolition_percentage()))
                .collect();
            log::info!(
                "t={:5.1}s clock={:4.1}s energy={:5.1} [{}]",
                session.elapsed(),
                session.time_remaining(),
                session.energy(),
                summary.join(" ")
            );
        }
    }

    if session.has_won() {
        log::info!(
            "victory at t={:.1}s with {:.1}s on the clock",
            session.elapsed(),
            session.time_remaining()
        );
    } else {
        log::info!("defeat: {} towers left standing", session.active_tower_count());
    }

    // Rebuild phase: gather the rubble back into towers
    session.tick(
        &TickInput {
            rebuild: true,
            ..Default::default()
        },
        SIM_DT,
    );
    log::info!("rebuild triggered");

    let rebuild_deadline = session.elapsed() + 120.0;
    while session.is_rebuilding() && session.elapsed() < rebuild_deadline {
        session.tick(&TickInput::default(), SIM_DT);
    }

    log::info!(
        "rebuild {} at t={:.1}s; {} towers active, clock={:.1}s",
        if session.is_rebuilding() {
            "still in flight"
        } else {
            "complete"
        },
        session.elapsed(),
        session.active_tower_count(),
        session.time_remaining()
    );
}
