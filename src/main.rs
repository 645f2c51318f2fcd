use anyhow::Result;
use log::info;

use rollback_physics::engine::physics::{presets, AreaEvent, BodyHandle, DebugLines, PhysicsWorld};
use rollback_physics::{Fix64, PhysicsConfig, ShapeBuilder, Vec2Fix};

const TOTAL_TICKS: u64 = 180;
const ROLLBACK_TICK: u64 = 60;

/// Handles the demo keeps around while simulating
struct Arena {
    world: PhysicsWorld,
    player: BodyHandle,
}

fn build_arena() -> Result<Arena> {
    let mut world = PhysicsWorld::with_config(PhysicsConfig::default().with_history_length(8));

    // Floor and walls
    for (x, y, half_width, half_height) in [(0, -6, 12, 1), (-12, 0, 1, 6), (12, 0, 1, 6)] {
        let shape = world.create_shape(presets::ground_shape(
            Fix64::from_int(half_width),
            Fix64::from_int(half_height),
        ))?;
        world.create_body(presets::static_ground(Vec2Fix::from_ints(x, y)).shape(shape))?;
    }

    let shape = world.create_shape(presets::mover_shape(Fix64::HALF, Fix64::ONE))?;
    let player = world.create_body(presets::kinematic_mover(Vec2Fix::from_ints(-8, -4)).shape(shape))?;

    let half = Fix64::from_ratio(3, 10);
    for i in 0..6 {
        let shape = world.create_shape(presets::dynamic_box_shape(half, half))?;
        let position = Vec2Fix::from_ints(-5 + 2 * i, 2);
        let velocity = Vec2Fix::from_ints(3 - i, -4);
        world.create_body(presets::dynamic_box(position, velocity).shape(shape))?;
    }

    let shape = world.create_shape(ShapeBuilder::box_shape(Fix64::TWO, Fix64::TWO))?;
    world.create_body(presets::trigger_area(Vec2Fix::from_ints(0, -3)).shape(shape))?;

    info!("Arena built with {} bodies", world.body_count());
    Ok(Arena { world, player })
}

/// Deterministic per-tick input: walk right, then back
fn player_input(tick: u64) -> Vec2Fix {
    let speed = Fix64::from_ratio(1, 5);
    if (tick / 60) % 2 == 0 {
        Vec2Fix::new(speed, Fix64::ZERO)
    } else {
        Vec2Fix::new(-speed, Fix64::ZERO)
    }
}

fn advance(arena: &mut Arena) -> Result<()> {
    let input = player_input(arena.world.tick());
    arena.world.move_and_slide(arena.player, input, None)?;
    arena.world.step();
    let tick = arena.world.tick();
    for event in arena.world.area_events() {
        match event {
            AreaEvent::Entered { area, body } => info!("Tick {}: {:?} entered {:?}", tick, body, area),
            AreaEvent::Exited { area, body } => info!("Tick {}: {:?} left {:?}", tick, body, area),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting rollback physics demo...");

    let mut arena = build_arena()?;
    let mut snapshot = None;
    while arena.world.tick() < TOTAL_TICKS {
        if arena.world.tick() == ROLLBACK_TICK {
            snapshot = Some(arena.world.save_snapshot());
        }
        advance(&mut arena)?;
    }
    let first_run = arena.world.checksum();
    info!("Tick {} checksum {:016x}", arena.world.tick(), first_run.0);

    let snapshot =
        snapshot.ok_or_else(|| anyhow::anyhow!("no snapshot taken at tick {}", ROLLBACK_TICK))?;
    arena.world.load_snapshot(&snapshot)?;
    info!("Rolled back to tick {}, resimulating", arena.world.tick());
    while arena.world.tick() < TOTAL_TICKS {
        advance(&mut arena)?;
    }
    let second_run = arena.world.checksum();
    info!("Tick {} checksum {:016x}", arena.world.tick(), second_run.0);

    anyhow::ensure!(
        first_run == second_run,
        "resimulation diverged: {:016x} != {:016x}",
        first_run.0,
        second_run.0
    );

    let mut lines = DebugLines::new();
    lines.set_enabled(true);
    lines.prepare(&arena.world);
    info!(
        "Resimulation matched; final frame has {} debug lines",
        lines.line_count()
    );

    Ok(())
}
