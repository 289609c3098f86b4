//! Kart Sim entry point
//!
//! Runs a headless demo race: the player kart auto-drives with the same
//! steering helper the AI uses, telemetry is logged periodically, and the
//! final race snapshot is printed as JSON.

use kartsim::consts::TICKS_PER_SECOND;
use kartsim::sim::{DriveInput, RaceConfig, RacePhase, RaceState, steer_toward};

/// Safety cap so a wedged demo can't spin forever (10 sim minutes)
const MAX_TICKS: u64 = 10 * 60 * TICKS_PER_SECOND as u64;

/// Telemetry log interval (5 seconds)
const LOG_INTERVAL: u64 = 5 * TICKS_PER_SECOND as u64;

fn main() {
    env_logger::init();
    log::info!("Kart Sim headless demo starting...");

    let config = RaceConfig::default();
    let mut race = match RaceState::new(config) {
        Ok(race) => race,
        Err(err) => {
            log::error!("race setup failed: {err}");
            std::process::exit(1);
        }
    };

    let mut ticks: u64 = 0;
    while race.phase != RacePhase::Finished && ticks < MAX_TICKS {
        let input = auto_drive(&race);
        race.tick(&input);
        ticks += 1;

        if ticks % LOG_INTERVAL == 0 {
            let hud = race.telemetry(0);
            log::info!(
                "t={:6.1}s  place {}/{}  lap {}/{}  item {}",
                hud.race_time,
                hud.position,
                hud.total_racers,
                hud.current_lap,
                hud.total_laps,
                hud.current_item.map(|i| i.as_str()).unwrap_or("-"),
            );
        }
    }

    if let Some(outcome) = &race.outcome {
        log::info!(
            "Player placed {} of {}: {}",
            outcome.player_position,
            outcome.standings.len(),
            if outcome.passed { "pass" } else { "fail" }
        );
    } else {
        log::warn!("demo hit the tick cap before the player finished");
    }

    match serde_json::to_string_pretty(&race.snapshot()) {
        Ok(json) => println!("{json}"),
        Err(err) => log::error!("snapshot serialization failed: {err}"),
    }
}

/// Drive the player kart at its next gate, using any item as soon as it is
/// collected. Same input shape the host would feed from real controls.
fn auto_drive(race: &RaceState) -> DriveInput {
    let player = &race.vehicles[0];
    let gate = race.track.checkpoint(player.next_checkpoint);

    DriveInput {
        throttle: 0.95,
        steer: steer_toward(player, gate.pos),
        use_item: player.held_item.is_some(),
    }
}
