//! Asteroid Quest headless demo
//!
//! Runs one scripted play-through against the recording services and prints
//! a JSON summary. Usage: `asteroid-quest [config.json] [seed]`

use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use asteroid_quest::consts::{ORB_COLLAPSE_HITS, SIM_DT};
use asteroid_quest::services::Services;
use asteroid_quest::sim::{GameEvent, InputEvent, Session, TickInput};
use asteroid_quest::GameConfig;
use serde::Serialize;

#[derive(Serialize)]
struct Summary<'a> {
    seed: u64,
    phase: String,
    events: usize,
    service_calls: usize,
    state: &'a asteroid_quest::sim::GameState,
}

fn main() -> ExitCode {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match GameConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("{}", err);
                return ExitCode::FAILURE;
            }
        },
        None => GameConfig::default(),
    };

    let seed = args
        .next()
        .and_then(|s| s.parse().ok())
        .or(config.seed)
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        });
    log::info!("Asteroid Quest starting with seed {}", seed);

    let (services, recorder) = Services::recording();
    let mut session = match Session::new(config, seed, services) {
        Ok(session) => session,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    session.events().subscribe(move |e: &GameEvent| sink.borrow_mut().push(e.clone()));

    // Pick the first body, then every orb on it
    let Some(body) = session.state().bodies.first() else {
        log::error!("no bodies spawned");
        return ExitCode::FAILURE;
    };
    let mut picks = vec![InputEvent::BodyPicked(body.handle)];
    picks.extend(body.orbs.iter().map(|o| InputEvent::OrbPicked(o.handle)));
    session.tick(
        &TickInput {
            picks,
            ..Default::default()
        },
        SIM_DT,
    );

    // Let the settle delay run out
    let settle_ticks = (session.config().settle_delay_secs / SIM_DT).ceil() as usize + 1;
    for _ in 0..settle_ticks {
        session.tick(&TickInput::default(), SIM_DT);
    }

    // Hit every orb open
    let orbs: Vec<_> = session.state().bodies[0].orbs.iter().map(|o| o.handle).collect();
    for handle in orbs {
        let picks = vec![InputEvent::OrbPicked(handle); ORB_COLLAPSE_HITS as usize];
        session.tick(
            &TickInput {
                picks,
                ..Default::default()
            },
            SIM_DT,
        );
    }

    let summary = Summary {
        seed,
        phase: session.phase().to_string(),
        events: events.borrow().len(),
        service_calls: recorder.calls().len(),
        state: session.state(),
    };
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("failed to serialize summary: {}", err);
            ExitCode::FAILURE
        }
    }
}
