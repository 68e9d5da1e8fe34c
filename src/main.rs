use monster_battle::battle::state::TurnRng;
use monster_battle::party;
use monster_battle::{
    BattleService, ContentRegistry, EngineConfig, InMemoryPartyStore, InMemorySpeciesStore, InMemoryWorldStore,
    PlayerId, SpeciesId, TurnAction, TurnResult,
};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Turns the demo plays before giving up on a stubborn enemy.
const MAX_TURNS: u32 = 50;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "monster_battle=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run() {
        println!("Error: {}", e);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::load(Path::new("config/engine.toml"))?;
    let content = Arc::new(ContentRegistry::load(&config.content_dir)?);
    let species = Arc::new(InMemorySpeciesStore::load(&config.content_dir)?);
    let party_store = Arc::new(InMemoryPartyStore::new());
    let world = Arc::new(InMemoryWorldStore::new());
    let player = PlayerId::new("demo");

    let mut rng = match config.rng_seed {
        Some(seed) => TurnRng::from_seed(seed),
        None => TurnRng::new_random(),
    };
    for species_id in [1, 4] {
        let starter = party::create_starter(
            &content,
            species.as_ref(),
            party_store.as_ref(),
            &player,
            SpeciesId(species_id),
            5,
            &mut rng,
        )?;
        println!("Starter: species #{} Lv{} ({} hp)", species_id, starter.level, starter.max_hp);
    }

    let service = BattleService::new(config, content, species, party_store, world);
    let mut view = service.start_battle(&player)?;
    tracing::debug!("Opening view: {}", serde_json::to_string(&view)?);
    println!(
        "Battle: {} Lv{} vs {} Lv{}",
        view.you.display_name(),
        view.you.level,
        view.enemy.display_name(),
        view.enemy.level
    );

    for _ in 0..MAX_TURNS {
        let action = if view.require_switch {
            let index = if view.you_index == 0 { 1 } else { 0 };
            TurnAction::Switch { index }
        } else if view.allow_capture {
            break;
        } else if view.pp.iter().all(|entry| entry.current == 0) {
            TurnAction::Run
        } else {
            let slot = view.pp.iter().position(|entry| entry.current > 0).unwrap_or(0);
            TurnAction::Move { slot }
        };

        match service.submit_turn(&player, action)? {
            TurnResult::Ongoing(next) => view = next,
            TurnResult::Ended { outcome, log } => {
                print_log(&log);
                println!("Battle over: {:?}", outcome);
                return Ok(());
            }
        }
    }

    if view.allow_capture {
        match service.attempt_capture(&player)? {
            TurnResult::Ongoing(next) => {
                print_log(&next.log);
                service.finish_battle(&player)?;
                println!("It got away. Battle finished.");
            }
            TurnResult::Ended { outcome, log } => {
                print_log(&log);
                println!("Battle over: {:?}", outcome);
            }
        }
    } else {
        print_log(&view.log);
        service.finish_battle(&player)?;
        println!("Battle finished without a knockout.");
    }
    Ok(())
}

fn print_log(log: &[String]) {
    for line in log {
        println!("  {}", line);
    }
}
