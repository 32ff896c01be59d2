use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::time::Duration;

#[cfg(feature = "dev-tools")]
use sprite_graph::debug::DebugPlugin;
use sprite_graph::manager::SpriteManager;
use sprite_graph::sprites::{
    FrameTriggered, SpriteId, SpriteStage, SpritesPlugin, ThinkClock, think_sprites,
};

const FRAME: Duration = Duration::from_millis(16);
const RUN_FOR_MS: i64 = 3000;
const KNIGHT: &str = "knight";

/// Knights spawned at startup, in spawn order.
#[derive(Resource, Debug, Default)]
struct Knights(Vec<SpriteId>);

#[derive(Debug, Clone)]
enum Cue {
    Command { knight: usize, names: Vec<&'static str> },
    Sync { names: Vec<Vec<&'static str>>, tag: &'static str },
}

/// Commands issued once the think clock passes their time.
#[derive(Resource, Debug)]
struct Script {
    cues: Vec<(i64, Cue)>,
    next: usize,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            cues: vec![
                (0, Cue::Command { knight: 0, names: vec!["walk"] }),
                (0, Cue::Command { knight: 1, names: vec!["turn"] }),
                (600, Cue::Command { knight: 1, names: vec!["walk"] }),
                (
                    1200,
                    Cue::Sync {
                        names: vec![vec!["stop", "attack"], vec!["stop", "attack"]],
                        tag: "hit",
                    },
                ),
            ],
            next: 0,
        }
    }
}

fn main() {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, LogPlugin::default()))
        .insert_resource(TimeUpdateStrategy::ManualDuration(FRAME))
        .add_plugins(SpritesPlugin);
    #[cfg(feature = "dev-tools")]
    app.add_plugins(DebugPlugin);
    app.init_resource::<Knights>()
        .init_resource::<Script>()
        .add_systems(Startup, spawn_knights)
        .add_systems(
            Update,
            (run_script.before(think_sprites), report_strikes.after(think_sprites)),
        );

    app.finish();
    app.cleanup();
    while app.world().resource::<ThinkClock>().elapsed_ms() < RUN_FOR_MS {
        app.update();
    }

    let stage = app.world().resource::<SpriteStage>();
    for id in stage.ids() {
        if let Some(sprite) = stage.get(id) {
            info!(
                "Knight {:?} finished in state '{}' on frame '{}' facing {}",
                id,
                sprite.state(),
                sprite.anim(),
                sprite.facing()
            );
        }
    }
}

fn spawn_knights(
    manager: Res<SpriteManager>,
    mut stage: ResMut<SpriteStage>,
    mut knights: ResMut<Knights>,
) {
    for _ in 0..2 {
        match manager.load_sprite(KNIGHT) {
            Ok(sprite) => knights.0.push(stage.insert(sprite)),
            Err(e) => {
                error!("Failed to load '{}': {}", KNIGHT, e);
                return;
            }
        }
    }
    info!("Spawned {} knight(s)", knights.0.len());
}

fn run_script(
    clock: Res<ThinkClock>,
    knights: Res<Knights>,
    mut script: ResMut<Script>,
    mut stage: ResMut<SpriteStage>,
) {
    while let Some((at, cue)) = script.cues.get(script.next).cloned() {
        if at > clock.elapsed_ms() {
            break;
        }
        script.next += 1;

        match cue {
            Cue::Command { knight, names } => {
                let Some(&id) = knights.0.get(knight) else {
                    warn!("Script names missing knight {}", knight);
                    continue;
                };
                match stage.command_n(id, &names) {
                    Ok(true) => info!("Knight {:?} <- {:?}", id, names),
                    Ok(false) => warn!("Knight {:?} rejected {:?}", id, names),
                    Err(e) => error!("{}", e),
                }
            }
            Cue::Sync { names, tag } => match stage.command_sync(&knights.0, &names, tag) {
                Some(group) => info!("Synchronised {:?} on '{}' as {:?}", names, tag, group),
                None => warn!("No knight accepted {:?}", names),
            },
        }
    }
}

fn report_strikes(clock: Res<ThinkClock>, mut triggered: MessageReader<FrameTriggered>) {
    for event in triggered.read() {
        if event.text == "strike" {
            info!("Knight {:?} struck at {}ms", event.sprite, clock.elapsed_ms());
        }
    }
}
