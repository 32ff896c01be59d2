//! Sprites domain: per-actor animation driven through the state and
//! animation graphs.
//!
//! This module handles:
//! - Command intake on the state graph
//! - The think loop that spends time on animation frames
//! - Barrier-synchronised commands across several sprites
//! - One-shot waits on reaching a state
//! - Position snapshots

mod command;
mod snapshot;
mod sprite;
mod stage;
mod systems;
mod waiter;

pub use command::{Command, CommandGroup, GroupId};
pub use snapshot::SpriteState;
pub use sprite::{Sprite, TriggerFn};
pub use stage::{SpriteId, SpriteStage};
pub use systems::{FrameTriggered, ThinkClock, think_sprites};
pub use waiter::{WaitHandle, WaiterRegistry};

use bevy::prelude::*;
use thiserror::Error;

use crate::config::{CONFIG_PATH, SpriteGraphConfig};
use crate::manager::SpriteManager;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteError {
    #[error("cannot restore a sprite while {0} waiter(s) are pending")]
    WaitersPending(usize),
    #[error("snapshot does not fit this sprite: {0}")]
    InvalidSnapshot(String),
    #[error("no sprite with id {0:?} on the stage")]
    UnknownSprite(SpriteId),
}

/// Registers the sprite manager, the stage and the system that thinks every
/// sprite once per frame.
///
/// A [`SpriteGraphConfig`] inserted before the plugin is used as is;
/// otherwise one is read from [`CONFIG_PATH`].
pub struct SpritesPlugin;

impl Plugin for SpritesPlugin {
    fn build(&self, app: &mut App) {
        let config = match app.world().get_resource::<SpriteGraphConfig>() {
            Some(config) => config.clone(),
            None => SpriteGraphConfig::load_or_default(CONFIG_PATH),
        };
        info!(
            "Sprite root '{}'{}",
            config.sprite_root.display(),
            match config.rng_seed {
                Some(seed) => format!(", seed {}", seed),
                None => String::new(),
            }
        );

        app.insert_resource(SpriteManager::from_config(&config))
            .insert_resource(config)
            .init_resource::<SpriteStage>()
            .init_resource::<ThinkClock>()
            .add_message::<FrameTriggered>()
            .add_systems(Update, think_sprites);
    }
}
