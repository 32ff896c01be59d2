//! Sprites domain: systems driving the stage from the Bevy clock.

use bevy::ecs::message::Message;
use bevy::prelude::*;
use std::time::Duration;

use super::stage::{SpriteId, SpriteStage};
use crate::config::SpriteGraphConfig;

/// Fired when a sprite arrives on a frame tagged with `func`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTriggered {
    pub sprite: SpriteId,
    pub text: String,
}

impl Message for FrameTriggered {}

/// Converts frame deltas into whole milliseconds, carrying the remainder so
/// no simulated time is lost between frames.
#[derive(Resource, Debug, Default)]
pub struct ThinkClock {
    carry: Duration,
    elapsed_ms: i64,
}

impl ThinkClock {
    pub fn advance(&mut self, delta: Duration) -> i64 {
        let total = self.carry + delta;
        let ms = total.as_millis();
        self.carry = total - Duration::from_millis(ms as u64);
        let ms = i64::try_from(ms).unwrap_or(i64::MAX);
        self.elapsed_ms = self.elapsed_ms.saturating_add(ms);
        ms
    }

    /// Total milliseconds handed to the stage so far.
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed_ms
    }
}

/// Thinks every sprite on the stage and republishes their frame triggers.
pub fn think_sprites(
    time: Res<Time>,
    config: Res<SpriteGraphConfig>,
    mut clock: ResMut<ThinkClock>,
    mut stage: ResMut<SpriteStage>,
    mut triggered: MessageWriter<FrameTriggered>,
) {
    let dt = clock.advance(time.delta());
    if dt > 0 {
        stage.think_all(dt);
    }

    for (sprite, text) in stage.drain_triggers() {
        if config.log_triggers {
            info!("Sprite {:?} triggered '{}'", sprite, text);
        }
        triggered.write(FrameTriggered { sprite, text });
    }
}
