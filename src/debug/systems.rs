//! Debug domain: status reporting for sprites on the stage.

use bevy::prelude::*;

use crate::debug::state::DebugState;
use crate::sprites::{SpriteId, SpriteStage, ThinkClock};

/// One sprite's position as shown in the status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub sprite: SpriteId,
    pub state: String,
    pub anim: String,
    pub facing: usize,
    pub togo: i64,
    pub pending: usize,
}

pub fn status_lines(stage: &SpriteStage) -> Vec<StatusLine> {
    stage
        .ids()
        .filter_map(|id| {
            let sprite = stage.get(id)?;
            Some(StatusLine {
                sprite: id,
                state: sprite.state().to_string(),
                anim: sprite.anim().to_string(),
                facing: sprite.facing(),
                togo: sprite.togo(),
                pending: sprite.num_pending_cmds(),
            })
        })
        .collect()
}

/// Logs every sprite's position once per report interval
pub fn log_sprite_status(
    time: Res<Time>,
    clock: Res<ThinkClock>,
    stage: Res<SpriteStage>,
    mut debug_state: ResMut<DebugState>,
) {
    if !debug_state.tick(time.delta_secs()) {
        return;
    }

    info!(
        "[DEBUG] t={}ms, {} sprite(s), {} open group(s)",
        clock.elapsed_ms(),
        stage.len(),
        stage.group_count()
    );
    for line in status_lines(&stage) {
        info!(
            "[DEBUG] {:?}: state '{}' anim '{}' facing {} togo {}ms pending {}",
            line.sprite, line.state, line.anim, line.facing, line.togo, line.pending
        );
    }
}
