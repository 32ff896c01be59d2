//! Debug domain: developer tooling compiled in with the `dev-tools` feature.

mod state;
mod systems;

pub use state::DebugState;
pub use systems::{StatusLine, log_sprite_status, status_lines};

use bevy::prelude::*;

use crate::sprites::think_sprites;

pub struct DebugPlugin;

impl Plugin for DebugPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugState>().add_systems(
            Update,
            log_sprite_status
                .after(think_sprites)
                .run_if(|state: Res<DebugState>| state.show_status),
        );
    }
}
