//! Opaque sprite position snapshots.

use serde::{Deserialize, Serialize};

/// Everything needed to put a sprite back at a position without replaying
/// the commands that led there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct SpriteState {
    facing: usize,
    state_node_id: usize,
    anim_node_id: usize,
}

impl SpriteState {
    pub(crate) fn new(facing: usize, state_node_id: usize, anim_node_id: usize) -> Self {
        Self {
            facing,
            state_node_id,
            anim_node_id,
        }
    }

    pub(crate) fn facing(&self) -> usize {
        self.facing
    }

    pub(crate) fn state_node_id(&self) -> usize {
        self.state_node_id
    }

    pub(crate) fn anim_node_id(&self) -> usize {
        self.anim_node_id
    }
}
