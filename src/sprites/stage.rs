//! The stage owns every live sprite and the command groups between them.

use bevy::log::{debug, error, warn};
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::SpriteError;
use super::command::{CommandGroup, GroupId};
use super::snapshot::SpriteState;
use super::sprite::{Advance, Sprite};

/// Index of a sprite on a [`SpriteStage`]. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct SpriteId(pub(crate) usize);

#[derive(Resource, Debug, Default)]
pub struct SpriteStage {
    sprites: Vec<Option<Sprite>>,
    groups: HashMap<GroupId, CommandGroup>,
    next_group: u64,
}

impl SpriteStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sprite: Sprite) -> SpriteId {
        self.sprites.push(Some(sprite));
        SpriteId(self.sprites.len() - 1)
    }

    /// Takes a sprite off the stage, detaching it from groups it has not
    /// started yet.
    pub fn remove(&mut self, id: SpriteId) -> Option<Sprite> {
        let sprite = self.sprites.get_mut(id.0)?.take()?;
        self.detach(id);
        Some(sprite)
    }

    pub fn get(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(id.0)?.as_ref()
    }

    pub fn get_mut(&mut self, id: SpriteId) -> Option<&mut Sprite> {
        self.sprites.get_mut(id.0)?.as_mut()
    }

    fn sprite_mut(&mut self, id: SpriteId) -> Result<&mut Sprite, SpriteError> {
        self.get_mut(id).ok_or(SpriteError::UnknownSprite(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = SpriteId> + '_ {
        self.sprites
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| SpriteId(i))
    }

    pub fn len(&self) -> usize {
        self.sprites.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn group(&self, id: GroupId) -> Option<&CommandGroup> {
        self.groups.get(&id)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    pub fn command(&mut self, id: SpriteId, name: &str) -> Result<bool, SpriteError> {
        Ok(self.sprite_mut(id)?.command(name))
    }

    pub fn command_n<S: AsRef<str>>(
        &mut self,
        id: SpriteId,
        names: &[S],
    ) -> Result<bool, SpriteError> {
        Ok(self.sprite_mut(id)?.command_n(names))
    }

    /// Issues `names[i]` to `ids[i]` as one synchronised command. Sprites that
    /// reject their command, or are not on the stage, are left out. Returns
    /// `None` when no sprite accepted.
    pub fn command_sync<S: AsRef<str>>(
        &mut self,
        ids: &[SpriteId],
        names: &[Vec<S>],
        sync_tag: &str,
    ) -> Option<GroupId> {
        if ids.len() != names.len() {
            warn!(
                "command_sync got {} sprites but {} command lists; extra entries are ignored",
                ids.len(),
                names.len()
            );
        }
        let group_id = GroupId(self.next_group);
        let mut group = CommandGroup::new(sync_tag);
        for (&id, names) in ids.iter().zip(names) {
            let Some(sprite) = self.get_mut(id) else {
                warn!("command_sync skipped unknown sprite {:?}", id);
                continue;
            };
            let names = names.iter().map(|n| n.as_ref().to_string()).collect();
            if sprite.base_command(names, Some(group_id)) {
                group.add_member(id);
            }
        }
        if group.members().is_empty() {
            return None;
        }
        self.next_group += 1;
        self.groups.insert(group_id, group);
        Some(group_id)
    }

    // -------------------------------------------------------------------------
    // Think
    // -------------------------------------------------------------------------

    /// Advances one sprite by `dt` milliseconds.
    pub fn think(&mut self, id: SpriteId, dt: i64) -> Result<(), SpriteError> {
        if self.get(id).is_none() {
            return Err(SpriteError::UnknownSprite(id));
        }
        think_sprite(&mut self.sprites, &mut self.groups, id, dt);
        self.groups.retain(|_, group| !group.is_finished());
        Ok(())
    }

    /// Advances every sprite on the stage by `dt` milliseconds.
    pub fn think_all(&mut self, dt: i64) {
        for index in 0..self.sprites.len() {
            if self.sprites[index].is_some() {
                think_sprite(&mut self.sprites, &mut self.groups, SpriteId(index), dt);
            }
        }
        self.groups.retain(|_, group| !group.is_finished());
    }

    pub fn restore(&mut self, id: SpriteId, state: SpriteState) -> Result<(), SpriteError> {
        self.sprite_mut(id)?.restore(state)?;
        self.detach(id);
        Ok(())
    }

    /// Collects the frame triggers every sprite fired since the last call.
    pub fn drain_triggers(&mut self) -> Vec<(SpriteId, String)> {
        let mut fired = Vec::new();
        for (index, slot) in self.sprites.iter_mut().enumerate() {
            if let Some(sprite) = slot {
                fired.extend(
                    sprite
                        .take_triggers()
                        .into_iter()
                        .map(|text| (SpriteId(index), text)),
                );
            }
        }
        fired
    }

    fn detach(&mut self, id: SpriteId) {
        for group in self.groups.values_mut() {
            group.detach(id);
        }
        self.groups.retain(|_, group| !group.is_finished());
    }
}

/// Runs the think loop for one sprite. Each pass starts the head command if
/// nothing is in flight, spends time on the current frame, then resolves
/// waiters. Passes repeat while frames run out inside the time step.
fn think_sprite(
    sprites: &mut [Option<Sprite>],
    groups: &mut HashMap<GroupId, CommandGroup>,
    id: SpriteId,
    mut dt: i64,
) {
    let Some(sprite) = sprites.get_mut(id.0).and_then(Option::as_mut) else {
        return;
    };
    if dt < 0 {
        debug!("Ignoring negative time step {} for sprite {:?}", dt, id);
        return;
    }
    sprite.begin_think();
    if dt == 0 {
        sprite.notify_waiters();
        return;
    }

    let mut limit = sprite.shared.model().anim.node_count() + sprite.path_len() + 1;
    let mut zero_steps = 0;
    let mut first_pass = true;
    loop {
        limit += start_head_command(sprites, groups, id, &mut dt, first_pass);
        first_pass = false;

        let Some(sprite) = sprites.get_mut(id.0).and_then(Option::as_mut) else {
            return;
        };
        let advance = sprite.advance(dt);
        sprite.notify_waiters();
        match advance {
            Advance::Settled => return,
            Advance::Moved { spent, leftover } => {
                dt = leftover;
                if spent > 0 {
                    zero_steps = 0;
                    continue;
                }
                zero_steps += 1;
                if zero_steps > limit {
                    error!(
                        "Sprite {:?} made {} zero-time transitions in one step; stopping at '{}'",
                        id,
                        zero_steps,
                        sprite.anim()
                    );
                    return;
                }
            }
        }
    }
}

/// Turns the sprite's head command into a path when nothing is in flight.
/// Grouped commands wait for their group and their countdown. Returns the
/// number of nodes queued.
fn start_head_command(
    sprites: &mut [Option<Sprite>],
    groups: &mut HashMap<GroupId, CommandGroup>,
    id: SpriteId,
    dt: &mut i64,
    first_pass: bool,
) -> usize {
    let head_group = match sprites.get(id.0).and_then(Option::as_ref) {
        Some(sprite) if sprite.path.is_empty() => match sprite.cmds.front() {
            Some(cmd) => cmd.group,
            None => return 0,
        },
        _ => return 0,
    };

    let group = head_group.and_then(|gid| groups.get_mut(&gid).map(|group| (gid, group)));
    let Some((group_id, group)) = group else {
        if let Some(gid) = head_group {
            warn!(
                "Sprite {:?} queued on missing command group {:?}; running it unsynchronised",
                id, gid
            );
        }
        return sprites
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .map_or(0, Sprite::start_ungrouped);
    };

    if !group.ready(group_id, sprites) {
        return 0;
    }
    let charge = if first_pass { *dt } else { 0 };
    let Some(wait) = group.tick(id, charge) else {
        return 0;
    };
    *dt -= wait;
    let path = group.take_path(id);
    group.mark_consumed(id);
    sprites
        .get_mut(id.0)
        .and_then(Option::as_mut)
        .map_or(0, |sprite| sprite.start_group_path(path))
}
