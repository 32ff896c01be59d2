//! Commands and the barrier that lets several sprites run one in lockstep.

use bevy::log::{debug, error};
use std::collections::{HashMap, HashSet};

use super::sprite::Sprite;
use super::stage::SpriteId;
use crate::graph::{Graph, NodeId};
use crate::pathing::find_synced_path;

/// Identifies a [`CommandGroup`] inside a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) u64);

/// Command labels accepted by the state graph and waiting to be played out
/// on the animation graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub names: Vec<String>,
    pub group: Option<GroupId>,
}

impl Command {
    pub fn new(names: Vec<String>, group: Option<GroupId>) -> Self {
        Self { names, group }
    }
}

/// Sprites that must reach the node tagged `sync_tag` at the same moment.
///
/// Nothing is computed until every member is [`ready`](Self::ready). From
/// then on each member has a fixed path and a wait offset; a member starts
/// its path once the offset has elapsed.
#[derive(Debug, Clone)]
pub struct CommandGroup {
    sync_tag: String,
    members: Vec<SpriteId>,
    was_ready: bool,
    offsets: HashMap<SpriteId, i64>,
    countdown: HashMap<SpriteId, i64>,
    paths: HashMap<SpriteId, Vec<NodeId>>,
    consumed: HashSet<SpriteId>,
}

impl CommandGroup {
    pub fn new(sync_tag: impl Into<String>) -> Self {
        Self {
            sync_tag: sync_tag.into(),
            members: Vec::new(),
            was_ready: false,
            offsets: HashMap::new(),
            countdown: HashMap::new(),
            paths: HashMap::new(),
            consumed: HashSet::new(),
        }
    }

    pub fn sync_tag(&self) -> &str {
        &self.sync_tag
    }

    pub fn members(&self) -> &[SpriteId] {
        &self.members
    }

    pub fn is_ready(&self) -> bool {
        self.was_ready
    }

    /// Wait offset computed for `member` when the group became ready.
    pub fn offset(&self, member: SpriteId) -> Option<i64> {
        self.offsets.get(&member).copied()
    }

    /// Time `member` still has to wait before starting its path.
    pub fn countdown(&self, member: SpriteId) -> Option<i64> {
        self.countdown.get(&member).copied()
    }

    pub fn path(&self, member: SpriteId) -> Option<&[NodeId]> {
        self.paths.get(&member).map(Vec::as_slice)
    }

    pub(crate) fn add_member(&mut self, member: SpriteId) {
        self.members.push(member);
    }

    /// Removes `member` unless it already ran the command.
    pub(crate) fn detach(&mut self, member: SpriteId) {
        if self.consumed.contains(&member) {
            return;
        }
        self.members.retain(|&m| m != member);
        self.offsets.remove(&member);
        self.countdown.remove(&member);
        self.paths.remove(&member);
    }

    pub(crate) fn mark_consumed(&mut self, member: SpriteId) {
        self.consumed.insert(member);
    }

    /// True once every remaining member has run the command.
    pub fn is_finished(&self) -> bool {
        self.members.iter().all(|m| self.consumed.contains(m))
    }

    /// Returns true once every member has no path in flight and this group's
    /// command at the head of its queue. Stays true from then on.
    pub(crate) fn ready(&mut self, id: GroupId, sprites: &mut [Option<Sprite>]) -> bool {
        if self.was_ready {
            return true;
        }
        let before = self.members.len();
        self.members.retain(|member| {
            sprites
                .get(member.0)
                .and_then(Option::as_ref)
                .is_some_and(|sprite| sprite.cmds.iter().any(|cmd| cmd.group == Some(id)))
        });
        if self.members.len() != before {
            debug!(
                "Command group {:?} dropped {} member(s) no longer holding its command",
                id,
                before - self.members.len()
            );
        }
        for member in &self.members {
            let Some(sprite) = sprites.get(member.0).and_then(Option::as_ref) else {
                return false;
            };
            if !sprite.path.is_empty() {
                return false;
            }
            match sprite.cmds.front() {
                Some(cmd) if cmd.group == Some(id) => {}
                _ => return false,
            }
        }

        let mut costs = Vec::with_capacity(self.members.len());
        for &member in &self.members {
            let Some(sprite) = sprites.get_mut(member.0).and_then(Option::as_mut) else {
                continue;
            };
            let Some(names) = sprite.cmds.front().map(|cmd| cmd.names.clone()) else {
                continue;
            };
            let shared = sprite.shared.clone();
            let anim = &shared.model().anim;
            let path = find_synced_path(
                anim,
                &names,
                &self.sync_tag,
                sprite.anim_node,
                &mut sprite.rng,
            );
            let cost = time_to_sync(anim, sprite.anim_node, sprite.togo, &path, &self.sync_tag);
            costs.push((member, cost));
            self.paths.insert(member, path);
        }

        let max = costs.iter().map(|&(_, cost)| cost).max().unwrap_or(0);
        for (member, cost) in costs {
            self.offsets.insert(member, max - cost);
            self.countdown.insert(member, max - cost);
        }
        debug!(
            "Command group {:?} ready with {} members, sync '{}' in {}ms",
            id,
            self.members.len(),
            self.sync_tag,
            max
        );
        self.was_ready = true;
        true
    }

    /// Charges `dt` against `member`'s countdown and reports how far into
    /// `dt` the member is released, if it is.
    pub(crate) fn tick(&mut self, member: SpriteId, dt: i64) -> Option<i64> {
        let Some(remaining) = self.countdown.get_mut(&member) else {
            error!(
                "Command group has no countdown for member {:?}; releasing it now",
                member
            );
            debug_assert!(false, "missing countdown for group member");
            return Some(0);
        };
        let wait = (*remaining).max(0);
        *remaining -= dt;
        (*remaining <= 0).then(|| wait.min(dt))
    }

    pub(crate) fn take_path(&mut self, member: SpriteId) -> Vec<NodeId> {
        match self.paths.remove(&member) {
            Some(path) => path,
            None => {
                error!("Command group has no path for member {:?}", member);
                debug_assert!(false, "missing path for group member");
                Vec::new()
            }
        }
    }
}

/// Time a sprite spends before arriving on the first node of `path` tagged
/// `sync_tag`. The first step is charged the sprite's remaining frame time;
/// steps taken over an enclosing group's edge cost nothing.
pub(crate) fn time_to_sync(
    anim: &Graph,
    from: NodeId,
    togo: i64,
    path: &[NodeId],
    sync_tag: &str,
) -> i64 {
    let mut total = 0;
    let mut prev = from;
    for (i, &node) in path.iter().enumerate() {
        if anim.is_sync(node, sync_tag) {
            break;
        }
        if !anim.connected_by_group_edge(prev, node) {
            total += if i == 0 { togo } else { anim.time(node) };
        }
        prev = node;
    }
    total
}
