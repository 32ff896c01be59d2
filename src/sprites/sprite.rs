//! Per-sprite position, command queue and frame timing.

use bevy::log::{debug, warn};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use super::SpriteError;
use super::command::{Command, GroupId};
use super::snapshot::SpriteState;
use super::waiter::{WaitHandle, WaiterRegistry};
use crate::graph::{Graph, NodeId};
use crate::manager::{FrameRect, FrameUv, SharedSpriteData};
use crate::pathing::{find_path, select_edge};

/// Called with the `func` text of every frame a sprite arrives on.
pub type TriggerFn = Box<dyn FnMut(&str) + Send + Sync>;

/// Outcome of one step of the think loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Advance {
    /// The current frame absorbed what was left of the time step.
    Settled,
    /// Moved to another frame after spending `spent` of the step.
    Moved { spent: i64, leftover: i64 },
}

fn turn(facing: usize, delta: i32, count: usize) -> usize {
    let count = count.max(1) as i64;
    (facing as i64 + delta as i64).rem_euclid(count) as usize
}

/// One animated actor walking the state and animation graphs of its source.
pub struct Sprite {
    pub(super) shared: Arc<SharedSpriteData>,
    pub(super) anim_node: NodeId,
    pub(super) state_node: NodeId,
    facing: usize,
    /// Facing whose sheet this sprite currently holds resident.
    loaded_facing: Option<usize>,
    state_facing: usize,
    /// Time left on the current frame, in milliseconds.
    pub(super) togo: i64,
    pub(super) path: VecDeque<NodeId>,
    pub(super) cmds: VecDeque<Command>,
    thinks: u64,
    waiters: WaiterRegistry,
    pub(super) rng: ChaCha8Rng,
    triggers: Vec<String>,
    on_trigger: Option<TriggerFn>,
}

impl fmt::Debug for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sprite")
            .field("source", &self.shared.path())
            .field("state", &self.state())
            .field("anim", &self.anim())
            .field("facing", &self.facing)
            .field("togo", &self.togo)
            .field("path", &self.path)
            .field("cmds", &self.cmds)
            .field("thinks", &self.thinks)
            .finish_non_exhaustive()
    }
}

impl Sprite {
    pub fn new(shared: Arc<SharedSpriteData>, rng: ChaCha8Rng) -> Self {
        let model = shared.model();
        let anim_node = model.anim.start();
        let state_node = model.state.start();
        let togo = model.anim.time(anim_node);
        Self {
            shared,
            anim_node,
            state_node,
            facing: 0,
            loaded_facing: None,
            state_facing: 0,
            togo,
            path: VecDeque::new(),
            cmds: VecDeque::new(),
            thinks: 0,
            waiters: WaiterRegistry::default(),
            rng,
            triggers: Vec::new(),
            on_trigger: None,
        }
    }

    fn anim_graph(&self) -> &Graph {
        &self.shared.model().anim
    }

    fn state_graph(&self) -> &Graph {
        &self.shared.model().state
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn shared(&self) -> &Arc<SharedSpriteData> {
        &self.shared
    }

    /// Name of the current state graph node.
    pub fn state(&self) -> &str {
        self.state_graph().name(self.state_node)
    }

    /// Name of the current animation frame.
    pub fn anim(&self) -> &str {
        self.anim_graph().name(self.anim_node)
    }

    /// The state carried by the current animation frame.
    pub fn anim_state(&self) -> &str {
        &self.anim_graph().node_data(self.anim_node).state
    }

    pub fn anim_node(&self) -> NodeId {
        self.anim_node
    }

    pub fn state_node(&self) -> NodeId {
        self.state_node
    }

    pub fn facing(&self) -> usize {
        self.facing
    }

    /// Facing the sprite will have once every accepted command has played out.
    pub fn state_facing(&self) -> usize {
        self.state_facing
    }

    pub fn togo(&self) -> i64 {
        self.togo
    }

    pub fn thinks(&self) -> u64 {
        self.thinks
    }

    pub fn num_pending_cmds(&self) -> usize {
        self.cmds.len()
    }

    pub fn path_len(&self) -> usize {
        self.path.len()
    }

    pub fn is_idle(&self) -> bool {
        self.cmds.is_empty() && self.path.is_empty()
    }

    pub fn frame_rect(&self) -> Option<FrameRect> {
        self.shared
            .sheets()
            .frame(self.facing, self.anim_node)
            .map(|(_, rect)| rect)
    }

    /// Pixel size of the current frame.
    pub fn dims(&self) -> Option<(i32, i32)> {
        self.frame_rect().map(|rect| (rect.width(), rect.height()))
    }

    pub fn frame_uv(&self) -> Option<FrameUv> {
        self.shared
            .sheets()
            .frame(self.facing, self.anim_node)
            .map(|(sheet, rect)| sheet.uv(rect))
    }

    pub fn waiters(&self) -> &WaiterRegistry {
        &self.waiters
    }

    /// Registers a wait that resolves once the sprite settles on one of
    /// `states` with no commands left to run.
    pub fn wait_for<I, S>(&self, states: I) -> WaitHandle
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.waiters.register(states)
    }

    // -------------------------------------------------------------------------
    // Triggers
    // -------------------------------------------------------------------------

    pub fn set_trigger_callback(&mut self, callback: impl FnMut(&str) + Send + Sync + 'static) {
        self.on_trigger = Some(Box::new(callback));
    }

    pub fn clear_trigger_callback(&mut self) {
        self.on_trigger = None;
    }

    /// Takes the trigger texts fired since the last call, oldest first.
    pub fn take_triggers(&mut self) -> Vec<String> {
        std::mem::take(&mut self.triggers)
    }

    fn fire_trigger(&mut self) {
        let func = &self.shared.model().anim.node_data(self.anim_node).func;
        if func.is_empty() {
            return;
        }
        if let Some(callback) = self.on_trigger.as_mut() {
            callback(func);
        }
        self.triggers.push(func.clone());
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    pub fn command(&mut self, name: &str) -> bool {
        self.base_command(vec![name.to_string()], None)
    }

    pub fn command_n<S: AsRef<str>>(&mut self, names: &[S]) -> bool {
        let names = names.iter().map(|n| n.as_ref().to_string()).collect();
        self.base_command(names, None)
    }

    /// Walks the state graph along `names`. Either every label has an edge
    /// and the command is queued, or nothing changes.
    pub(crate) fn base_command(&mut self, names: Vec<String>, group: Option<GroupId>) -> bool {
        if names.is_empty() {
            return false;
        }
        let shared = self.shared.clone();
        let graph = &shared.model().state;

        let mut node = self.state_node;
        let mut edges = Vec::with_capacity(names.len());
        for name in &names {
            let Some(edge) = select_edge(graph, node, &[name.as_str()], &mut self.rng) else {
                debug!(
                    "Sprite '{}' rejected command {:?} at state '{}'",
                    shared.path().display(),
                    names,
                    graph.name(node)
                );
                return false;
            };
            edges.push(edge);
            node = graph.edge(edge).dst();
        }

        let facings = shared.facing_count();
        for edge in edges {
            self.state_facing = turn(self.state_facing, graph.edge_data(edge).facing, facings);
            self.state_node = graph.edge(edge).dst();
        }

        // Settle along free edges. The bound stops a free-edge cycle.
        for _ in 0..graph.node_count() {
            let Some(edge) = select_edge(graph, self.state_node, &[""], &mut self.rng) else {
                break;
            };
            self.state_node = graph.edge(edge).dst();
        }

        self.cmds.push_back(Command::new(names, group));
        true
    }

    // -------------------------------------------------------------------------
    // Think loop pieces, driven by the stage
    // -------------------------------------------------------------------------

    pub(super) fn begin_think(&mut self) {
        if self.thinks == 0 {
            self.reconcile_sheets();
            self.togo = self.anim_graph().time(self.anim_node);
        }
        self.thinks += 1;
    }

    /// Makes the current facing's sheet the one this sprite holds resident.
    fn reconcile_sheets(&mut self) {
        if self.loaded_facing == Some(self.facing) {
            return;
        }
        let sheets = self.shared.sheets();
        if let Some(old) = self.loaded_facing {
            sheets.unload(old);
        }
        sheets.load(self.facing);
        self.loaded_facing = Some(self.facing);
    }

    /// Resolves the head command into a path. Returns the number of nodes
    /// queued.
    pub(super) fn start_ungrouped(&mut self) -> usize {
        let Some(cmd) = self.cmds.pop_front() else {
            return 0;
        };
        let path = find_path(self.anim_graph(), &cmd.names, self.anim_node);
        if path.is_empty() {
            warn!(
                "Sprite '{}' found no animation path for {:?} from '{}'",
                self.shared.path().display(),
                cmd.names,
                self.anim()
            );
        }
        let queued = path.len();
        self.path.extend(path);
        queued
    }

    /// Jumps onto the first node of a synchronised path and queues the rest.
    pub(super) fn start_group_path(&mut self, path: Vec<NodeId>) -> usize {
        self.cmds.pop_front();
        let mut nodes = path.into_iter();
        if let Some(first) = nodes.next() {
            self.arrive(first);
        }
        let before = self.path.len();
        self.path.extend(nodes);
        self.path.len() - before
    }

    fn arrive(&mut self, next: NodeId) {
        let anim = &self.shared.model().anim;
        if let Some(edge) = anim.edge_to(self.anim_node, next) {
            let delta = anim.edge_data(edge).facing;
            if delta != 0 {
                self.facing = turn(self.facing, delta, self.shared.facing_count());
            }
        }
        self.togo = anim.time(next);
        self.anim_node = next;
        self.fire_trigger();
    }

    /// Spends `dt` on the current frame, moving to the next one when the
    /// frame runs out.
    pub(super) fn advance(&mut self, dt: i64) -> Advance {
        let anim = &self.shared.model().anim;
        if let Some(&next) = self.path.front() {
            if anim.connected_by_group_edge(self.anim_node, next) {
                self.togo = 0;
            }
        }

        if self.togo > dt {
            self.togo -= dt;
            self.reconcile_sheets();
            return Advance::Settled;
        }

        let spent = self.togo.max(0);
        let next = match self.path.pop_front() {
            Some(next) => next,
            None => select_edge(anim, self.anim_node, &[""], &mut self.rng)
                .map(|edge| anim.edge(edge).dst())
                .unwrap_or(self.anim_node),
        };
        self.arrive(next);
        Advance::Moved {
            spent,
            leftover: dt - spent,
        }
    }

    /// Resolves waiters listening for the current anim state, once no
    /// commands are left to run.
    pub(super) fn notify_waiters(&self) {
        if !self.cmds.is_empty() {
            return;
        }
        let resolved = self.waiters.resolve(self.anim_state());
        if resolved > 0 {
            debug!(
                "Sprite '{}' resolved {} waiter(s) on '{}'",
                self.shared.path().display(),
                resolved,
                self.anim_state()
            );
        }
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    pub fn snapshot(&self) -> SpriteState {
        SpriteState::new(self.facing, self.state_node.0, self.anim_node.0)
    }

    /// Puts the sprite at the position in `state`, dropping queued commands
    /// and any path in flight. Callers go through [`SpriteStage::restore`] so
    /// the sprite also leaves its command groups.
    ///
    /// [`SpriteStage::restore`]: super::SpriteStage::restore
    pub(super) fn restore(&mut self, state: SpriteState) -> Result<(), SpriteError> {
        let pending = self.waiters.len();
        if pending > 0 {
            return Err(SpriteError::WaitersPending(pending));
        }
        let model = self.shared.model();
        let state_node = NodeId(state.state_node_id());
        let anim_node = NodeId(state.anim_node_id());
        if !model.state.contains(state_node) {
            return Err(SpriteError::InvalidSnapshot(format!(
                "state node {} of {}",
                state_node.0,
                model.state.node_count()
            )));
        }
        if !model.anim.contains(anim_node) {
            return Err(SpriteError::InvalidSnapshot(format!(
                "anim node {} of {}",
                anim_node.0,
                model.anim.node_count()
            )));
        }
        if state.facing() >= self.shared.facing_count() {
            return Err(SpriteError::InvalidSnapshot(format!(
                "facing {} of {}",
                state.facing(),
                self.shared.facing_count()
            )));
        }

        self.cmds.clear();
        self.path.clear();
        self.facing = state.facing();
        self.state_facing = state.facing();
        self.state_node = state_node;
        self.anim_node = anim_node;
        self.togo = model.anim.time(anim_node);
        if self.thinks > 0 {
            self.reconcile_sheets();
        }
        Ok(())
    }
}

impl Drop for Sprite {
    fn drop(&mut self) {
        if let Some(facing) = self.loaded_facing.take() {
            self.shared.sheets().unload(facing);
        }
        self.waiters.abandon_all();
    }
}
