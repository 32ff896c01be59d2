//! Manager domain: loads sprite sources once and shares them between sprites.
//!
//! This module handles:
//! - The path-keyed cache of shared graph and sheet data
//! - Loading sprite directories through a pluggable [`SpriteSource`]
//! - Facing-indexed sheet lookups

mod loader;
mod sheet;

pub use loader::{GRAPH_FILE, RonSpriteSource, SHEETS_FILE, SpriteSource};
pub use sheet::{FrameKey, FrameRect, FrameUv, Sheet, SheetSet};

pub(crate) use loader::ron_options;

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::config::SpriteGraphConfig;
use crate::graph::{GraphError, GraphModel};
use crate::sprites::Sprite;

/// Error type for sprite loading failures.
#[derive(Debug, Error)]
pub enum SpriteLoadError {
    #[error("Failed to load {}: IO error: {source}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to load {}: Parse error: {message}", file.display())]
    Ron { file: PathBuf, message: String },
    #[error("Failed to load {}: Parse error: {message}", file.display())]
    Json { file: PathBuf, message: String },
    #[error("Failed to load {}: {source}", file.display())]
    Graph {
        file: PathBuf,
        #[source]
        source: GraphError,
    },
    #[error("Failed to load {}: {message}", file.display())]
    Sheets { file: PathBuf, message: String },
}

/// Immutable data shared by every sprite loaded from one path.
#[derive(Debug)]
pub struct SharedSpriteData {
    path: PathBuf,
    model: GraphModel,
    sheets: SheetSet,
}

impl SharedSpriteData {
    pub fn new(path: impl Into<PathBuf>, model: GraphModel, sheets: SheetSet) -> Self {
        Self {
            path: path.into(),
            model,
            sheets,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn sheets(&self) -> &SheetSet {
        &self.sheets
    }

    pub fn facing_count(&self) -> usize {
        self.sheets.facing_count()
    }
}

/// Collapses `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        PathBuf::from(".")
    } else {
        out.iter().collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Caches one [`SharedSpriteData`] per normalised path.
#[derive(Resource)]
pub struct SpriteManager {
    source: Box<dyn SpriteSource>,
    shared: Mutex<HashMap<PathBuf, Arc<SharedSpriteData>>>,
    /// Serialises construction so each path is loaded at most once.
    load_lock: Mutex<()>,
    rng_seed: Option<u64>,
    spawned: AtomicU64,
}

impl SpriteManager {
    pub fn new(source: impl SpriteSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            shared: Mutex::new(HashMap::new()),
            load_lock: Mutex::new(()),
            rng_seed: None,
            spawned: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &SpriteGraphConfig) -> Self {
        Self::new(RonSpriteSource::new(&config.sprite_root)).with_seed(config.rng_seed)
    }

    /// Seeds every sprite's RNG from `seed` so runs can be replayed.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Returns the shared data for `path`, loading it on first use.
    pub fn load_shared(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Arc<SharedSpriteData>, SpriteLoadError> {
        let path = normalize_path(path.as_ref());
        if let Some(shared) = lock(&self.shared).get(&path) {
            return Ok(shared.clone());
        }

        let _loading = lock(&self.load_lock);
        if let Some(shared) = lock(&self.shared).get(&path) {
            return Ok(shared.clone());
        }

        let data = Arc::new(self.source.load(&path)?);
        info!(
            "Loaded sprite '{}' ({} state nodes, {} anim nodes, {} facings)",
            path.display(),
            data.model.state.node_count(),
            data.model.anim.node_count(),
            data.facing_count()
        );
        lock(&self.shared).insert(path, data.clone());
        Ok(data)
    }

    /// Registers already-built data under `path`, replacing any cached entry.
    pub fn insert_shared(
        &self,
        path: impl AsRef<Path>,
        data: SharedSpriteData,
    ) -> Arc<SharedSpriteData> {
        let data = Arc::new(data);
        lock(&self.shared).insert(normalize_path(path.as_ref()), data.clone());
        data
    }

    pub fn load_sprite(&self, path: impl AsRef<Path>) -> Result<Sprite, SpriteLoadError> {
        let shared = self.load_shared(path)?;
        Ok(self.sprite_from_shared(shared))
    }

    /// Builds a new sprite at the start nodes of `shared`.
    pub fn sprite_from_shared(&self, shared: Arc<SharedSpriteData>) -> Sprite {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let rng = match self.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(n)),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Sprite::new(shared, rng)
    }

    pub fn is_cached(&self, path: impl AsRef<Path>) -> bool {
        lock(&self.shared).contains_key(&normalize_path(path.as_ref()))
    }

    pub fn len(&self) -> usize {
        lock(&self.shared).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached entry. Sprites keep their own references alive.
    pub fn clear(&self) {
        lock(&self.shared).clear();
    }
}
