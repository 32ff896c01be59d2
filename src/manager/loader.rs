//! Loader for sprite directories: `sprite.ron` plus `sheets.json`.

use ron::Options;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::sheet::{FrameKey, FrameRect, Sheet, SheetSet};
use super::{SharedSpriteData, SpriteLoadError};
use crate::graph::{Graph, GraphModel, SpriteDef};

pub const GRAPH_FILE: &str = "sprite.ron";
pub const SHEETS_FILE: &str = "sheets.json";

/// Produces the shared data for a sprite path.
pub trait SpriteSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<SharedSpriteData, SpriteLoadError>;
}

impl<F> SpriteSource for F
where
    F: Fn(&Path) -> Result<SharedSpriteData, SpriteLoadError> + Send + Sync,
{
    fn load(&self, path: &Path) -> Result<SharedSpriteData, SpriteLoadError> {
        self(path)
    }
}

/// Reads sprite directories below a root directory.
#[derive(Debug, Clone, Default)]
pub struct RonSpriteSource {
    root: PathBuf,
}

impl RonSpriteSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SpriteSource for RonSpriteSource {
    fn load(&self, path: &Path) -> Result<SharedSpriteData, SpriteLoadError> {
        let dir = self.root.join(path);
        let def: SpriteDef = load_ron(&dir.join(GRAPH_FILE))?;
        let model = GraphModel::from_def(&def).map_err(|source| SpriteLoadError::Graph {
            file: dir.join(GRAPH_FILE),
            source,
        })?;
        let sheets = load_sheets(&dir.join(SHEETS_FILE), &model.anim)?;
        Ok(SharedSpriteData::new(path, model, sheets))
    }
}

/// Create RON options with extensions enabled for more flexible parsing.
pub(crate) fn ron_options() -> Options {
    Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
}

fn read(path: &Path) -> Result<String, SpriteLoadError> {
    fs::read_to_string(path).map_err(|source| SpriteLoadError::Io {
        file: path.to_path_buf(),
        source,
    })
}

fn load_ron<T>(path: &Path) -> Result<T, SpriteLoadError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = read(path)?;
    ron_options()
        .from_str(&contents)
        .map_err(|e| SpriteLoadError::Ron {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
}

#[derive(Deserialize)]
struct SheetsJson {
    facings: Vec<FacingJson>,
    #[serde(default)]
    connector: Option<ConnectorJson>,
}

#[derive(Deserialize)]
struct FacingJson {
    width: u32,
    height: u32,
    /// Frame rectangles keyed by anim node name.
    #[serde(default)]
    frames: HashMap<String, FrameRect>,
}

#[derive(Deserialize)]
struct ConnectorJson {
    width: u32,
    height: u32,
    #[serde(default)]
    frames: Vec<ConnectorFrameJson>,
}

#[derive(Deserialize)]
struct ConnectorFrameJson {
    facing: usize,
    node: String,
    rect: FrameRect,
}

/// Load a sheet manifest and resolve its frame names against `anim`.
pub(crate) fn load_sheets(path: &Path, anim: &Graph) -> Result<SheetSet, SpriteLoadError> {
    let contents = read(path)?;
    let manifest: SheetsJson =
        serde_json::from_str(&contents).map_err(|e| SpriteLoadError::Json {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let sheets_error = |message: String| SpriteLoadError::Sheets {
        file: path.to_path_buf(),
        message,
    };

    if manifest.facings.is_empty() {
        return Err(sheets_error("found no facings".to_string()));
    }

    let mut facings = Vec::with_capacity(manifest.facings.len());
    for (facing, json) in manifest.facings.into_iter().enumerate() {
        let mut sheet = Sheet::new(json.width, json.height);
        for (name, rect) in json.frames {
            let node = anim.find(&name).ok_or_else(|| {
                sheets_error(format!("facing {} has an unused frame '{}'", facing, name))
            })?;
            sheet.insert(FrameKey { facing, node }, rect);
        }
        facings.push(sheet);
    }

    let connector = match manifest.connector {
        Some(json) => {
            let mut sheet = Sheet::new(json.width, json.height);
            for frame in json.frames {
                if frame.facing >= facings.len() {
                    return Err(sheets_error(format!(
                        "connector frame '{}' uses facing {} of {}",
                        frame.node,
                        frame.facing,
                        facings.len()
                    )));
                }
                let node = anim.find(&frame.node).ok_or_else(|| {
                    sheets_error(format!("connector has an unused frame '{}'", frame.node))
                })?;
                sheet.insert(
                    FrameKey {
                        facing: frame.facing,
                        node,
                    },
                    frame.rect,
                );
            }
            Some(sheet)
        }
        None => None,
    };

    Ok(SheetSet::new(facings, connector))
}
