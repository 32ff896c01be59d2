//! Facing-indexed sprite sheets.
//!
//! The core never touches textures. A sheet here is the frame-rectangle
//! lookup for one facing plus a residency counter that render glue can watch
//! to decide when to upload or drop the texture behind it.

use bevy::log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::graph::NodeId;

/// Pixel rectangle of a frame inside its sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub struct FrameRect {
    pub x: i32,
    pub y: i32,
    pub x2: i32,
    pub y2: i32,
}

impl FrameRect {
    pub fn width(&self) -> i32 {
        self.x2 - self.x
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y
    }
}

/// A frame rectangle normalised to the sheet's dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameUv {
    pub u: f32,
    pub v: f32,
    pub u2: f32,
    pub v2: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub facing: usize,
    pub node: NodeId,
}

#[derive(Debug, Default)]
pub struct Sheet {
    width: u32,
    height: u32,
    rects: HashMap<FrameKey, FrameRect>,
    loads: AtomicUsize,
}

impl Sheet {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn insert(&mut self, key: FrameKey, rect: FrameRect) {
        self.rects.insert(key, rect);
    }

    pub fn rect(&self, key: FrameKey) -> Option<FrameRect> {
        self.rects.get(&key).copied()
    }

    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame_count(&self) -> usize {
        self.rects.len()
    }

    pub fn uv(&self, rect: FrameRect) -> FrameUv {
        let dx = self.width.max(1) as f32;
        let dy = self.height.max(1) as f32;
        FrameUv {
            u: rect.x as f32 / dx,
            v: rect.y as f32 / dy,
            u2: rect.x2 as f32 / dx,
            v2: rect.y2 as f32 / dy,
        }
    }

    /// Number of sprites currently holding this sheet resident.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Acquire)
    }

    pub fn is_loaded(&self) -> bool {
        self.load_count() > 0
    }

    fn acquire(&self) -> usize {
        self.loads.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn release(&self) -> usize {
        match self
            .loads
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(prev) => prev - 1,
            Err(_) => 0,
        }
    }
}

/// The sheets of one sprite source: one per facing, plus an optional
/// connector sheet whose frames take precedence.
#[derive(Debug, Default)]
pub struct SheetSet {
    facings: Vec<Sheet>,
    connector: Option<Sheet>,
}

impl SheetSet {
    pub fn new(facings: Vec<Sheet>, connector: Option<Sheet>) -> Self {
        Self { facings, connector }
    }

    /// `count` empty sheets, for sprites that have no frame data.
    pub fn blank(count: usize) -> Self {
        Self {
            facings: (0..count).map(|_| Sheet::default()).collect(),
            connector: None,
        }
    }

    /// Number of facings, never less than one.
    pub fn facing_count(&self) -> usize {
        self.facings.len().max(1)
    }

    pub fn facing(&self, facing: usize) -> Option<&Sheet> {
        self.facings.get(facing)
    }

    pub fn connector(&self) -> Option<&Sheet> {
        self.connector.as_ref()
    }

    /// Looks a frame up in the connector sheet first, then in the facing's sheet.
    pub fn frame(&self, facing: usize, node: NodeId) -> Option<(&Sheet, FrameRect)> {
        let key = FrameKey { facing, node };
        if let Some(connector) = &self.connector {
            if let Some(rect) = connector.rect(key) {
                return Some((connector, rect));
            }
        }
        let sheet = self.facings.get(facing)?;
        sheet.rect(key).map(|rect| (sheet, rect))
    }

    pub fn load(&self, facing: usize) {
        if let Some(sheet) = self.facings.get(facing) {
            if sheet.acquire() == 1 {
                debug!("Facing {} sheet became resident", facing);
            }
        }
    }

    pub fn unload(&self, facing: usize) {
        if let Some(sheet) = self.facings.get(facing) {
            if sheet.release() == 0 {
                debug!("Facing {} sheet no longer resident", facing);
            }
        }
    }
}
