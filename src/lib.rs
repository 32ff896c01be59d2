//! Graph-driven sprite animation.
//!
//! Each sprite walks two graphs: a state graph that commands travel over and
//! an animation graph whose frames carry time, facing and trigger tags. The
//! [`sprites::SpritesPlugin`] hosts everything inside a Bevy app.

pub mod config;
#[cfg(feature = "dev-tools")]
pub mod debug;
pub mod graph;
pub mod manager;
pub mod pathing;
pub mod sprites;
