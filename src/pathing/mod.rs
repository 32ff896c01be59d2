//! Pathing domain: choosing the anim frames that carry out a command.

mod dijkstra;
mod finder;
#[cfg(test)]
mod tests;

pub use finder::{find_path, find_synced_path, select_edge};
