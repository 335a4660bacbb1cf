// Engine module - tile navigation, crowd steering and the world driver

pub mod bridge;
pub mod components;
pub mod config;
pub mod debug_overlay;
pub mod error;
pub mod geometry;
pub mod navigation;
pub mod steering;
pub mod systems;
pub mod world;

// Re-export commonly used items
pub use bridge::{FieldValue, ScriptBridge};
pub use components::*;
pub use config::SimConfig;
pub use error::{BridgeError, NavError};
pub use navigation::{NavigationGrid, TileKind, WallSide};
pub use steering::SteeringParams;
pub use world::{LevelTile, TickReport, WorldState, build_navigation};
