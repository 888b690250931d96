use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub const GRID_WIDTH: usize = 128;
pub const GRID_HEIGHT: usize = 128;

/// Difficulty chosen at new-game time. Indexes the meltdown odds and
/// external-market tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameLevel {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl GameLevel {
    pub fn index(self) -> usize {
        match self {
            GameLevel::Easy => 0,
            GameLevel::Medium => 1,
            GameLevel::Hard => 2,
        }
    }
}

/// Session-level toggles set from outside the core (menus, scenario setup).
#[derive(Resource, Debug, Clone)]
pub struct SimSettings {
    pub level: GameLevel,
    pub disasters_enabled: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            level: GameLevel::Easy,
            disasters_enabled: true,
        }
    }
}
