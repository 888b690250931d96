use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{GRID_HEIGHT, GRID_WIDTH};

/// What occupies a tile. The map scanner dispatches discovery callbacks on
/// this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Empty,
    PowerLine,
    CoalPlant,
    NuclearPlant,
}

impl TileKind {
    pub fn is_plant(self) -> bool {
        matches!(self, TileKind::CoalPlant | TileKind::NuclearPlant)
    }
}

/// Cardinal directions in the fixed order the flood fill probes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    /// Carries current along the network (lines and plants).
    pub conductive: bool,
    pub powered: bool,
    /// Drives sprite animation around running plants.
    pub animated: bool,
    pub flammable: bool,
}

#[derive(Resource, Serialize, Deserialize)]
pub struct TileGrid {
    pub cells: Vec<Tile>,
    pub width: usize,
    pub height: usize,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::new(GRID_WIDTH, GRID_HEIGHT)
    }
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![Tile::default(); width * height],
            width,
            height,
        }
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &Tile {
        &self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut Tile {
        let idx = self.index(x, y);
        &mut self.cells[idx]
    }

    /// Neighbor coordinate one step in `dir`, or `None` at the map edge.
    pub fn step(&self, x: usize, y: usize, dir: Direction) -> Option<(usize, usize)> {
        let (dx, dy) = dir.offset();
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx < 0 || ny < 0 {
            return None;
        }
        let (nx, ny) = (nx as usize, ny as usize);
        self.in_bounds(nx, ny).then_some((nx, ny))
    }

    pub fn place_power_line(&mut self, x: usize, y: usize) {
        let tile = self.get_mut(x, y);
        tile.kind = TileKind::PowerLine;
        tile.conductive = true;
    }

    pub fn place_coal_plant(&mut self, x: usize, y: usize) {
        let tile = self.get_mut(x, y);
        tile.kind = TileKind::CoalPlant;
        tile.conductive = true;
        tile.flammable = true;
    }

    pub fn place_nuclear_plant(&mut self, x: usize, y: usize) {
        let tile = self.get_mut(x, y);
        tile.kind = TileKind::NuclearPlant;
        tile.conductive = true;
        tile.flammable = true;
    }
}
