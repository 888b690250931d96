//! Power propagation.
//!
//! Each tick the map scan reseeds the network with every generating plant it
//! finds, then `run_pass` walks the conductive network outward from those
//! seeds until the combined plant output is exhausted, and finally every
//! plant radiates coverage over its local service district regardless of
//! wiring. `apply_tile_power` then folds the coverage map back into the
//! per-tile `powered` flag.
//!
//! The walk keeps straight runs cheap: a chain only returns to the worklist
//! at junctions, and a junction remembers at most one branch point per
//! visit. Two adjacent plants therefore read as one plant feeding the other.
//! Inherited behavior, pinned by a regression test below.

use bevy::prelude::*;
use rand::Rng;

use crate::census::Census;
use crate::grid::{Direction, TileGrid, TileKind};
use crate::scan::{MapScanner, RepairRegistry, SimData};
use crate::simulation_sets::SimulationSet;

/// Tunables for the power scan, injectable by tests.
#[derive(Resource, Debug, Clone)]
pub struct PowerParams {
    /// Output of one coal plant, in serviced tiles per pass.
    pub coal_strength: u32,
    /// Output of one nuclear plant, in serviced tiles per pass.
    pub nuclear_strength: u32,
    /// Local service radius (Manhattan) around a coal plant.
    pub coal_radius: u32,
    /// Local service radius (Manhattan) around a nuclear plant.
    pub nuclear_radius: u32,
    /// One-in-N meltdown odds per game level, lowest level first. N >= 1.
    pub meltdown_odds: [u32; 3],
}

impl Default for PowerParams {
    fn default() -> Self {
        Self {
            coal_strength: 700,
            nuclear_strength: 2000,
            coal_radius: 15,
            nuclear_radius: 25,
            meltdown_odds: [30_000, 20_000, 10_000],
        }
    }
}

// ---------------------------------------------------------------------------
// Coverage map
// ---------------------------------------------------------------------------

/// Which tiles currently receive power. 0 = unserved.
#[derive(Debug, Clone)]
pub struct CoverageMap {
    cells: Vec<u8>,
    width: usize,
    height: usize,
}

impl CoverageMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![0; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    pub fn mark(&mut self, x: usize, y: usize) {
        self.cells[y * self.width + x] = 1;
    }

    pub fn is_covered(&self, x: usize, y: usize) -> bool {
        self.cells[y * self.width + x] > 0
    }

    pub fn covered_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c > 0).count()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Published when network demand exceeds the combined plant output.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct PowerShortageEvent;

/// Handed to the disaster collaborator when a nuclear plant fails its
/// reliability roll. The power scan takes no further action on that tile
/// this tick.
#[derive(Event, Debug, Clone, Copy)]
pub struct MeltdownEvent {
    pub x: usize,
    pub y: usize,
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Outcome of one power pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub capacity: u32,
    pub consumed: u32,
    pub shortage: bool,
}

#[derive(Resource, Debug, Clone)]
pub struct PowerNetwork {
    coverage: CoverageMap,
    stack: Vec<(usize, usize)>,
}

impl Default for PowerNetwork {
    fn default() -> Self {
        Self::new(crate::config::GRID_WIDTH, crate::config::GRID_HEIGHT)
    }
}

impl PowerNetwork {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            coverage: CoverageMap::new(width, height),
            stack: Vec::new(),
        }
    }

    pub fn coverage(&self) -> &CoverageMap {
        &self.coverage
    }

    pub fn pending_sources(&self) -> usize {
        self.stack.len()
    }

    /// Seed the next pass with a generating tile and flag it for animation.
    pub fn register_source(&mut self, grid: &mut TileGrid, x: usize, y: usize) {
        self.stack.push((x, y));
        grid.get_mut(x, y).animated = true;
    }

    /// The worklist is rebuilt from scratch by every map scan.
    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    /// True if the tile one step in `dir` can draw current: in bounds,
    /// conductive, and not already served this pass.
    pub fn test_conductive(&self, grid: &TileGrid, x: usize, y: usize, dir: Direction) -> bool {
        self.conductive_neighbor(grid, x, y, dir).is_some()
    }

    fn conductive_neighbor(
        &self,
        grid: &TileGrid,
        x: usize,
        y: usize,
        dir: Direction,
    ) -> Option<(usize, usize)> {
        let (nx, ny) = grid.step(x, y, dir)?;
        let tile = grid.get(nx, ny);
        (tile.conductive && !self.coverage.is_covered(nx, ny)).then_some((nx, ny))
    }

    /// Run the per-tick power pass: drain the seed worklist through the
    /// conductive network, cutting the whole pass off once consumption
    /// exceeds capacity, then radiate local coverage from every plant.
    ///
    /// The area pass runs even when the network walk aborted on shortage, so
    /// plant districts never flicker dark while the wider grid is starved.
    pub fn run_pass(&mut self, grid: &TileGrid, census: &Census, params: &PowerParams) -> ScanReport {
        if self.coverage.width != grid.width || self.coverage.height != grid.height {
            self.coverage = CoverageMap::new(grid.width, grid.height);
        } else {
            self.coverage.clear();
        }

        let capacity = census.coal_plants * params.coal_strength
            + census.nuclear_plants * params.nuclear_strength;

        let mut consumed = 0u32;
        let mut shortage = false;

        'seeds: while let Some(seed) = self.stack.pop() {
            let (mut x, mut y) = seed;
            let mut pending: Option<(usize, usize)> = None;
            loop {
                consumed += 1;
                if consumed > capacity {
                    shortage = true;
                    self.stack.clear();
                    break 'seeds;
                }

                if let Some(next) = pending.take() {
                    (x, y) = next;
                }
                self.coverage.mark(x, y);

                // Probe the cardinal neighbors, stopping at the second hit:
                // one branch point per visit, the rest are rediscovered when
                // the junction is popped again.
                let mut branches = 0u32;
                for dir in Direction::CARDINAL {
                    if branches >= 2 {
                        break;
                    }
                    if let Some(next) = self.conductive_neighbor(grid, x, y, dir) {
                        branches += 1;
                        pending = Some(next);
                    }
                }

                if branches > 1 {
                    self.stack.push((x, y));
                }
                if branches == 0 {
                    break;
                }
            }
        }

        self.area_pass(grid, params);

        ScanReport {
            capacity,
            consumed,
            shortage,
        }
    }

    /// Every plant serves its surrounding district directly, wired or not.
    fn area_pass(&mut self, grid: &TileGrid, params: &PowerParams) {
        for y in 0..grid.height {
            for x in 0..grid.width {
                let radius = match grid.get(x, y).kind {
                    TileKind::CoalPlant => params.coal_radius as i32,
                    TileKind::NuclearPlant => params.nuclear_radius as i32,
                    _ => continue,
                };
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        if dx.abs() + dy.abs() > radius {
                            continue;
                        }
                        let tx = x as i32 + dx;
                        let ty = y as i32 + dy;
                        if tx < 0 || ty < 0 {
                            continue;
                        }
                        let (tx, ty) = (tx as usize, ty as usize);
                        if grid.in_bounds(tx, ty) {
                            self.coverage.mark(tx, ty);
                        }
                    }
                }
            }
        }
    }

    /// Set or clear the powered flag on one tile: plants are always hot,
    /// every other tile follows the coverage map.
    pub fn set_tile_power(&self, grid: &mut TileGrid, x: usize, y: usize) {
        let covered = self.coverage.is_covered(x, y);
        let tile = grid.get_mut(x, y);
        tile.powered = tile.kind.is_plant() || covered;
    }

    /// Fold the coverage map into the powered flag of every tile.
    pub fn apply_coverage(&self, grid: &mut TileGrid) {
        for y in 0..grid.height {
            for x in 0..grid.width {
                self.set_tile_power(grid, x, y);
            }
        }
    }

    /// Install the plant discovery callbacks and repair table entries.
    pub fn register_handlers(scanner: &mut MapScanner, repairs: &mut RepairRegistry) {
        scanner.add_action(TileKind::CoalPlant, coal_plant_found);
        scanner.add_action(TileKind::NuclearPlant, nuclear_plant_found);
        repairs.add_action(TileKind::CoalPlant, 7, 4);
        repairs.add_action(TileKind::NuclearPlant, 7, 4);
    }
}

// ---------------------------------------------------------------------------
// Discovery callbacks
// ---------------------------------------------------------------------------

/// Offsets around a coal plant whose sprites animate while the plant runs.
const COAL_ANIM_OFFSETS: [(i32, i32); 4] = [(-1, -1), (2, -1), (1, 0), (2, 0)];

fn coal_plant_found(grid: &mut TileGrid, x: usize, y: usize, data: &mut SimData) {
    data.census.coal_plants += 1;
    data.network.register_source(grid, x, y);

    for (dx, dy) in COAL_ANIM_OFFSETS {
        let ax = x as i32 + dx;
        let ay = y as i32 + dy;
        if ax >= 0 && ay >= 0 && grid.in_bounds(ax as usize, ay as usize) {
            grid.get_mut(ax as usize, ay as usize).animated = true;
        }
    }
}

fn nuclear_plant_found(grid: &mut TileGrid, x: usize, y: usize, data: &mut SimData) {
    // A plant that fails its reliability roll never joins the network this
    // tick: the disaster collaborator owns the tile from here.
    let odds = data.params.meltdown_odds[data.level.index()];
    if data.disasters_enabled && data.rng.0.gen_range(0..odds) == 0 {
        data.meltdowns.push((x, y));
        return;
    }

    data.census.nuclear_plants += 1;
    data.network.register_source(grid, x, y);

    let tile = grid.get_mut(x, y);
    tile.conductive = true;
    tile.powered = true;
    tile.flammable = true;
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

pub fn run_power_scan(
    grid: Res<TileGrid>,
    census: Res<Census>,
    params: Res<PowerParams>,
    mut network: ResMut<PowerNetwork>,
    mut shortages: EventWriter<PowerShortageEvent>,
) {
    let report = network.run_pass(&grid, &census, &params);
    if report.shortage {
        shortages.send(PowerShortageEvent);
    }
}

pub fn apply_tile_power(mut grid: ResMut<TileGrid>, network: Res<PowerNetwork>) {
    network.apply_coverage(&mut grid);
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct PowerPlugin;

impl Plugin for PowerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PowerParams>()
            .init_resource::<PowerNetwork>()
            .add_event::<PowerShortageEvent>()
            .add_event::<MeltdownEvent>();

        app.init_resource::<MapScanner>();
        app.init_resource::<RepairRegistry>();
        app.world_mut()
            .resource_scope(|world, mut scanner: Mut<MapScanner>| {
                let mut repairs = world.resource_mut::<RepairRegistry>();
                PowerNetwork::register_handlers(&mut scanner, &mut repairs);
            });

        app.add_systems(
            FixedUpdate,
            (
                crate::scan::scan_map.in_set(SimulationSet::PreSim),
                (run_power_scan, apply_tile_power.after(run_power_scan))
                    .in_set(SimulationSet::Simulation),
            ),
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
