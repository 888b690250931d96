//! Per-tick map scan dispatch.
//!
//! The scanner owns a table mapping tile kinds to discovery callbacks.
//! Feature modules install their handlers at plugin build time and the
//! `scan_map` system walks the grid once per tick, invoking each callback at
//! most once per matching tile. Keeping the dispatch table here means the
//! power module never depends on scan iteration order.

use bevy::prelude::*;

use crate::census::Census;
use crate::config::{GameLevel, SimSettings};
use crate::grid::{TileGrid, TileKind};
use crate::power::{MeltdownEvent, PowerNetwork, PowerParams};
use crate::sim_rng::SimRng;

/// Shared per-tick context threaded through every discovery callback.
pub struct SimData<'a> {
    pub network: &'a mut PowerNetwork,
    pub census: &'a mut Census,
    pub rng: &'a mut SimRng,
    pub params: &'a PowerParams,
    pub level: GameLevel,
    pub disasters_enabled: bool,
    /// Tiles that rolled a catastrophic failure this scan; drained into
    /// `MeltdownEvent`s once the scan finishes.
    pub meltdowns: Vec<(usize, usize)>,
}

/// A discovery callback, invoked once per matching tile per scan.
pub type ScanAction = fn(&mut TileGrid, usize, usize, &mut SimData);

#[derive(Resource, Default)]
pub struct MapScanner {
    actions: Vec<(TileKind, ScanAction)>,
}

impl MapScanner {
    pub fn add_action(&mut self, kind: TileKind, action: ScanAction) {
        self.actions.push((kind, action));
    }

    fn action_for(&self, kind: TileKind) -> Option<ScanAction> {
        self.actions
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, action)| *action)
    }

    /// Walk the full grid, dispatching the registered callback for each tile
    /// whose kind has one.
    pub fn scan(&self, grid: &mut TileGrid, data: &mut SimData) {
        for y in 0..grid.height {
            for x in 0..grid.width {
                let kind = grid.get(x, y).kind;
                if let Some(action) = self.action_for(kind) {
                    action(grid, x, y, data);
                }
            }
        }
    }
}

/// Repair priority and footprint registered per structure kind, consumed by
/// the structural-repair collaborator outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairSpec {
    pub priority: u8,
    pub strength: u8,
}

#[derive(Resource, Default)]
pub struct RepairRegistry {
    entries: Vec<(TileKind, RepairSpec)>,
}

impl RepairRegistry {
    pub fn add_action(&mut self, kind: TileKind, priority: u8, strength: u8) {
        self.entries.push((kind, RepairSpec { priority, strength }));
    }

    pub fn spec_for(&self, kind: TileKind) -> Option<RepairSpec> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, spec)| *spec)
    }
}

/// PreSim: recount plants and reseed the power network from the map.
#[allow(clippy::too_many_arguments)]
pub fn scan_map(
    mut grid: ResMut<TileGrid>,
    scanner: Res<MapScanner>,
    mut network: ResMut<PowerNetwork>,
    mut census: ResMut<Census>,
    mut rng: ResMut<SimRng>,
    params: Res<PowerParams>,
    settings: Res<SimSettings>,
    mut meltdowns: EventWriter<MeltdownEvent>,
) {
    census.reset_plant_counts();
    network.clear_stack();

    let mut data = SimData {
        network: &mut network,
        census: &mut census,
        rng: &mut rng,
        params: &params,
        level: settings.level,
        disasters_enabled: settings.disasters_enabled,
        meltdowns: Vec::new(),
    };
    scanner.scan(&mut grid, &mut data);

    for (x, y) in data.meltdowns {
        meltdowns.send(MeltdownEvent { x, y });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::PowerParams;

    fn context<'a>(
        network: &'a mut PowerNetwork,
        census: &'a mut Census,
        rng: &'a mut SimRng,
        params: &'a PowerParams,
        disasters_enabled: bool,
    ) -> SimData<'a> {
        SimData {
            network,
            census,
            rng,
            params,
            level: GameLevel::Easy,
            disasters_enabled,
            meltdowns: Vec::new(),
        }
    }

    #[test]
    fn scan_dispatches_once_per_matching_tile() {
        let mut grid = TileGrid::new(16, 16);
        grid.place_coal_plant(3, 3);
        grid.place_coal_plant(10, 10);
        grid.place_power_line(4, 3);

        let mut scanner = MapScanner::default();
        let mut repairs = RepairRegistry::default();
        PowerNetwork::register_handlers(&mut scanner, &mut repairs);

        let mut network = PowerNetwork::new(16, 16);
        let mut census = Census::default();
        let mut rng = SimRng::seeded(7);
        let params = PowerParams::default();
        let mut data = context(&mut network, &mut census, &mut rng, &params, false);

        scanner.scan(&mut grid, &mut data);

        assert_eq!(census.coal_plants, 2);
        assert_eq!(network.pending_sources(), 2);
        // Power lines have no registered action.
        assert_eq!(census.nuclear_plants, 0);
    }

    #[test]
    fn coal_discovery_animates_neighbor_offsets() {
        let mut grid = TileGrid::new(16, 16);
        grid.place_coal_plant(5, 5);

        let mut scanner = MapScanner::default();
        let mut repairs = RepairRegistry::default();
        PowerNetwork::register_handlers(&mut scanner, &mut repairs);

        let mut network = PowerNetwork::new(16, 16);
        let mut census = Census::default();
        let mut rng = SimRng::seeded(7);
        let params = PowerParams::default();
        let mut data = context(&mut network, &mut census, &mut rng, &params, false);

        scanner.scan(&mut grid, &mut data);

        assert!(grid.get(5, 5).animated);
        assert!(grid.get(4, 4).animated);
        assert!(grid.get(7, 4).animated);
        assert!(grid.get(6, 5).animated);
        assert!(grid.get(7, 5).animated);
        assert!(!grid.get(5, 6).animated);
    }

    #[test]
    fn certain_meltdown_skips_registration() {
        let mut grid = TileGrid::new(16, 16);
        grid.place_nuclear_plant(8, 8);

        let mut scanner = MapScanner::default();
        let mut repairs = RepairRegistry::default();
        PowerNetwork::register_handlers(&mut scanner, &mut repairs);

        let mut network = PowerNetwork::new(16, 16);
        let mut census = Census::default();
        let mut rng = SimRng::seeded(7);
        // One-in-one odds melt every tick the roll is allowed.
        let params = PowerParams {
            meltdown_odds: [1, 1, 1],
            ..Default::default()
        };
        let mut data = context(&mut network, &mut census, &mut rng, &params, true);

        scanner.scan(&mut grid, &mut data);

        assert_eq!(data.meltdowns, vec![(8, 8)]);
        assert_eq!(census.nuclear_plants, 0);
        assert_eq!(network.pending_sources(), 0);
        assert!(!grid.get(8, 8).animated);
    }

    #[test]
    fn meltdown_roll_disabled_with_disasters_off() {
        let mut grid = TileGrid::new(16, 16);
        grid.place_nuclear_plant(8, 8);

        let mut scanner = MapScanner::default();
        let mut repairs = RepairRegistry::default();
        PowerNetwork::register_handlers(&mut scanner, &mut repairs);

        let mut network = PowerNetwork::new(16, 16);
        let mut census = Census::default();
        let mut rng = SimRng::seeded(7);
        let params = PowerParams {
            meltdown_odds: [1, 1, 1],
            ..Default::default()
        };
        let mut data = context(&mut network, &mut census, &mut rng, &params, false);

        scanner.scan(&mut grid, &mut data);

        assert!(data.meltdowns.is_empty());
        assert_eq!(census.nuclear_plants, 1);
        assert_eq!(network.pending_sources(), 1);
        assert!(grid.get(8, 8).animated && grid.get(8, 8).powered);
    }

    #[test]
    fn repair_registry_keeps_plant_specs() {
        let mut scanner = MapScanner::default();
        let mut repairs = RepairRegistry::default();
        PowerNetwork::register_handlers(&mut scanner, &mut repairs);

        let spec = repairs.spec_for(TileKind::CoalPlant).unwrap();
        assert_eq!(spec.priority, 7);
        assert_eq!(spec.strength, 4);
        assert!(repairs.spec_for(TileKind::NuclearPlant).is_some());
        assert!(repairs.spec_for(TileKind::PowerLine).is_none());
    }
}
