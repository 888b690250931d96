//! Headless integration test harness.
//!
//! Wraps `bevy::app::App` + `SimulationPlugin` in a fluent builder so
//! integration tests can lay out a city, advance the fixed-timestep
//! simulation, and assert on the resulting state without a window or
//! renderer.

use bevy::prelude::*;

use crate::census::Census;
use crate::config::{GameLevel, SimSettings};
use crate::economy::CityBudget;
use crate::grid::{Tile, TileGrid};
use crate::power::PowerNetwork;
use crate::valves::Valves;
use crate::SimulationPlugin;

pub struct TestCity {
    app: App,
}

impl TestCity {
    /// Create an empty city: a default-size grid with all resources at their
    /// defaults. One update runs so Startup systems execute.
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(SimulationPlugin);
        app.update();
        Self { app }
    }

    // -----------------------------------------------------------------------
    // World setup (builder pattern: consumes and returns Self)
    // -----------------------------------------------------------------------

    /// Replace the tile grid with a fresh one of the given size. Call this
    /// before placing anything.
    pub fn with_grid_size(mut self, width: usize, height: usize) -> Self {
        self.app.insert_resource(TileGrid::new(width, height));
        self
    }

    /// Fill the inclusive rectangle with power line tiles. Degenerate
    /// rectangles give straight runs.
    pub fn with_power_line(mut self, x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        let mut grid = self.app.world_mut().resource_mut::<TileGrid>();
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                grid.place_power_line(x, y);
            }
        }
        self
    }

    pub fn with_coal_plant(mut self, x: usize, y: usize) -> Self {
        self.app
            .world_mut()
            .resource_mut::<TileGrid>()
            .place_coal_plant(x, y);
        self
    }

    pub fn with_nuclear_plant(mut self, x: usize, y: usize) -> Self {
        self.app
            .world_mut()
            .resource_mut::<TileGrid>()
            .place_nuclear_plant(x, y);
        self
    }

    /// Set the census zone populations directly, standing in for the zone
    /// collaborators outside this crate.
    pub fn with_population(mut self, res: i32, com: i32, ind: i32) -> Self {
        let mut census = self.app.world_mut().resource_mut::<Census>();
        census.res_pop = res;
        census.com_pop = com;
        census.ind_pop = ind;
        self
    }

    pub fn with_tax(mut self, rate: i32) -> Self {
        self.app
            .world_mut()
            .resource_mut::<CityBudget>()
            .set_tax_rate(rate);
        self
    }

    pub fn with_level(mut self, level: GameLevel) -> Self {
        self.app.world_mut().resource_mut::<SimSettings>().level = level;
        self
    }

    pub fn with_disasters(mut self, enabled: bool) -> Self {
        self.app
            .world_mut()
            .resource_mut::<SimSettings>()
            .disasters_enabled = enabled;
        self
    }

    /// Insert or replace any resource (e.g. alternate parameter tables).
    pub fn with_resource<R: Resource>(mut self, resource: R) -> Self {
        self.app.insert_resource(resource);
        self
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run N fixed-update ticks. The simulation runs at 10 Hz, so each call
    /// advances virtual time by 100 ms per tick and updates the app once.
    pub fn tick(&mut self, n: u32) {
        let dt = std::time::Duration::from_millis(100);
        for _ in 0..n {
            self.app
                .world_mut()
                .resource_mut::<Time<Virtual>>()
                .advance_by(dt);
            self.app.update();
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn grid(&self) -> &TileGrid {
        self.resource::<TileGrid>()
    }

    pub fn tile(&self, x: usize, y: usize) -> &Tile {
        self.grid().get(x, y)
    }

    pub fn census(&self) -> &Census {
        self.resource::<Census>()
    }

    pub fn valves(&self) -> &Valves {
        self.resource::<Valves>()
    }

    pub fn network(&self) -> &PowerNetwork {
        self.resource::<PowerNetwork>()
    }

    /// Drain all pending events of one type, returning them in send order.
    pub fn drain_events<E: Event>(&mut self) -> Vec<E> {
        self.app
            .world_mut()
            .resource_mut::<Events<E>>()
            .drain()
            .collect()
    }
}
