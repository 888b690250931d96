use bevy::prelude::*;
use std::collections::BTreeMap;

pub mod census;
pub mod config;
pub mod economy;
pub mod grid;
pub mod power;
pub mod scan;
pub mod sim_rng;
pub mod simulation_sets;
pub mod valves;

#[cfg(test)]
pub mod test_harness;

pub use simulation_sets::SimulationSet;

// ---------------------------------------------------------------------------
// Saveable trait + registry for the extension map save pattern
// ---------------------------------------------------------------------------

/// Trait for resources that persist through the save file's extension map.
///
/// Each implementing resource owns its serialization, so a feature plugin only
/// has to call `registry.register::<T>()` in its `build()` and the save layer
/// never learns about individual feature types.
pub trait Saveable: Resource + Default + Send + Sync + 'static {
    /// Stable key for this resource in the extension map.
    const SAVE_KEY: &'static str;

    /// Serialize to bytes. Return `None` to skip saving (e.g. default state).
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    /// Deserialize from bytes, returning the restored resource.
    fn load_from_bytes(bytes: &[u8]) -> Self;
}

/// Decode bytes via `bitcode::decode`, logging a warning and returning
/// `Default` on failure.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    match bitcode::decode(bytes) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Saveable {}: failed to decode {} bytes, falling back to default: {}",
                key,
                bytes.len(),
                e
            );
            T::default()
        }
    }
}

/// Type alias for the save function stored in a `SaveableEntry`.
pub type SaveFn = Box<dyn Fn(&World) -> Option<Vec<u8>> + Send + Sync>;
/// Type alias for the load function stored in a `SaveableEntry`.
pub type LoadFn = Box<dyn Fn(&mut World, &[u8]) + Send + Sync>;
/// Type alias for the reset function stored in a `SaveableEntry`.
pub type ResetFn = Box<dyn Fn(&mut World) + Send + Sync>;

/// Type-erased save/load/reset operations for one registered resource.
pub struct SaveableEntry {
    pub key: String,
    pub save_fn: SaveFn,
    pub load_fn: LoadFn,
    pub reset_fn: ResetFn,
}

/// Registry of all saveable resources, populated during plugin setup.
#[derive(Resource, Default)]
pub struct SaveableRegistry {
    pub entries: Vec<SaveableEntry>,
}

impl SaveableRegistry {
    /// Register a resource type that implements `Saveable`.
    ///
    /// A duplicate `SAVE_KEY` would silently shadow saved data, so the second
    /// registration is dropped with a debug assertion.
    pub fn register<T: Saveable>(&mut self) {
        let key = T::SAVE_KEY.to_string();
        if self.entries.iter().any(|e| e.key == key) {
            warn!(
                "SaveableRegistry: duplicate key '{}', ignoring second registration",
                key
            );
            debug_assert!(false, "SaveableRegistry: duplicate key '{}'", key);
            return;
        }
        self.entries.push(SaveableEntry {
            key,
            save_fn: Box::new(|world: &World| {
                world.get_resource::<T>().and_then(|r| r.save_to_bytes())
            }),
            load_fn: Box::new(|world: &mut World, bytes: &[u8]| {
                let value = T::load_from_bytes(bytes);
                world.insert_resource(value);
            }),
            reset_fn: Box::new(|world: &mut World| {
                world.insert_resource(T::default());
            }),
        });
    }

    /// Save all registered resources into an extension map.
    pub fn save_all(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        let mut extensions = BTreeMap::new();
        for entry in &self.entries {
            if let Some(bytes) = (entry.save_fn)(world) {
                extensions.insert(entry.key.clone(), bytes);
            }
        }
        extensions
    }

    /// Load registered resources from an extension map. Resources whose key
    /// is absent keep their current value.
    pub fn load_all(&self, world: &mut World, extensions: &BTreeMap<String, Vec<u8>>) {
        for entry in &self.entries {
            if let Some(bytes) = extensions.get(&entry.key) {
                (entry.load_fn)(world, bytes);
            }
        }
    }

    /// Reset all registered resources to their defaults (used by new-game).
    pub fn reset_all(&self, world: &mut World) {
        for entry in &self.entries {
            (entry.reset_fn)(world);
        }
    }
}

// ---------------------------------------------------------------------------
// Core resources
// ---------------------------------------------------------------------------

/// Global tick counter incremented each `FixedUpdate`.
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

fn advance_tick(mut tick: ResMut<TickCounter>) {
    tick.0 = tick.0.wrapping_add(1);
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::PreSim,
                SimulationSet::Simulation,
                SimulationSet::PostSim,
            )
                .chain(),
        );

        // The simulation advances at 10 Hz; hosts that need a different
        // cadence override `Time<Fixed>` after adding the plugin.
        app.insert_resource(Time::<Fixed>::from_hz(10.0));

        app.init_resource::<TickCounter>()
            .init_resource::<SaveableRegistry>()
            .init_resource::<grid::TileGrid>()
            .init_resource::<economy::CityBudget>()
            .init_resource::<config::SimSettings>()
            .add_systems(FixedUpdate, advance_tick.in_set(SimulationSet::PreSim));

        app.add_plugins((
            sim_rng::SimRngPlugin,
            census::CensusPlugin,
            power::PowerPlugin,
            valves::ValvesPlugin,
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
