use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::simulation_sets::SimulationSet;

/// Aggregate population and infrastructure counts feeding the valve model and
/// the power pass. Zone populations are written by the zone collaborators
/// outside this crate; the plant counts are recounted by every map scan.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Census {
    pub res_pop: i32,
    pub com_pop: i32,
    pub ind_pop: i32,
    /// Coal plants found by the current map scan.
    pub coal_plants: u32,
    /// Nuclear plants found by the current map scan.
    pub nuclear_plants: u32,
    /// Rolling population samples; index 0 is the current sample, index 1 the
    /// previous one.
    pub res_hist: [i32; 10],
    pub com_hist: [i32; 10],
    pub ind_hist: [i32; 10],
}

impl Census {
    /// Plant counts are recounted from scratch by each map scan.
    pub fn reset_plant_counts(&mut self) {
        self.coal_plants = 0;
        self.nuclear_plants = 0;
    }

    /// Shift the rolling series one slot and record the current populations.
    pub fn record_history(&mut self) {
        self.res_hist.rotate_right(1);
        self.com_hist.rotate_right(1);
        self.ind_hist.rotate_right(1);
        self.res_hist[0] = self.res_pop;
        self.com_hist[0] = self.com_pop;
        self.ind_hist[0] = self.ind_pop;
    }
}

fn take_census(mut census: ResMut<Census>) {
    census.record_history();
}

pub struct CensusPlugin;

impl Plugin for CensusPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Census>()
            .add_systems(FixedUpdate, take_census.in_set(SimulationSet::PostSim));
    }
}
