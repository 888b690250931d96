//! Zone growth valves.
//!
//! Three signed integrals (residential, commercial, industrial) that zone
//! development reads as growth pressure. Each tick the controller projects
//! next-period populations from demographics, migration, labor availability,
//! and the external market, converts the projected/current ratios into
//! deltas banded by the tax table, and integrates the deltas into the
//! clamped valves. The model is deterministic: all randomness in this crate
//! lives in the meltdown roll, never here.

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::census::Census;
use crate::config::{GameLevel, SimSettings};
use crate::economy::CityBudget;
use crate::simulation_sets::SimulationSet;
use crate::{decode_or_warn, Saveable, SaveableRegistry};

/// Tunables for the valve model, injectable by tests.
#[derive(Resource, Debug, Clone)]
pub struct ValveParams {
    pub res_valve_range: i32,
    pub com_valve_range: i32,
    pub ind_valve_range: i32,
    /// Residential zones report a scaled population index; dividing by this
    /// yields people.
    pub res_pop_scale: f64,
    /// Share of residents outside the formal workforce.
    pub dependent_share: f64,
    /// Fraction of dependents entering the workforce each period.
    pub workforce_entry_rate: f64,
    pub infant_mortality: f64,
    pub death_rate: f64,
    pub birth_rate: f64,
    pub migration_factor: f64,
    /// Pull of public assistance on prospective migrants.
    pub welfare_pull: f64,
    /// New residents drawn directly by industrial jobs.
    pub job_inflow_rate: f64,
    pub labor_ratio_max: f64,
    pub internal_market_denom: f64,
    pub projected_ind_min: f64,
    pub res_ratio_default: f64,
    pub ratio_max: f64,
    pub tax_ceiling: i32,
    pub ratio_scale: f64,
    /// Growth adjustment by effective tax band, index `0..=tax_ceiling`.
    pub tax_table: [i32; 21],
    /// External-market demand factor per game level.
    pub ext_market: [f64; 3],
}

impl Default for ValveParams {
    fn default() -> Self {
        Self {
            res_valve_range: 2000,
            com_valve_range: 1500,
            ind_valve_range: 1500,
            res_pop_scale: 8.0,
            dependent_share: 0.35,
            workforce_entry_rate: 0.02,
            infant_mortality: 0.30,
            death_rate: 0.035,
            birth_rate: 0.03,
            migration_factor: 1.4,
            welfare_pull: 0.6,
            job_inflow_rate: 0.015,
            labor_ratio_max: 1.3,
            internal_market_denom: 3.7,
            projected_ind_min: 5.0,
            res_ratio_default: 1.3,
            ratio_max: 2.0,
            tax_ceiling: 20,
            ratio_scale: 600.0,
            tax_table: [
                150, 120, 100, 80, 60, 40, 20, 0, -10, -30, -60, -100, -140, -180, -220, -260,
                -300, -340, -380, -420, -460,
            ],
            ext_market: [0.9, 0.85, 0.8],
        }
    }
}

/// Published every time the valves are recomputed, and once after load.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct ValvesUpdatedEvent;

#[derive(Resource, Debug, Clone, Default)]
pub struct Valves {
    pub res_valve: i32,
    pub com_valve: i32,
    pub ind_valve: i32,
    /// While set, the matching valve may not hold a positive value.
    pub res_cap: bool,
    pub com_cap: bool,
    pub ind_cap: bool,
    /// Set by load so the next tick republishes the update notification.
    republish: bool,
}

#[derive(Encode, Decode, Default)]
struct ValveSave {
    res_valve: i32,
    com_valve: i32,
    ind_valve: i32,
}

impl Valves {
    /// Recompute the valve targets from this tick's inputs and integrate.
    pub fn set_valves(
        &mut self,
        level: GameLevel,
        census: &Census,
        budget: &CityBudget,
        params: &ValveParams,
    ) {
        let normalized_res = census.res_pop as f64 / params.res_pop_scale;
        let com_pop = census.com_pop as f64;
        let ind_pop = census.ind_pop as f64;
        let total_pop = normalized_res + com_pop + ind_pop;

        // Natural change plus the trickle of dependents entering the
        // workforce.
        let dependents = normalized_res * params.dependent_share;
        let workforce = normalized_res * (1.0 - params.dependent_share);
        let births = normalized_res * (1.0 - params.infant_mortality) * params.birth_rate;
        let deaths = normalized_res * params.death_rate;
        let natural_change = births - deaths;
        let entering_workforce = dependents * params.workforce_entry_rate;

        // Migration: economic activity, public assistance, and low taxes all
        // pull people in.
        let activity_pull = (ind_pop + com_pop) / 100.0;
        let welfare_attraction = workforce * params.welfare_pull / 100.0;
        let tax_discount =
            (params.tax_ceiling - budget.tax_rate) as f64 / params.tax_ceiling as f64;
        let migration =
            (activity_pull + welfare_attraction) * params.migration_factor * tax_discount;

        let job_inflow = ind_pop * params.job_inflow_rate;

        let projected_res =
            normalized_res + natural_change + migration + entering_workforce + job_inflow;

        // Labor availability against the prior period's job base.
        let labor_base = (census.com_hist[1] + census.ind_hist[1]) as f64;
        let labor_ratio = if labor_base > 0.0 {
            normalized_res / labor_base
        } else {
            1.0
        };
        let labor_ratio = labor_ratio.clamp(0.0, params.labor_ratio_max);

        let internal_market = total_pop / params.internal_market_denom;
        let projected_com = internal_market * labor_ratio;

        let projected_ind = (ind_pop * labor_ratio * params.ext_market[level.index()])
            .max(params.projected_ind_min);

        let res_ratio = if normalized_res > 0.0 {
            projected_res / normalized_res
        } else {
            params.res_ratio_default
        };
        let com_ratio = if com_pop > 0.0 {
            projected_com / com_pop
        } else {
            projected_com
        };
        let ind_ratio = if ind_pop > 0.0 {
            projected_ind / ind_pop
        } else {
            projected_ind
        };

        let res_ratio = res_ratio.min(params.ratio_max);
        let com_ratio = com_ratio.min(params.ratio_max);
        let ind_ratio = ind_ratio.min(params.ratio_max);

        // Taxes and difficulty suppress growth through the banded table.
        let band = (budget.tax_rate + level.index() as i32).min(params.tax_ceiling) as usize;
        let tax_adjust = params.tax_table[band] as f64;

        let res_delta = (res_ratio - 1.0) * params.ratio_scale + tax_adjust;
        let com_delta = (com_ratio - 1.0) * params.ratio_scale + tax_adjust;
        let ind_delta = (ind_ratio - 1.0) * params.ratio_scale + tax_adjust;

        self.res_valve = (self.res_valve + res_delta.round() as i32)
            .clamp(-params.res_valve_range, params.res_valve_range);
        self.com_valve = (self.com_valve + com_delta.round() as i32)
            .clamp(-params.com_valve_range, params.com_valve_range);
        self.ind_valve = (self.ind_valve + ind_delta.round() as i32)
            .clamp(-params.ind_valve_range, params.ind_valve_range);

        // Caps suppress the growth signal without erasing decline.
        if self.res_cap && self.res_valve > 0 {
            self.res_valve = 0;
        }
        if self.com_cap && self.com_valve > 0 {
            self.com_valve = 0;
        }
        if self.ind_cap && self.ind_valve > 0 {
            self.ind_valve = 0;
        }
    }
}

impl Saveable for Valves {
    const SAVE_KEY: &'static str = "valves";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(&ValveSave {
            res_valve: self.res_valve,
            com_valve: self.com_valve,
            ind_valve: self.ind_valve,
        }))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        let saved: ValveSave = decode_or_warn(Self::SAVE_KEY, bytes);
        // Caps are session configuration, not save state.
        Self {
            res_valve: saved.res_valve,
            com_valve: saved.com_valve,
            ind_valve: saved.ind_valve,
            republish: true,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

pub fn update_valves(
    settings: Res<SimSettings>,
    census: Res<Census>,
    budget: Res<CityBudget>,
    params: Res<ValveParams>,
    mut valves: ResMut<Valves>,
    mut updates: EventWriter<ValvesUpdatedEvent>,
) {
    valves.set_valves(settings.level, &census, &budget, &params);
    updates.send(ValvesUpdatedEvent);
}

/// Load replaces the resource wholesale; republish so observers refresh.
pub fn republish_after_load(
    mut valves: ResMut<Valves>,
    mut updates: EventWriter<ValvesUpdatedEvent>,
) {
    if valves.republish {
        valves.republish = false;
        updates.send(ValvesUpdatedEvent);
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct ValvesPlugin;

impl Plugin for ValvesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Valves>()
            .init_resource::<ValveParams>()
            .add_event::<ValvesUpdatedEvent>()
            .add_systems(
                FixedUpdate,
                (
                    update_valves.in_set(SimulationSet::Simulation),
                    republish_after_load.in_set(SimulationSet::PostSim),
                ),
            );

        app.init_resource::<SaveableRegistry>();
        app.world_mut()
            .resource_mut::<SaveableRegistry>()
            .register::<Valves>();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
