use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// City fiscal state. Only the tax rate feeds the valve model; the treasury
/// is carried for the budget collaborators that sit outside this crate.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct CityBudget {
    pub treasury: f64,
    /// City tax rate in whole percent, `0..=20`.
    pub tax_rate: i32,
}

impl Default for CityBudget {
    fn default() -> Self {
        Self {
            treasury: 10_000.0,
            tax_rate: 7,
        }
    }
}

impl CityBudget {
    pub const TAX_RATE_MAX: i32 = 20;

    pub fn set_tax_rate(&mut self, rate: i32) {
        self.tax_rate = rate.clamp(0, Self::TAX_RATE_MAX);
    }
}
