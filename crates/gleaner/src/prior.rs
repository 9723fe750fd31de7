// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::candidate::Slot;
use crate::error::{GenerationError, GenerationResult};
use crate::grammar::{AggType, ChartType};
use rand::Rng;
use rand_distr::{Dirichlet, Distribution};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Range the per-outcome Dirichlet concentrations are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorConfig {
    pub concentration_min: f64,
    pub concentration_max: f64,
}
impl Default for PriorConfig {
    fn default() -> Self {
        Self {
            concentration_min: 0.5,
            concentration_max: 2.0,
        }
    }
}
impl PriorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.concentration_min.is_finite() && self.concentration_max.is_finite()) {
            return Err("concentrations must be finite".to_string());
        }
        if self.concentration_min <= 0.0 {
            return Err("concentration_min must be greater than 0.0".to_string());
        }
        if self.concentration_min > self.concentration_max {
            return Err("concentration_min must not exceed concentration_max".to_string());
        }
        Ok(())
    }
}

/// Weights over one slot's domain.
#[derive(Debug, Clone)]
pub enum SlotPrior {
    /// Returns the same weights on every draw.
    Fixed(Vec<f64>),
    /// Returns a fresh Dirichlet draw on every call.
    Dirichlet {
        concentration: Vec<f64>,
        dist: Dirichlet<f64>,
    },
}
impl SlotPrior {
    pub fn uniform(len: usize) -> Self {
        SlotPrior::Fixed(vec![1.0; len])
    }
    pub fn fixed(slot: Slot, weights: Vec<f64>) -> GenerationResult<Self> {
        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(GenerationError::InvalidPrior {
                slot,
                reason: format!("weight {bad} is negative or not finite"),
            });
        }
        Ok(SlotPrior::Fixed(weights))
    }
    /// A domain of fewer than two outcomes has nothing to randomise and
    /// degrades to fixed unit weights.
    pub fn dirichlet(slot: Slot, concentration: Vec<f64>) -> GenerationResult<Self> {
        if let Some(bad) = concentration.iter().find(|a| !a.is_finite() || **a <= 0.0) {
            return Err(GenerationError::InvalidPrior {
                slot,
                reason: format!("concentration {bad} must be positive and finite"),
            });
        }
        if concentration.len() < 2 {
            return Ok(SlotPrior::uniform(concentration.len()));
        }
        let dist = Dirichlet::new(&concentration).map_err(|e| GenerationError::InvalidPrior {
            slot,
            reason: e.to_string(),
        })?;
        Ok(SlotPrior::Dirichlet {
            concentration,
            dist,
        })
    }
    fn random<R: Rng + ?Sized>(
        slot: Slot,
        len: usize,
        config: &PriorConfig,
        rng: &mut R,
    ) -> GenerationResult<Self> {
        let concentration = (0..len)
            .map(|_| rng.gen_range(config.concentration_min..=config.concentration_max))
            .collect();
        Self::dirichlet(slot, concentration)
    }
    pub fn len(&self) -> usize {
        match self {
            SlotPrior::Fixed(weights) => weights.len(),
            SlotPrior::Dirichlet { concentration, .. } => concentration.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        match self {
            SlotPrior::Fixed(weights) => weights.clone(),
            SlotPrior::Dirichlet { dist, .. } => dist.sample(rng),
        }
    }
}

/// Per-slot priors for one dataset. The attribute slots are aligned with
/// `[None, attr_names...]`.
#[derive(Debug, Clone)]
pub struct PriorParameters {
    attr_names: Vec<String>,
    chart_type: SlotPrior,
    x: SlotPrior,
    y: SlotPrior,
    z: SlotPrior,
    agg_type: SlotPrior,
}
impl PriorParameters {
    /// Flat weights everywhere.
    pub fn uniform(attr_names: &[String]) -> Self {
        let attr_len = attr_names.len() + 1;
        Self {
            attr_names: attr_names.to_vec(),
            chart_type: SlotPrior::uniform(ChartType::ALL.len()),
            x: SlotPrior::uniform(attr_len),
            y: SlotPrior::uniform(attr_len),
            z: SlotPrior::uniform(attr_len),
            agg_type: SlotPrior::uniform(AggType::ALL.len()),
        }
    }
    /// Dirichlet priors with concentrations drawn from `config`'s range.
    pub fn random<R: Rng + ?Sized>(
        attr_names: &[String],
        config: &PriorConfig,
        rng: &mut R,
    ) -> GenerationResult<Self> {
        config
            .validate()
            .map_err(|reason| GenerationError::InvalidPrior {
                slot: Slot::ChartType,
                reason,
            })?;
        let attr_len = attr_names.len() + 1;
        Ok(Self {
            attr_names: attr_names.to_vec(),
            chart_type: SlotPrior::random(Slot::ChartType, ChartType::ALL.len(), config, rng)?,
            x: SlotPrior::random(Slot::X, attr_len, config, rng)?,
            y: SlotPrior::random(Slot::Y, attr_len, config, rng)?,
            z: SlotPrior::random(Slot::Z, attr_len, config, rng)?,
            agg_type: SlotPrior::random(Slot::AggType, AggType::ALL.len(), config, rng)?,
        })
    }
    pub fn attr_names(&self) -> &[String] {
        &self.attr_names
    }
    pub fn domain_len(&self, slot: Slot) -> usize {
        match slot {
            Slot::ChartType => ChartType::ALL.len(),
            Slot::AggType => AggType::ALL.len(),
            Slot::X | Slot::Y | Slot::Z => self.attr_names.len() + 1,
        }
    }
    pub fn get(&self, slot: Slot) -> &SlotPrior {
        match slot {
            Slot::ChartType => &self.chart_type,
            Slot::X => &self.x,
            Slot::Y => &self.y,
            Slot::Z => &self.z,
            Slot::AggType => &self.agg_type,
        }
    }
    pub fn set(&mut self, slot: Slot, prior: SlotPrior) -> GenerationResult<()> {
        let expected = self.domain_len(slot);
        if prior.len() != expected {
            return Err(GenerationError::PriorMisaligned {
                slot,
                expected,
                found: prior.len(),
            });
        }
        match slot {
            Slot::ChartType => self.chart_type = prior,
            Slot::X => self.x = prior,
            Slot::Y => self.y = prior,
            Slot::Z => self.z = prior,
            Slot::AggType => self.agg_type = prior,
        }
        Ok(())
    }
    /// Fixed attribute-slot weights keyed by column name. `none_weight`
    /// applies to the unused-slot outcome, unnamed columns get 0.
    pub fn set_attribute_weights(
        &mut self,
        slot: Slot,
        none_weight: f64,
        weights: &HashMap<String, f64>,
    ) -> GenerationResult<()> {
        if !slot.is_attribute() {
            return Err(GenerationError::InvalidPrior {
                slot,
                reason: "attribute weights only apply to x, y and z".to_string(),
            });
        }
        let aligned = std::iter::once(none_weight)
            .chain(
                self.attr_names
                    .iter()
                    .map(|name| weights.get(name).copied().unwrap_or(0.0)),
            )
            .collect();
        self.set(slot, SlotPrior::fixed(slot, aligned)?)
    }
    pub fn sample<R: Rng + ?Sized>(&self, slot: Slot, rng: &mut R) -> Vec<f64> {
        self.get(slot).sample(rng)
    }
}
