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

//! Grammar-constrained chart sampling.
//!
//! A chart is drawn slot by slot in the order chart type, x, y, z,
//! aggregation. Before each attribute or aggregation draw the grammar is
//! asked which tokens may follow the choices made so far; outcomes outside
//! that set get weight zero. Every completed candidate therefore matches a
//! grammar rule, and a slot with no legal outcome fails the whole draw with
//! [`GenerationError::InfeasibleSample`].

use crate::attribute::{infer_attributes, Attribute, AttributeType, SlotValue};
use crate::candidate::{slot_token, ChartCandidate, Dashboard, Slot};
use crate::error::{DataResult, GenerationError, GenerationResult};
use crate::grammar::{AggType, ChartType, Grammar, GrammarToken};
use crate::prior::{PriorConfig, PriorParameters};
use polars::prelude::DataFrame;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Scales `weights` to sum to one. `None` when nothing carries weight.
pub fn normalize(weights: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return None;
    }
    Some(weights.iter().map(|w| w / total).collect())
}

/// A chart whose chart type and a prefix of x, y, z are chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialChart {
    chart_type: ChartType,
    attrs: Vec<SlotValue>,
}
impl PartialChart {
    pub fn new(chart_type: ChartType) -> Self {
        Self {
            chart_type,
            attrs: Vec::with_capacity(3),
        }
    }
    /// Fills the next attribute slot. Values past z are ignored.
    pub fn with(mut self, value: impl Into<SlotValue>) -> Self {
        if self.attrs.len() < 3 {
            self.attrs.push(value.into());
        }
        self
    }
    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }
    pub fn next_slot(&self) -> Slot {
        Slot::from_position(1 + self.attrs.len()).unwrap_or(Slot::AggType)
    }
    pub fn tokens(&self) -> Vec<GrammarToken> {
        std::iter::once(GrammarToken::Chart(self.chart_type))
            .chain(self.attrs.iter().map(slot_token))
            .collect()
    }
    pub fn uses(&self, attr: &Attribute) -> bool {
        self.attrs.iter().any(|v| v.attribute() == Some(attr))
    }
    fn into_candidate(self, agg_type: AggType) -> ChartCandidate {
        let mut attrs = self.attrs.into_iter();
        ChartCandidate {
            chart_type: self.chart_type,
            x: attrs.next().unwrap_or(SlotValue::None),
            y: attrs.next().unwrap_or(SlotValue::None),
            z: attrs.next().unwrap_or(SlotValue::None),
            agg_type,
        }
    }
}

pub struct Generator {
    df: Arc<DataFrame>,
    grammar: Arc<Grammar>,
    attrs: Vec<SlotValue>,
    attr_names: Vec<String>,
    prior: PriorParameters,
    prior_config: PriorConfig,
}
impl Generator {
    /// Infers attributes from the dataframe's column types and starts from
    /// flat priors.
    pub fn new(df: Arc<DataFrame>, grammar: Arc<Grammar>) -> DataResult<Self> {
        Self::with_overrides(df, grammar, &BTreeMap::new())
    }
    pub fn with_overrides(
        df: Arc<DataFrame>,
        grammar: Arc<Grammar>,
        overrides: &BTreeMap<String, AttributeType>,
    ) -> DataResult<Self> {
        let attributes = infer_attributes(&df, overrides)?;
        Ok(Self::with_attributes(df, grammar, attributes))
    }
    pub fn with_attributes(
        df: Arc<DataFrame>,
        grammar: Arc<Grammar>,
        attributes: Vec<Attribute>,
    ) -> Self {
        let attr_names: Vec<String> = attributes.iter().map(|a| a.name.clone()).collect();
        let attrs = std::iter::once(SlotValue::None)
            .chain(attributes.into_iter().map(SlotValue::Attribute))
            .collect();
        let prior = PriorParameters::uniform(&attr_names);
        Self {
            df,
            grammar,
            attrs,
            attr_names,
            prior,
            prior_config: PriorConfig::default(),
        }
    }
    pub fn with_prior_config(mut self, config: PriorConfig) -> Self {
        self.prior_config = config;
        self
    }
    /// Replaces the priors with freshly randomised ones for the same
    /// attribute list.
    pub fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> GenerationResult<()> {
        self.prior = PriorParameters::random(&self.attr_names, &self.prior_config, rng)?;
        debug!(attributes = self.attr_names.len(), "Priors re-initialised");
        Ok(())
    }
    pub fn set_priors(&mut self, prior: PriorParameters) -> GenerationResult<()> {
        if prior.attr_names() != self.attr_names.as_slice() {
            return Err(GenerationError::PriorMisaligned {
                slot: Slot::X,
                expected: self.domain_len(Slot::X),
                found: prior.domain_len(Slot::X),
            });
        }
        for slot in Slot::ORDER {
            let expected = self.domain_len(slot);
            let found = prior.get(slot).len();
            if found != expected {
                return Err(GenerationError::PriorMisaligned {
                    slot,
                    expected,
                    found,
                });
            }
        }
        self.prior = prior;
        Ok(())
    }
    pub fn priors(&self) -> &PriorParameters {
        &self.prior
    }
    pub fn priors_mut(&mut self) -> &mut PriorParameters {
        &mut self.prior
    }
    pub fn dataframe(&self) -> &Arc<DataFrame> {
        &self.df
    }
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }
    /// The attribute domain, led by the unused-slot marker.
    pub fn attributes(&self) -> &[SlotValue] {
        &self.attrs
    }
    fn domain_len(&self, slot: Slot) -> usize {
        match slot {
            Slot::ChartType => ChartType::ALL.len(),
            Slot::AggType => AggType::ALL.len(),
            Slot::X | Slot::Y | Slot::Z => self.attrs.len(),
        }
    }
    /// Eligibility of every attribute-domain entry for the next slot of
    /// `partial`: its type must be legal after the prefix and a column may
    /// not repeat within one chart.
    pub fn attr_mask(&self, partial: &PartialChart) -> Vec<bool> {
        let legal = self.grammar.legal_next(&partial.tokens());
        self.attrs
            .iter()
            .map(|value| match value {
                SlotValue::None => legal.admits(&GrammarToken::Empty),
                SlotValue::Attribute(attr) => {
                    legal.admits(&GrammarToken::Attr(attr.attr_type)) && !partial.uses(attr)
                }
            })
            .collect()
    }
    pub fn agg_mask(&self, partial: &PartialChart) -> Vec<bool> {
        let legal = self.grammar.legal_next(&partial.tokens());
        AggType::ALL
            .iter()
            .map(|agg| legal.admits(&GrammarToken::Agg(*agg)))
            .collect()
    }
    /// Draws one grammar-valid chart. Fails without retrying when some slot
    /// has no legal outcome.
    pub fn sample_one<R: Rng + ?Sized>(&self, rng: &mut R) -> GenerationResult<ChartCandidate> {
        let weights = self.prior.sample(Slot::ChartType, rng);
        let chart_type = draw(Slot::ChartType, &ChartType::ALL, weights, None, rng)?;
        let mut partial = PartialChart::new(chart_type);
        for slot in [Slot::X, Slot::Y, Slot::Z] {
            let mask = self.attr_mask(&partial);
            let weights = self.prior.sample(slot, rng);
            let value = draw(slot, &self.attrs, weights, Some(&mask), rng)
                .inspect_err(|_| warn!(%chart_type, %slot, "No legal attribute for slot"))?;
            partial = partial.with(value);
        }
        let mask = self.agg_mask(&partial);
        let weights = self.prior.sample(Slot::AggType, rng);
        let agg_type = draw(Slot::AggType, &AggType::ALL, weights, Some(&mask), rng)
            .inspect_err(|_| warn!(%chart_type, "No legal aggregation"))?;
        let candidate = partial.into_candidate(agg_type);
        debug!(candidate = %candidate, "Sampled chart");
        Ok(candidate)
    }
    /// `n` independent draws. Negative counts are rejected before any
    /// sampling happens.
    pub fn sample_dashboard<R: Rng + ?Sized>(
        &self,
        n: i64,
        rng: &mut R,
    ) -> GenerationResult<Dashboard> {
        let count =
            usize::try_from(n).map_err(|_| GenerationError::InvalidCount { requested: n })?;
        let charts = (0..count)
            .map(|_| self.sample_one(rng))
            .collect::<GenerationResult<Vec<_>>>()?;
        Ok(Dashboard::new(Arc::clone(&self.df), charts))
    }
}

/// Pairs the domain with its masked prior weights and draws one entry.
fn draw<T: Clone, R: Rng + ?Sized>(
    slot: Slot,
    domain: &[T],
    weights: Vec<f64>,
    mask: Option<&[bool]>,
    rng: &mut R,
) -> GenerationResult<T> {
    if weights.len() != domain.len() {
        return Err(GenerationError::PriorMisaligned {
            slot,
            expected: domain.len(),
            found: weights.len(),
        });
    }
    let weighted: Vec<(&T, f64)> = domain
        .iter()
        .zip(weights)
        .enumerate()
        .map(|(i, (value, w))| {
            let eligible = mask.map_or(true, |m| m.get(i).copied().unwrap_or(false));
            (value, if eligible { w } else { 0.0 })
        })
        .collect();
    let masked: Vec<f64> = weighted.iter().map(|(_, w)| *w).collect();
    let probabilities = normalize(&masked).ok_or(GenerationError::InfeasibleSample { slot })?;
    let dist = WeightedIndex::new(&probabilities)
        .map_err(|_| GenerationError::InfeasibleSample { slot })?;
    let eligible = probabilities.iter().filter(|p| **p > 0.0).count();
    debug!(%slot, eligible, "Drawing slot");
    Ok(weighted[dist.sample(rng)].0.clone())
}
