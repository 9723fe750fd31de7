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

use crate::attribute::{Attribute, SlotValue};
use crate::grammar::{AggType, ChartType, GrammarToken, SLOT_COUNT};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Sampling positions, in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    ChartType,
    X,
    Y,
    Z,
    AggType,
}
impl Slot {
    pub const ORDER: [Slot; SLOT_COUNT] = [Slot::ChartType, Slot::X, Slot::Y, Slot::Z, Slot::AggType];
    pub fn position(&self) -> usize {
        match self {
            Slot::ChartType => 0,
            Slot::X => 1,
            Slot::Y => 2,
            Slot::Z => 3,
            Slot::AggType => 4,
        }
    }
    pub fn from_position(position: usize) -> Option<Self> {
        Slot::ORDER.get(position).copied()
    }
    pub fn is_attribute(&self) -> bool {
        matches!(self, Slot::X | Slot::Y | Slot::Z)
    }
}
impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::ChartType => "chart_type",
            Slot::X => "x",
            Slot::Y => "y",
            Slot::Z => "z",
            Slot::AggType => "agg_type",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartCandidate {
    pub chart_type: ChartType,
    pub x: SlotValue,
    pub y: SlotValue,
    pub z: SlotValue,
    pub agg_type: AggType,
}
impl ChartCandidate {
    pub fn new(
        chart_type: ChartType,
        x: impl Into<SlotValue>,
        y: impl Into<SlotValue>,
        z: impl Into<SlotValue>,
        agg_type: AggType,
    ) -> Self {
        Self {
            chart_type,
            x: x.into(),
            y: y.into(),
            z: z.into(),
            agg_type,
        }
    }
    /// The type of each slot, as compared against grammar rows.
    pub fn tokens(&self) -> [GrammarToken; SLOT_COUNT] {
        [
            GrammarToken::Chart(self.chart_type),
            slot_token(&self.x),
            slot_token(&self.y),
            slot_token(&self.z),
            GrammarToken::Agg(self.agg_type),
        ]
    }
    pub fn attribute_slots(&self) -> [&SlotValue; 3] {
        [&self.x, &self.y, &self.z]
    }
    /// Used attributes in x, y, z order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attribute_slots()
            .into_iter()
            .filter_map(SlotValue::attribute)
    }
    /// No column appears in more than one of x, y and z.
    pub fn has_distinct_attributes(&self) -> bool {
        let attrs: Vec<&Attribute> = self.attributes().collect();
        attrs
            .iter()
            .enumerate()
            .all(|(i, a)| attrs[i + 1..].iter().all(|b| a != b))
    }
}
pub(crate) fn slot_token(value: &SlotValue) -> GrammarToken {
    value
        .attr_type()
        .map_or(GrammarToken::Empty, GrammarToken::Attr)
}
impl fmt::Display for ChartCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}, {})/{}",
            self.chart_type, self.x, self.y, self.z, self.agg_type
        )
    }
}

/// An ordered collection of sampled charts over one dataset. Repeats are
/// allowed; diversity is scored, not enforced.
#[derive(Debug, Clone)]
pub struct Dashboard {
    source: Arc<DataFrame>,
    charts: Vec<ChartCandidate>,
}
impl Dashboard {
    pub fn new(source: Arc<DataFrame>, charts: Vec<ChartCandidate>) -> Self {
        Self { source, charts }
    }
    pub fn empty(source: Arc<DataFrame>) -> Self {
        Self::new(source, Vec::new())
    }
    pub fn source(&self) -> &Arc<DataFrame> {
        &self.source
    }
    pub fn charts(&self) -> &[ChartCandidate] {
        &self.charts
    }
    pub fn push(&mut self, chart: ChartCandidate) {
        self.charts.push(chart);
    }
    pub fn len(&self) -> usize {
        self.charts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, ChartCandidate> {
        self.charts.iter()
    }
    pub fn into_charts(self) -> Vec<ChartCandidate> {
        self.charts
    }
}
impl<'a> IntoIterator for &'a Dashboard {
    type Item = &'a ChartCandidate;
    type IntoIter = std::slice::Iter<'a, ChartCandidate>;
    fn into_iter(self) -> Self::IntoIter {
        self.charts.iter()
    }
}
