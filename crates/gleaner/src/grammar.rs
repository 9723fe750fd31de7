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

//! The compatibility grammar: which `(chart_type, x, y, z, agg_type)` shapes
//! are legal.
//!
//! Rules are compiled into a prefix trie when the grammar is built, so the
//! set of legal continuations of a partially sampled chart is found by
//! walking at most five levels instead of rescanning every rule. The linear
//! [`GrammarRow::matches_prefix`] predicate is kept for validation.

use crate::attribute::AttributeType;
use crate::candidate::{ChartCandidate, Slot};
use crate::error::{GrammarError, GrammarResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

pub const SLOT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Bar,
    Line,
    Scatter,
    Pie,
    BoxPlot,
    Histogram,
    Heatmap,
}
impl ChartType {
    pub const ALL: [ChartType; 7] = [
        ChartType::Bar,
        ChartType::Line,
        ChartType::Scatter,
        ChartType::Pie,
        ChartType::BoxPlot,
        ChartType::Histogram,
        ChartType::Heatmap,
    ];
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Scatter => "scatter",
            ChartType::Pie => "pie",
            ChartType::BoxPlot => "box_plot",
            ChartType::Histogram => "histogram",
            ChartType::Heatmap => "heatmap",
        }
    }
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase();
        ChartType::ALL
            .into_iter()
            .find(|ct| ct.as_str() == token || (token == "boxplot" && *ct == ChartType::BoxPlot))
    }
}
impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggType {
    Raw,
    Count,
    Sum,
    Mean,
    Min,
    Max,
}
impl AggType {
    pub const ALL: [AggType; 6] = [
        AggType::Raw,
        AggType::Count,
        AggType::Sum,
        AggType::Mean,
        AggType::Min,
        AggType::Max,
    ];
    pub fn as_str(&self) -> &'static str {
        match self {
            AggType::Raw => "raw",
            AggType::Count => "count",
            AggType::Sum => "sum",
            AggType::Mean => "mean",
            AggType::Min => "min",
            AggType::Max => "max",
        }
    }
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase();
        match token.as_str() {
            "avg" | "average" => Some(AggType::Mean),
            "none" => Some(AggType::Raw),
            _ => AggType::ALL.into_iter().find(|at| at.as_str() == token),
        }
    }
}
impl fmt::Display for AggType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One position of a grammar rule, or the type a sampled value has at that
/// position. `Any` only ever appears in rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GrammarToken {
    Chart(ChartType),
    Attr(AttributeType),
    Agg(AggType),
    Empty,
    Any,
}
impl GrammarToken {
    /// Whether a rule holding `self` accepts the sampled `value`.
    /// The wildcard accepts every concrete value but not an unused slot.
    pub fn accepts(&self, value: &GrammarToken) -> bool {
        match self {
            GrammarToken::Any => *value != GrammarToken::Empty,
            _ => self == value,
        }
    }
    fn parse_at(rule: usize, position: usize, raw: Option<&str>) -> GrammarResult<Self> {
        let unknown = || GrammarError::UnknownToken {
            rule,
            position,
            token: raw.unwrap_or("null").to_string(),
        };
        let Some(raw) = raw else {
            return match Slot::from_position(position) {
                Some(slot) if slot.is_attribute() => Ok(GrammarToken::Empty),
                _ => Err(unknown()),
            };
        };
        if raw.trim() == "*" {
            return Ok(GrammarToken::Any);
        }
        match Slot::from_position(position) {
            Some(Slot::ChartType) => ChartType::parse(raw).map(GrammarToken::Chart),
            Some(Slot::AggType) => AggType::parse(raw).map(GrammarToken::Agg),
            Some(_) if raw.trim().eq_ignore_ascii_case("none") => Some(GrammarToken::Empty),
            Some(_) => AttributeType::parse(raw).map(GrammarToken::Attr),
            None => None,
        }
        .ok_or_else(unknown)
    }
}
impl fmt::Display for GrammarToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarToken::Chart(ct) => write!(f, "{ct}"),
            GrammarToken::Attr(at) => write!(f, "{at}"),
            GrammarToken::Agg(agg) => write!(f, "{agg}"),
            GrammarToken::Empty => write!(f, "none"),
            GrammarToken::Any => write!(f, "*"),
        }
    }
}

/// A legal chart shape. Rows shorter than five slots leave the remaining
/// positions unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrammarRow(Vec<GrammarToken>);
impl GrammarRow {
    pub fn new(tokens: Vec<GrammarToken>) -> Self {
        Self(tokens)
    }
    pub fn tokens(&self) -> &[GrammarToken] {
        &self.0
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn chart_type(&self) -> Option<ChartType> {
        match self.0.first() {
            Some(GrammarToken::Chart(ct)) => Some(*ct),
            _ => None,
        }
    }
    pub fn covers(&self, chart_type: ChartType) -> bool {
        matches!(self.0.first(), Some(GrammarToken::Any)) || self.chart_type() == Some(chart_type)
    }
    pub fn has_wildcard(&self) -> bool {
        self.0.contains(&GrammarToken::Any)
    }
    /// Position-by-position check of a partially sampled chart.
    pub fn matches_prefix(&self, prefix: &[GrammarToken]) -> bool {
        prefix
            .iter()
            .enumerate()
            .all(|(i, value)| self.0.get(i).map_or(true, |rule| rule.accepts(value)))
    }
    fn check_kinds(&self, rule: usize) -> GrammarResult<()> {
        if self.0.is_empty() {
            return Err(GrammarError::EmptyRule { rule });
        }
        if self.0.len() > SLOT_COUNT {
            return Err(GrammarError::RuleTooLong {
                rule,
                length: self.0.len(),
            });
        }
        for (position, token) in self.0.iter().enumerate() {
            let ok = match (Slot::from_position(position), token) {
                (_, GrammarToken::Any) => true,
                (Some(Slot::ChartType), GrammarToken::Chart(_)) => true,
                (Some(Slot::AggType), GrammarToken::Agg(_)) => true,
                (Some(slot), GrammarToken::Attr(_) | GrammarToken::Empty) => slot.is_attribute(),
                _ => false,
            };
            if !ok {
                return Err(GrammarError::UnknownToken {
                    rule,
                    position,
                    token: token.to_string(),
                });
            }
        }
        Ok(())
    }
}
impl fmt::Display for GrammarRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Tokens that may legally follow a prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegalSet {
    tokens: BTreeSet<GrammarToken>,
    unconstrained: bool,
}
impl LegalSet {
    pub fn admits(&self, value: &GrammarToken) -> bool {
        self.unconstrained
            || self.tokens.contains(value)
            || (*value != GrammarToken::Empty && self.tokens.contains(&GrammarToken::Any))
    }
    pub fn tokens(&self) -> &BTreeSet<GrammarToken> {
        &self.tokens
    }
    pub fn is_unconstrained(&self) -> bool {
        self.unconstrained
    }
    pub fn is_empty(&self) -> bool {
        !self.unconstrained && self.tokens.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: BTreeMap<GrammarToken, usize>,
    open_end: bool,
}

#[derive(Debug, Clone)]
struct PrefixTrie {
    nodes: Vec<TrieNode>,
}
impl PrefixTrie {
    fn build(rows: &[GrammarRow]) -> Self {
        let mut nodes = vec![TrieNode::default()];
        for row in rows {
            let mut current = 0;
            for token in row.tokens() {
                current = match nodes[current].children.get(token) {
                    Some(&next) => next,
                    None => {
                        nodes.push(TrieNode::default());
                        let next = nodes.len() - 1;
                        nodes[current].children.insert(*token, next);
                        next
                    }
                };
            }
            if row.len() < SLOT_COUNT {
                nodes[current].open_end = true;
            }
        }
        Self { nodes }
    }
    fn legal_next(&self, prefix: &[GrammarToken]) -> LegalSet {
        let mut frontier = vec![0usize];
        // Set once some rule has ended before the current position.
        let mut past_open_end = false;
        for value in prefix {
            let mut next = Vec::new();
            for &node_id in &frontier {
                let node = &self.nodes[node_id];
                past_open_end |= node.open_end;
                if let Some(&child) = node.children.get(value) {
                    next.push(child);
                }
                if *value != GrammarToken::Empty {
                    if let Some(&child) = node.children.get(&GrammarToken::Any) {
                        next.push(child);
                    }
                }
            }
            next.sort_unstable();
            next.dedup();
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }
        let mut legal = LegalSet {
            unconstrained: past_open_end,
            ..LegalSet::default()
        };
        for node_id in frontier {
            let node = &self.nodes[node_id];
            legal.unconstrained |= node.open_end;
            legal.tokens.extend(node.children.keys().copied());
        }
        legal
    }
}

#[derive(Debug, Deserialize)]
struct GrammarConfig {
    rules: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone)]
pub struct Grammar {
    rows: Vec<GrammarRow>,
    rows_by_chart: BTreeMap<ChartType, Vec<usize>>,
    trie: PrefixTrie,
}
impl Grammar {
    pub fn from_rows(rows: Vec<GrammarRow>) -> GrammarResult<Self> {
        if rows.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }
        for (idx, row) in rows.iter().enumerate() {
            row.check_kinds(idx)?;
        }
        let mut rows_by_chart: BTreeMap<ChartType, Vec<usize>> = BTreeMap::new();
        for chart_type in ChartType::ALL {
            let indices: Vec<usize> = rows
                .iter()
                .enumerate()
                .filter(|(_, row)| row.covers(chart_type))
                .map(|(idx, _)| idx)
                .collect();
            if !indices.is_empty() {
                rows_by_chart.insert(chart_type, indices);
            }
        }
        let trie = PrefixTrie::build(&rows);
        Ok(Self {
            rows,
            rows_by_chart,
            trie,
        })
    }
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> GrammarResult<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|source| GrammarError::GrammarFileError {
                path: path.as_ref().display().to_string(),
                source,
            })?;
        Self::from_yaml_str(&content)
    }
    pub fn from_yaml_str(yaml_content: &str) -> GrammarResult<Self> {
        let config: GrammarConfig = serde_yaml::from_str(yaml_content)?;
        let rows = config
            .rules
            .iter()
            .enumerate()
            .map(|(rule, raw)| {
                if raw.len() > SLOT_COUNT {
                    return Err(GrammarError::RuleTooLong {
                        rule,
                        length: raw.len(),
                    });
                }
                raw.iter()
                    .enumerate()
                    .map(|(position, token)| {
                        GrammarToken::parse_at(rule, position, token.as_deref())
                    })
                    .collect::<GrammarResult<Vec<_>>>()
                    .map(GrammarRow::new)
            })
            .collect::<GrammarResult<Vec<_>>>()?;
        Self::from_rows(rows)
    }
    /// The default chart vocabulary.
    pub fn builtin() -> Self {
        use AggType::*;
        use AttributeType::{Categorical as C, Quantitative as Q};
        use ChartType::*;
        let a = GrammarToken::Attr;
        let n = GrammarToken::Empty;
        let row = |ct: ChartType, x: GrammarToken, y: GrammarToken, z: GrammarToken, agg| {
            GrammarRow::new(vec![GrammarToken::Chart(ct), x, y, z, GrammarToken::Agg(agg)])
        };
        let mut rows = Vec::new();
        for agg in [Sum, Mean, Min, Max] {
            rows.push(row(Bar, a(C), a(Q), n, agg));
        }
        rows.push(row(Bar, a(C), n, n, Count));
        for agg in [Sum, Mean] {
            rows.push(row(Bar, a(C), a(Q), a(C), agg));
        }
        rows.push(row(Line, a(Q), a(Q), n, Raw));
        rows.push(row(Line, a(Q), a(Q), a(C), Raw));
        for agg in [Sum, Mean] {
            rows.push(row(Line, a(C), a(Q), n, agg));
        }
        rows.push(row(Scatter, a(Q), a(Q), n, Raw));
        rows.push(row(Scatter, a(Q), a(Q), a(C), Raw));
        rows.push(row(Scatter, a(Q), a(Q), a(Q), Raw));
        rows.push(row(Pie, a(C), a(Q), n, Sum));
        rows.push(row(Pie, a(C), n, n, Count));
        rows.push(row(BoxPlot, a(C), a(Q), n, Raw));
        rows.push(row(Histogram, a(Q), n, n, Count));
        for agg in [Mean, Sum] {
            rows.push(row(Heatmap, a(C), a(C), a(Q), agg));
        }
        rows.push(row(Heatmap, a(C), a(C), n, Count));
        Self::from_rows(rows).unwrap_or_else(|e| unreachable!("built-in grammar is invalid: {e}"))
    }
    pub fn rows(&self) -> &[GrammarRow] {
        &self.rows
    }
    pub fn rows_for(&self, chart_type: ChartType) -> Vec<&GrammarRow> {
        self.rows_by_chart
            .get(&chart_type)
            .map(|indices| indices.iter().map(|&idx| &self.rows[idx]).collect())
            .unwrap_or_default()
    }
    /// Legal tokens for the position right after `prefix`, via the trie.
    pub fn legal_next(&self, prefix: &[GrammarToken]) -> LegalSet {
        self.trie.legal_next(prefix)
    }
    /// Same result as [`Grammar::legal_next`], computed by scanning all rows.
    pub fn legal_next_scan(&self, prefix: &[GrammarToken]) -> LegalSet {
        let mut legal = LegalSet::default();
        for row in self.rows.iter().filter(|row| row.matches_prefix(prefix)) {
            match row.tokens().get(prefix.len()) {
                Some(token) => {
                    legal.tokens.insert(*token);
                }
                None => legal.unconstrained = true,
            }
        }
        legal
    }
    pub fn is_valid(&self, candidate: &ChartCandidate) -> bool {
        let tokens = candidate.tokens();
        self.rows.iter().any(|row| row.matches_prefix(&tokens))
    }
    /// Stricter than loading: every chart type needs a rule and no rule may
    /// repeat. A grammar that fails here still samples; draws of an
    /// uncovered chart type end in an infeasible sample.
    pub fn validate(&self) -> GrammarResult<()> {
        if let Some(chart_type) = self.uncovered_chart_types().first() {
            return Err(GrammarError::UncoveredChartType {
                chart_type: chart_type.to_string(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for (rule, row) in self.rows.iter().enumerate() {
            if !seen.insert(row) {
                return Err(GrammarError::DuplicateRule { rule });
            }
        }
        Ok(())
    }
    pub fn uncovered_chart_types(&self) -> Vec<ChartType> {
        ChartType::ALL
            .into_iter()
            .filter(|ct| !self.rows_by_chart.contains_key(ct))
            .collect()
    }
    pub fn stats(&self) -> GrammarStats {
        let rules_per_chart = self
            .rows_by_chart
            .iter()
            .map(|(ct, indices)| (*ct, indices.len()))
            .collect();
        GrammarStats {
            total_rules: self.rows.len(),
            wildcard_rules: self.rows.iter().filter(|r| r.has_wildcard()).count(),
            open_rules: self.rows.iter().filter(|r| r.len() < SLOT_COUNT).count(),
            trie_nodes: self.trie.nodes.len(),
            rules_per_chart,
        }
    }
}
impl Default for Grammar {
    fn default() -> Self {
        Self::builtin()
    }
}
#[derive(Debug, Clone)]
pub struct GrammarStats {
    pub total_rules: usize,
    pub wildcard_rules: usize,
    pub open_rules: usize,
    pub trie_nodes: usize,
    pub rules_per_chart: BTreeMap<ChartType, usize>,
}
impl GrammarStats {
    pub fn summary(&self) -> String {
        let per_chart: Vec<String> = self
            .rules_per_chart
            .iter()
            .map(|(ct, n)| format!("{ct}={n}"))
            .collect();
        format!(
            "Grammar Summary:\n\
            - Total Rules: {}\n\
            - Wildcard Rules: {}\n\
            - Open-ended Rules: {}\n\
            - Trie Nodes: {}\n\
            - Rules per Chart: {}",
            self.total_rules,
            self.wildcard_rules,
            self.open_rules,
            self.trie_nodes,
            per_chart.join(", ")
        )
    }
}
