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

pub mod attribute;
pub mod candidate;
pub mod config;
pub mod error;
pub mod generator;
pub mod grammar;
pub mod node;
pub mod oracle;
pub mod prior;

pub use attribute::{infer_attributes, Attribute, AttributeType, SlotValue};
pub use candidate::{ChartCandidate, Dashboard, Slot};
pub use config::{GleanerConfig, SelectionConfig};
pub use error::{
    ConfigError, DataError, ErrorReporter, GenerationError, GleanerError, GrammarError, Result,
};
pub use generator::{normalize, Generator, PartialChart};
pub use grammar::{AggType, ChartType, Grammar, GrammarRow, GrammarStats, GrammarToken, LegalSet};
pub use node::{Filter, NodeId, OracleNode, ProbabilisticNode, VisualizationNode};
pub use oracle::{
    ColumbusOracle, ColumbusProbOracle, FeatureTable, OracleResult, OracleWeight,
    StatisticFeatures, StatisticStore,
};
pub use prior::{PriorConfig, PriorParameters, SlotPrior};

use error::GenerationResult;
use polars::prelude::{CsvReader, DataFrame, SerReader};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A dashboard together with the nodes it was scored on and its score.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub dashboard: Dashboard,
    pub nodes: Vec<VisualizationNode>,
    pub result: OracleResult,
}
impl Suggestion {
    pub fn score(&self) -> f64 {
        self.result.score()
    }
}

pub struct DashboardSuggestionSystem {
    config: GleanerConfig,
    grammar: Arc<Grammar>,
    oracle: ColumbusOracle,
}
impl DashboardSuggestionSystem {
    /// Built-in grammar and default configuration.
    pub fn new() -> Self {
        let config = GleanerConfig::default();
        Self {
            oracle: ColumbusOracle::new(config.oracle),
            grammar: Arc::new(Grammar::builtin()),
            config,
        }
    }
    pub fn from_config(config: GleanerConfig) -> Result<Self> {
        config.validate()?;
        let grammar = match &config.grammar_path {
            Some(path) => Grammar::from_yaml_file(path)?,
            None => Grammar::builtin(),
        };
        let uncovered = grammar.uncovered_chart_types();
        if !uncovered.is_empty() {
            warn!(?uncovered, "Grammar has no rule for some chart types, draws of them will fail");
        }
        Ok(Self::with_grammar(grammar, config))
    }
    /// A relative `grammar_path` is resolved against the config file's
    /// directory.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = GleanerConfig::from_yaml_file(path)?;
        if let (Some(grammar_path), Some(dir)) = (&config.grammar_path, path.parent()) {
            if grammar_path.is_relative() {
                config.grammar_path = Some(dir.join(grammar_path));
            }
        }
        Self::from_config(config)
    }
    /// Ignores `config.grammar_path`.
    pub fn with_grammar(grammar: Grammar, config: GleanerConfig) -> Self {
        Self {
            oracle: ColumbusOracle::new(config.oracle),
            grammar: Arc::new(grammar),
            config,
        }
    }
    pub fn config(&self) -> &GleanerConfig {
        &self.config
    }
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }
    pub fn oracle(&self) -> &ColumbusOracle {
        &self.oracle
    }
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .finish()
            .map_err(|source| DataError::DataFileError {
                path: path.display().to_string(),
                source,
            })?;
        if df.width() == 0 {
            return Err(DataError::EmptyDataset.into());
        }
        debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded CSV");
        Ok(df)
    }
    /// The configured seed, or entropy when none is set.
    pub fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
    pub fn generator(&self, df: Arc<DataFrame>) -> Result<Generator> {
        let generator =
            Generator::with_overrides(df, Arc::clone(&self.grammar), &self.config.attribute_overrides)?
                .with_prior_config(self.config.prior);
        Ok(generator)
    }
    /// Redraws after an infeasible sample, up to `max_sample_attempts`
    /// draws in total. Other errors are returned at once.
    pub fn sample_one_with_retry<R: Rng + ?Sized>(
        &self,
        generator: &Generator,
        rng: &mut R,
    ) -> GenerationResult<ChartCandidate> {
        let attempts = self.config.selection.max_sample_attempts;
        for attempt in 1..=attempts {
            match generator.sample_one(rng) {
                Ok(candidate) => return Ok(candidate),
                Err(GenerationError::InfeasibleSample { slot }) => {
                    warn!(attempt, attempts, %slot, "Infeasible sample, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(GenerationError::RetriesExhausted { attempts })
    }
    pub fn sample_dashboard_with_retry<R: Rng + ?Sized>(
        &self,
        generator: &Generator,
        n: i64,
        rng: &mut R,
    ) -> GenerationResult<Dashboard> {
        let count =
            usize::try_from(n).map_err(|_| GenerationError::InvalidCount { requested: n })?;
        let charts = (0..count)
            .map(|_| self.sample_one_with_retry(generator, rng))
            .collect::<GenerationResult<Vec<_>>>()?;
        Ok(Dashboard::new(Arc::clone(generator.dataframe()), charts))
    }
    pub fn nodes_for(&self, dashboard: &Dashboard) -> Result<Vec<VisualizationNode>> {
        let nodes = dashboard
            .iter()
            .map(|chart| VisualizationNode::from_candidate(chart.clone(), dashboard.source()))
            .collect::<error::DataResult<Vec<_>>>()?;
        Ok(nodes)
    }
    /// Draws `candidate_pool` dashboards, each under freshly initialised
    /// priors.
    pub fn candidate_pool<R: Rng + ?Sized>(
        &self,
        df: Arc<DataFrame>,
        rng: &mut R,
    ) -> Result<Vec<Dashboard>> {
        let mut generator = self.generator(df)?;
        let size = i64::try_from(self.config.selection.dashboard_size).map_err(|_| {
            ConfigError::InvalidSelectionConfig {
                field: "dashboard_size".to_string(),
            }
        })?;
        let mut pool = Vec::with_capacity(self.config.selection.candidate_pool);
        for _ in 0..self.config.selection.candidate_pool {
            generator.initialize(rng)?;
            pool.push(self.sample_dashboard_with_retry(&generator, size, rng)?);
        }
        Ok(pool)
    }
    /// Scores every dashboard in parallel, best first.
    pub fn rank_dashboards<S: StatisticStore + Sync + ?Sized>(
        &self,
        dashboards: Vec<Dashboard>,
        wildcard: &BTreeSet<String>,
        store: &S,
    ) -> Result<Vec<Suggestion>> {
        let mut ranked = dashboards
            .into_par_iter()
            .map(|dashboard| -> Result<Suggestion> {
                let nodes = self.nodes_for(&dashboard)?;
                let result = self
                    .oracle
                    .get_result(&nodes, dashboard.source(), wildcard, store);
                Ok(Suggestion {
                    dashboard,
                    nodes,
                    result,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));
        Ok(ranked)
    }
    /// Samples a pool of dashboards and returns the highest scoring one.
    /// `None` when the pool is empty.
    pub fn suggest<S: StatisticStore + Sync + ?Sized>(
        &self,
        df: Arc<DataFrame>,
        wildcard: &BTreeSet<String>,
        store: &S,
    ) -> Result<Option<Suggestion>> {
        let mut rng = self.rng();
        let pool = self.candidate_pool(df, &mut rng)?;
        let pool_size = pool.len();
        let best = self.rank_dashboards(pool, wildcard, store)?.into_iter().next();
        if let Some(best) = &best {
            info!(
                pool = pool_size,
                charts = best.dashboard.len(),
                score = best.score(),
                "Selected dashboard"
            );
        }
        Ok(best)
    }
    pub fn suggest_from_csv<P: AsRef<Path>, S: StatisticStore + Sync + ?Sized>(
        &self,
        path: P,
        wildcard: &BTreeSet<String>,
        store: &S,
    ) -> Result<Option<Suggestion>> {
        let df = self.load_csv(path)?;
        self.suggest(Arc::new(df), wildcard, store)
    }
}
impl Default for DashboardSuggestionSystem {
    fn default() -> Self {
        Self::new()
    }
}
