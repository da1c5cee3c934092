//! Batch mining engine tying the pipeline stages together.
//!
//! Both run flavors share the generation front half. A cascade run then
//! connects events across adjacent windows through entity linkage; a path
//! run builds the case-overlap graph and enumerates paths through it.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use stau_core::{
    CaseSet, EventLog, HighLevelActivity, HighLevelEvent, HleId, MiningConfig, StauError,
};
use stau_graph::HleGraph;

use crate::algorithms::cascades::correlate_by_links;
use crate::algorithms::overlap::{build_overlap_graph, spread_bounds};
use crate::algorithms::paths::{maximal_paths, mine_paths, project_to_hla_paths, MinedPath};
use crate::pipeline::features::{Evaluation, Focus, InstanceTable};
use crate::pipeline::filter::filter_by_frequency;
use crate::pipeline::generation::{generate, HleSet};
use crate::pipeline::linkage::EntityLinkage;
use crate::pipeline::thresholds::ThresholdTable;
use crate::pipeline::windowing::Windowing;

/// Identity and size figures of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub windows: usize,
    pub events: usize,
    pub hles: usize,
    pub cascades: usize,
    /// Zero for cascade runs.
    pub paths: usize,
}

/// Result of a cascade run.
#[derive(Debug, Clone, Serialize)]
pub struct CascadeRun {
    pub summary: RunSummary,
    /// Window borders as (left, right) seconds, in window order.
    pub window_borders: Vec<(f64, f64)>,
    /// All generated events, indexed by id.
    pub hles: Vec<HighLevelEvent>,
    /// Per event, the cases of its instances. Indexed by id.
    pub case_sets: Vec<CaseSet>,
    /// Member ids per cascade, sorted within each group.
    pub cascades: Vec<Vec<HleId>>,
    /// Cascade label per event id.
    pub cascade_of: HashMap<HleId, usize>,
    /// Activities surviving the frequency cut, most frequent first.
    pub selected_hlas: Vec<HighLevelActivity>,
}

/// Result of a path run.
#[derive(Debug, Clone, Serialize)]
pub struct PathRun {
    pub summary: RunSummary,
    pub window_borders: Vec<(f64, f64)>,
    /// All generated events, indexed by id.
    pub hles: Vec<HighLevelEvent>,
    /// Per event, the cases of its instances. Indexed by id.
    pub case_sets: Vec<CaseSet>,
    /// Connected components of the overlap graph, sorted within each group.
    pub cascades: Vec<Vec<HleId>>,
    /// Enumerated event paths with the cases their members share.
    pub paths: Vec<MinedPath>,
    /// Activity paths surviving the frequency cuts, most frequent first.
    pub hla_paths: Vec<HlaPath>,
}

/// One projected activity path with its observation figures.
#[derive(Debug, Clone, Serialize)]
pub struct HlaPath {
    pub activities: Vec<HighLevelActivity>,
    pub frequency: usize,
    pub cases: CaseSet,
}

/// Batch mining engine. One instance runs any number of logs with the
/// same configuration; the configuration is validated once up front.
#[derive(Debug, Clone)]
pub struct HlemEngine {
    config: MiningConfig,
}

impl HlemEngine {
    pub fn new(config: MiningConfig) -> Result<Self, StauError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Full cascade run: generation, linkage correlation, frequency cut.
    pub fn run_cascades(&self, log: &EventLog) -> Result<CascadeRun, StauError> {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, events = log.len(), "Running cascade mining...");

        let (windowing, set) = self.generate_hles(log)?;

        info!("Computing entity linkage...");
        let mut links = EntityLinkage::compute(log, self.config.resource_info);
        if self.config.uniform_spread {
            links.uniform_spread();
        }

        info!("Correlating into cascades...");
        let assignment = correlate_by_links(&set, &links, self.config.link_threshold);
        let cascades = assignment.groups();
        let selected_hlas = filter_by_frequency(&set.frequencies, self.config.frequency);

        let elapsed = start.elapsed();
        info!(
            "Cascade mining complete in {:.1}s, {} cascades over {} events",
            elapsed.as_secs_f64(),
            cascades.len(),
            set.len()
        );

        Ok(CascadeRun {
            summary: RunSummary {
                run_id,
                started_at,
                elapsed_ms: elapsed.as_millis() as u64,
                windows: windowing.len(),
                events: log.len(),
                hles: set.len(),
                cascades: cascades.len(),
                paths: 0,
            },
            window_borders: windowing.borders(),
            hles: set.hles,
            case_sets: set.case_sets,
            cascades,
            cascade_of: assignment.cascade_of,
            selected_hlas,
        })
    }

    /// Full path run: generation, overlap graph, path search, projection.
    pub fn run_paths(&self, log: &EventLog) -> Result<PathRun, StauError> {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, events = log.len(), "Running path mining...");

        let (windowing, set) = self.generate_hles(log)?;

        info!("Building the overlap graph...");
        let bounds = spread_bounds(&set, &windowing);
        let graph = build_overlap_graph(&set, &bounds, self.config.overlap_threshold);
        let cascades = component_groups(&graph);

        info!("Searching paths...");
        let mut paths = mine_paths(
            &graph,
            &set.case_sets,
            self.config.overlap_threshold,
            self.config.path_threshold,
            self.config.only_maximal,
        );
        if self.config.only_maximal {
            paths = maximal_paths(paths);
        }
        let hla_paths = self.cut_hla_paths(&paths, &set.hles);

        let elapsed = start.elapsed();
        info!(
            "Path mining complete in {:.1}s, {} paths over {} events",
            elapsed.as_secs_f64(),
            paths.len(),
            set.len()
        );

        Ok(PathRun {
            summary: RunSummary {
                run_id,
                started_at,
                elapsed_ms: elapsed.as_millis() as u64,
                windows: windowing.len(),
                events: log.len(),
                hles: set.len(),
                cascades: cascades.len(),
                paths: paths.len(),
            },
            window_borders: windowing.borders(),
            hles: set.hles,
            case_sets: set.case_sets,
            cascades,
            paths,
            hla_paths,
        })
    }

    /// Shared front half of both run flavors.
    fn generate_hles(&self, log: &EventLog) -> Result<(Windowing, HleSet), StauError> {
        let config = &self.config;
        if config.resource_info && !log.has_resource_info() {
            return Err(StauError::Config(
                "Resource information requested but the log carries none".to_string(),
            ));
        }

        info!("Cutting windows...");
        let windowing = Windowing::build(log, &config.window)?;

        info!("Evaluating features...");
        let focus = Focus::from_config(log, config);
        let table = InstanceTable::collect(log, &windowing, &focus, &config.aspects);
        let evaluation = Evaluation::from_instances(&table, log, &windowing);

        let thresholds =
            ThresholdTable::build(&evaluation, config.granularity, config.percentile_level())?;
        let set = generate(log, &table, &evaluation, &thresholds, config);
        Ok((windowing, set))
    }

    /// Projects event paths onto activity paths and applies both frequency
    /// cuts, the absolute floor first.
    fn cut_hla_paths(&self, paths: &[MinedPath], hles: &[HighLevelEvent]) -> Vec<HlaPath> {
        let mut projected = project_to_hla_paths(paths, hles);
        if self.config.min_path_frequency > 0 {
            projected.retain(|_, stats| stats.frequency >= self.config.min_path_frequency);
        }

        let frequencies: HashMap<Vec<HighLevelActivity>, usize> = projected
            .iter()
            .map(|(signature, stats)| (signature.clone(), stats.frequency))
            .collect();
        filter_by_frequency(&frequencies, self.config.frequency)
            .into_iter()
            .map(|signature| {
                let stats = projected.remove(&signature).unwrap_or_default();
                HlaPath {
                    activities: signature,
                    frequency: stats.frequency,
                    cases: stats.cases,
                }
            })
            .collect()
    }
}

/// Connected components of the overlap graph as sorted id groups.
fn component_groups(graph: &HleGraph) -> Vec<Vec<HleId>> {
    let labels = graph.components();
    let count = labels.iter().map(|&label| label + 1).max().unwrap_or(0);
    let mut groups = vec![Vec::new(); count];
    for idx in graph.node_indices() {
        groups[labels[idx]].push(graph.hle_id(idx));
    }
    for group in &mut groups {
        group.sort_unstable();
    }
    groups
}
