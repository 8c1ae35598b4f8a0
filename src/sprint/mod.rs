//! Sprint partitioning of a selected activity batch
//!
//! A solved batch is an unordered set; learners consume it as a sequence of
//! small sprints. The builder groups activities by the depth of the lessons
//! they teach so prerequisites come up before the material that depends on
//! them, then splits oversized depth groups by coverage similarity so each
//! sprint hangs together thematically.

pub mod cluster;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Activity, CourseCatalog};
use crate::core::config::PlannerConfig;
use crate::core::error::Result;
use crate::core::types::ActivityId;
use crate::graph::PrerequisiteGraph;
use cluster::cluster;

/// How finished sprints are ordered in the output sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SprintOrdering {
    /// Depth groups in ascending order, clusters in discovery order within
    /// each group
    DepthGroup,
    /// All sprints re-sorted by the mean depth of their activities
    MeanDepth,
}

/// One ordered unit of study handed to the learner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub activities: Vec<ActivityId>,
}

impl Sprint {
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

/// Partitions selected activities into ordered sprints
pub struct SprintBuilder<'a> {
    catalog: &'a CourseCatalog,
    graph: &'a PrerequisiteGraph,
    config: &'a PlannerConfig,
}

impl<'a> SprintBuilder<'a> {
    pub fn new(
        catalog: &'a CourseCatalog,
        graph: &'a PrerequisiteGraph,
        config: &'a PlannerConfig,
    ) -> Self {
        Self {
            catalog,
            graph,
            config,
        }
    }

    /// Partition `selected` into sprints of at most `max_sprint_size`
    /// activities, ordered shallow to deep
    ///
    /// Activities covering no known lesson carry no depth signal and are
    /// dropped with a warning. Every surviving activity appears in exactly
    /// one sprint.
    pub fn build(&self, selected: &[&Activity]) -> Result<Vec<Sprint>> {
        let mut by_depth: Vec<(u32, Vec<&Activity>)> = Vec::new();
        for activity in selected {
            let Some(depth) = self.depth(activity) else {
                tracing::warn!(activity = %activity.id, "dropping activity with no lesson coverage");
                continue;
            };
            match by_depth.binary_search_by_key(&depth, |(d, _)| *d) {
                Ok(i) => by_depth[i].1.push(activity),
                Err(i) => by_depth.insert(i, (depth, vec![activity])),
            }
        }

        let mut sprints = Vec::new();
        // Groups keep the caller's activity order, so sequential chunks
        // come out in arrival order
        for (depth, group) in by_depth {
            debug!(depth, size = group.len(), "partitioning depth group");
            self.split_group(&group, &mut sprints)?;
        }

        if self.config.sprint_ordering == SprintOrdering::MeanDepth {
            sprints.sort_by(|a, b| {
                self.mean_depth(a)
                    .partial_cmp(&self.mean_depth(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        Ok(sprints)
    }

    /// Deepest lesson the activity contributes to, per the prerequisite
    /// levels
    fn depth(&self, activity: &Activity) -> Option<u32> {
        activity
            .effectiveness
            .keys()
            .filter_map(|lesson| self.graph.level(lesson))
            .max()
    }

    fn mean_depth(&self, sprint: &Sprint) -> f64 {
        let depths: Vec<u32> = sprint
            .activities
            .iter()
            .filter_map(|id| self.catalog.activity(id))
            .filter_map(|a| self.depth(a))
            .collect();
        if depths.is_empty() {
            0.0
        } else {
            depths.iter().sum::<u32>() as f64 / depths.len() as f64
        }
    }

    /// Split one depth group into sprints no larger than the configured cap
    fn split_group(&self, group: &[&Activity], out: &mut Vec<Sprint>) -> Result<()> {
        let max = self.config.max_sprint_size.max(1);
        if group.len() <= max || !self.config.use_clustering || group.len() < 4 {
            self.chunk(group, out);
            return Ok(());
        }

        let universe = self.catalog.sorted_lesson_ids();
        let vectors: Vec<Vec<f64>> = group
            .iter()
            .map(|activity| {
                universe
                    .iter()
                    .map(|lesson| {
                        if activity.effectiveness.contains_key(lesson) {
                            1.0
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect();

        let k = group.len().div_ceil(max).clamp(1, group.len() / 2);
        let labels = cluster(
            &vectors,
            k,
            self.config.cluster_metric,
            self.config.solver_seed,
        )?;

        let mut clusters: Vec<Vec<&Activity>> = vec![Vec::new(); k];
        for (activity, &label) in group.iter().zip(&labels) {
            clusters[label].push(*activity);
        }
        for members in clusters {
            // Similarity clustering bounds cluster count, not cluster size;
            // oversized clusters still get chunked to honor the cap
            self.chunk(&members, out);
        }
        Ok(())
    }

    fn chunk(&self, group: &[&Activity], out: &mut Vec<Sprint>) {
        let max = self.config.max_sprint_size.max(1);
        for piece in group.chunks(max) {
            out.push(Sprint {
                activities: piece.iter().map(|a| a.id.clone()).collect(),
            });
        }
    }
}
