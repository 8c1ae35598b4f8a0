//! Prerequisite graph: DAG validation, topological levels, ancestor queries.
//!
//! Edges run prerequisite -> dependent lesson. Level computation uses layered
//! Kahn-style peeling: repeatedly collect every node with zero remaining
//! in-degree, assign the current 0-based level, remove them, and advance. If
//! nodes remain with no zero in-degree candidate the graph has a cycle, which
//! is fatal: the scheduler must not run on a cyclic curriculum.
//!
//! Invariant: for every edge p -> l, `level(p) < level(l)`.

use ahash::{AHashMap, AHashSet};

use crate::catalog::Lesson;
use crate::core::error::{PathError, Result};
use crate::core::types::LessonId;

/// Validated lesson dependency DAG with precomputed levels and topo order
#[derive(Debug, Clone)]
pub struct PrerequisiteGraph {
    /// lesson -> its direct prerequisites
    prerequisites: AHashMap<LessonId, AHashSet<LessonId>>,
    levels: AHashMap<LessonId, u32>,
    /// All lessons in topological order (level by level, ids sorted within a
    /// level for determinism)
    topo_order: Vec<LessonId>,
    rank: AHashMap<LessonId, usize>,
}

impl PrerequisiteGraph {
    /// Build and validate the graph from the lesson map.
    ///
    /// Returns `PathError::Cycle` naming every lesson that could not be
    /// assigned a level.
    pub fn build(lessons: &AHashMap<LessonId, Lesson>) -> Result<Self> {
        let mut dependents: AHashMap<LessonId, Vec<LessonId>> = AHashMap::new();
        let mut prerequisites: AHashMap<LessonId, AHashSet<LessonId>> = AHashMap::new();
        let mut in_degree: AHashMap<LessonId, usize> = AHashMap::new();

        for lesson in lessons.values() {
            in_degree.entry(lesson.id.clone()).or_insert(0);
            dependents.entry(lesson.id.clone()).or_default();
            prerequisites
                .entry(lesson.id.clone())
                .or_default()
                .extend(lesson.prerequisites.iter().cloned());
            for prereq in &lesson.prerequisites {
                dependents
                    .entry(prereq.clone())
                    .or_default()
                    .push(lesson.id.clone());
                *in_degree.entry(lesson.id.clone()).or_insert(0) += 1;
            }
        }

        let mut levels: AHashMap<LessonId, u32> = AHashMap::with_capacity(lessons.len());
        let mut topo_order = Vec::with_capacity(lessons.len());
        let mut current_level = 0u32;

        // Layered peeling: each pass removes the whole zero in-degree frontier
        let mut remaining = in_degree;
        loop {
            let mut frontier: Vec<LessonId> = remaining
                .iter()
                .filter(|(_, &deg)| deg == 0)
                .map(|(id, _)| id.clone())
                .collect();
            if frontier.is_empty() {
                break;
            }
            frontier.sort();

            for id in &frontier {
                levels.insert(id.clone(), current_level);
                remaining.remove(id);
                for dep in &dependents[id] {
                    if let Some(deg) = remaining.get_mut(dep) {
                        *deg -= 1;
                    }
                }
                topo_order.push(id.clone());
            }
            current_level += 1;
        }

        if !remaining.is_empty() {
            let mut stuck: Vec<LessonId> = remaining.into_keys().collect();
            stuck.sort();
            return Err(PathError::Cycle { remaining: stuck });
        }

        let rank = topo_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        tracing::debug!(
            lessons = lessons.len(),
            depth = current_level,
            "prerequisite graph built"
        );

        Ok(Self {
            prerequisites,
            levels,
            topo_order,
            rank,
        })
    }

    /// Topological depth of each lesson (0 = no prerequisites)
    pub fn levels(&self) -> &AHashMap<LessonId, u32> {
        &self.levels
    }

    pub fn level(&self, id: &LessonId) -> Option<u32> {
        self.levels.get(id).copied()
    }

    /// All transitive prerequisites of a lesson
    pub fn ancestors(&self, id: &LessonId) -> AHashSet<LessonId> {
        let mut seen = AHashSet::new();
        let mut stack: Vec<LessonId> = self
            .prerequisites
            .get(id)
            .map(|p| p.iter().cloned().collect())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            if seen.insert(current.clone()) {
                if let Some(parents) = self.prerequisites.get(&current) {
                    stack.extend(parents.iter().cloned());
                }
            }
        }
        seen
    }

    /// All lessons, level by level, ids sorted within a level
    pub fn topo_order(&self) -> &[LessonId] {
        &self.topo_order
    }

    /// Position of a lesson in the topological order
    pub fn rank(&self, id: &LessonId) -> Option<usize> {
        self.rank.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Lesson;

    fn lessons(defs: &[(&str, &[&str])]) -> AHashMap<LessonId, Lesson> {
        defs.iter()
            .map(|(id, prereqs)| {
                (
                    LessonId::from(*id),
                    Lesson {
                        id: LessonId::from(*id),
                        name: id.to_string(),
                        min_mastery: 50,
                        prerequisites: prereqs.iter().map(|p| LessonId::from(*p)).collect(),
                        min_coverage: 1,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_levels_chain() {
        let map = lessons(&[("L1", &[]), ("L2", &["L1"]), ("L3", &["L2"])]);
        let graph = PrerequisiteGraph::build(&map).unwrap();

        assert_eq!(graph.level(&"L1".into()), Some(0));
        assert_eq!(graph.level(&"L2".into()), Some(1));
        assert_eq!(graph.level(&"L3".into()), Some(2));
    }

    #[test]
    fn test_levels_diamond() {
        let map = lessons(&[
            ("root", &[]),
            ("left", &["root"]),
            ("right", &["root"]),
            ("join", &["left", "right"]),
        ]);
        let graph = PrerequisiteGraph::build(&map).unwrap();

        assert_eq!(graph.level(&"root".into()), Some(0));
        assert_eq!(graph.level(&"left".into()), Some(1));
        assert_eq!(graph.level(&"right".into()), Some(1));
        assert_eq!(graph.level(&"join".into()), Some(2));
    }

    #[test]
    fn test_cycle_rejected() {
        let map = lessons(&[("L1", &["L2"]), ("L2", &["L1"]), ("L3", &[])]);
        let err = PrerequisiteGraph::build(&map).unwrap_err();

        match err {
            PathError::Cycle { remaining } => {
                assert_eq!(remaining, vec![LessonId::from("L1"), LessonId::from("L2")]);
            }
            other => panic!("expected Cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_ancestors_transitive() {
        let map = lessons(&[("L1", &[]), ("L2", &["L1"]), ("L3", &["L2"])]);
        let graph = PrerequisiteGraph::build(&map).unwrap();

        let ancestors = graph.ancestors(&"L3".into());
        assert!(ancestors.contains(&"L1".into()));
        assert!(ancestors.contains(&"L2".into()));
        assert_eq!(ancestors.len(), 2);
        assert!(graph.ancestors(&"L1".into()).is_empty());
    }

    #[test]
    fn test_edge_level_invariant() {
        let map = lessons(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a", "b"]),
            ("d", &["b"]),
            ("e", &["c", "d"]),
        ]);
        let graph = PrerequisiteGraph::build(&map).unwrap();

        for lesson in map.values() {
            for prereq in &lesson.prerequisites {
                assert!(graph.level(prereq).unwrap() < graph.level(&lesson.id).unwrap());
            }
        }
    }

    #[test]
    fn test_topo_rank_respects_prerequisites() {
        let map = lessons(&[("L1", &[]), ("L2", &["L1"]), ("L3", &["L1", "L2"])]);
        let graph = PrerequisiteGraph::build(&map).unwrap();

        assert!(graph.rank(&"L1".into()).unwrap() < graph.rank(&"L2".into()).unwrap());
        assert!(graph.rank(&"L2".into()).unwrap() < graph.rank(&"L3".into()).unwrap());
    }

    #[test]
    fn test_empty_graph() {
        let graph = PrerequisiteGraph::build(&AHashMap::new()).unwrap();
        assert!(graph.topo_order().is_empty());
    }
}
