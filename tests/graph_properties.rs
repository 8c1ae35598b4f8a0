//! Property tests for the prerequisite graph
//!
//! Random DAGs are generated by only allowing edges from a lower index to a
//! higher one, which cannot cycle; the layered levels must then respect
//! every edge.

use ahash::AHashMap;
use proptest::prelude::*;

use pathforge::catalog::Lesson;
use pathforge::core::types::LessonId;
use pathforge::graph::PrerequisiteGraph;

fn build_lessons(n: usize, raw_edges: &[(usize, usize)]) -> AHashMap<LessonId, Lesson> {
    let mut lessons: AHashMap<LessonId, Lesson> = (0..n)
        .map(|i| {
            let id = LessonId(format!("l{i:02}"));
            (
                id.clone(),
                Lesson {
                    id,
                    name: format!("lesson {i}"),
                    min_mastery: 50,
                    prerequisites: Default::default(),
                    min_coverage: 1,
                },
            )
        })
        .collect();

    for &(a, b) in raw_edges {
        let (from, to) = (a % n, b % n);
        let (from, to) = (from.min(to), from.max(to));
        if from == to {
            continue;
        }
        let prereq = LessonId(format!("l{from:02}"));
        if let Some(lesson) = lessons.get_mut(&LessonId(format!("l{to:02}"))) {
            lesson.prerequisites.insert(prereq);
        }
    }
    lessons
}

proptest! {
    #[test]
    fn prop_levels_respect_every_edge(
        n in 2usize..16,
        raw_edges in prop::collection::vec((0usize..16, 0usize..16), 0..40),
    ) {
        let lessons = build_lessons(n, &raw_edges);
        let graph = PrerequisiteGraph::build(&lessons).unwrap();

        prop_assert_eq!(graph.levels().len(), lessons.len());
        for lesson in lessons.values() {
            let level = graph.levels()[&lesson.id];
            for prereq in &lesson.prerequisites {
                prop_assert!(graph.levels()[prereq] < level);
            }
        }
    }

    #[test]
    fn prop_topo_order_covers_every_lesson_once(
        n in 2usize..16,
        raw_edges in prop::collection::vec((0usize..16, 0usize..16), 0..40),
    ) {
        let lessons = build_lessons(n, &raw_edges);
        let graph = PrerequisiteGraph::build(&lessons).unwrap();

        prop_assert_eq!(graph.topo_order().len(), lessons.len());
        for lesson in lessons.values() {
            let rank = graph.rank(&lesson.id).unwrap();
            for prereq in &lesson.prerequisites {
                prop_assert!(graph.rank(prereq).unwrap() < rank);
            }
        }
    }

    #[test]
    fn prop_ancestors_are_transitively_closed(
        n in 2usize..12,
        raw_edges in prop::collection::vec((0usize..12, 0usize..12), 0..30),
    ) {
        let lessons = build_lessons(n, &raw_edges);
        let graph = PrerequisiteGraph::build(&lessons).unwrap();

        for lesson in lessons.values() {
            let ancestors = graph.ancestors(&lesson.id);
            for prereq in &lesson.prerequisites {
                prop_assert!(ancestors.contains(prereq));
                for grand in graph.ancestors(prereq) {
                    prop_assert!(ancestors.contains(&grand));
                }
            }
        }
    }
}
