//! Batch-selection solve benchmarks on small hand-built instances

use criterion::{criterion_group, criterion_main, Criterion};

use ahash::AHashMap;
use pathforge::catalog::{Activity, ActivityType, CourseCatalog, Difficulty, LearningStyle, Lesson};
use pathforge::core::config::PlannerConfig;
use pathforge::core::types::LessonId;
use pathforge::graph::PrerequisiteGraph;
use pathforge::learner::LearnerModel;
use pathforge::planner::PathModelBuilder;
use pathforge::solver::native::NativeSolver;

/// Chain of `lessons` lessons with `per_lesson` alternative activities each
fn chain_instance(lessons: usize, per_lesson: usize) -> CourseCatalog {
    let lesson_records: Vec<Lesson> = (0..lessons)
        .map(|i| Lesson {
            id: LessonId(format!("l{i:02}")),
            name: format!("lesson {i}"),
            min_mastery: 50,
            prerequisites: if i == 0 {
                Default::default()
            } else {
                [LessonId(format!("l{:02}", i - 1))].into_iter().collect()
            },
            min_coverage: 1,
        })
        .collect();

    let activities: Vec<Activity> = (0..lessons)
        .flat_map(|i| {
            (0..per_lesson).map(move |j| {
                let mut effectiveness = AHashMap::new();
                effectiveness.insert(LessonId(format!("l{i:02}")), 60);
                Activity {
                    id: format!("a{i:02}_{j}").as_str().into(),
                    name: format!("activity {i}/{j}"),
                    duration: 20 + 10 * j as u32,
                    style: LearningStyle::Visual,
                    effectiveness,
                    difficulty: Difficulty::Medium,
                    activity_type: ActivityType::Video,
                    max_selections: 1,
                }
            })
        })
        .collect();

    CourseCatalog::from_parts(lesson_records, activities).unwrap()
}

fn bench_batch_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_selection");
    for (lessons, per_lesson) in [(4, 2), (5, 3)] {
        let catalog = chain_instance(lessons, per_lesson);
        let graph = PrerequisiteGraph::build(catalog.lessons()).unwrap();
        let learner = LearnerModel::new(catalog.lessons().keys().cloned().collect());
        let config = PlannerConfig::default();
        let solver = NativeSolver::new();

        group.bench_function(format!("chain_{lessons}x{per_lesson}"), |b| {
            b.iter(|| {
                PathModelBuilder::new(&catalog, &graph)
                    .select_batch(&learner, &config, &solver)
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_batch_selection);
criterion_main!(benches);
