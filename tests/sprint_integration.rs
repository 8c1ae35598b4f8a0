//! Sprint builder integration tests

use pathforge::catalog::{Activity, ActivityType, CourseCatalog, Difficulty, LearningStyle, Lesson};
use pathforge::core::config::PlannerConfig;
use pathforge::core::types::{ActivityId, LessonId};
use pathforge::graph::PrerequisiteGraph;
use pathforge::sprint::{Sprint, SprintBuilder, SprintOrdering};

fn lesson(id: &str, prereqs: &[&str]) -> Lesson {
    Lesson {
        id: id.into(),
        name: id.to_string(),
        min_mastery: 50,
        prerequisites: prereqs.iter().map(|p| LessonId::from(*p)).collect(),
        min_coverage: 1,
    }
}

fn activity(id: &str, effectiveness: &[(&str, u32)]) -> Activity {
    Activity {
        id: id.into(),
        name: id.to_string(),
        duration: 30,
        style: LearningStyle::Visual,
        effectiveness: effectiveness
            .iter()
            .map(|(l, e)| (LessonId::from(*l), *e))
            .collect(),
        difficulty: Difficulty::Medium,
        activity_type: ActivityType::Video,
        max_selections: 1,
    }
}

fn setup(lessons: Vec<Lesson>, activities: Vec<Activity>) -> (CourseCatalog, PrerequisiteGraph) {
    let catalog = CourseCatalog::from_parts(lessons, activities).unwrap();
    let graph = PrerequisiteGraph::build(catalog.lessons()).unwrap();
    (catalog, graph)
}

#[test]
fn test_five_same_depth_activities_split_into_two_two_one() {
    let (catalog, graph) = setup(
        vec![lesson("l1", &[]), lesson("l2", &[])],
        vec![
            activity("a1", &[("l1", 30)]),
            activity("a2", &[("l1", 30)]),
            activity("a3", &[("l1", 30), ("l2", 30)]),
            activity("a4", &[("l2", 30)]),
            activity("a5", &[("l2", 30)]),
        ],
    );
    let mut config = PlannerConfig::default();
    config.max_sprint_size = 2;
    let builder = SprintBuilder::new(&catalog, &graph, &config);
    let refs: Vec<&Activity> = catalog.activities().iter().collect();
    let sprints = builder.build(&refs).unwrap();

    let mut sizes: Vec<usize> = sprints.iter().map(Sprint::len).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 2, 2]);

    let mut all: Vec<ActivityId> = sprints
        .iter()
        .flat_map(|s| s.activities.iter().cloned())
        .collect();
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 5);
}

#[test]
fn test_chunking_disabled_preserves_input_order() {
    // Arrival order deliberately disagrees with id order
    let (catalog, graph) = setup(
        vec![lesson("l1", &[])],
        ["e", "d", "c", "b", "a"]
            .iter()
            .map(|id| activity(id, &[("l1", 30)]))
            .collect(),
    );
    let mut config = PlannerConfig::default();
    config.max_sprint_size = 2;
    config.use_clustering = false;
    let builder = SprintBuilder::new(&catalog, &graph, &config);
    let refs: Vec<&Activity> = catalog.activities().iter().collect();
    let sprints = builder.build(&refs).unwrap();

    let chunks: Vec<Vec<ActivityId>> = sprints.iter().map(|s| s.activities.clone()).collect();
    assert_eq!(
        chunks,
        vec![
            vec![ActivityId::from("e"), ActivityId::from("d")],
            vec![ActivityId::from("c"), ActivityId::from("b")],
            vec![ActivityId::from("a")],
        ]
    );
}

#[test]
fn test_shallow_sprints_precede_deep_ones() {
    let (catalog, graph) = setup(
        vec![
            lesson("l1", &[]),
            lesson("l2", &["l1"]),
            lesson("l3", &["l2"]),
        ],
        vec![
            activity("deep", &[("l3", 30)]),
            activity("mid", &[("l2", 30)]),
            activity("shallow", &[("l1", 30)]),
        ],
    );
    let config = PlannerConfig::default();
    let builder = SprintBuilder::new(&catalog, &graph, &config);
    let refs: Vec<&Activity> = catalog.activities().iter().collect();
    let sprints = builder.build(&refs).unwrap();

    let order: Vec<ActivityId> = sprints
        .iter()
        .flat_map(|s| s.activities.iter().cloned())
        .collect();
    assert_eq!(
        order,
        vec![
            ActivityId::from("shallow"),
            ActivityId::from("mid"),
            ActivityId::from("deep"),
        ]
    );
}

#[test]
fn test_mean_depth_ordering_sorts_across_groups() {
    let (catalog, graph) = setup(
        vec![lesson("l1", &[]), lesson("l2", &["l1"])],
        vec![
            activity("deep", &[("l2", 30)]),
            activity("shallow", &[("l1", 30)]),
        ],
    );
    let mut config = PlannerConfig::default();
    config.sprint_ordering = SprintOrdering::MeanDepth;
    let builder = SprintBuilder::new(&catalog, &graph, &config);
    let refs: Vec<&Activity> = catalog.activities().iter().collect();
    let sprints = builder.build(&refs).unwrap();

    assert_eq!(sprints[0].activities, vec![ActivityId::from("shallow")]);
    assert_eq!(sprints[1].activities, vec![ActivityId::from("deep")]);
}

#[test]
fn test_empty_selection_yields_no_sprints() {
    let (catalog, graph) = setup(vec![lesson("l1", &[])], vec![activity("a1", &[("l1", 30)])]);
    let config = PlannerConfig::default();
    let builder = SprintBuilder::new(&catalog, &graph, &config);
    let sprints = builder.build(&[]).unwrap();
    assert!(sprints.is_empty());
}

#[test]
fn test_large_group_never_exceeds_size_cap() {
    let activities: Vec<Activity> = (0..23)
        .map(|i| activity(&format!("a{i:02}"), &[("l1", 10)]))
        .collect();
    let (catalog, graph) = setup(vec![lesson("l1", &[])], activities);

    for use_clustering in [true, false] {
        let mut config = PlannerConfig::default();
        config.max_sprint_size = 4;
        config.use_clustering = use_clustering;
        let builder = SprintBuilder::new(&catalog, &graph, &config);
        let refs: Vec<&Activity> = catalog.activities().iter().collect();
        let sprints = builder.build(&refs).unwrap();

        assert_eq!(
            sprints.iter().map(Sprint::len).sum::<usize>(),
            23,
            "clustering={use_clustering}"
        );
        for sprint in &sprints {
            assert!(sprint.len() <= 4);
            assert!(!sprint.is_empty());
        }
    }
}
