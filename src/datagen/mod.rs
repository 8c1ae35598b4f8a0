//! Synthetic curriculum generator for benchmarks and simulation
//!
//! Produces catalogs in three size tiers. Prerequisite density scales with a
//! lesson's position so early lessons stay shallow and later ones sit deeper
//! in the graph, and activity durations and effectiveness scale with the
//! complexity of the lessons they cover. Generation is seeded per
//! (tier, instance) pair so benchmark instances are reproducible.

use std::fs;
use std::path::Path;

use ahash::AHashMap;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::catalog::{Activity, ActivityType, CourseCatalog, Difficulty, LearningStyle, Lesson};
use crate::core::error::Result;
use crate::core::types::{ActivityId, LessonId};

/// Instance size tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Tier {
    Basic,
    Intermediate,
    Advanced,
}

/// Generation parameters for one tier
#[derive(Debug, Clone, Copy)]
pub struct TierConfig {
    pub lessons_range: (usize, usize),
    pub activities_range: (usize, usize),
    pub max_lessons_per_activity: usize,
    pub max_prereqs: usize,
    pub effectiveness_range: (u32, u32),
}

impl Tier {
    pub fn config(self) -> TierConfig {
        match self {
            Tier::Basic => TierConfig {
                lessons_range: (5, 8),
                activities_range: (50, 70),
                max_lessons_per_activity: 2,
                max_prereqs: 2,
                effectiveness_range: (30, 40),
            },
            Tier::Intermediate => TierConfig {
                lessons_range: (20, 40),
                activities_range: (300, 400),
                max_lessons_per_activity: 3,
                max_prereqs: 4,
                effectiveness_range: (20, 25),
            },
            Tier::Advanced => TierConfig {
                lessons_range: (50, 60),
                activities_range: (800, 1000),
                max_lessons_per_activity: 5,
                max_prereqs: 7,
                effectiveness_range: (7, 12),
            },
        }
    }

    fn seed_tag(self) -> u64 {
        match self {
            Tier::Basic => 1,
            Tier::Intermediate => 2,
            Tier::Advanced => 3,
        }
    }
}

const STYLE_COMPAT: [(ActivityType, &[LearningStyle]); 8] = [
    (ActivityType::Reading, &[LearningStyle::ReadingWriting]),
    (
        ActivityType::Video,
        &[LearningStyle::Visual, LearningStyle::Auditory],
    ),
    (ActivityType::Quiz, &[LearningStyle::ReadingWriting]),
    (ActivityType::Discussion, &[LearningStyle::Auditory]),
    (ActivityType::Exercise, &[LearningStyle::Kinesthetic]),
    (
        ActivityType::Project,
        &[LearningStyle::Kinesthetic, LearningStyle::Visual],
    ),
    (
        ActivityType::Game,
        &[LearningStyle::Kinesthetic, LearningStyle::Visual],
    ),
    (
        ActivityType::Simulation,
        &[LearningStyle::Visual, LearningStyle::Kinesthetic],
    ),
];

/// Generates one synthetic catalog instance
pub struct InstanceGenerator {
    config: TierConfig,
    rng: ChaCha8Rng,
    lessons: Vec<Lesson>,
    activities: Vec<Activity>,
}

impl InstanceGenerator {
    pub fn new(tier: Tier, instance_id: u32) -> Self {
        Self {
            config: tier.config(),
            rng: ChaCha8Rng::seed_from_u64(instance_id as u64 * 100 + tier.seed_tag()),
            lessons: Vec::new(),
            activities: Vec::new(),
        }
    }

    /// Generate a validated catalog
    pub fn generate(mut self) -> Result<CourseCatalog> {
        self.create_lessons();
        self.assign_prerequisites();
        self.create_activities();
        self.check_coherence();
        CourseCatalog::from_parts(self.lessons, self.activities)
    }

    fn create_lessons(&mut self) {
        let (lo, hi) = self.config.lessons_range;
        let count = self.rng.gen_range(lo..=hi);
        for i in 0..count {
            self.lessons.push(Lesson {
                id: LessonId(format!("Lesson_{:03}", i + 1)),
                name: format!("Lesson {}", i + 1),
                min_mastery: self.rng.gen_range(70..=100),
                prerequisites: Default::default(),
                min_coverage: 1,
            });
        }
    }

    /// Prerequisite count scales with position: the lesson at fraction `f`
    /// of the curriculum may take up to `max_prereqs * f * 1.5` earlier
    /// lessons
    fn assign_prerequisites(&mut self) {
        let ids: Vec<LessonId> = self.lessons.iter().map(|l| l.id.clone()).collect();
        for (i, lesson) in self.lessons.iter_mut().enumerate() {
            let position = i as f64 / ids.len() as f64;
            let cap = ((self.config.max_prereqs as f64 * position * 1.5).round() as usize).min(i);
            let count = self.rng.gen_range(0..=cap);
            if count > 0 {
                let mut earlier: Vec<&LessonId> = ids[..i].iter().collect();
                earlier.shuffle(&mut self.rng);
                lesson.prerequisites = earlier[..count].iter().map(|id| (*id).clone()).collect();
            }
        }
    }

    /// Transitive dependent count, normalized by the deepest chain; proxies
    /// how foundational a lesson is
    fn lesson_complexity(&self) -> AHashMap<LessonId, f64> {
        let mut dependents: AHashMap<&LessonId, Vec<&LessonId>> = AHashMap::new();
        for lesson in &self.lessons {
            for prereq in &lesson.prerequisites {
                dependents.entry(prereq).or_default().push(&lesson.id);
            }
        }

        // Longest prerequisite chain; prereqs only point backward so a
        // single forward pass suffices
        let mut depth: AHashMap<&LessonId, usize> = AHashMap::new();
        for lesson in &self.lessons {
            let d = lesson
                .prerequisites
                .iter()
                .filter_map(|p| depth.get(p))
                .max()
                .map_or(0, |m| m + 1);
            depth.insert(&lesson.id, d);
        }
        let max_depth = depth.values().copied().max().unwrap_or(0).max(1);

        self.lessons
            .iter()
            .map(|lesson| {
                let mut seen: Vec<&LessonId> = Vec::new();
                let mut stack: Vec<&LessonId> = vec![&lesson.id];
                while let Some(id) = stack.pop() {
                    for dep in dependents.get(id).into_iter().flatten() {
                        if !seen.contains(dep) {
                            seen.push(*dep);
                            stack.push(*dep);
                        }
                    }
                }
                (lesson.id.clone(), seen.len() as f64 / max_depth as f64)
            })
            .collect()
    }

    fn create_activities(&mut self) {
        let (lo, hi) = self.config.activities_range;
        let count = self.rng.gen_range(lo..=hi);
        let ids: Vec<LessonId> = self.lessons.iter().map(|l| l.id.clone()).collect();
        let complexity = self.lesson_complexity();

        for i in 0..count {
            let (activity_type, styles) = STYLE_COMPAT[self.rng.gen_range(0..STYLE_COMPAT.len())];

            let linked = self
                .rng
                .gen_range(1..=self.config.max_lessons_per_activity.min(ids.len()));
            let mut pool = ids.clone();
            pool.shuffle(&mut self.rng);
            pool.truncate(linked);

            let avg_complexity =
                pool.iter().map(|id| complexity[id]).sum::<f64>() / pool.len() as f64;

            // Complex material takes longer and yields more per contact
            let (dlo, dhi) = Difficulty::Medium.duration_range();
            let base_duration = self.rng.gen_range(dlo..=dhi);
            let duration = ((base_duration as f64 * (0.5 + avg_complexity * 1.5)) as u32).max(1);

            let (elo, ehi) = self.config.effectiveness_range;
            let effectiveness: AHashMap<LessonId, u32> = pool
                .iter()
                .map(|id| {
                    let base = self.rng.gen_range(elo..=ehi);
                    let adjusted = (base as f64 * (0.7 + complexity[id] * 0.6)) as u32;
                    (id.clone(), adjusted.clamp(1, 20))
                })
                .collect();

            self.activities.push(Activity {
                id: ActivityId(format!("Activity_{:03}", i + 1)),
                name: format!("Activity {}", i + 1),
                duration,
                style: *styles
                    .choose(&mut self.rng)
                    .unwrap_or(&LearningStyle::Visual),
                effectiveness,
                difficulty: difficulty_label(avg_complexity),
                activity_type,
                max_selections: self.rng.gen_range(1..=3),
            });
        }
    }

    /// Warn for any lesson whose total available contribution cannot reach
    /// its threshold; such instances are infeasible for batch selection
    fn check_coherence(&self) {
        let mut totals: AHashMap<&LessonId, u32> = AHashMap::new();
        for activity in &self.activities {
            for (lesson_id, &eff) in &activity.effectiveness {
                *totals.entry(lesson_id).or_insert(0) += eff;
            }
        }
        for lesson in &self.lessons {
            let available = totals.get(&lesson.id).copied().unwrap_or(0);
            if available < lesson.min_mastery {
                warn!(
                    lesson = %lesson.id,
                    available,
                    required = lesson.min_mastery,
                    "lesson may not reach mastery"
                );
            }
        }
    }
}

/// Write a catalog's records as `lessons.json` and `activities.json` under
/// `dir`
pub fn write_json(catalog: &CourseCatalog, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    let mut lessons: Vec<&Lesson> = catalog.lessons().values().collect();
    lessons.sort_by(|a, b| a.id.cmp(&b.id));
    fs::write(
        dir.join("lessons.json"),
        serde_json::to_string_pretty(&lessons)?,
    )?;
    fs::write(
        dir.join("activities.json"),
        serde_json::to_string_pretty(catalog.activities())?,
    )?;
    Ok(())
}

fn difficulty_label(complexity: f64) -> Difficulty {
    if complexity < 0.33 {
        Difficulty::Easy
    } else if complexity < 0.66 {
        Difficulty::Medium
    } else {
        Difficulty::Hard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_instance_validates() {
        let catalog = InstanceGenerator::new(Tier::Basic, 0).generate().unwrap();
        let (lo, hi) = Tier::Basic.config().lessons_range;
        assert!((lo..=hi).contains(&catalog.lessons().len()));
        let (lo, hi) = Tier::Basic.config().activities_range;
        assert!((lo..=hi).contains(&catalog.activities().len()));
    }

    #[test]
    fn test_prerequisites_only_point_backward() {
        let catalog = InstanceGenerator::new(Tier::Intermediate, 1)
            .generate()
            .unwrap();
        // Ids are ordinal, so backward edges mean a smaller suffix
        for lesson in catalog.lessons().values() {
            for prereq in &lesson.prerequisites {
                assert!(prereq.0 < lesson.id.0, "{} -> {}", lesson.id, prereq);
            }
        }
        // Backward-only edges cannot cycle
        crate::graph::PrerequisiteGraph::build(catalog.lessons()).unwrap();
    }

    #[test]
    fn test_same_seed_same_instance() {
        let a = InstanceGenerator::new(Tier::Basic, 3).generate().unwrap();
        let b = InstanceGenerator::new(Tier::Basic, 3).generate().unwrap();
        assert_eq!(a.lessons().len(), b.lessons().len());
        assert_eq!(a.activities().len(), b.activities().len());
        for (x, y) in a.activities().iter().zip(b.activities()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.duration, y.duration);
            assert_eq!(x.effectiveness, y.effectiveness);
        }
    }

    #[test]
    fn test_effectiveness_stays_in_bounds() {
        let catalog = InstanceGenerator::new(Tier::Advanced, 2).generate().unwrap();
        for activity in catalog.activities() {
            assert!(!activity.effectiveness.is_empty());
            for &eff in activity.effectiveness.values() {
                assert!((1..=20).contains(&eff));
            }
            assert!((1..=3).contains(&activity.max_selections));
        }
    }
}
