//! Learner state: mastery, sprint history, preference tracking.
//!
//! The `LearnerModel` is the only mutable state that survives across planning
//! cycles, and it is owned exclusively by the session loop. Sprint logs are
//! append-only: once a sprint is recorded its log is never touched again.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::catalog::CourseCatalog;
use crate::core::types::{ActivityId, LessonId, MASTERY_SCALE};

/// Smoothing factor for the preference moving averages
const PREFERENCE_EMA_ALPHA: f64 = 0.3;

/// Neutral starting preference before any evidence
const PREFERENCE_BASELINE: f64 = 0.5;

/// Performance score for one completed activity, in [0, 1]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPerformance {
    pub activity_id: ActivityId,
    pub performance: f64,
}

/// Immutable record of one completed sprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintLog {
    pub sprint_id: u32,
    /// Activity ids in the order they were performed
    pub activities: Vec<ActivityId>,
    pub performances: AHashMap<ActivityId, f64>,
    pub timestamp: SystemTime,
    /// Mastery state snapshot taken after applying this sprint
    pub mastery_after: AHashMap<LessonId, u32>,
}

/// Mutable mastery and preference state for one learner
#[derive(Debug, Clone)]
pub struct LearnerModel {
    /// Lessons the learner must master
    pub target_lessons: AHashSet<LessonId>,
    /// Mastery per lesson (0-100); absent means 0
    current_mastery: AHashMap<LessonId, u32>,
    sprint_history: Vec<SprintLog>,
    /// EMA scores per style/type/difficulty; advisory only, never consulted
    /// by the planning formulations
    style_preferences: AHashMap<String, f64>,
    type_preferences: AHashMap<String, f64>,
    difficulty_preferences: AHashMap<String, f64>,
    next_sprint_id: u32,
}

impl LearnerModel {
    pub fn new(target_lessons: AHashSet<LessonId>) -> Self {
        Self {
            target_lessons,
            current_mastery: AHashMap::new(),
            sprint_history: Vec::new(),
            style_preferences: AHashMap::new(),
            type_preferences: AHashMap::new(),
            difficulty_preferences: AHashMap::new(),
            next_sprint_id: 1,
        }
    }

    /// Start from an existing mastery map (e.g. a returning learner)
    pub fn with_initial_mastery(
        target_lessons: AHashSet<LessonId>,
        mastery: AHashMap<LessonId, u32>,
    ) -> Self {
        let mut model = Self::new(target_lessons);
        model.current_mastery = mastery;
        model
    }

    pub fn mastery(&self, lesson: &LessonId) -> u32 {
        self.current_mastery.get(lesson).copied().unwrap_or(0)
    }

    pub fn current_mastery(&self) -> &AHashMap<LessonId, u32> {
        &self.current_mastery
    }

    pub fn sprint_history(&self) -> &[SprintLog] {
        &self.sprint_history
    }

    /// Lessons whose mastery meets or exceeds their threshold
    pub fn completed_lesson_ids(&self, catalog: &CourseCatalog) -> AHashSet<LessonId> {
        self.current_mastery
            .iter()
            .filter(|(id, &mastery)| {
                catalog
                    .lesson(id)
                    .is_some_and(|lesson| mastery >= lesson.min_mastery)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Activities performed in any recorded sprint
    pub fn completed_activity_ids(&self) -> AHashSet<ActivityId> {
        self.sprint_history
            .iter()
            .flat_map(|log| log.activities.iter().cloned())
            .collect()
    }

    /// Target lessons whose threshold is still unmet, sorted for stable
    /// reporting
    pub fn unmet_targets(&self, catalog: &CourseCatalog) -> Vec<LessonId> {
        let mut unmet: Vec<LessonId> = self
            .target_lessons
            .iter()
            .filter(|id| {
                catalog
                    .lesson(id)
                    .is_some_and(|lesson| self.mastery(id) < lesson.min_mastery)
            })
            .cloned()
            .collect();
        unmet.sort();
        unmet
    }

    /// Apply one sprint's performance scores and append its immutable log.
    ///
    /// For every (activity, lesson) pair the gain is
    /// `floor(effectiveness * performance)`, and mastery saturates at 100.
    pub fn record_sprint(&mut self, performances: &[ActivityPerformance], catalog: &CourseCatalog) {
        for perf in performances {
            let Some(activity) = catalog.activity(&perf.activity_id) else {
                continue;
            };
            for (lesson_id, &effectiveness) in &activity.effectiveness {
                let gain = (effectiveness as f64 * perf.performance).floor() as u32;
                let entry = self.current_mastery.entry(lesson_id.clone()).or_insert(0);
                *entry = (*entry + gain).min(MASTERY_SCALE);
            }
            self.update_preferences(perf, catalog);
        }

        self.sprint_history.push(SprintLog {
            sprint_id: self.next_sprint_id,
            activities: performances.iter().map(|p| p.activity_id.clone()).collect(),
            performances: performances
                .iter()
                .map(|p| (p.activity_id.clone(), p.performance))
                .collect(),
            timestamp: SystemTime::now(),
            mastery_after: self.current_mastery.clone(),
        });
        self.next_sprint_id += 1;
    }

    pub fn next_sprint_id(&self) -> u32 {
        self.next_sprint_id
    }

    pub fn style_preference(&self, style: &str) -> f64 {
        self.style_preferences
            .get(style)
            .copied()
            .unwrap_or(PREFERENCE_BASELINE)
    }

    fn update_preferences(&mut self, perf: &ActivityPerformance, catalog: &CourseCatalog) {
        let Some(activity) = catalog.activity(&perf.activity_id) else {
            return;
        };
        let keys = [
            (&mut self.style_preferences, format!("{:?}", activity.style)),
            (
                &mut self.type_preferences,
                format!("{:?}", activity.activity_type),
            ),
            (
                &mut self.difficulty_preferences,
                format!("{:?}", activity.difficulty),
            ),
        ];
        for (prefs, key) in keys {
            let entry = prefs.entry(key).or_insert(PREFERENCE_BASELINE);
            *entry = PREFERENCE_EMA_ALPHA * perf.performance + (1.0 - PREFERENCE_EMA_ALPHA) * *entry;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Activity, ActivityType, CourseCatalog, Difficulty, LearningStyle, Lesson};

    fn catalog() -> CourseCatalog {
        CourseCatalog::from_parts(
            vec![Lesson {
                id: "L1".into(),
                name: "Counting".into(),
                min_mastery: 50,
                prerequisites: AHashSet::new(),
                min_coverage: 1,
            }],
            vec![Activity {
                id: "A1".into(),
                name: "Counting drill".into(),
                duration: 20,
                style: LearningStyle::Visual,
                effectiveness: [(LessonId::from("L1"), 60)].into_iter().collect(),
                difficulty: Difficulty::Easy,
                activity_type: ActivityType::Exercise,
                max_selections: 1,
            }],
        )
        .unwrap()
    }

    fn perf(id: &str, score: f64) -> ActivityPerformance {
        ActivityPerformance {
            activity_id: id.into(),
            performance: score,
        }
    }

    #[test]
    fn test_mastery_gain_floors() {
        let catalog = catalog();
        let mut learner = LearnerModel::new([LessonId::from("L1")].into_iter().collect());

        // 60 * 0.85 = 51.0 -> floor 51
        learner.record_sprint(&[perf("A1", 0.85)], &catalog);
        assert_eq!(learner.mastery(&"L1".into()), 51);
    }

    #[test]
    fn test_mastery_saturates_at_scale() {
        let catalog = catalog();
        let mut learner = LearnerModel::new([LessonId::from("L1")].into_iter().collect());

        learner.record_sprint(&[perf("A1", 1.0)], &catalog);
        learner.record_sprint(&[perf("A1", 1.0)], &catalog);
        assert_eq!(learner.mastery(&"L1".into()), 100);
    }

    #[test]
    fn test_history_and_derived_sets() {
        let catalog = catalog();
        let mut learner = LearnerModel::new([LessonId::from("L1")].into_iter().collect());
        assert!(learner.completed_lesson_ids(&catalog).is_empty());

        learner.record_sprint(&[perf("A1", 1.0)], &catalog);

        assert_eq!(learner.sprint_history().len(), 1);
        assert_eq!(learner.sprint_history()[0].sprint_id, 1);
        assert_eq!(learner.next_sprint_id(), 2);
        assert!(learner.completed_activity_ids().contains(&"A1".into()));
        assert!(learner.completed_lesson_ids(&catalog).contains(&"L1".into()));
        assert!(learner.unmet_targets(&catalog).is_empty());

        // snapshot is frozen after the fact
        assert_eq!(
            learner.sprint_history()[0].mastery_after[&LessonId::from("L1")],
            60
        );
    }

    #[test]
    fn test_preference_ema_moves_toward_performance() {
        let catalog = catalog();
        let mut learner = LearnerModel::new(AHashSet::new());
        assert_eq!(learner.style_preference("Visual"), 0.5);

        learner.record_sprint(&[perf("A1", 1.0)], &catalog);
        let after_one = learner.style_preference("Visual");
        assert!(after_one > 0.5 && after_one < 1.0);

        learner.record_sprint(&[perf("A1", 1.0)], &catalog);
        assert!(learner.style_preference("Visual") > after_one);
    }
}
