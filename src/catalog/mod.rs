//! Course catalog: lesson and activity records plus the per-session registry.
//!
//! This module defines the data structures loaded from the two course JSON
//! files. Lesson records carry `{id, name, min_mastery, prerequisites}`,
//! activity records `{id, name, duration, style, effectiveness, difficulty,
//! type}`. The `CourseCatalog` owns both collections for the lifetime of a
//! planning session and is passed by reference to every component; there is
//! no process-wide cached load.
//!
//! Loading validates every cross-reference: a prerequisite or effectiveness
//! entry naming an unknown lesson is a fatal `DataValidation` error, never
//! silently ignored.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{PathError, Result};
use crate::core::types::{ActivityId, LessonId, MASTERY_SCALE};

/// Presentation style of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    #[serde(rename = "reading/writing")]
    ReadingWriting,
    Kinesthetic,
}

/// Kind of learning activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Reading,
    Video,
    Quiz,
    Discussion,
    Exercise,
    Project,
    Game,
    Simulation,
}

/// Difficulty tier of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Authored duration range in minutes for activities of this tier
    pub fn duration_range(self) -> (u32, u32) {
        match self {
            Difficulty::Easy => (10, 25),
            Difficulty::Medium => (20, 40),
            Difficulty::Hard => (30, 60),
        }
    }
}

fn default_min_coverage() -> u32 {
    1
}

fn default_max_selections() -> u32 {
    1
}

/// A lesson in the curriculum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub name: String,
    /// Mastery threshold (0-100) at which the lesson counts as completed
    pub min_mastery: u32,
    /// Lessons that must be mastered before activities advancing this one
    /// may be scheduled
    #[serde(default)]
    pub prerequisites: AHashSet<LessonId>,
    /// Minimum number of activity contacts the timestep formulation requires
    /// for this lesson
    #[serde(default = "default_min_coverage")]
    pub min_coverage: u32,
}

/// A learning activity, immutable once loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    /// Estimated duration in minutes
    pub duration: u32,
    pub style: LearningStyle,
    /// How much this activity raises mastery, per covered lesson (1-100)
    pub effectiveness: AHashMap<LessonId, u32>,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// How many times the timestep formulation may schedule this activity
    #[serde(default = "default_max_selections")]
    pub max_selections: u32,
}

/// Read-only registry of lessons and activities for one planning session
#[derive(Debug, Clone)]
pub struct CourseCatalog {
    lessons: AHashMap<LessonId, Lesson>,
    activities: Vec<Activity>,
    by_activity_id: AHashMap<ActivityId, usize>,
}

impl CourseCatalog {
    /// Build a catalog from record lists, validating every cross-reference.
    ///
    /// Collects all problems before failing so the error names every
    /// offending record, not just the first.
    pub fn from_parts(lessons: Vec<Lesson>, activities: Vec<Activity>) -> Result<Self> {
        let mut problems = Vec::new();

        let mut lesson_map: AHashMap<LessonId, Lesson> = AHashMap::with_capacity(lessons.len());
        for lesson in lessons {
            if lesson.min_mastery > MASTERY_SCALE {
                problems.push(format!(
                    "lesson {}: min_mastery {} exceeds scale {}",
                    lesson.id, lesson.min_mastery, MASTERY_SCALE
                ));
            }
            if lesson_map.insert(lesson.id.clone(), lesson).is_some() {
                problems.push("duplicate lesson id".to_string());
            }
        }
        for lesson in lesson_map.values() {
            for prereq in &lesson.prerequisites {
                if !lesson_map.contains_key(prereq) {
                    problems.push(format!(
                        "lesson {}: unknown prerequisite {}",
                        lesson.id, prereq
                    ));
                }
            }
        }

        let mut by_activity_id = AHashMap::with_capacity(activities.len());
        for (idx, activity) in activities.iter().enumerate() {
            if activity.duration == 0 {
                problems.push(format!("activity {}: zero duration", activity.id));
            }
            for (lesson_id, score) in &activity.effectiveness {
                if !lesson_map.contains_key(lesson_id) {
                    problems.push(format!(
                        "activity {}: effectiveness references unknown lesson {}",
                        activity.id, lesson_id
                    ));
                }
                if *score == 0 || *score > MASTERY_SCALE {
                    problems.push(format!(
                        "activity {}: effectiveness for {} out of range: {}",
                        activity.id, lesson_id, score
                    ));
                }
            }
            if by_activity_id.insert(activity.id.clone(), idx).is_some() {
                problems.push(format!("duplicate activity id {}", activity.id));
            }
        }

        if !problems.is_empty() {
            problems.sort();
            return Err(PathError::DataValidation(problems));
        }

        Ok(Self {
            lessons: lesson_map,
            activities,
            by_activity_id,
        })
    }

    /// Load and validate a catalog from the two course JSON files
    pub fn load(lessons_path: &Path, activities_path: &Path) -> Result<Self> {
        let lessons: Vec<Lesson> = serde_json::from_str(&std::fs::read_to_string(lessons_path)?)?;
        let activities: Vec<Activity> =
            serde_json::from_str(&std::fs::read_to_string(activities_path)?)?;
        tracing::info!(
            lessons = lessons.len(),
            activities = activities.len(),
            "course catalog loaded"
        );
        Self::from_parts(lessons, activities)
    }

    pub fn lessons(&self) -> &AHashMap<LessonId, Lesson> {
        &self.lessons
    }

    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.lessons.get(id)
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn activity(&self, id: &ActivityId) -> Option<&Activity> {
        self.by_activity_id.get(id).map(|&i| &self.activities[i])
    }

    /// Lesson ids in sorted order, the canonical universe for coverage vectors
    pub fn sorted_lesson_ids(&self) -> Vec<LessonId> {
        let mut ids: Vec<LessonId> = self.lessons.keys().cloned().collect();
        ids.sort();
        ids
    }
}
