//! Shared identifier newtypes.
//!
//! Lessons and activities are keyed by authored string ids (e.g. "Lesson_007",
//! "Activity_042") coming straight from the course data files, so the newtypes
//! wrap `String` and serialize transparently.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a lesson
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(pub String);

/// Unique identifier for an activity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub String);

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LessonId {
    fn from(s: &str) -> Self {
        LessonId(s.to_string())
    }
}

impl From<&str> for ActivityId {
    fn from(s: &str) -> Self {
        ActivityId(s.to_string())
    }
}

/// Mastery scores live on a 0-100 integer scale
pub const MASTERY_SCALE: u32 = 100;
