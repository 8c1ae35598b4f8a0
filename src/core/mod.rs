pub mod config;
pub mod error;
pub mod types;

pub use config::PlannerConfig;
pub use error::{PathError, Result};
pub use types::{ActivityId, LessonId, MASTERY_SCALE};
