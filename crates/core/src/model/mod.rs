mod ids;
mod path;
mod phase;
mod progress;
mod task;

pub use ids::{ParseIdError, PathId, StepId, UserId};
pub use path::{Difficulty, KnowledgePath, PathSummary, Step, StepAction, StepKind, UnknownVariant};
pub use phase::{Phase, PhaseTemplate};
pub use progress::{OnboardingProgress, PathProgress, StepActionError};
pub use task::{Task, TaskKind, TaskPriority, TaskTemplate};
