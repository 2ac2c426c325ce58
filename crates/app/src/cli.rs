use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use onboard_core::model::{Difficulty, PathId, StepAction, StepId, UserId};

#[derive(Parser)]
#[command(name = "onboard")]
#[command(about = "Onboarding and knowledge-path progress tracking", long_about = None)]
#[command(version)]
pub struct Cli {
    /// SQLite database URL or file path
    #[arg(long, global = true, env = "ONBOARD_DB_URL", default_value = "sqlite://onboard.sqlite3")]
    pub db: String,

    /// Catalog JSON file replacing the built-in phases and paths
    #[arg(long, global = true, env = "ONBOARD_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Keep all progress in memory for this invocation
    #[arg(long, global = true)]
    pub in_memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TaskState {
    Done,
    Todo,
}

impl TaskState {
    pub fn completed(self) -> bool {
        matches!(self, TaskState::Done)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Onboarding phases with task state for a user
    Phases { user: UserId },

    /// Tasks of one phase for a user
    Tasks { user: UserId, phase: String },

    /// Flip a task's completion flag
    Toggle {
        user: UserId,
        phase: String,
        task: String,
    },

    /// Set a task's completion flag explicitly
    SetTask {
        user: UserId,
        phase: String,
        task: String,
        #[arg(value_enum)]
        state: TaskState,
    },

    /// Onboarding progress for one user, or every user when omitted
    Progress { user: Option<UserId> },

    /// Unlocked achievements in unlock order
    Achievements { user: UserId },

    /// Knowledge path catalog
    Paths {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
    },

    /// One knowledge path with a user's progress
    Path { path_id: PathId, user: UserId },

    /// Paths a user has started
    UserPaths { user: UserId },

    /// Start, complete or skip a step
    Step {
        path_id: PathId,
        user: UserId,
        step_id: StepId,
        action: StepAction,
    },

    /// URL registered for a resource name
    Resource { name: String },

    /// Populate the store with demo progress
    Seed,
}
