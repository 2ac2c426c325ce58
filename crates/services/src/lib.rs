#![forbid(unsafe_code)]

pub mod achievement_service;
pub mod error;
pub mod knowledge_path_service;
pub mod locks;
pub mod onboarding_service;
pub mod progress_services;

pub use onboard_core::Clock;

pub use achievement_service::AchievementService;
pub use error::{AchievementError, ErrorKind, KnowledgePathError, OnboardingError, ServicesInitError};
pub use knowledge_path_service::{KnowledgePathService, PathView};
pub use onboarding_service::{OnboardingService, TaskUpdate, UserProgressSummary};
pub use progress_services::ProgressServices;
