use std::sync::Arc;

use onboard_core::achievement::{Achievement, AchievementRules};
use onboard_core::model::{OnboardingProgress, UserId};
use storage::repository::AchievementRepository;
use tracing::info;

use crate::Clock;
use crate::error::AchievementError;

/// Unlocks achievements from onboarding progress snapshots.
#[derive(Clone)]
pub struct AchievementService {
    clock: Clock,
    rules: AchievementRules,
    achievements: Arc<dyn AchievementRepository>,
}

impl AchievementService {
    #[must_use]
    pub fn new(
        clock: Clock,
        rules: AchievementRules,
        achievements: Arc<dyn AchievementRepository>,
    ) -> Self {
        Self {
            clock,
            rules,
            achievements,
        }
    }

    /// Append every label whose rule `progress` now meets.
    ///
    /// Returns only the labels this call added. A label already unlocked, by
    /// an earlier call or a concurrent one, is never reported twice.
    ///
    /// # Errors
    ///
    /// Returns `AchievementError::Storage` if the log cannot be read or written.
    pub async fn evaluate(
        &self,
        user: &UserId,
        progress: &OnboardingProgress,
    ) -> Result<Vec<String>, AchievementError> {
        let unlocked = self.achievements.list_achievements(user).await?;
        let candidates = self.rules.newly_met(progress, &unlocked);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let mut added = Vec::with_capacity(candidates.len());
        for label in candidates {
            let achievement = Achievement {
                label: label.to_owned(),
                unlocked_at: now,
            };
            if self.achievements.append_achievement(user, &achievement).await? {
                info!(user = %user, achievement = label, percentage = progress.percentage, "achievement unlocked");
                added.push(achievement.label);
            }
        }
        Ok(added)
    }

    /// Unlocked achievements in unlock order.
    ///
    /// # Errors
    ///
    /// Returns `AchievementError::Storage` if repository access fails.
    pub async fn list_achievements(
        &self,
        user: &UserId,
    ) -> Result<Vec<Achievement>, AchievementError> {
        Ok(self.achievements.list_achievements(user).await?)
    }

    /// Just the labels, in unlock order.
    ///
    /// # Errors
    ///
    /// Returns `AchievementError::Storage` if repository access fails.
    pub async fn labels(&self, user: &UserId) -> Result<Vec<String>, AchievementError> {
        let achievements = self.list_achievements(user).await?;
        Ok(achievements.into_iter().map(|a| a.label).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onboard_core::achievement::ONBOARDING_COMPLETE;
    use onboard_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn progress(completed: usize, total: usize) -> OnboardingProgress {
        OnboardingProgress {
            percentage: onboard_core::aggregate::percentage(completed, total),
            completed_phases: (0..completed).map(|i| format!("done-{i}")).collect(),
            pending_phases: (completed..total).map(|i| format!("todo-{i}")).collect(),
        }
    }

    fn service(rules: AchievementRules) -> AchievementService {
        AchievementService::new(fixed_clock(), rules, Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn onboarding_complete_is_emitted_once() {
        let svc = service(AchievementRules::minimal());
        let user = UserId::new("rakshitha").unwrap();

        assert!(svc.evaluate(&user, &progress(4, 5)).await.unwrap().is_empty());
        assert_eq!(
            svc.evaluate(&user, &progress(5, 5)).await.unwrap(),
            vec![ONBOARDING_COMPLETE]
        );
        assert!(svc.evaluate(&user, &progress(5, 5)).await.unwrap().is_empty());

        // Dropping below 100% keeps what was unlocked.
        assert!(svc.evaluate(&user, &progress(4, 5)).await.unwrap().is_empty());
        assert_eq!(svc.labels(&user).await.unwrap(), vec![ONBOARDING_COMPLETE]);
    }

    #[tokio::test]
    async fn ladder_unlocks_in_rule_order() {
        let svc = service(AchievementRules::builtin());
        let user = UserId::new("roopika").unwrap();

        assert_eq!(
            svc.evaluate(&user, &progress(2, 5)).await.unwrap(),
            vec!["First Steps", "Explorer"]
        );
        assert_eq!(
            svc.evaluate(&user, &progress(5, 5)).await.unwrap(),
            vec!["Contributor", "Team Player", ONBOARDING_COMPLETE]
        );
        assert_eq!(svc.list_achievements(&user).await.unwrap().len(), 5);
    }
}
