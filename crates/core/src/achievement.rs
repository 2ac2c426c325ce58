use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::OnboardingProgress;

/// Label unlocked when every onboarding phase is complete.
pub const ONBOARDING_COMPLETE: &str = "Onboarding Complete";

/// An unlocked achievement. Once stored it is never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub label: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Condition an onboarding progress snapshot must meet to unlock a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Threshold {
    CompletedPhases(usize),
    Percentage(u8),
}

impl Threshold {
    #[must_use]
    pub fn is_met(self, progress: &OnboardingProgress) -> bool {
        match self {
            Threshold::CompletedPhases(n) => n > 0 && progress.completed_phases.len() >= n,
            Threshold::Percentage(p) => progress.total_phases() > 0 && progress.percentage >= p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AchievementRule {
    pub label: String,
    pub threshold: Threshold,
}

impl AchievementRule {
    #[must_use]
    pub fn new(label: impl Into<String>, threshold: Threshold) -> Self {
        Self {
            label: label.into(),
            threshold,
        }
    }
}

/// Ordered rule set; labels are unlocked in rule order when several
/// thresholds are crossed by the same mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementRules(Vec<AchievementRule>);

impl AchievementRules {
    #[must_use]
    pub fn new(rules: Vec<AchievementRule>) -> Self {
        Self(rules)
    }

    /// Only the "Onboarding Complete" rule.
    #[must_use]
    pub fn minimal() -> Self {
        Self(vec![AchievementRule::new(
            ONBOARDING_COMPLETE,
            Threshold::Percentage(100),
        )])
    }

    /// The completed-phase ladder followed by "Onboarding Complete".
    #[must_use]
    pub fn builtin() -> Self {
        Self(vec![
            AchievementRule::new("First Steps", Threshold::CompletedPhases(1)),
            AchievementRule::new("Explorer", Threshold::CompletedPhases(2)),
            AchievementRule::new("Contributor", Threshold::CompletedPhases(3)),
            AchievementRule::new("Team Player", Threshold::CompletedPhases(4)),
            AchievementRule::new(ONBOARDING_COMPLETE, Threshold::Percentage(100)),
        ])
    }

    #[must_use]
    pub fn rules(&self) -> &[AchievementRule] {
        &self.0
    }

    /// Labels whose threshold `progress` meets and that are not in `unlocked` yet.
    #[must_use]
    pub fn newly_met<'a>(
        &'a self,
        progress: &OnboardingProgress,
        unlocked: &[Achievement],
    ) -> Vec<&'a str> {
        let mut out: Vec<&str> = Vec::new();
        for rule in &self.0 {
            let label = rule.label.as_str();
            if !rule.threshold.is_met(progress) {
                continue;
            }
            if unlocked.iter().any(|a| a.label == label) || out.contains(&label) {
                continue;
            }
            out.push(label);
        }
        out
    }
}

impl Default for AchievementRules {
    fn default() -> Self {
        Self::builtin()
    }
}
