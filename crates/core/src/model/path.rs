use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::ids::{PathId, StepId};

//
// ─── ENUMS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(UnknownVariant::new("difficulty", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Document,
    Video,
    CodeReview,
    AiInteraction,
    Quiz,
    Interactive,
    Lab,
}

/// What a user did with a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    /// Open the path on this step without completing anything.
    Start,
    Complete,
    /// Only allowed on optional steps; counts toward progress like `Complete`.
    Skip,
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepAction::Start => "start",
            StepAction::Complete => "complete",
            StepAction::Skip => "skip",
        })
    }
}

impl FromStr for StepAction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "complete" => Ok(Self::Complete),
            "skip" => Ok(Self::Skip),
            _ => Err(UnknownVariant::new("step action", s)),
        }
    }
}

/// Error returned when parsing a textual enum value fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

//
// ─── STEP / PATH ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub id: StepId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    #[serde(default)]
    pub content: String,
    pub resource_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    /// 1-based display order inside the path.
    pub order: u32,
}

fn default_required() -> bool {
    true
}

/// A named, ordered learning journey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgePath {
    pub id: PathId,
    pub title: String,
    pub description: String,
    pub estimated_time: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub steps: Vec<Step>,
}

impl KnowledgePath {
    #[must_use]
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|s| &s.id == id)
    }

    /// Steps sorted by their declared `order`.
    pub fn ordered_steps(&self) -> impl Iterator<Item = &Step> {
        let mut steps: Vec<&Step> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.order);
        steps.into_iter()
    }

    #[must_use]
    pub fn summary(&self) -> PathSummary {
        PathSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            estimated_time: self.estimated_time.clone(),
            difficulty: self.difficulty,
            category: self.category.clone(),
            total_steps: self.steps.len(),
            required_steps: self.steps.iter().filter(|s| s.required).count(),
        }
    }
}

/// Listing shape for the path catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSummary {
    pub id: PathId,
    pub title: String,
    pub description: String,
    pub estimated_time: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub total_steps: usize,
    pub required_steps: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_action_parses_case_insensitively() {
        assert_eq!("Complete".parse::<StepAction>().unwrap(), StepAction::Complete);
        assert_eq!(" skip ".parse::<StepAction>().unwrap(), StepAction::Skip);
        let err = "finish".parse::<StepAction>().unwrap_err();
        assert_eq!(err.to_string(), "unknown step action: finish");
    }

    #[test]
    fn step_deserializes_with_wire_names() {
        let step: Step = serde_json::from_str(
            r#"{
                "id": "step-4",
                "title": "Ask AI Assistant",
                "type": "ai_interaction",
                "resource_url": "/ai/chat",
                "required": false,
                "order": 4
            }"#,
        )
        .unwrap();
        assert_eq!(step.kind, StepKind::AiInteraction);
        assert!(!step.required);
        assert!(step.content.is_empty());
    }

    #[test]
    fn ordered_steps_follow_declared_order() {
        let path: KnowledgePath = serde_json::from_str(
            r#"{
                "id": "p",
                "title": "P",
                "description": "",
                "estimated_time": "1 hour",
                "difficulty": "beginner",
                "category": "general",
                "steps": [
                    { "id": "b", "title": "B", "type": "quiz", "resource_url": "/b", "order": 2 },
                    { "id": "a", "title": "A", "type": "video", "resource_url": "/a", "order": 1 }
                ]
            }"#,
        )
        .unwrap();
        let ids: Vec<&str> = path.ordered_steps().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(path.summary().required_steps, 2);
    }
}
